// src/functions/extractors.rs

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::FunctionError;
use crate::auth::extractors::app_state;
use crate::auth::{authorize, bearer_token};
use crate::services::DecodedToken;

/// Same check as the console gate, reported with the function surface's messages.
#[derive(Debug, Clone)]
pub struct FunctionAdmin(pub DecodedToken);

#[async_trait]
impl<S> FromRequestParts<S> for FunctionAdmin
where
    S: Send + Sync,
{
    type Rejection = FunctionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state)
            .await
            .map_err(|e| FunctionError::Internal(e.to_string()))?;
        let decoded = authorize(&app_state, bearer_token(&parts.headers)).await?;
        Ok(FunctionAdmin(decoded))
    }
}
