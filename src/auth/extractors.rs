//! Authorization extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::{safe_token_log, ApiError, AppState};
use crate::services::DecodedToken;

/// Why a request did not get past the admin check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailure {
    MissingToken,
    InvalidToken,
    NotAdmin,
}

impl From<GateFailure> for ApiError {
    fn from(failure: GateFailure) -> Self {
        match failure {
            GateFailure::MissingToken => {
                ApiError::Unauthorized("No authorization token provided".to_string())
            }
            GateFailure::InvalidToken => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            GateFailure::NotAdmin => ApiError::Forbidden("Admin privileges required".to_string()),
        }
    }
}

/// The token part of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the token and requires the boolean `admin` claim.
pub async fn authorize(state: &AppState, token: Option<&str>) -> Result<DecodedToken, GateFailure> {
    let token = token.ok_or_else(|| {
        warn!("Authorization failed: missing bearer token");
        GateFailure::MissingToken
    })?;

    let decoded = state.identity.verify_id_token(token).await.map_err(|e| {
        warn!(error = %e, token = %safe_token_log(token), "ID token verification failed");
        GateFailure::InvalidToken
    })?;

    if !decoded.is_admin() {
        warn!(uid = %decoded.uid, "Authorization failed: admin claim missing");
        return Err(GateFailure::NotAdmin);
    }

    debug!(uid = %decoded.uid, "Admin request authorized");
    Ok(decoded)
}

pub(crate) async fn app_state<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<Arc<AppState>, ApiError> {
    let Extension(app_state): Extension<Arc<AppState>> =
        Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;
    Ok(app_state)
}

/// Verified admin caller
///
/// Handlers that take this extractor only run for requests carrying a valid
/// ID token whose `admin` claim is `true`.
#[derive(Debug, Clone)]
pub struct AdminGate(pub DecodedToken);

#[async_trait]
impl<S> FromRequestParts<S> for AdminGate
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let token = bearer_token(&parts.headers);
        let decoded = authorize(&app_state, token).await?;
        Ok(AdminGate(decoded))
    }
}
