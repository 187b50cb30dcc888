// src/functions/error.rs

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::GateFailure;
use crate::services::{ProviderError, StoreError};

/// Errors on the function surface render as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl FunctionError {
    pub fn status(&self) -> StatusCode {
        match self {
            FunctionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FunctionError::Forbidden(_) => StatusCode::FORBIDDEN,
            FunctionError::BadRequest(_) => StatusCode::BAD_REQUEST,
            FunctionError::NotFound(_) => StatusCode::NOT_FOUND,
            FunctionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn from_provider(context: &str, err: ProviderError) -> Self {
        match err {
            ProviderError::UserNotFound(_) => FunctionError::NotFound("User not found".to_string()),
            ProviderError::Rejected(reason) => FunctionError::BadRequest(reason),
            other => {
                error!(error = %other, context = %context, "Identity provider call failed");
                FunctionError::Internal(context.to_string())
            }
        }
    }

    pub fn from_store(context: &str, err: StoreError) -> Self {
        error!(error = %err, context = %context, "Document store call failed");
        FunctionError::Internal(context.to_string())
    }
}

impl From<GateFailure> for FunctionError {
    fn from(failure: GateFailure) -> Self {
        match failure {
            GateFailure::MissingToken => FunctionError::Unauthorized("Missing token".to_string()),
            GateFailure::InvalidToken => FunctionError::Unauthorized("Invalid token".to_string()),
            GateFailure::NotAdmin => FunctionError::Forbidden("Admin only".to_string()),
        }
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
