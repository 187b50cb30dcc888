// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::{ValidationError, ValidationResult};
use crate::services::identity::ProviderError;
use crate::services::firestore::StoreError;
use crate::services::storage::StorageError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    /// 404 with a second line the console shows under the title
    NotFoundDescribed { message: String, description: String },
    InternalServer(String),
    ServiceUnavailable(String),
    InvalidRequestData(Vec<ValidationError>),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::NotFoundDescribed { message, .. } => write!(f, "Not Found: {}", message),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::InvalidRequestData(errors) => {
                write!(f, "Invalid request data: {} field error(s)", errors.len())
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// JSON error response structure
///
/// The admin console reads `message` for its toasts, so every error carries it.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut description = None;
        let (status, message, code, errors) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED", None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN", None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST", None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND", None),
            ApiError::NotFoundDescribed {
                message,
                description: detail,
            } => {
                description = Some(detail);
                (StatusCode::NOT_FOUND, message, "NOT_FOUND", None)
            }
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
                None,
            ),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
                None,
            ),
            ApiError::InvalidRequestData(errors) => (
                StatusCode::BAD_REQUEST,
                "Invalid request data".to_string(),
                "VALIDATION_ERROR",
                Some(errors),
            ),
        };

        let error_response = ErrorResponse {
            message,
            code: code.to_string(),
            description,
            errors,
        };

        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Logs a provider failure and hides its details behind `context`.
    ///
    /// `USER_NOT_FOUND` style failures keep their own status so the console can
    /// tell a stale row from an outage.
    pub fn from_provider(context: &str, err: ProviderError) -> Self {
        match err {
            ProviderError::UserNotFound(uid) => {
                ApiError::NotFound(format!("User not found: {}", uid))
            }
            ProviderError::InvalidCredentials => {
                ApiError::Unauthorized("Current password is incorrect".to_string())
            }
            ProviderError::Rejected(reason) => {
                error!(error = %reason, context = %context, "Identity provider rejected request");
                ApiError::BadRequest(format!("{}: {}", context, reason))
            }
            other => {
                error!(error = %other, context = %context, "Identity provider call failed");
                ApiError::InternalServer(context.to_string())
            }
        }
    }

    pub fn from_store(context: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => ApiError::NotFound(format!("Not found: {}", path)),
            other => {
                error!(error = %other, context = %context, "Document store call failed");
                ApiError::InternalServer(context.to_string())
            }
        }
    }

    pub fn from_storage(context: &str, err: StorageError) -> Self {
        match err {
            StorageError::NotConfigured => {
                ApiError::ServiceUnavailable("Object storage not configured".to_string())
            }
            other => {
                error!(error = %other, context = %context, "Object storage call failed");
                ApiError::InternalServer(context.to_string())
            }
        }
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            ApiError::InvalidRequestData(result.errors)
        }
    }
}
