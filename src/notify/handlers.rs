// src/notify/handlers.rs

use axum::{extract::Extension, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use super::models::{NotifyResponse, DEFAULT_EMAIL_MESSAGE, DEFAULT_SMS_MESSAGE, DEFAULT_SUBJECT};
use crate::common::validation::looks_like_email;
use crate::common::{ApiError, AppState};
use crate::services::notify::Delivery;

fn string_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

/// Missing or non-string optional fields fall back to the defaults.
fn required_to<'a>(body: &'a Value, message: &str) -> Result<&'a str, ApiError> {
    string_field(body, "to")
        .filter(|to| !to.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// POST /api/notify/email
pub async fn notify_email(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> Result<Json<NotifyResponse>, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let to = required_to(&body, "Field 'to' (email) is required")?;
    if !looks_like_email(to) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }

    let subject = string_field(&body, "subject").unwrap_or(DEFAULT_SUBJECT);
    let message = string_field(&body, "message").unwrap_or(DEFAULT_EMAIL_MESSAGE);

    let delivery = state
        .notifier
        .send_email(to, subject, message)
        .await
        .map_err(|e| {
            error!(error = %e, "/api/notify/email error");
            ApiError::InternalServer(e.to_string())
        })?;

    Ok(Json(match delivery {
        Delivery::Sent { .. } => NotifyResponse::sent(None),
        Delivery::LoggedOnly => NotifyResponse::logged("Email relay not configured; logged only"),
    }))
}

/// POST /api/notify/sms
pub async fn notify_sms(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> Result<Json<NotifyResponse>, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let to = required_to(&body, "Field 'to' (phone) is required")?;
    let message = string_field(&body, "message").unwrap_or(DEFAULT_SMS_MESSAGE);

    let delivery = state.notifier.send_sms(to, message).await.map_err(|e| {
        error!(error = %e, "/api/notify/sms error");
        ApiError::InternalServer(e.to_string())
    })?;

    Ok(Json(match delivery {
        Delivery::Sent { sid } => NotifyResponse::sent(sid),
        Delivery::LoggedOnly => NotifyResponse::logged("SMS provider not configured; logged only"),
    }))
}
