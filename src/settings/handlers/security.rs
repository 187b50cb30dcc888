// src/settings/handlers/security.rs

use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{info, warn};

use super::super::models::{ChangePasswordRequest, MessageResponse, MIN_PASSWORD_LEN};
use crate::auth::AdminGate;
use crate::common::{safe_email_log, ApiError, AppState};
use crate::services::identity::ProfileUpdate;

/// POST /api/settings/password - Re-checks the current password first
pub async fn change_password(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let present = |value: Option<String>| value.filter(|v| !v.is_empty());
    let (Some(current), Some(new_password)) = (
        present(request.current_password),
        present(request.new_password),
    ) else {
        return Err(ApiError::BadRequest(
            "Current and new password are required".to_string(),
        ));
    };

    let record = state
        .identity
        .get_user(&admin.uid)
        .await
        .map_err(|e| ApiError::from_provider("Failed to load account", e))?;
    let email = record
        .email
        .ok_or_else(|| ApiError::BadRequest("Account has no email address".to_string()))?;

    if let Err(e) = state.identity.verify_password(&email, &current).await {
        warn!(email = %safe_email_log(&email), "Password change with wrong current password");
        return Err(ApiError::from_provider("Failed to verify password", e));
    }

    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    state
        .identity
        .update_user(
            &admin.uid,
            ProfileUpdate {
                password: Some(new_password),
                ..ProfileUpdate::default()
            },
        )
        .await
        .map_err(|e| ApiError::from_provider("Failed to change password", e))?;

    info!(uid = %admin.uid, "Admin password changed");
    Ok(Json(MessageResponse::new("Password updated")))
}
