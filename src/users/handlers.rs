// src/users/handlers.rs

use axum::{
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::{MessageResponse, UserDto, UserListQuery, UserStats};
use super::services::{apply_update, compute_stats, filter_users};
use super::validators::parse_update;
use crate::auth::{AdminGate, Role};
use crate::common::{ApiError, AppState};
use crate::services::identity::list_all_users;

/// GET /api/users - Every account, or one filtered page when query params are given
pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Query(query): Query<UserListQuery>,
) -> Result<Response, ApiError> {
    let users = list_all_users(state.identity.as_ref())
        .await
        .map_err(|e| ApiError::from_provider("Failed to fetch users", e))?;

    info!(admin_uid = %admin.uid, user_count = users.len(), "Users listed");

    let dtos: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();
    if query.is_empty() {
        return Ok(Json(dtos).into_response());
    }
    Ok(Json(filter_users(dtos, &query)).into_response())
}

/// GET /api/users/stats
pub async fn user_stats(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
) -> Result<Json<UserStats>, ApiError> {
    let users = list_all_users(state.identity.as_ref())
        .await
        .map_err(|e| ApiError::from_provider("Failed to fetch user statistics", e))?;

    Ok(Json(compute_stats(&users, Utc::now())))
}

/// PATCH /api/users/:uid
pub async fn update_user(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(uid): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<UserDto>, ApiError> {
    let update = parse_update(&body).map_err(|errors| {
        warn!(uid = %uid, errors = ?errors.errors, "Rejected user update");
        ApiError::from(errors)
    })?;

    let record = apply_update(state.identity.as_ref(), &uid, update)
        .await
        .map_err(|e| ApiError::from_provider("Failed to update user", e))?;

    info!(admin_uid = %admin.uid, uid = %uid, "User updated");
    Ok(Json(UserDto::from(record)))
}

/// DELETE /api/users/:uid
pub async fn delete_user(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(uid): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .identity
        .delete_user(&uid)
        .await
        .map_err(|e| ApiError::from_provider("Failed to delete user", e))?;

    info!(admin_uid = %admin.uid, uid = %uid, "User deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

async fn assign_role(
    state: &AppState,
    uid: &str,
    role: Role,
    context: &str,
) -> Result<Json<UserDto>, ApiError> {
    state
        .identity
        .set_custom_claims(uid, role.to_claims())
        .await
        .map_err(|e| ApiError::from_provider(context, e))?;

    let record = state
        .identity
        .get_user(uid)
        .await
        .map_err(|e| ApiError::from_provider(context, e))?;

    info!(uid = %uid, role = ?role, "Role assigned");
    Ok(Json(UserDto::from(record)))
}

/// POST /api/users/:uid/admin
pub async fn grant_admin(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
    Path(uid): Path<String>,
) -> Result<Json<UserDto>, ApiError> {
    assign_role(&state, &uid, Role::Admin, "Failed to set user as admin").await
}

/// DELETE /api/users/:uid/admin
pub async fn revoke_admin(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
    Path(uid): Path<String>,
) -> Result<Json<UserDto>, ApiError> {
    assign_role(&state, &uid, Role::User, "Failed to remove admin privileges").await
}
