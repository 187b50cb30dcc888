// src/functions/handlers.rs

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use super::audit::{self, AuditEntry, AuditKind};
use super::error::FunctionError;
use super::extractors::FunctionAdmin;
use super::models::{
    is_truthy, BootstrapRequest, CreateUserRequest, FunctionUser, ItemsResponse, LinkResponse,
    OkResponse, RoleRequest, UidResponse, UpdateUserRequest, UserListResponse, UserPageQuery,
};
use crate::auth::Role;
use crate::common::{safe_email_log, AppState};
use crate::services::identity::{NewAccount, ProfileUpdate};
use crate::services::{Direction, DocumentData, FieldValue, Query as StoreQuery};

const LOGIN_LOG_LIMIT: u32 = 200;

/// GET /users?limit&nextPageToken
pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    FunctionAdmin(_admin): FunctionAdmin,
    Query(query): Query<UserPageQuery>,
) -> Result<Json<UserListResponse>, FunctionError> {
    let page = state
        .identity
        .list_users(query.page_size(), query.page_token())
        .await
        .map_err(|e| FunctionError::from_provider("Failed to list users", e))?;

    Ok(Json(UserListResponse {
        users: page.users.into_iter().map(FunctionUser::from).collect(),
        next_page_token: page.next_page_token.filter(|t| !t.is_empty()),
    }))
}

/// POST /users
pub async fn create_user(
    Extension(state): Extension<Arc<AppState>>,
    FunctionAdmin(admin): FunctionAdmin,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UidResponse>), FunctionError> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(email), Some(password)) = (non_empty(request.email), non_empty(request.password))
    else {
        return Err(FunctionError::BadRequest(
            "email & password required".to_string(),
        ));
    };

    let uid = state
        .identity
        .create_user(NewAccount {
            email: email.clone(),
            password,
            display_name: non_empty(request.display_name),
        })
        .await
        .map_err(|e| FunctionError::from_provider("Failed to create user", e))?;

    if is_truthy(&request.admin) {
        state
            .identity
            .set_custom_claims(&uid, Role::Admin.to_claims())
            .await
            .map_err(|e| FunctionError::from_provider("Failed to set admin claim", e))?;
    }

    let store = state.store.as_ref();
    audit::record(store, AuditEntry::new(AuditKind::CreateUser, &uid).by(&admin.uid)).await;
    audit::record(store, AuditEntry::new(AuditKind::UserCreated, &uid)).await;

    info!(admin_uid = %admin.uid, uid = %uid, email = %safe_email_log(&email), "Account created");
    Ok((StatusCode::CREATED, Json(UidResponse { uid })))
}

/// PATCH /users/:uid - only the fields present in the body change
pub async fn update_user(
    Extension(state): Extension<Arc<AppState>>,
    FunctionAdmin(admin): FunctionAdmin,
    Path(uid): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<OkResponse>, FunctionError> {
    let update = ProfileUpdate {
        email: request.email.clone(),
        display_name: request.display_name.clone(),
        disabled: request.disabled,
        ..ProfileUpdate::default()
    };
    if !update.is_empty() {
        state
            .identity
            .update_user(&uid, update)
            .await
            .map_err(|e| FunctionError::from_provider("Failed to update user", e))?;
    }

    let mut payload = DocumentData::new();
    if let Some(email) = request.email {
        payload.insert("email".to_string(), FieldValue::from(email));
    }
    if let Some(name) = request.display_name {
        payload.insert("displayName".to_string(), FieldValue::from(name));
    }
    if let Some(disabled) = request.disabled {
        payload.insert("disabled".to_string(), FieldValue::from(disabled));
    }
    audit::record(
        state.store.as_ref(),
        AuditEntry::new(AuditKind::UpdateUser, &uid)
            .by(&admin.uid)
            .payload(payload),
    )
    .await;

    info!(admin_uid = %admin.uid, uid = %uid, "Account updated");
    Ok(Json(OkResponse::ok()))
}

/// DELETE /users/:uid
pub async fn delete_user(
    Extension(state): Extension<Arc<AppState>>,
    FunctionAdmin(admin): FunctionAdmin,
    Path(uid): Path<String>,
) -> Result<Json<OkResponse>, FunctionError> {
    state
        .identity
        .delete_user(&uid)
        .await
        .map_err(|e| FunctionError::from_provider("Failed to delete user", e))?;

    audit::record(
        state.store.as_ref(),
        AuditEntry::new(AuditKind::DeleteUser, &uid).by(&admin.uid),
    )
    .await;

    info!(admin_uid = %admin.uid, uid = %uid, "Account deleted");
    Ok(Json(OkResponse::ok()))
}

/// POST /users/:uid/role - `{admin}` replaces the claims with `{admin: bool}`
pub async fn set_role(
    Extension(state): Extension<Arc<AppState>>,
    FunctionAdmin(admin): FunctionAdmin,
    Path(uid): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<OkResponse>, FunctionError> {
    let make_admin = is_truthy(&request.admin);
    let role = if make_admin { Role::Admin } else { Role::User };
    state
        .identity
        .set_custom_claims(&uid, role.to_claims())
        .await
        .map_err(|e| FunctionError::from_provider("Failed to set role", e))?;

    let mut payload = DocumentData::new();
    payload.insert("admin".to_string(), FieldValue::from(make_admin));
    audit::record(
        state.store.as_ref(),
        AuditEntry::new(AuditKind::SetRole, &uid)
            .by(&admin.uid)
            .payload(payload),
    )
    .await;

    info!(admin_uid = %admin.uid, uid = %uid, admin = make_admin, "Role set");
    Ok(Json(OkResponse::ok()))
}

/// POST /users/:uid/reset-link
pub async fn reset_link(
    Extension(state): Extension<Arc<AppState>>,
    FunctionAdmin(admin): FunctionAdmin,
    Path(uid): Path<String>,
) -> Result<Json<LinkResponse>, FunctionError> {
    let record = state
        .identity
        .get_user(&uid)
        .await
        .map_err(|e| FunctionError::from_provider("Failed to load user", e))?;
    let email = record
        .email
        .ok_or_else(|| FunctionError::BadRequest("User has no email address".to_string()))?;

    let link = state
        .identity
        .password_reset_link(&email)
        .await
        .map_err(|e| FunctionError::from_provider("Failed to generate reset link", e))?;

    audit::record(
        state.store.as_ref(),
        AuditEntry::new(AuditKind::PasswordResetLink, &uid).by(&admin.uid),
    )
    .await;

    info!(admin_uid = %admin.uid, uid = %uid, "Password reset link generated");
    Ok(Json(LinkResponse { link }))
}

/// GET /logs/login - the most recent login attempts
pub async fn login_logs(
    Extension(state): Extension<Arc<AppState>>,
    FunctionAdmin(_admin): FunctionAdmin,
) -> Result<Json<ItemsResponse>, FunctionError> {
    let query = StoreQuery::collection("loginAttempts")
        .order_by("at", Direction::Descending)
        .limit(LOGIN_LOG_LIMIT);
    let docs = state
        .store
        .query(&query)
        .await
        .map_err(|e| FunctionError::from_store("Failed to load login logs", e))?;

    Ok(Json(ItemsResponse {
        items: docs.iter().map(|d| d.to_json()).collect(),
    }))
}

/// Secret check for the bootstrap endpoint. An unset secret rejects everything.
pub fn secret_matches(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() => {
            bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
        }
        _ => false,
    }
}

/// POST /bootstrap/make-admin - unauthenticated, guarded by `MAKE_ADMIN_SECRET`
pub async fn make_admin(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<BootstrapRequest>,
) -> Result<Json<OkResponse>, FunctionError> {
    if !secret_matches(
        state.config.make_admin_secret.as_deref(),
        request.secret.as_deref(),
    ) {
        warn!("Bootstrap attempt with wrong secret");
        return Err(FunctionError::Forbidden("Nope".to_string()));
    }

    let email = request
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| FunctionError::BadRequest("email required".to_string()))?;

    let user = state
        .identity
        .get_user_by_email(email.trim())
        .await
        .map_err(|e| FunctionError::from_provider("Failed to find user", e))?;

    state
        .identity
        .set_custom_claims(&user.uid, Role::Admin.to_claims())
        .await
        .map_err(|e| FunctionError::from_provider("Failed to set admin claim", e))?;

    info!(uid = %user.uid, email = %safe_email_log(&email), "Bootstrap admin granted");
    Ok(Json(OkResponse::with_uid(user.uid)))
}
