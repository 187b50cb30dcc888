//! Session handlers

use axum::extract::{Extension, Json};
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::debug;

use super::extractors::bearer_token;
use super::models::AccessDecision;
use crate::common::AppState;

/// GET /api/session
///
/// Never fails: a missing or bad token is reported as `unauthenticated`, a
/// valid non-admin token as `denied`.
///
/// # Response
/// ```json
/// { "access": "granted", "uid": "...", "email": "...", "role": "admin" }
/// ```
pub async fn session_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AccessDecision> {
    let Some(token) = bearer_token(&headers) else {
        return Json(AccessDecision::Unauthenticated);
    };

    let decision = match state.identity.verify_id_token(token).await {
        Err(_) => AccessDecision::Unauthenticated,
        Ok(decoded) if decoded.is_admin() => AccessDecision::Granted {
            role: decoded.role(),
            uid: decoded.uid,
            email: decoded.email,
        },
        Ok(decoded) => AccessDecision::Denied {
            uid: decoded.uid,
            email: decoded.email,
        },
    };

    debug!(decision = ?decision, "Session resolved");
    Json(decision)
}
