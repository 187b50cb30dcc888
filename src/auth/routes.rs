//! Session routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the session router
///
/// # Routes
/// - `GET /api/session` - Classify the caller for the console's route guard
pub fn auth_routes() -> Router {
    Router::new().route("/api/session", get(handlers::session_handler))
}
