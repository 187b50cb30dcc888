// src/notify/routes.rs

use axum::{routing::post, Router};

use super::handlers;

/// Public notification passthroughs; no admin gate.
pub fn notify_routes() -> Router {
    Router::new()
        .route("/api/notify/email", post(handlers::notify_email))
        .route("/api/notify/sms", post(handlers::notify_sms))
}
