// src/functions/routes.rs

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers;

/// Paths are relative; the router is nested under the configured prefix.
pub fn functions_routes() -> Router {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:uid",
            patch(handlers::update_user).delete(handlers::delete_user),
        )
        .route("/users/:uid/role", post(handlers::set_role))
        .route("/users/:uid/reset-link", post(handlers::reset_link))
        .route("/logs/login", get(handlers::login_logs))
        .route("/bootstrap/make-admin", post(handlers::make_admin))
}
