// src/users/routes.rs

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers;

pub fn users_routes() -> Router {
    Router::new()
        .route("/api/users", get(handlers::list_users))
        .route("/api/users/stats", get(handlers::user_stats))
        .route(
            "/api/users/:uid",
            patch(handlers::update_user).delete(handlers::delete_user),
        )
        .route(
            "/api/users/:uid/admin",
            post(handlers::grant_admin).delete(handlers::revoke_admin),
        )
}
