// src/tracking/routes.rs

use axum::{
    routing::{get, post, put},
    Router,
};

use super::{handlers, websocket};

pub fn tracking_routes() -> Router {
    Router::new()
        .route("/api/tickets", get(handlers::list_tickets))
        .route("/api/tickets/:id/open", post(handlers::open_ticket))
        .route("/api/tickets/:id/status", put(handlers::update_status))
        .route(
            "/api/tickets/:id/messages",
            get(handlers::list_messages).post(handlers::post_message),
        )
        .route("/ws/tickets", get(websocket::tickets_socket))
        .route("/ws/tickets/:id/messages", get(websocket::messages_socket))
}
