// src/settings/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use super::handlers::{contacts, invoices, profile, security};
use super::models::MAX_AVATAR_BYTES;

pub fn settings_routes() -> Router {
    Router::new()
        .route(
            "/api/settings/profile",
            get(profile::get_profile)
                .put(profile::update_profile)
                // Headroom over the avatar cap so oversized files get a readable 400
                .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 1024 * 1024)),
        )
        .route("/api/settings/password", post(security::change_password))
        .route(
            "/api/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/api/invoices/export.csv",
            get(invoices::export_invoices_csv),
        )
        .route(
            "/api/invoices/:id",
            put(invoices::update_invoice).delete(invoices::delete_invoice),
        )
        .route("/api/invoices/:id/pdf", get(invoices::download_invoice_pdf))
        .route("/api/contacts", get(contacts::list_contacts))
        .route("/api/contacts/:id", delete(contacts::delete_contact))
}
