// src/settings/handlers/contacts.rs

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::super::models::MessageResponse;
use super::super::services::document_path;
use crate::auth::AdminGate;
use crate::common::{ApiError, AppState};
use crate::services::{Direction, Query};

/// GET /api/contacts - Newest submissions first
pub async fn list_contacts(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
) -> Result<Json<Vec<Value>>, ApiError> {
    let query = Query::collection("contacts").order_by("createdAt", Direction::Descending);
    let docs = state
        .store
        .query(&query)
        .await
        .map_err(|e| ApiError::from_store("Failed to load contacts", e))?;

    Ok(Json(docs.iter().map(|d| d.to_json()).collect()))
}

/// DELETE /api/contacts/:id
pub async fn delete_contact(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let path = document_path("contacts", &id)?;
    state
        .store
        .delete(&path)
        .await
        .map_err(|e| ApiError::from_store("Failed to delete contact", e))?;

    info!(admin_uid = %admin.uid, contact_id = %id, "Contact deleted");
    Ok(Json(MessageResponse::new("Contact deleted")))
}
