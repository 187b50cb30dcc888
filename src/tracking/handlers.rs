// src/tracking/handlers.rs

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::{
    CreatedResponse, PostMessageRequest, StatusResponse, TicketStatus, UpdateStatusRequest,
    MAX_MESSAGE_LEN,
};
use crate::auth::AdminGate;
use crate::common::{ApiError, AppState};
use crate::services::{Direction, DocumentData, FieldValue, Query};

pub fn tickets_query() -> Query {
    Query::collection("tickets").order_by("createdAt", Direction::Descending)
}

pub fn messages_query(ticket_id: &str) -> Query {
    Query::collection(format!("tickets/{}/messages", ticket_id)).order_by("ts", Direction::Ascending)
}

fn ticket_path(id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id.contains('/') {
        return Err(ApiError::BadRequest("Invalid ticket id".to_string()));
    }
    Ok(format!("tickets/{}", id))
}

fn status_update(index: i64) -> DocumentData {
    let mut data = DocumentData::new();
    data.insert("statusIndex".to_string(), FieldValue::Integer(index));
    data
}

/// GET /api/tickets - Newest first
pub async fn list_tickets(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = state
        .store
        .query(&tickets_query())
        .await
        .map_err(|e| ApiError::from_store("Failed to load tickets", e))?;

    Ok(Json(docs.iter().map(|d| d.to_json()).collect()))
}

/// POST /api/tickets/:id/open - Moves an unset or negative status to Opened
pub async fn open_ticket(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let path = ticket_path(&id)?;
    let mut ticket = state
        .store
        .get(&path)
        .await
        .map_err(|e| ApiError::from_store("Failed to load ticket", e))?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    let current = ticket.get("statusIndex").and_then(FieldValue::as_i64);
    if current.map_or(true, |index| index < 0) {
        state
            .store
            .update(&path, status_update(0))
            .await
            .map_err(|e| ApiError::from_store("Failed to update status", e))?;
        ticket
            .data
            .insert("statusIndex".to_string(), FieldValue::Integer(0));
        info!(admin_uid = %admin.uid, ticket_id = %id, "Ticket opened");
    }

    Ok(Json(ticket.to_json()))
}

/// PUT /api/tickets/:id/status
pub async fn update_status(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let path = ticket_path(&id)?;
    let status = request
        .status_index
        .as_i64()
        .and_then(TicketStatus::from_index)
        .ok_or_else(|| {
            warn!(ticket_id = %id, value = %request.status_index, "Rejected status index");
            ApiError::BadRequest("statusIndex must be an integer between 0 and 3".to_string())
        })?;

    state
        .store
        .update(&path, status_update(status.index()))
        .await
        .map_err(|e| ApiError::from_store("Failed to update status", e))?;

    info!(admin_uid = %admin.uid, ticket_id = %id, status = status.label(), "Ticket status updated");
    Ok(Json(StatusResponse::from(status)))
}

/// GET /api/tickets/:id/messages - Oldest first
pub async fn list_messages(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
    Path(id): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    ticket_path(&id)?;
    let docs = state
        .store
        .query(&messages_query(&id))
        .await
        .map_err(|e| ApiError::from_store("Failed to load messages", e))?;

    Ok(Json(docs.iter().map(|d| d.to_json()).collect()))
}

/// POST /api/tickets/:id/messages - Appends an admin reply
pub async fn post_message(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let path = ticket_path(&id)?;
    let text = request.msg.as_deref().map(str::trim).unwrap_or_default();

    if text.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::BadRequest(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }

    let mut data = DocumentData::new();
    data.insert("from".to_string(), FieldValue::from("admin"));
    data.insert("msg".to_string(), FieldValue::from(text));
    data.insert("ts".to_string(), FieldValue::ServerTimestamp);

    let message_id = state
        .store
        .add(&format!("{}/messages", path), data)
        .await
        .map_err(|e| ApiError::from_store("Failed to send message", e))?;

    info!(admin_uid = %admin.uid, ticket_id = %id, message_id = %message_id, "Reply posted");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: message_id })))
}
