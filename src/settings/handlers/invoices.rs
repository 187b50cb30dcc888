// src/settings/handlers/invoices.rs

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::super::models::{
    CreatedResponse, InvoiceListResponse, InvoiceUserQuery, MessageResponse,
};
use super::super::services::{
    document_path, invoice_pdf, invoices_csv, pdf_file_name, resolve_user_id, InvoiceRow,
};
use super::super::validators::{parse_invoice, parse_new_invoice};
use crate::auth::AdminGate;
use crate::common::{ApiError, AppState};
use crate::services::{Document, FieldValue, Query as StoreQuery};

async fn invoices_for(state: &AppState, user_id: &str) -> Result<Vec<Document>, ApiError> {
    let query = StoreQuery::collection("invoices").where_eq("userId", user_id);
    state
        .store
        .query(&query)
        .await
        .map_err(|e| ApiError::from_store("Failed to load invoices", e))
}

/// GET /api/invoices?user=<email-or-uid>
pub async fn list_invoices(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
    Query(query): Query<InvoiceUserQuery>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let user_id = resolve_user_id(state.store.as_ref(), query.user.as_deref().unwrap_or("")).await?;
    let docs = invoices_for(&state, &user_id).await?;

    Ok(Json(InvoiceListResponse {
        user_id,
        invoices: docs.iter().map(|d| d.to_json()).collect(),
    }))
}

/// POST /api/invoices
pub async fn create_invoice(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let (user, fields) = parse_new_invoice(&body).map_err(|e| {
        warn!(error = %e, "Rejected invoice");
        e
    })?;
    let user_id = resolve_user_id(state.store.as_ref(), &user).await?;

    let mut data = fields.to_document();
    data.insert("userId".to_string(), FieldValue::from(user_id.clone()));

    let id = state
        .store
        .add("invoices", data)
        .await
        .map_err(|e| ApiError::from_store("Failed to create invoice", e))?;

    info!(admin_uid = %admin.uid, invoice_id = %id, user_id = %user_id, "Invoice created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /api/invoices/:id - `userId` is left untouched
pub async fn update_invoice(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<MessageResponse>, ApiError> {
    let path = document_path("invoices", &id)?;
    let fields = parse_invoice(&body)?;

    state
        .store
        .update(&path, fields.to_document())
        .await
        .map_err(|e| ApiError::from_store("Failed to update invoice", e))?;

    info!(admin_uid = %admin.uid, invoice_id = %id, "Invoice updated");
    Ok(Json(MessageResponse::new("Invoice updated")))
}

/// DELETE /api/invoices/:id
pub async fn delete_invoice(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let path = document_path("invoices", &id)?;
    state
        .store
        .delete(&path)
        .await
        .map_err(|e| ApiError::from_store("Failed to delete invoice", e))?;

    info!(admin_uid = %admin.uid, invoice_id = %id, "Invoice deleted");
    Ok(Json(MessageResponse::new("Invoice deleted")))
}

/// GET /api/invoices/export.csv?user=<email-or-uid>
pub async fn export_invoices_csv(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
    Query(query): Query<InvoiceUserQuery>,
) -> Result<Response, ApiError> {
    let user_id = resolve_user_id(state.store.as_ref(), query.user.as_deref().unwrap_or("")).await?;
    let docs = invoices_for(&state, &user_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"invoices.csv\"",
            ),
        ],
        invoices_csv(&docs),
    )
        .into_response())
}

/// GET /api/invoices/:id/pdf
pub async fn download_invoice_pdf(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(_admin): AdminGate,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let path = document_path("invoices", &id)?;
    let doc = state
        .store
        .get(&path)
        .await
        .map_err(|e| ApiError::from_store("Failed to load invoice", e))?
        .ok_or_else(|| ApiError::NotFound("Invoice not found".to_string()))?;

    let row = InvoiceRow::from_document(&doc);
    let pdf = invoice_pdf(&row)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        pdf_file_name(&row.invoice_number)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
