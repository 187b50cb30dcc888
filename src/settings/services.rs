// src/settings/services.rs

use infer::Infer;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::{debug, error, warn};

use super::models::RAW_UID_MIN_LEN;
use crate::common::ApiError;
use crate::services::storage::sanitize_file_name;
use crate::services::{Document, DocumentStore, FieldValue, Query};

/// Collections searched, in order, when the console names a user by email
const LOOKUP_COLLECTIONS: [&str; 2] = ["profiles", "users"];

pub const CSV_HEADER: &str = "Invoice Number,Date,Service,Amount,Status";

/// Turns a console input (email or uid) into a user id.
pub async fn resolve_user_id(store: &dyn DocumentStore, input: &str) -> Result<String, ApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("User ID required".to_string()));
    }
    if trimmed.chars().count() >= RAW_UID_MIN_LEN && !trimmed.contains('@') {
        return Ok(trimmed.to_string());
    }

    for collection in LOOKUP_COLLECTIONS {
        let query = Query::collection(collection).where_eq("email", trimmed).limit(1);
        match store.query(&query).await {
            Ok(docs) => {
                if let Some(doc) = docs.into_iter().next() {
                    debug!(collection, user_id = %doc.id, "Resolved user by email");
                    return Ok(doc.id);
                }
            }
            Err(e) => warn!(collection, error = %e, "User lookup failed, trying next collection"),
        }
    }

    Err(ApiError::NotFoundDescribed {
        message: "User not found".to_string(),
        description: "No user with this email.".to_string(),
    })
}

pub fn document_path(collection: &str, id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id.contains('/') {
        return Err(ApiError::BadRequest("Invalid document id".to_string()));
    }
    Ok(format!("{}/{}", collection, id))
}

/// Storage key for an uploaded avatar: `adminAvatars/<uid>/<ms>_<name>`
pub fn avatar_key(uid: &str, uploaded_at_ms: i64, file_name: &str) -> String {
    format!(
        "adminAvatars/{}/{}_{}",
        uid,
        uploaded_at_ms,
        sanitize_file_name(file_name)
    )
}

/// Returns the MIME type when the bytes are a JPEG, PNG, GIF or WebP image.
pub fn detect_image(data: &[u8]) -> Option<&'static str> {
    let mime = Infer::new().get(data)?.mime_type();
    match mime {
        "image/jpeg" | "image/png" | "image/gif" | "image/webp" => Some(mime),
        _ => None,
    }
}

/// Flattened invoice row as the console table shows it
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub invoice_number: String,
    pub date: String,
    pub service: String,
    pub amount: String,
    pub status: String,
}

impl InvoiceRow {
    pub fn from_document(doc: &Document) -> Self {
        let text = |field: &str| doc.get_str(field).unwrap_or_default().to_string();
        let date = match doc.get("date") {
            Some(FieldValue::Timestamp(ts)) => ts.format("%Y-%m-%d").to_string(),
            Some(FieldValue::String(s)) => s.clone(),
            _ => String::new(),
        };
        let amount = doc
            .get("amount")
            .and_then(FieldValue::as_f64)
            .map(|a| a.to_string())
            .unwrap_or_default();

        Self {
            invoice_number: text("invoiceNumber"),
            date,
            service: text("service"),
            amount,
            status: text("status"),
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn invoices_csv(docs: &[Document]) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    for doc in docs {
        let row = InvoiceRow::from_document(doc);
        let cells = [
            &row.invoice_number,
            &row.date,
            &row.service,
            &row.amount,
            &row.status,
        ];
        lines.push(
            cells
                .iter()
                .map(|c| csv_field(c))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}

/// Single-page A4 invoice. Coordinates are measured from the bottom edge.
pub fn invoice_pdf(row: &InvoiceRow) -> Result<Vec<u8>, ApiError> {
    let render_failed = |e: printpdf::Error| {
        error!(error = %e, invoice = %row.invoice_number, "Failed to render invoice PDF");
        ApiError::InternalServer("Failed to render invoice".to_string())
    };

    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", row.invoice_number),
        Mm(210.0),
        Mm(297.0),
        "Layer 1",
    );
    let canvas = doc.get_page(page).get_layer(layer);
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(render_failed)?;
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_failed)?;

    canvas.use_text("Invoice", 18.0, Mm(90.0), Mm(277.0), &font_bold);

    let lines = [
        format!("Invoice Number: {}", row.invoice_number),
        format!("Date: {}", row.date),
        format!("Service: {}", row.service),
        format!("Amount: {}", row.amount),
        format!("Status: {}", row.status),
    ];
    let mut y = 257.0;
    for line in &lines {
        canvas.use_text(line.as_str(), 12.0, Mm(20.0), Mm(y), &font);
        y -= 10.0;
    }

    canvas.use_text("Thank you for your business!", 10.0, Mm(20.0), Mm(197.0), &font);

    doc.save_to_bytes().map_err(render_failed)
}

/// Download name for an invoice PDF
pub fn pdf_file_name(invoice_number: &str) -> String {
    let base = if invoice_number.trim().is_empty() {
        "invoice"
    } else {
        invoice_number
    };
    format!("{}.pdf", sanitize_file_name(base))
}
