// src/settings/models.rs

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::{DocumentData, FieldValue};

/// Avatar uploads above this are rejected before they reach storage
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Identity provider minimum
pub const MIN_PASSWORD_LEN: usize = 6;

/// Inputs at least this long without an `@` are taken as raw user ids
pub const RAW_UID_MIN_LEN: usize = 20;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Overdue,
}

impl InvoiceStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Paid" => Some(InvoiceStatus::Paid),
            "Pending" => Some(InvoiceStatus::Pending),
            "Overdue" => Some(InvoiceStatus::Overdue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Overdue => "Overdue",
        }
    }
}

/// Editable invoice fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceFields {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub service: String,
    pub amount: f64,
    pub status: InvoiceStatus,
}

impl InvoiceFields {
    /// The date is stored as a timestamp at midnight UTC
    pub fn to_document(&self) -> DocumentData {
        let date = Utc.from_utc_datetime(&self.date.and_time(chrono::NaiveTime::MIN));

        let mut data = DocumentData::new();
        data.insert(
            "invoiceNumber".to_string(),
            FieldValue::from(self.invoice_number.clone()),
        );
        data.insert("date".to_string(), FieldValue::Timestamp(date));
        data.insert("service".to_string(), FieldValue::from(self.service.clone()));
        data.insert("amount".to_string(), FieldValue::Double(self.amount));
        data.insert("status".to_string(), FieldValue::from(self.status.as_str()));
        data
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoiceUserQuery {
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListResponse {
    pub user_id: String,
    pub invoices: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
