// src/functions/audit.rs
//! Append-only `audit` trail for account changes made through the function surface.

use tracing::{debug, error};

use crate::services::{DocumentData, DocumentStore, FieldValue};

pub const AUDIT_COLLECTION: &str = "audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    CreateUser,
    /// Written for every account this service creates, whoever asked
    UserCreated,
    UpdateUser,
    DeleteUser,
    SetRole,
    PasswordResetLink,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditKind::CreateUser => "createUser",
            AuditKind::UserCreated => "userCreated",
            AuditKind::UpdateUser => "updateUser",
            AuditKind::DeleteUser => "deleteUser",
            AuditKind::SetRole => "setRole",
            AuditKind::PasswordResetLink => "passwordResetLink",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub kind: AuditKind,
    pub by: Option<String>,
    pub target: String,
    pub payload: Option<DocumentData>,
}

impl AuditEntry {
    pub fn new(kind: AuditKind, target: &str) -> Self {
        Self {
            kind,
            by: None,
            target: target.to_string(),
            payload: None,
        }
    }

    pub fn by(mut self, uid: &str) -> Self {
        self.by = Some(uid.to_string());
        self
    }

    pub fn payload(mut self, payload: DocumentData) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn to_document(&self) -> DocumentData {
        let mut data = DocumentData::new();
        data.insert("type".to_string(), FieldValue::from(self.kind.as_str()));
        if let Some(by) = &self.by {
            data.insert("by".to_string(), FieldValue::from(by.as_str()));
        }
        data.insert("target".to_string(), FieldValue::from(self.target.as_str()));
        data.insert("at".to_string(), FieldValue::ServerTimestamp);
        if let Some(payload) = &self.payload {
            data.insert("payload".to_string(), FieldValue::Map(payload.clone()));
        }
        data
    }
}

/// The account change has already happened by the time this runs, so a
/// failed write is logged rather than turned into an error response.
pub async fn record(store: &dyn DocumentStore, entry: AuditEntry) {
    match store.add(AUDIT_COLLECTION, entry.to_document()).await {
        Ok(id) => debug!(kind = entry.kind.as_str(), target = %entry.target, audit_id = %id, "Audit entry written"),
        Err(e) => error!(
            kind = entry.kind.as_str(),
            target = %entry.target,
            error = %e,
            "Failed to write audit entry"
        ),
    }
}
