// src/notify/models.rs

use serde::Serialize;

pub const DEFAULT_SUBJECT: &str = "Notification Activated";
pub const DEFAULT_EMAIL_MESSAGE: &str = "Good Day Sir/Ma you successfully activated email service";
pub const DEFAULT_SMS_MESSAGE: &str = "Good Day Sir/Ma you successfully activated SMS service";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyResponse {
    pub status: &'static str,
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl NotifyResponse {
    pub fn sent(sid: Option<String>) -> Self {
        Self {
            status: "ok",
            sent: true,
            sid,
            note: None,
        }
    }

    pub fn logged(note: &'static str) -> Self {
        Self {
            status: "ok",
            sent: false,
            sid: None,
            note: Some(note),
        }
    }
}
