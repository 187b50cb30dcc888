// src/tracking/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_MESSAGE_LEN: usize = 10_000;

/// Support ticket progress. Any index may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Opened,
    InProgress,
    AwaitingSupport,
    Resolved,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Opened,
        TicketStatus::InProgress,
        TicketStatus::AwaitingSupport,
        TicketStatus::Resolved,
    ];

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::Opened => "Opened",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::AwaitingSupport => "Awaiting Technical Support",
            TicketStatus::Resolved => "Resolved",
        }
    }

    /// Position on the console's progress bar, 0 to 100
    pub fn progress_percent(self) -> u8 {
        (self.index() * 100 / (Self::ALL.len() as i64 - 1)) as u8
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status_index: Value,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status_index: i64,
    pub label: &'static str,
    pub progress: u8,
}

impl From<TicketStatus> for StatusResponse {
    fn from(status: TicketStatus) -> Self {
        Self {
            status_index: status.index(),
            label: status.label(),
            progress: status.progress_percent(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamAuth {
    pub token: Option<String>,
}

/// Frames pushed over the realtime sockets
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Snapshot { items: Vec<Value> },
    Error { message: String },
}
