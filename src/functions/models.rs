// src/functions/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::helpers::to_http_date;
use crate::services::identity::{UserRecord, MAX_LIST_PAGE_SIZE};

/// Account row as the function surface lists it
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: String,
    pub disabled: bool,
    pub admin: bool,
    pub created_at: String,
    pub last_sign_in_at: Option<String>,
}

impl From<UserRecord> for FunctionUser {
    fn from(record: UserRecord) -> Self {
        let admin = record
            .custom_claims
            .get("admin")
            .map(is_truthy)
            .unwrap_or(false);
        Self {
            uid: record.uid,
            email: record.email,
            display_name: record.display_name.unwrap_or_default(),
            disabled: record.disabled,
            admin,
            created_at: to_http_date(record.created_at),
            last_sign_in_at: record.last_sign_in_at.map(to_http_date),
        }
    }
}

/// JavaScript-style truthiness for loosely typed flags in request bodies
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPageQuery {
    pub limit: Option<String>,
    pub next_page_token: Option<String>,
}

impl UserPageQuery {
    /// Missing, zero or unparseable limits fall back to the maximum page size
    pub fn page_size(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .map_or(MAX_LIST_PAGE_SIZE, |n| {
                n.min(i64::from(MAX_LIST_PAGE_SIZE)) as u32
            })
    }

    pub fn page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<FunctionUser>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub admin: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub admin: Value,
}

#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UidResponse {
    pub uid: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true, uid: None }
    }

    pub fn with_uid(uid: String) -> Self {
        Self {
            ok: true,
            uid: Some(uid),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<Value>,
}
