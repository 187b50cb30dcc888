// src/users/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::helpers::to_http_date;
use crate::services::identity::{ProviderUserInfo, UserRecord};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadataDto {
    pub creation_time: String,
    pub last_sign_in_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDto {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub provider_id: String,
}

/// User as the console's table renders it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub metadata: UserMetadataDto,
    pub custom_claims: Map<String, Value>,
    pub provider_data: Vec<ProviderDto>,
}

impl From<ProviderUserInfo> for ProviderDto {
    fn from(info: ProviderUserInfo) -> Self {
        Self {
            uid: info.uid,
            display_name: info.display_name,
            email: info.email,
            photo_url: info.photo_url,
            provider_id: info.provider_id,
        }
    }
}

impl From<UserRecord> for UserDto {
    fn from(record: UserRecord) -> Self {
        Self {
            uid: record.uid,
            email: record.email,
            display_name: record.display_name,
            photo_url: record.photo_url,
            email_verified: record.email_verified,
            disabled: record.disabled,
            metadata: UserMetadataDto {
                creation_time: to_http_date(record.created_at),
                last_sign_in_time: record.last_sign_in_at.map(to_http_date),
            },
            custom_claims: record.custom_claims,
            provider_data: record.provider_data.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: usize,
    pub active_users: usize,
    pub inactive_users: usize,
    pub new_users: usize,
}

/// Validated body of `PATCH /api/users/:uid`; `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub disabled: Option<bool>,
    pub custom_claims: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

/// Table filter of the console's user list; all optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl UserListQuery {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.status.is_none()
            && self.page.is_none()
            && self.page_size.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPageResponse {
    pub users: Vec<UserDto>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
