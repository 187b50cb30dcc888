// src/services/identity.rs
//! Identity provider seam.
//!
//! Handlers never talk to the provider's REST API directly; they go through an
//! `IdentityProvider` handle stored in `AppState`. `FirebaseAuth` is the real
//! implementation, tests plug in an in-memory one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::credentials::CredentialsError;
use crate::auth::models::Role;

/// The provider's own page size ceiling for account listing.
pub const MAX_LIST_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider not configured: {0}")]
    NotConfigured(String),

    #[error("invalid id token: {0}")]
    InvalidToken(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl From<CredentialsError> for ProviderError {
    fn from(err: CredentialsError) -> Self {
        match err {
            CredentialsError::NotConfigured => {
                ProviderError::NotConfigured("service account".to_string())
            }
            other => ProviderError::Transport(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUserInfo {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: String,
}

/// Provider-owned account record
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub custom_claims: Map<String, Value>,
    pub provider_data: Vec<ProviderUserInfo>,
}

impl UserRecord {
    pub fn role(&self) -> Role {
        Role::from_claims(&self.custom_claims)
    }
}

/// Fields to change on an account; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub disabled: Option<bool>,
    pub photo_url: Option<String>,
    pub password: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.disabled.is_none()
            && self.photo_url.is_none()
            && self.password.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    pub next_page_token: Option<String>,
}

/// Verified contents of a bearer token, scoped to one request
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub uid: String,
    pub email: Option<String>,
    pub claims: Map<String, Value>,
}

impl DecodedToken {
    /// Only a literal boolean `true` grants admin; `"true"` or `1` do not.
    pub fn is_admin(&self) -> bool {
        matches!(self.claims.get("admin"), Some(Value::Bool(true)))
    }

    pub fn role(&self) -> Role {
        Role::from_claims(&self.claims)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<DecodedToken, ProviderError>;

    async fn list_users(
        &self,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<UserPage, ProviderError>;

    async fn get_user(&self, uid: &str) -> Result<UserRecord, ProviderError>;

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord, ProviderError>;

    /// Creates an account and returns its uid
    async fn create_user(&self, account: NewAccount) -> Result<String, ProviderError>;

    async fn update_user(&self, uid: &str, update: ProfileUpdate) -> Result<(), ProviderError>;

    /// Replaces the whole claims map
    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: Map<String, Value>,
    ) -> Result<(), ProviderError>;

    async fn delete_user(&self, uid: &str) -> Result<(), ProviderError>;

    async fn password_reset_link(&self, email: &str) -> Result<String, ProviderError>;

    /// Re-authenticates with email and password; `InvalidCredentials` on mismatch
    async fn verify_password(&self, email: &str, password: &str) -> Result<(), ProviderError>;
}

/// Walks every page of the account listing.
pub async fn list_all_users(
    provider: &dyn IdentityProvider,
) -> Result<Vec<UserRecord>, ProviderError> {
    let mut users = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = provider
            .list_users(MAX_LIST_PAGE_SIZE, page_token.as_deref())
            .await?;
        users.extend(page.users);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(users)
}
