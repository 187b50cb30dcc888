// src/services/firebase_auth.rs
//! `IdentityProvider` backed by the Identity Toolkit v1 REST API.
//!
//! Admin calls authenticate with the service-account access token; password
//! re-verification goes through the public sign-in endpoint and needs the web
//! API key instead.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use super::credentials::AccessTokenSource;
use super::id_token::FirebaseTokenVerifier;
use super::identity::{
    DecodedToken, IdentityProvider, NewAccount, ProfileUpdate, ProviderError, ProviderUserInfo,
    UserPage, UserRecord, MAX_LIST_PAGE_SIZE,
};
use crate::common::helpers::{parse_epoch_millis, safe_email_log};

const IDENTITY_TOOLKIT_API: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProviderInfo {
    provider_id: String,
    #[serde(default)]
    raw_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_login_at: Option<String>,
    /// Claims travel as a JSON document encoded into a string
    #[serde(default)]
    custom_attributes: Option<String>,
    #[serde(default)]
    provider_user_info: Vec<WireProviderInfo>,
}

impl From<WireUser> for UserRecord {
    fn from(wire: WireUser) -> Self {
        let custom_claims = wire
            .custom_attributes
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
            .unwrap_or_default();

        UserRecord {
            created_at: wire
                .created_at
                .as_deref()
                .and_then(parse_epoch_millis)
                .unwrap_or_default(),
            last_sign_in_at: wire.last_login_at.as_deref().and_then(parse_epoch_millis),
            uid: wire.local_id,
            email: wire.email,
            display_name: wire.display_name,
            photo_url: wire.photo_url,
            email_verified: wire.email_verified,
            disabled: wire.disabled,
            custom_claims,
            provider_data: wire
                .provider_user_info
                .into_iter()
                .map(|info| ProviderUserInfo {
                    uid: info.raw_id.unwrap_or_default(),
                    display_name: info.display_name,
                    email: info.email,
                    photo_url: info.photo_url,
                    provider_id: info.provider_id,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<WireUser>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OobResponse {
    oob_link: Option<String>,
}

/// Maps the `error.message` codes the REST API returns.
fn classify_error(status: u16, message: &str, subject: &str) -> ProviderError {
    let code = message.split([' ', ':']).next().unwrap_or(message);
    match code {
        "USER_NOT_FOUND" => ProviderError::UserNotFound(subject.to_string()),
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "EMAIL_NOT_FOUND" => {
            ProviderError::InvalidCredentials
        }
        "EMAIL_EXISTS" | "INVALID_EMAIL" | "WEAK_PASSWORD" | "MISSING_PASSWORD"
        | "INVALID_CLAIMS" | "CLAIMS_TOO_LARGE" | "INVALID_DISPLAY_NAME" | "INVALID_PHOTO_URL" => {
            ProviderError::Rejected(message.to_string())
        }
        _ => ProviderError::Api {
            status,
            message: message.to_string(),
        },
    }
}

#[derive(Clone)]
pub struct FirebaseAuth {
    http: Client,
    tokens: AccessTokenSource,
    verifier: FirebaseTokenVerifier,
    project_id: String,
    web_api_key: Option<String>,
}

impl FirebaseAuth {
    pub fn new(
        http: Client,
        tokens: AccessTokenSource,
        project_id: &str,
        web_api_key: Option<String>,
    ) -> Self {
        Self {
            verifier: FirebaseTokenVerifier::new(http.clone(), project_id),
            http,
            tokens,
            project_id: project_id.to_string(),
            web_api_key,
        }
    }

    fn project_url(&self, action: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            IDENTITY_TOOLKIT_API, self.project_id, action
        )
    }

    /// Authenticated POST; `subject` names the account in error mapping.
    async fn post_admin(&self, action: &str, body: Value, subject: &str) -> Result<Value, ProviderError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.project_url(action))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Self::read_response(response, subject).await
    }

    async fn read_response(response: reqwest::Response, subject: &str) -> Result<Value, ProviderError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(body);
        }

        let message = body["error"]["message"].as_str().unwrap_or("UNKNOWN");
        let err = classify_error(status.as_u16(), message, subject);
        if matches!(err, ProviderError::Api { .. }) {
            error!(http_status = %status, message = %message, "Identity Toolkit request failed");
        }
        Err(err)
    }

    async fn lookup(&self, body: Value, subject: &str) -> Result<UserRecord, ProviderError> {
        let value = self.post_admin("accounts:lookup", body, subject).await?;
        let parsed: LookupResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        parsed
            .users
            .into_iter()
            .next()
            .map(UserRecord::from)
            .ok_or_else(|| ProviderError::UserNotFound(subject.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn verify_id_token(&self, token: &str) -> Result<DecodedToken, ProviderError> {
        self.verifier.verify(token).await
    }

    async fn list_users(
        &self,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<UserPage, ProviderError> {
        let token = self.tokens.access_token().await?;
        let max_results = max_results.clamp(1, MAX_LIST_PAGE_SIZE).to_string();

        let mut request = self
            .http
            .get(self.project_url("accounts:batchGet"))
            .bearer_auth(token)
            .query(&[("maxResults", max_results.as_str())]);
        if let Some(page_token) = page_token {
            request = request.query(&[("nextPageToken", page_token)]);
        }

        let value = Self::read_response(request.send().await?, "").await?;
        let parsed: BatchGetResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        debug!(count = parsed.users.len(), "Fetched user page");
        Ok(UserPage {
            users: parsed.users.into_iter().map(UserRecord::from).collect(),
            next_page_token: parsed.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_user(&self, uid: &str) -> Result<UserRecord, ProviderError> {
        self.lookup(json!({ "localId": [uid] }), uid).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord, ProviderError> {
        self.lookup(json!({ "email": [email] }), email).await
    }

    async fn create_user(&self, account: NewAccount) -> Result<String, ProviderError> {
        let mut body = json!({
            "email": account.email,
            "password": account.password,
        });
        if let Some(name) = &account.display_name {
            body["displayName"] = json!(name);
        }

        let value = self.post_admin("accounts", body, &account.email).await?;
        let created: SignUpResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        info!(uid = %created.local_id, email = %safe_email_log(&account.email), "Account created");
        Ok(created.local_id)
    }

    async fn update_user(&self, uid: &str, update: ProfileUpdate) -> Result<(), ProviderError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut body = json!({ "localId": uid });
        if let Some(name) = update.display_name {
            body["displayName"] = json!(name);
        }
        if let Some(email) = update.email {
            body["email"] = json!(email);
        }
        if let Some(disabled) = update.disabled {
            body["disableUser"] = json!(disabled);
        }
        if let Some(photo_url) = update.photo_url {
            body["photoUrl"] = json!(photo_url);
        }
        if let Some(password) = update.password {
            body["password"] = json!(password);
        }

        self.post_admin("accounts:update", body, uid).await?;
        Ok(())
    }

    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: Map<String, Value>,
    ) -> Result<(), ProviderError> {
        let encoded = Value::Object(claims).to_string();
        self.post_admin(
            "accounts:update",
            json!({ "localId": uid, "customAttributes": encoded }),
            uid,
        )
        .await?;
        info!(uid = %uid, "Custom claims replaced");
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> Result<(), ProviderError> {
        self.post_admin("accounts:delete", json!({ "localId": uid }), uid)
            .await?;
        info!(uid = %uid, "Account deleted");
        Ok(())
    }

    async fn password_reset_link(&self, email: &str) -> Result<String, ProviderError> {
        let value = self
            .post_admin(
                "accounts:sendOobCode",
                json!({
                    "requestType": "PASSWORD_RESET",
                    "email": email,
                    "returnOobLink": true,
                }),
                email,
            )
            .await?;
        let parsed: OobResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        parsed
            .oob_link
            .ok_or_else(|| ProviderError::Transport("response carried no link".to_string()))
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        let api_key = self.web_api_key.as_deref().ok_or_else(|| {
            warn!("Password verification requested without FIREBASE_WEB_API_KEY");
            ProviderError::NotConfigured("web API key".to_string())
        })?;

        let response = self
            .http
            .post(format!("{}/accounts:signInWithPassword", IDENTITY_TOOLKIT_API))
            .query(&[("key", api_key)])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": false,
            }))
            .send()
            .await?;

        Self::read_response(response, email).await.map(|_| ())
    }
}
