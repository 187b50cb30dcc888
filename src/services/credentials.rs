// src/services/credentials.rs
//! Service-account OAuth access tokens for the Google REST APIs.
//!
//! The identity and document clients share one `AccessTokenSource`; it signs a
//! JWT-bearer assertion with the service account key, exchanges it for an
//! access token and caches the token until shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::common::config::ServiceAccountKey;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("service account credentials not configured")]
    NotConfigured,

    #[error("invalid service account private key: {0}")]
    InvalidKey(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AccessTokenSource {
    http: Client,
    key: Option<Arc<ServiceAccountKey>>,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AccessTokenSource {
    pub fn new(http: Client, key: Option<ServiceAccountKey>) -> Self {
        Self {
            http,
            key: key.map(Arc::new),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns a cached access token, refreshing it when it is about to expire.
    pub async fn access_token(&self) -> Result<String, CredentialsError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.value.clone());
            }
        }

        let mut slot = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *slot = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self) -> Result<CachedToken, CredentialsError> {
        let key = self.key.as_ref().ok_or(CredentialsError::NotConfigured)?;
        let assertion = sign_assertion(key, Utc::now())?;

        debug!(client_email = %key.client_email, "Exchanging service account assertion");

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error contacting token endpoint");
                CredentialsError::Exchange(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(http_status = %status, body = %body, "Token endpoint rejected assertion");
            return Err(CredentialsError::Exchange(format!("status {}", status)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialsError::Exchange(e.to_string()))?;

        // Refresh a minute early so in-flight requests never carry a stale token.
        let lifetime = (token.expires_in - 60).max(0);
        info!(expires_in = token.expires_in, "Service account access token refreshed");

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, CredentialsError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| CredentialsError::InvalidKey(e.to_string()))?;

    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| CredentialsError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_reports_not_configured() {
        let source = AccessTokenSource::new(Client::new(), None);
        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err, CredentialsError::NotConfigured));
    }

    #[test]
    fn test_garbage_private_key_is_rejected() {
        let key = ServiceAccountKey {
            project_id: None,
            client_email: "svc@demo.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        };
        let err = sign_assertion(&key, Utc::now()).unwrap_err();
        assert!(matches!(err, CredentialsError::InvalidKey(_)));
    }
}
