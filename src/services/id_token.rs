// src/services/id_token.rs
//! Verification of the identity provider's ID tokens.
//!
//! Tokens are RS256 JWTs signed by one of the keys published at the
//! securetoken JWK endpoint. The key set rotates, so it is cached for the
//! `max-age` the endpoint advertises and refetched when an unknown `kid`
//! shows up.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::identity::{DecodedToken, ProviderError};

const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_KEY_TTL_SECS: i64 = 3600;
const CLOCK_SKEW_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JsonWebKey>,
}

#[derive(Debug, Deserialize, Clone)]
struct JsonWebKey {
    kty: String,
    kid: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

struct KeySet {
    keys: HashMap<String, JsonWebKey>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct FirebaseTokenVerifier {
    http: Client,
    project_id: String,
    jwks_url: String,
    keys: Arc<RwLock<Option<KeySet>>>,
}

impl FirebaseTokenVerifier {
    pub fn new(http: Client, project_id: &str) -> Self {
        Self {
            http,
            project_id: project_id.to_string(),
            jwks_url: SECURETOKEN_JWKS_URL.to_string(),
            keys: Arc::new(RwLock::new(None)),
        }
    }

    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    pub async fn verify(&self, token: &str) -> Result<DecodedToken, ProviderError> {
        let header = decode_header(token)
            .map_err(|e| ProviderError::InvalidToken(format!("malformed header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(ProviderError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| ProviderError::InvalidToken("missing kid".to_string()))?;

        let jwk = self.verification_key(&kid).await?;
        let decoding_key = decoding_key(&jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.validate_exp = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let data = decode::<IdTokenClaims>(token, &decoding_key, &validation)
            .map_err(|e| ProviderError::InvalidToken(e.to_string()))?;

        check_subject_and_issue_time(&data.claims, Utc::now())?;

        let IdTokenClaims {
            sub, email, extra, ..
        } = data.claims;

        debug!(uid = %sub, "ID token verified");
        Ok(DecodedToken {
            uid: sub,
            email,
            claims: extra,
        })
    }

    async fn verification_key(&self, kid: &str) -> Result<JsonWebKey, ProviderError> {
        {
            let cache = self.keys.read().await;
            if let Some(set) = cache.as_ref() {
                if set.expires_at > Utc::now() {
                    if let Some(jwk) = set.keys.get(kid) {
                        return Ok(jwk.clone());
                    }
                }
            }
        }

        let fresh = self.fetch_keys().await?;
        let jwk = fresh.keys.get(kid).cloned();
        *self.keys.write().await = Some(fresh);

        jwk.ok_or_else(|| ProviderError::InvalidToken(format!("unknown kid {}", kid)))
    }

    async fn fetch_keys(&self) -> Result<KeySet, ProviderError> {
        let response = self.http.get(&self.jwks_url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(http_status = %status, "Failed to fetch token signing keys");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: "JWKS request failed".to_string(),
            });
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_TTL_SECS);

        let jwks: JwksResponse = response.json().await?;
        let keys = jwks
            .keys
            .into_iter()
            .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
            .collect::<HashMap<_, _>>();

        debug!(count = keys.len(), ttl_secs = ttl, "Token signing keys refreshed");
        Ok(KeySet {
            keys,
            expires_at: Utc::now() + Duration::seconds(ttl),
        })
    }
}

fn decoding_key(jwk: &JsonWebKey) -> Result<DecodingKey, ProviderError> {
    if jwk.kty != "RSA" {
        return Err(ProviderError::InvalidToken("signing key is not RSA".to_string()));
    }
    let n = jwk
        .n
        .as_ref()
        .ok_or_else(|| ProviderError::InvalidToken("JWK missing modulus".to_string()))?;
    let e = jwk
        .e
        .as_ref()
        .ok_or_else(|| ProviderError::InvalidToken("JWK missing exponent".to_string()))?;
    DecodingKey::from_rsa_components(n, e).map_err(|e| ProviderError::InvalidToken(e.to_string()))
}

fn check_subject_and_issue_time(
    claims: &IdTokenClaims,
    now: DateTime<Utc>,
) -> Result<(), ProviderError> {
    if claims.sub.is_empty() || claims.sub.len() > 128 {
        return Err(ProviderError::InvalidToken("bad subject".to_string()));
    }
    if claims.iat > now.timestamp() + CLOCK_SKEW_SECS as i64 {
        return Err(ProviderError::InvalidToken("issued in the future".to_string()));
    }
    Ok(())
}

/// Extracts `max-age` seconds from a Cache-Control header value.
fn parse_max_age(header: &str) -> Option<i64> {
    header.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|secs| secs.trim().parse::<i64>().ok())
    })
}
