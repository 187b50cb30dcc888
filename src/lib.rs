// src/lib.rs
//! Backend for the admin console: account management, support ticket
//! tracking, settings and the function-hosted account API, all on top of
//! Firebase Authentication and Cloud Firestore.

use axum::{extract::Extension, http::HeaderValue, middleware, Router};
use reqwest::Client;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub mod auth;
pub mod common;
pub mod functions;
pub mod logging_middleware;
pub mod notify;
pub mod services;
pub mod settings;
pub mod tracking;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use common::{AppConfig, AppState};
use services::credentials::AccessTokenSource;
use services::firebase_auth::FirebaseAuth;
use services::firestore::FirestoreClient;
use services::notify::{EmailRelay, SesRelay, SmsRelay, TwilioRelay};
use services::storage::BucketStorage;
use services::{ChangeNotifier, NotificationService, ObservedStore};

/// Identity and document clients sharing one access token source.
pub fn connect_firebase(config: &AppConfig, http: &Client) -> (FirebaseAuth, FirestoreClient) {
    let firebase = &config.firebase;
    let tokens = AccessTokenSource::new(http.clone(), firebase.service_account.clone());
    if firebase.service_account.is_none() {
        warn!("No service account configured; admin calls to Firebase will fail");
    }

    let identity = FirebaseAuth::new(
        http.clone(),
        tokens.clone(),
        &firebase.project_id,
        firebase.web_api_key.clone(),
    );
    let store = FirestoreClient::new(http.clone(), tokens, &firebase.project_id);
    (identity, store)
}

/// Builds every provider client the server needs.
pub async fn build_state(config: AppConfig) -> anyhow::Result<Arc<AppState>> {
    let http = Client::builder().no_proxy().build()?;
    let (identity, store) = connect_firebase(&config, &http);
    info!(project_id = %config.firebase.project_id, "Firebase clients initialized");

    let storage = BucketStorage::connect(config.storage.clone()).await;

    let email: Option<Arc<dyn EmailRelay>> = match &config.ses {
        Some(ses) => Some(Arc::new(SesRelay::connect(ses).await)),
        None => {
            warn!("SES_FROM_EMAIL not set; emails will only be logged");
            None
        }
    };
    let sms: Option<Arc<dyn SmsRelay>> = match &config.twilio {
        Some(twilio) => Some(Arc::new(TwilioRelay::new(http.clone(), twilio.clone()))),
        None => {
            warn!("Twilio credentials not set; SMS will only be logged");
            None
        }
    };

    let changes = ChangeNotifier::new();
    Ok(Arc::new(AppState {
        config: Arc::new(config),
        identity: Arc::new(identity),
        store: Arc::new(ObservedStore::new(Arc::new(store), changes.clone())),
        storage: Arc::new(storage),
        notifier: Arc::new(NotificationService::new(email, sms)),
        changes,
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let prefix = state.config.functions_prefix.trim_end_matches('/');
    let functions = if prefix.is_empty() {
        functions::functions_routes()
    } else {
        Router::new().nest(prefix, functions::functions_routes())
    };

    Router::new()
        .merge(auth::auth_routes())
        .merge(users::users_routes())
        .merge(notify::notify_routes())
        .merge(tracking::tracking_routes())
        .merge(settings::settings_routes())
        .merge(functions)
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(state.clone()))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
}
