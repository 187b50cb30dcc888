// src/services/monitoring.rs
//! Log output and optional error tracking.
//!
//! Every `error!` event is forwarded to Sentry through the tracing layer once a
//! client is bound. Without `SENTRY_DSN` the layer has nowhere to send events
//! and only the console output remains.

use sentry::types::Dsn;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::common::config::MonitoringConfig;

/// Installs the global subscriber: env-filtered console output plus the
/// Sentry bridge.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(sentry_tracing::layer())
        .init();
}

/// Starts the Sentry client. Keep the guard alive for the life of the
/// process; dropping it flushes pending events.
pub fn init_error_tracking(config: &MonitoringConfig) -> Option<sentry::ClientInitGuard> {
    let Some(dsn) = config.sentry_dsn.as_deref() else {
        info!("Sentry DSN not configured; error tracking disabled");
        return None;
    };

    let dsn = match dsn.parse::<Dsn>() {
        Ok(dsn) => dsn,
        Err(e) => {
            warn!(error = %e, "SENTRY_DSN is malformed; error tracking disabled");
            return None;
        }
    };

    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        environment: Some(config.environment.clone().into()),
        traces_sample_rate: config.traces_sample_rate,
        ..Default::default()
    });
    info!(environment = %config.environment, "Sentry initialized");
    Some(guard)
}
