// src/bin/sync_users.rs
//! One-off job: mirror every identity account into `users/{uid}`.

use anyhow::Context;
use dotenv::dotenv;
use reqwest::Client;
use tracing::{error, info};

use admin_console::common::AppConfig;
use admin_console::connect_firebase;
use admin_console::services::monitoring::{init_error_tracking, init_tracing};
use admin_console::users::sync::sync_auth_users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    init_tracing();

    let config = AppConfig::from_env().context("loading configuration")?;
    let _sentry = init_error_tracking(&config.monitoring);
    let http = Client::builder().no_proxy().build()?;
    let (identity, store) = connect_firebase(&config, &http);

    match sync_auth_users(&identity, &store).await {
        Ok(summary) => {
            info!(synced = summary.synced, "Synced users");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "User sync failed");
            Err(e.into())
        }
    }
}
