// src/main.rs
use dotenv::dotenv;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use admin_console::common::AppConfig;
use admin_console::services::monitoring::{init_error_tracking, init_tracing};
use admin_console::{build_router, build_state};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    init_tracing();

    // ========================================================================
    // CONFIGURATION AND SERVICES
    // ========================================================================

    let config = AppConfig::from_env()?;
    let port = config.port;
    let _sentry = init_error_tracking(&config.monitoring);

    let state = build_state(config).await?;

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
