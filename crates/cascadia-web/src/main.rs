//! Cascadia gateway server.
//!
//! Run with: cargo run -p cascadia-web

use std::net::SocketAddr;

use cascadia_config::GatewayConfig;
use cascadia_monitoring::install_prometheus_recorder;
use cascadia_web::{build_router, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cascadia=debug,info")),
        )
        .init();

    info!("Cascadia gateway starting up...");

    let config = GatewayConfig::load()?;
    let bind = config.bind;
    info!(
        rate_limit = %config.rate_limit,
        injection_check = config.injection_check,
        pii_check = config.pii_check,
        timeout_ms = config.provider_timeout.as_millis() as u64,
        retries = config.provider_retries,
        "Configuration loaded",
    );

    let mut state = AppState::from_config(config)?;
    match install_prometheus_recorder() {
        Ok(handle) => state = state.with_prometheus(handle),
        Err(e) => warn!(error = %e, "Prometheus exporter disabled"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Cascadia gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
