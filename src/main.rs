use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reportdeck::api;
use reportdeck::config::Config;
use reportdeck::report::ReportService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Loaded configuration");

    let reports = ReportService::from_config(&config).context("Failed to configure report providers")?;

    let api_router = api::create_api_router(
        Arc::new(reports),
        config.api_server.cors_allow_origin.as_deref(),
    );

    match config.api_server.cors_allow_origin.as_deref() {
        Some(origin) => info!("CORS restricted to {}", origin),
        None => info!("CORS allows any origin"),
    }

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("Failed to bind {api_addr}"))?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Report endpoints available at http://{}/api/...", api_addr);

    axum::serve(api_listener, api_router).await?;

    Ok(())
}
