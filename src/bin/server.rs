//! Serving API - loads the Champion composite once and serves forecasts.
//!
//! # Usage
//! ```sh
//! SERVER_ADDR=0.0.0.0:8000 cargo run --bin server
//! ```

use anyhow::{Context, Result};
use btc_forecast::application::pipeline::predict::load_champion;
use btc_forecast::application::serving;
use btc_forecast::config::Config;
use btc_forecast::infrastructure::registry::ModelRegistry;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Forecast server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let registry = ModelRegistry::open(&config.registry_root)?;

    // Loaded once; the artifact is immutable for the process lifetime. A new
    // Champion requires a redeploy.
    let state = Arc::new(load_champion(&registry)?);
    info!("Champion composite loaded");

    let app = serving::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_addr))?;
    info!("Serving on http://{}", config.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated abnormally")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received. Exiting...");
    }
}
