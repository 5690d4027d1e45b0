//! Batch pipeline entry point: FETCH → TRAIN → WRAP → PREDICT.

use anyhow::Result;
use btc_forecast::application::pipeline;
use btc_forecast::config::Config;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("BTC forecast pipeline {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: registry={:?}, fetch_days={}",
        config.registry_root, config.fetch_days
    );

    let forecasts = pipeline::run(&config).await?;

    info!("==== Predictions are ====");
    for (i, row) in forecasts.rows().into_iter().enumerate() {
        info!("window {}: {:?}", i, row.to_vec());
    }

    Ok(())
}
