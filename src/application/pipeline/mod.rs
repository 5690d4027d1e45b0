//! Batch pipeline: FETCH → TRAIN → WRAP → PREDICT.
//!
//! Every stage returns an explicit report (or error with reason); the
//! orchestrator logs each outcome and halts loudly on the first failure or
//! non-READY registry status.

pub mod fetch;
pub mod predict;
pub mod train;
pub mod wrap;

use crate::config::Config;
use crate::infrastructure::coingecko::CoinGeckoClient;
use crate::infrastructure::persistence::{CandleStore, Database};
use crate::infrastructure::registry::ModelRegistry;
use anyhow::{Context, Result, bail};
use ndarray::Array2;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Registered name of the raw trained network.
pub const RAW_MODEL_NAME: &str = "LSTM_BTC_Forecast";
/// Registered name of the serving composite.
pub const COMPOSITE_MODEL_NAME: &str = "LSTM_BTC_Forecast_Pyfunc";

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Creates a fresh scratch directory for artifact assembly.
pub(crate) fn scratch_dir(tag: &str) -> Result<PathBuf> {
    let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "btc_forecast_{}_{tag}_{seq}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create scratch directory {dir:?}"))?;
    Ok(dir)
}

/// Runs every stage in order and returns the final forecasts.
pub async fn run(config: &Config) -> Result<Array2<f64>> {
    let db = Database::connect(&config.db).await?;
    let store = CandleStore::new(db.pool.clone());
    let client = CoinGeckoClient::with_base_url(
        config.api_key.clone(),
        config.coingecko_base_url.clone(),
    );
    let registry = ModelRegistry::open(&config.registry_root)?;

    let fetch_report = fetch::run(&client, &store, config.fetch_days)
        .await
        .context("Fetch stage failed")?;
    info!(
        fetched = fetch_report.fetched,
        inserted = fetch_report.inserted,
        "Fetch stage complete"
    );

    let train_report = train::run(&store, &registry, &config.training)
        .await
        .context("Train stage failed")?;
    if !train_report.status.is_ready() {
        bail!(
            "Train stage registered {} v{} with status {}, expected READY",
            RAW_MODEL_NAME,
            train_report.version,
            train_report.status
        );
    }
    info!(
        version = train_report.version,
        train_loss = train_report.train_loss,
        "Train stage complete, Challenger is READY"
    );

    let wrap_report = wrap::run(&registry).context("Wrap stage failed")?;
    if !wrap_report.status.is_ready() {
        bail!(
            "Wrap stage registered {} v{} with status {}, expected READY",
            COMPOSITE_MODEL_NAME,
            wrap_report.version,
            wrap_report.status
        );
    }
    info!(
        version = wrap_report.version,
        source_version = wrap_report.source_version,
        "Wrap stage complete, Champion is READY"
    );

    let forecasts = predict::run(&store, &registry, config.prediction_window_rows)
        .await
        .context("Predict stage failed")?;
    info!(windows = forecasts.nrows(), "Predict stage complete");

    Ok(forecasts)
}
