//! WRAP stage: assembles the Challenger's network and scalers into a
//! self-contained composite bundle and promotes it to Champion.

use crate::application::composite::{
    COMPOSITE_META_FILE, CompositeMeta, MODEL_FILE, PredictorState, SCALER_X_FILE, SCALER_Y_FILE,
};
use crate::application::pipeline::{COMPOSITE_MODEL_NAME, RAW_MODEL_NAME, scratch_dir};
use crate::domain::ml::windowing::N_FEATURES;
use crate::infrastructure::registry::{
    ALIAS_CHALLENGER, ALIAS_CHAMPION, ModelRegistry, ModelStatus,
};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct WrapReport {
    pub version: u32,
    pub status: ModelStatus,
    /// Challenger version the bundle was assembled from.
    pub source_version: u32,
}

pub fn run(registry: &ModelRegistry) -> Result<WrapReport> {
    let challenger = registry.version_by_alias(RAW_MODEL_NAME, ALIAS_CHALLENGER)?;
    info!(
        version = challenger.version,
        run_name = %challenger.run_name,
        "Wrapping current Challenger"
    );

    let scratch = scratch_dir("wrap")?;
    registry.download_artifacts(RAW_MODEL_NAME, challenger.version, &scratch)?;
    CompositeMeta::new(N_FEATURES).write(&scratch)?;

    // Load the bundle once before registering it; a composite that cannot
    // serve must not become Champion.
    PredictorState::load(&scratch).context("Assembled composite bundle failed to load")?;

    let run_name = format!("LSTM_BTC_Pyfunc_{}", Utc::now().format("%Y%m%d"));
    let model_path = scratch.join(MODEL_FILE);
    let scaler_x_path = scratch.join(SCALER_X_FILE);
    let scaler_y_path = scratch.join(SCALER_Y_FILE);
    let meta_path = scratch.join(COMPOSITE_META_FILE);

    let version = registry.log_model(
        COMPOSITE_MODEL_NAME,
        &run_name,
        &[
            (MODEL_FILE, model_path.as_path()),
            (SCALER_X_FILE, scaler_x_path.as_path()),
            (SCALER_Y_FILE, scaler_y_path.as_path()),
            (COMPOSITE_META_FILE, meta_path.as_path()),
        ],
    )?;
    registry.set_alias(COMPOSITE_MODEL_NAME, ALIAS_CHAMPION, version)?;
    let status = registry.status_by_alias(COMPOSITE_MODEL_NAME, ALIAS_CHAMPION)?;

    Ok(WrapReport {
        version,
        status,
        source_version: challenger.version,
    })
}
