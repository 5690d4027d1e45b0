//! PREDICT stage: loads the Champion composite and forecasts from the most
//! recent observation window.

use crate::application::composite::PredictorState;
use crate::application::pipeline::COMPOSITE_MODEL_NAME;
use crate::domain::market::OhlcRecord;
use crate::domain::ml::windowing::stack_records;
use crate::infrastructure::persistence::CandleStore;
use crate::infrastructure::registry::{ALIAS_CHAMPION, ModelRegistry};
use anyhow::Result;
use ndarray::Array2;
use tracing::info;

/// Loads the current Champion bundle.
pub fn load_champion(registry: &ModelRegistry) -> Result<PredictorState> {
    let champion = registry.version_by_alias(COMPOSITE_MODEL_NAME, ALIAS_CHAMPION)?;
    info!(
        version = champion.version,
        run_name = %champion.run_name,
        "Loading Champion composite"
    );
    let dir = registry.version_dir(COMPOSITE_MODEL_NAME, champion.version);
    PredictorState::load(&dir)
}

pub async fn run(
    store: &CandleStore,
    registry: &ModelRegistry,
    window_rows: u32,
) -> Result<Array2<f64>> {
    let records = store.recent_window(window_rows).await?;
    forecast_records(&records, registry)
}

/// Core of the predict stage, independent of the database.
pub fn forecast_records(
    records: &[OhlcRecord],
    registry: &ModelRegistry,
) -> Result<Array2<f64>> {
    let state = load_champion(registry)?;
    let stacked = stack_records(records);
    Ok(state.predict(&stacked)?)
}
