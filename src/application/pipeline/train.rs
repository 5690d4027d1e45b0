//! TRAIN stage: windows the stored series, fits scalers and the network,
//! registers the artifacts as the new Challenger.

use crate::application::composite::{MODEL_FILE, SCALER_X_FILE, SCALER_Y_FILE};
use crate::application::pipeline::{RAW_MODEL_NAME, scratch_dir};
use crate::domain::market::OhlcRecord;
use crate::domain::ml::lstm::{Lstm, LstmConfig};
use crate::domain::ml::scaler::MinMaxScaler;
use crate::domain::ml::windowing::{
    N_FEATURES, N_STEPS_IN, N_STEPS_OUT, TRAIN_FRACTION, chronological_split, split_series,
    stack_records,
};
use crate::infrastructure::persistence::CandleStore;
use crate::infrastructure::registry::{ALIAS_CHALLENGER, ModelRegistry, ModelStatus};
use anyhow::{Result, bail};
use chrono::Utc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub version: u32,
    pub status: ModelStatus,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

pub async fn run(
    store: &CandleStore,
    registry: &ModelRegistry,
    training: &LstmConfig,
) -> Result<TrainReport> {
    let records = store.load_all().await?;
    train_from_records(&records, registry, training)
}

/// Core of the train stage, independent of the database.
pub fn train_from_records(
    records: &[OhlcRecord],
    registry: &ModelRegistry,
    training: &LstmConfig,
) -> Result<TrainReport> {
    let stacked = stack_records(records);
    let (x, y) = split_series(&stacked, N_STEPS_IN, N_STEPS_OUT);
    let n_windows = x.shape()[0];
    if n_windows == 0 {
        bail!(
            "Not enough rows to build training windows: have {}, need at least {}",
            records.len(),
            N_STEPS_IN + N_STEPS_OUT
        );
    }

    // Scaling bounds are refit from the current data every training run and
    // persisted alongside the model for inference.
    let flat = x.into_shape((n_windows * N_STEPS_IN, N_FEATURES))?;
    let (scaler_x, flat_scaled) = MinMaxScaler::fit_transform(&flat);
    let x_scaled = flat_scaled.into_shape((n_windows, N_STEPS_IN, N_FEATURES))?;
    let (scaler_y, y_scaled) = MinMaxScaler::fit_transform(&y);

    let (x_train, y_train, x_test, y_test) =
        chronological_split(&x_scaled, &y_scaled, TRAIN_FRACTION);
    info!(
        windows = n_windows,
        train = x_train.shape()[0],
        test = x_test.shape()[0],
        "Built window pairs"
    );

    let mut model = Lstm::new(training.clone());
    let fit_report = model.fit(&x_train, &y_train)?;
    if x_test.shape()[0] > 0 {
        let test_loss = Lstm::mse(&model.forward(&x_test), &y_test);
        info!(test_loss, "Held-out evaluation");
    }

    let scratch = scratch_dir("train")?;
    let model_path = scratch.join(MODEL_FILE);
    let scaler_x_path = scratch.join(SCALER_X_FILE);
    let scaler_y_path = scratch.join(SCALER_Y_FILE);
    model.save(&model_path)?;
    scaler_x.save(&scaler_x_path)?;
    scaler_y.save(&scaler_y_path)?;

    let run_name = format!("LSTM_3L_{}", Utc::now().format("%Y%m%d"));
    let version = registry.log_model(
        RAW_MODEL_NAME,
        &run_name,
        &[
            (MODEL_FILE, model_path.as_path()),
            (SCALER_X_FILE, scaler_x_path.as_path()),
            (SCALER_Y_FILE, scaler_y_path.as_path()),
        ],
    )?;
    registry.set_alias(RAW_MODEL_NAME, ALIAS_CHALLENGER, version)?;
    let status = registry.status_by_alias(RAW_MODEL_NAME, ALIAS_CHALLENGER)?;

    Ok(TrainReport {
        version,
        status,
        train_loss: fit_report.train_loss,
        validation_loss: fit_report.validation_loss,
    })
}
