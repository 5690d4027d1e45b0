//! Composite predictor bundle: network + scalers + windowing geometry.
//!
//! Callers hand it raw OHLC rows; windowing, scaling, inference, and
//! inverse-scaling all happen inside. Scaling bounds are the ones fit at
//! training time — the bundle never refits them on inference batches.

use crate::domain::errors::WindowingError;
use crate::domain::ml::lstm::Lstm;
use crate::domain::ml::scaler::MinMaxScaler;
use crate::domain::ml::windowing::{N_STEPS_IN, N_STEPS_OUT, split_series};
use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_X_FILE: &str = "scaler_x.bin";
pub const SCALER_Y_FILE: &str = "scaler_y.bin";
pub const COMPOSITE_META_FILE: &str = "composite.json";

/// Manifest describing a composite bundle's geometry and artifact files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeMeta {
    pub n_steps_in: usize,
    pub n_steps_out: usize,
    pub n_features: usize,
    pub model_file: String,
    pub scaler_x_file: String,
    pub scaler_y_file: String,
}

impl CompositeMeta {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_steps_in: N_STEPS_IN,
            n_steps_out: N_STEPS_OUT,
            n_features,
            model_file: MODEL_FILE.to_string(),
            scaler_x_file: SCALER_X_FILE.to_string(),
            scaler_y_file: SCALER_Y_FILE.to_string(),
        }
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(COMPOSITE_META_FILE);
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&path, data).with_context(|| format!("Failed to write {path:?}"))?;
        Ok(())
    }
}

/// A loaded composite bundle, constructed once and reused for every
/// prediction.
pub struct PredictorState {
    model: Lstm,
    scaler_x: MinMaxScaler,
    scaler_y: MinMaxScaler,
    n_steps_in: usize,
    n_steps_out: usize,
    n_features: usize,
}

impl PredictorState {
    /// Loads a bundle from a directory holding the composite manifest and
    /// its artifact files.
    pub fn load(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(COMPOSITE_META_FILE);
        let meta: CompositeMeta = serde_json::from_str(
            &fs::read_to_string(&meta_path)
                .with_context(|| format!("Failed to read composite manifest {meta_path:?}"))?,
        )
        .with_context(|| format!("Failed to decode composite manifest {meta_path:?}"))?;

        let model = Lstm::load(&dir.join(&meta.model_file))?;
        let scaler_x = MinMaxScaler::load(&dir.join(&meta.scaler_x_file))?;
        let scaler_y = MinMaxScaler::load(&dir.join(&meta.scaler_y_file))?;

        Ok(Self::new(model, scaler_x, scaler_y, meta))
    }

    pub fn new(
        model: Lstm,
        scaler_x: MinMaxScaler,
        scaler_y: MinMaxScaler,
        meta: CompositeMeta,
    ) -> Self {
        Self {
            model,
            scaler_x,
            scaler_y,
            n_steps_in: meta.n_steps_in,
            n_steps_out: meta.n_steps_out,
            n_features: meta.n_features,
        }
    }

    /// Forecasts from raw OHLC rows stacked as `[target, f1, f2, f3]`.
    /// Returns one row of `n_steps_out` real-valued forecasts per derivable
    /// input window.
    pub fn predict(&self, raw: &Array2<f64>) -> Result<Array2<f64>, WindowingError> {
        if raw.ncols() != self.n_features + 1 {
            return Err(WindowingError::ColumnMismatch {
                expected: self.n_features + 1,
                got: raw.ncols(),
            });
        }

        let min_rows = self.n_steps_in + self.n_steps_out;
        if raw.nrows() < min_rows {
            return Err(WindowingError::NotEnoughRows {
                have: raw.nrows(),
                need: min_rows,
            });
        }

        let (x, _) = split_series(raw, self.n_steps_in, self.n_steps_out);
        let n_windows = x.shape()[0];

        let flat = x
            .into_shape((n_windows * self.n_steps_in, self.n_features))
            .map_err(|_| WindowingError::ColumnMismatch {
                expected: self.n_features,
                got: 0,
            })?;
        let scaled = self.scaler_x.transform(&flat)?;
        let scaled = scaled
            .into_shape((n_windows, self.n_steps_in, self.n_features))
            .map_err(|_| WindowingError::ColumnMismatch {
                expected: self.n_features,
                got: 0,
            })?;

        let normalized_preds = self.model.forward(&scaled);
        self.scaler_y.inverse_transform(&normalized_preds)
    }
}
