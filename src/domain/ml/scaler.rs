//! Per-column min-max scaling.

use crate::domain::errors::WindowingError;
use anyhow::{Context, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Min-max transform fitted over one feature group. Columns with zero range
/// scale to 0.0 and inverse back to their minimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl MinMaxScaler {
    /// Fits scaling bounds from every column of `data`.
    pub fn fit(data: &Array2<f64>) -> Self {
        let mins = data
            .axis_iter(Axis(1))
            .map(|col| col.iter().copied().fold(f64::INFINITY, f64::min))
            .collect();
        let maxs = data
            .axis_iter(Axis(1))
            .map(|col| col.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect();
        Self { mins, maxs }
    }

    pub fn n_features(&self) -> usize {
        self.mins.len()
    }

    fn check_width(&self, data: &Array2<f64>) -> Result<(), WindowingError> {
        if data.ncols() != self.n_features() {
            return Err(WindowingError::ColumnMismatch {
                expected: self.n_features(),
                got: data.ncols(),
            });
        }
        Ok(())
    }

    /// Scales each column into `[0, 1]` using the fitted bounds.
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, WindowingError> {
        self.check_width(data)?;
        let mut out = data.clone();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let range = self.maxs[j] - self.mins[j];
            if range == 0.0 {
                col.fill(0.0);
            } else {
                col.mapv_inplace(|v| (v - self.mins[j]) / range);
            }
        }
        Ok(out)
    }

    /// Maps scaled values back to the original units.
    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, WindowingError> {
        self.check_width(data)?;
        let mut out = data.clone();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let range = self.maxs[j] - self.mins[j];
            col.mapv_inplace(|v| v * range + self.mins[j]);
        }
        Ok(out)
    }

    pub fn fit_transform(data: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(data);
        let scaled = scaler
            .transform(data)
            .expect("fit and transform widths match");
        (scaler, scaled)
    }

    /// Persists the fitted bounds as a binary blob.
    pub fn save(&self, path: &Path) -> Result<()> {
        let encoded = bincode::serialize(self)
            .with_context(|| format!("Failed to encode scaler for {path:?}"))?;
        std::fs::write(path, encoded).with_context(|| format!("Failed to write scaler {path:?}"))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("Failed to read scaler {path:?}"))?;
        bincode::deserialize(&data).with_context(|| format!("Failed to decode scaler {path:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn round_trip_restores_original() {
        let data = array![[1.0, 10.0], [2.0, 30.0], [4.0, 20.0]];
        let (scaler, scaled) = MinMaxScaler::fit_transform(&data);

        assert_eq!(scaled[[0, 0]], 0.0);
        assert_eq!(scaled[[2, 0]], 1.0);

        let restored = scaler.inverse_transform(&scaled).unwrap();
        for (a, b) in data.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-12, "{a} != {b}");
        }
    }

    #[test]
    fn zero_range_column_scales_to_zero() {
        let data = array![[5.0, 1.0], [5.0, 2.0]];
        let (scaler, scaled) = MinMaxScaler::fit_transform(&data);
        assert_eq!(scaled[[0, 0]], 0.0);
        assert_eq!(scaled[[1, 0]], 0.0);

        let restored = scaler.inverse_transform(&scaled).unwrap();
        assert_eq!(restored[[0, 0]], 5.0);
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let scaler = MinMaxScaler::fit(&data);
        let narrow = array![[1.0], [2.0]];
        assert!(scaler.transform(&narrow).is_err());
    }

    #[test]
    fn save_and_load_preserve_bounds() {
        let data = array![[1.0, 10.0], [4.0, 40.0]];
        let scaler = MinMaxScaler::fit(&data);

        let path = std::env::temp_dir().join(format!("scaler_test_{}.bin", std::process::id()));
        scaler.save(&path).unwrap();
        let loaded = MinMaxScaler::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let scaled = loaded.transform(&data).unwrap();
        assert_eq!(scaled[[1, 1]], 1.0);
    }
}
