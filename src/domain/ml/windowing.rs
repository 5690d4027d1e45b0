//! Window-pair derivation for supervised sequence forecasting.
//!
//! A stacked series has columns `[price, open, high, low]`; column 0 is the
//! forecast target. Input windows cover `n_steps_in` rows of the non-target
//! columns, output windows the following `n_steps_out` target values.

use crate::domain::market::OhlcRecord;
use ndarray::{Array2, Array3, Axis, s};

/// Lookback length of one input window.
pub const N_STEPS_IN: usize = 10;
/// Forecast horizon of one output window.
pub const N_STEPS_OUT: usize = 5;
/// Non-target feature columns per input step (open, high, low).
pub const N_FEATURES: usize = 3;
/// Leading fraction of windows used for training.
pub const TRAIN_FRACTION: f64 = 0.7;

/// Stacks ordered records into a 2D series with columns
/// `[price, open, high, low]`.
pub fn stack_records(records: &[OhlcRecord]) -> Array2<f64> {
    let mut stacked = Array2::zeros((records.len(), N_FEATURES + 1));
    for (i, r) in records.iter().enumerate() {
        stacked[[i, 0]] = r.price;
        stacked[[i, 1]] = r.open;
        stacked[[i, 2]] = r.high;
        stacked[[i, 3]] = r.low;
    }
    stacked
}

/// Slides a `(n_steps_in, n_steps_out)` window pair over the series one row
/// at a time, stopping once the output window would run past the end.
///
/// For `len` rows this yields exactly `max(0, len - n_steps_in - n_steps_out + 1)`
/// pairs: inputs of shape `(pairs, n_steps_in, cols - 1)` (target column
/// excluded), outputs of shape `(pairs, n_steps_out)` (target column only).
pub fn split_series(
    stacked: &Array2<f64>,
    n_steps_in: usize,
    n_steps_out: usize,
) -> (Array3<f64>, Array2<f64>) {
    let len = stacked.nrows();
    let n_features = stacked.ncols().saturating_sub(1);
    let n_pairs = (len + 1).saturating_sub(n_steps_in + n_steps_out);

    let mut x = Array3::zeros((n_pairs, n_steps_in, n_features));
    let mut y = Array2::zeros((n_pairs, n_steps_out));

    for i in 0..n_pairs {
        let end_ix = i + n_steps_in;
        let out_end_ix = end_ix + n_steps_out;

        x.slice_mut(s![i, .., ..])
            .assign(&stacked.slice(s![i..end_ix, 1..]));
        y.slice_mut(s![i, ..])
            .assign(&stacked.slice(s![end_ix..out_end_ix, 0]));
    }

    (x, y)
}

/// Splits window pairs chronologically: the leading `ceil(fraction * n)`
/// pairs train, the rest test. No shuffling.
pub fn chronological_split(
    x: &Array3<f64>,
    y: &Array2<f64>,
    train_fraction: f64,
) -> (Array3<f64>, Array2<f64>, Array3<f64>, Array2<f64>) {
    let n = x.len_of(Axis(0));
    let train_size = ((n as f64) * train_fraction).ceil() as usize;
    let train_size = train_size.min(n);

    let x_train = x.slice(s![..train_size, .., ..]).to_owned();
    let y_train = y.slice(s![..train_size, ..]).to_owned();
    let x_test = x.slice(s![train_size.., .., ..]).to_owned();
    let y_test = y.slice(s![train_size.., ..]).to_owned();

    (x_train, y_train, x_test, y_test)
}
