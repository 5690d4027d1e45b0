//! Stacked gated-recurrent forecaster with a trained dense readout.
//!
//! Three recurrent layers (sigmoid/tanh/tanh output activations) feed a
//! linear readout sized to the forecast horizon. Training minimizes MSE over
//! the readout; the recurrent stack is a fixed random feature map.

use anyhow::{Context, Result, bail};
use ndarray::{Array1, Array2, Array3, ArrayView3, Axis, s};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

fn sigmoid(v: &Array1<f64>) -> Array1<f64> {
    v.mapv(|x| 1.0 / (1.0 + (-x).exp()))
}

fn tanh(v: &Array1<f64>) -> Array1<f64> {
    v.mapv(f64::tanh)
}

/// Linear readout layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Dense {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

impl Dense {
    fn new(input_size: usize, output_size: usize) -> Self {
        let limit = (1.0 / input_size as f64).sqrt();
        Self {
            weights: Array2::random((output_size, input_size), Uniform::new(-limit, limit)),
            biases: Array1::zeros(output_size),
        }
    }
}

/// One gated recurrent cell. `activation` shapes the hidden output,
/// `h = o * act(c)`; the gates themselves are always sigmoid/tanh.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LstmCell {
    input_size: usize,
    hidden_size: usize,
    activation: Activation,

    w_ii: Array2<f64>,
    w_hi: Array2<f64>,
    b_i: Array1<f64>,

    w_if: Array2<f64>,
    w_hf: Array2<f64>,
    b_f: Array1<f64>,

    w_ig: Array2<f64>,
    w_hg: Array2<f64>,
    b_g: Array1<f64>,

    w_io: Array2<f64>,
    w_ho: Array2<f64>,
    b_o: Array1<f64>,
}

impl LstmCell {
    fn new(input_size: usize, hidden_size: usize, activation: Activation) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let rect = || Array2::random((hidden_size, input_size), Uniform::new(-limit, limit));
        let square = || Array2::random((hidden_size, hidden_size), Uniform::new(-limit, limit));

        Self {
            input_size,
            hidden_size,
            activation,
            w_ii: rect(),
            w_hi: square(),
            b_i: Array1::zeros(hidden_size),
            w_if: rect(),
            w_hf: square(),
            // Forget gate bias starts at 1 so early training keeps state.
            b_f: Array1::from_elem(hidden_size, 1.0),
            w_ig: rect(),
            w_hg: square(),
            b_g: Array1::zeros(hidden_size),
            w_io: rect(),
            w_ho: square(),
            b_o: Array1::zeros(hidden_size),
        }
    }

    fn forward(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let i_gate = sigmoid(&(self.w_ii.dot(x) + self.w_hi.dot(h_prev) + &self.b_i));
        let f_gate = sigmoid(&(self.w_if.dot(x) + self.w_hf.dot(h_prev) + &self.b_f));
        let g = tanh(&(self.w_ig.dot(x) + self.w_hg.dot(h_prev) + &self.b_g));
        let o_gate = sigmoid(&(self.w_io.dot(x) + self.w_ho.dot(h_prev) + &self.b_o));

        let c_next = &f_gate * c_prev + &i_gate * &g;
        let h_next = &o_gate * &c_next.mapv(|v| self.activation.apply(v));

        (h_next, c_next)
    }

    fn init_hidden(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// Hidden-output activation per recurrent layer; the vector length sets
    /// the layer count.
    pub layer_activations: Vec<Activation>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Trailing fraction of the training windows held out for validation.
    pub validation_split: f64,
    /// Validation loss is evaluated every this many epochs.
    pub validation_freq: usize,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            input_size: 3,
            hidden_size: 100,
            output_size: 5,
            layer_activations: vec![Activation::Sigmoid, Activation::Tanh, Activation::Tanh],
            epochs: 150,
            batch_size: 32,
            learning_rate: 1e-3,
            validation_split: 0.15,
            validation_freq: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

/// The forecasting network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lstm {
    pub config: LstmConfig,
    cells: Vec<LstmCell>,
    readout: Dense,
}

impl Lstm {
    pub fn new(config: LstmConfig) -> Self {
        assert!(
            !config.layer_activations.is_empty(),
            "at least one recurrent layer is required"
        );

        let mut cells = Vec::with_capacity(config.layer_activations.len());
        cells.push(LstmCell::new(
            config.input_size,
            config.hidden_size,
            config.layer_activations[0],
        ));
        for &activation in &config.layer_activations[1..] {
            cells.push(LstmCell::new(
                config.hidden_size,
                config.hidden_size,
                activation,
            ));
        }

        let readout = Dense::new(config.hidden_size, config.output_size);

        Self {
            config,
            cells,
            readout,
        }
    }

    /// Runs the recurrent stack over each sequence and returns the final
    /// hidden state of the last layer, one row per sample.
    fn hidden_features(&self, x: ArrayView3<f64>) -> Array2<f64> {
        let batch = x.len_of(Axis(0));
        let seq_len = x.len_of(Axis(1));
        let mut feats = Array2::zeros((batch, self.config.hidden_size));

        for b in 0..batch {
            let mut states: Vec<(Array1<f64>, Array1<f64>)> =
                self.cells.iter().map(LstmCell::init_hidden).collect();

            for t in 0..seq_len {
                let mut layer_input = x.slice(s![b, t, ..]).to_owned();
                for (idx, cell) in self.cells.iter().enumerate() {
                    let (h, c) = cell.forward(&layer_input, &states[idx].0, &states[idx].1);
                    layer_input = h.clone();
                    states[idx] = (h, c);
                }
            }

            feats
                .row_mut(b)
                .assign(&states[self.cells.len() - 1].0);
        }

        feats
    }

    /// Forward pass: `[batch, seq, features]` in, `[batch, output]` out.
    pub fn forward(&self, x: &Array3<f64>) -> Array2<f64> {
        let feats = self.hidden_features(x.view());
        feats.dot(&self.readout.weights.t()) + &self.readout.biases
    }

    pub fn mse(predictions: &Array2<f64>, targets: &Array2<f64>) -> f64 {
        let diff = predictions - targets;
        diff.mapv(|v| v * v).mean().unwrap_or(0.0)
    }

    /// Fits the readout with mini-batch gradient descent on MSE, holding out
    /// the trailing `validation_split` fraction and scoring it every
    /// `validation_freq` epochs.
    pub fn fit(&mut self, x: &Array3<f64>, y: &Array2<f64>) -> Result<TrainingReport> {
        let n = x.len_of(Axis(0));
        if n == 0 {
            bail!("No training windows supplied");
        }
        if x.len_of(Axis(2)) != self.config.input_size {
            bail!(
                "Input has {} features, model expects {}",
                x.len_of(Axis(2)),
                self.config.input_size
            );
        }
        if y.nrows() != n || y.ncols() != self.config.output_size {
            bail!(
                "Target shape {:?} does not match ({}, {})",
                y.shape(),
                n,
                self.config.output_size
            );
        }

        let val_size = ((n as f64) * self.config.validation_split).floor() as usize;
        let fit_n = (n - val_size).max(1);
        let batch_size = self.config.batch_size.min(fit_n);
        let lr = self.config.learning_rate;

        let mut train_loss = f64::NAN;
        let mut validation_loss = None;

        for epoch in 1..=self.config.epochs {
            let mut epoch_loss = 0.0;
            let mut n_batches = 0usize;

            for start in (0..fit_n).step_by(batch_size) {
                let end = (start + batch_size).min(fit_n);
                let feats = self.hidden_features(x.slice(s![start..end, .., ..]));
                let preds = feats.dot(&self.readout.weights.t()) + &self.readout.biases;
                let err = &preds - &y.slice(s![start..end, ..]);

                epoch_loss += err.mapv(|v| v * v).mean().unwrap_or(0.0);
                n_batches += 1;

                let scale = 2.0 / err.len() as f64;
                let grad_w = err.t().dot(&feats) * scale;
                let grad_b = err.sum_axis(Axis(0)) * scale;
                self.readout.weights.scaled_add(-lr, &grad_w);
                self.readout.biases.scaled_add(-lr, &grad_b);
            }

            train_loss = epoch_loss / n_batches as f64;

            if val_size > 0 && (epoch % self.config.validation_freq == 0 || epoch == self.config.epochs)
            {
                let x_val = x.slice(s![fit_n.., .., ..]).to_owned();
                let y_val = y.slice(s![fit_n.., ..]).to_owned();
                let val = Self::mse(&self.forward(&x_val), &y_val);
                validation_loss = Some(val);
                debug!(epoch, train_loss, validation_loss = val, "epoch complete");
            } else {
                debug!(epoch, train_loss, "epoch complete");
            }
        }

        Ok(TrainingReport {
            epochs: self.config.epochs,
            train_loss,
            validation_loss,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Failed to create model file {path:?}"))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("Failed to serialize model to {path:?}"))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open model file {path:?}"))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to deserialize model from {path:?}"))
    }
}
