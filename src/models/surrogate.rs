//! Per-bin surrogate models.
//!
//! Training happens elsewhere; the report only needs to evaluate a trained
//! predictor. `DenseNetwork` covers the fully-connected networks exported by
//! the training step, and anything else can plug in through `Surrogate`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A trained predictor for one flattened output bin.
///
/// Inputs and outputs are in the normalized space of the run ensemble.
pub trait Surrogate {
    fn predict(&self, x_scaled: &[f64]) -> Result<f64, AppError>;

    /// Loss of a single sample; mean squared error unless overridden.
    fn evaluate(&self, x_scaled: &[f64], y_scaled: f64) -> Result<f64, AppError> {
        let r = self.predict(x_scaled)? - y_scaled;
        Ok(r * r)
    }

    /// Training loss per epoch.
    fn loss_history(&self) -> &[f64];

    fn final_loss(&self) -> Option<f64> {
        self.loss_history().last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, v: f64) -> f64 {
        match self {
            Activation::Linear => v,
            Activation::Relu => v.max(0.0),
            Activation::Tanh => v.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-v).exp()),
        }
    }
}

/// Serialized layer: `weights` is `outputs x inputs`, row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayerFile {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetworkFile {
    pub layers: Vec<DenseLayerFile>,
    #[serde(default)]
    pub loss: Vec<f64>,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    activation: Activation,
}

/// Fully-connected feed-forward network with a scalar output.
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
    loss: Vec<f64>,
    inputs: usize,
}

impl DenseNetwork {
    /// Validate shapes (layer chaining, scalar output) and build the network.
    pub fn from_file(file: DenseNetworkFile) -> Result<Self, AppError> {
        let Some(first) = file.layers.first() else {
            return Err(AppError::config("Network has no layers."));
        };
        let inputs = first.weights.first().map_or(0, Vec::len);
        if inputs == 0 {
            return Err(AppError::config("Network input layer has no weights."));
        }

        let mut layers = Vec::with_capacity(file.layers.len());
        let mut width = inputs;
        for (i, layer) in file.layers.into_iter().enumerate() {
            let rows = layer.weights.len();
            if rows == 0 || layer.weights.iter().any(|r| r.len() != width) {
                return Err(AppError::config(format!(
                    "Layer {i}: weight rows must all have {width} columns."
                )));
            }
            if layer.bias.len() != rows {
                return Err(AppError::config(format!(
                    "Layer {i}: bias has {} entries, expected {rows}.",
                    layer.bias.len()
                )));
            }
            let weights = DMatrix::from_fn(rows, width, |r, c| layer.weights[r][c]);
            layers.push(DenseLayer {
                weights,
                bias: DVector::from_vec(layer.bias),
                activation: layer.activation,
            });
            width = rows;
        }
        if width != 1 {
            return Err(AppError::config(format!(
                "Network output layer must have 1 unit, got {width}."
            )));
        }

        Ok(Self {
            layers,
            loss: file.loss,
            inputs,
        })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }
}

impl Surrogate for DenseNetwork {
    fn predict(&self, x_scaled: &[f64]) -> Result<f64, AppError> {
        if x_scaled.len() != self.inputs {
            return Err(AppError::domain(format!(
                "Network expects {} inputs, got {}.",
                self.inputs,
                x_scaled.len()
            )));
        }
        let mut a = DVector::from_column_slice(x_scaled);
        for layer in &self.layers {
            let z = &layer.weights * a + &layer.bias;
            a = z.map(|v| layer.activation.apply(v));
        }
        Ok(a[0])
    }

    fn loss_history(&self) -> &[f64] {
        &self.loss
    }
}
