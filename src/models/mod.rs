//! Surrogate models (one per flattened output bin) and their diagnostics.

pub mod evaluate;
pub mod surrogate;

pub use evaluate::*;
pub use surrogate::*;

use crate::data::RunEnsemble;
use crate::error::AppError;

/// Unscaled prediction of every bin at a scaled parameter point.
pub fn predict_bins<M: Surrogate>(
    models: &[M],
    runs: &RunEnsemble,
    x_scaled: &[f64],
) -> Result<Vec<f64>, AppError> {
    if models.len() != runs.n_bins() {
        return Err(AppError::config(format!(
            "Got {} models for {} output bins.",
            models.len(),
            runs.n_bins()
        )));
    }
    models
        .iter()
        .enumerate()
        .map(|(bin, m)| Ok(runs.unscale_y(bin, m.predict(x_scaled)?)))
        .collect()
}
