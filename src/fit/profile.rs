//! One-dimensional profiles of the objective around the best-fit point.
//!
//! Each parameter is swept over the range spanned by the runs while every
//! other coordinate stays at the best-fit value. Nothing is re-minimized.

use tracing::debug;

use crate::data::RunEnsemble;
use crate::error::AppError;
use crate::fit::objective::Objective;
use crate::fit::result::MinimizerResult;
use crate::math::linspace;

/// Number of sweep points per parameter.
pub const PROFILE_POINTS: usize = 40;

#[derive(Debug, Clone)]
pub struct ParameterProfile {
    pub dim: usize,
    pub name: String,
    /// Sweep points, unscaled.
    pub x: Vec<f64>,
    pub chi2: Vec<f64>,
    /// Only present when the objective is weighted.
    pub unweighted: Option<Vec<f64>>,
    pub best: f64,
    pub sigma: f64,
}

pub fn profile_scan<O: Objective>(
    result: &MinimizerResult<O>,
    runs: &RunEnsemble,
) -> Result<Vec<ParameterProfile>, AppError> {
    let n = runs.n_params();
    if result.best_x_scaled.len() != n {
        return Err(AppError::domain(format!(
            "Best-fit point has {} coordinates, runs have {n} parameters.",
            result.best_x_scaled.len()
        )));
    }
    let weighted = result.objective.is_weighted();

    let mut profiles = Vec::with_capacity(n);
    for dim in 0..n {
        let column = runs.x_scaled().column(dim);
        let lo = column.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut x = Vec::with_capacity(PROFILE_POINTS);
        let mut chi2 = Vec::with_capacity(PROFILE_POINTS);
        let mut unweighted = weighted.then(|| Vec::with_capacity(PROFILE_POINTS));
        let mut point = result.best_x_scaled.clone();
        for v in linspace(lo, hi, PROFILE_POINTS) {
            point[dim] = v;
            chi2.push(result.objective.chi2(&point)?);
            if let Some(u) = unweighted.as_mut() {
                u.push(result.objective.unweighted_chi2(&point)?);
            }
            x.push(runs.unscale_x(&point)?[dim]);
        }

        let name = runs.params()[dim].clone();
        debug!(param = %name, lo, hi, "Profiled parameter.");
        profiles.push(ParameterProfile {
            dim,
            name,
            x,
            chi2,
            unweighted,
            best: result.best_x[dim],
            sigma: result.best_error.get(dim).copied().unwrap_or(0.0),
        });
    }
    Ok(profiles)
}
