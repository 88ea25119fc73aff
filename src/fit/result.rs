//! Best-fit point of a finished tune plus everything needed to re-evaluate it.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::RunEnsemble;
use crate::domain::{ParamBound, TracePoint};
use crate::error::AppError;
use crate::fit::objective::Objective;
use crate::math::{correlation_from_covariance, matrix_from_rows};

/// On-disk summary written by the minimizer. Values are unscaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub best_x: Vec<f64>,
    pub best_error: Vec<f64>,
    #[serde(default)]
    pub trace: Vec<TracePoint>,
    #[serde(default)]
    pub covariance: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone)]
pub struct MinimizerResult<O> {
    pub best_x: Vec<f64>,
    pub best_x_scaled: Vec<f64>,
    /// 1-sigma errors, unscaled.
    pub best_error: Vec<f64>,
    pub objective: O,
    pub trace: Vec<TracePoint>,
    pub correlation: Option<DMatrix<f64>>,
}

impl<O: Objective> MinimizerResult<O> {
    pub fn from_summary(
        summary: FitSummary,
        objective: O,
        runs: &RunEnsemble,
        bounds: &[ParamBound],
    ) -> Result<Self, AppError> {
        let n = runs.n_params();
        if summary.best_error.len() != n {
            return Err(AppError::config(format!(
                "Fit summary has {} errors for {n} parameters.",
                summary.best_error.len()
            )));
        }
        let best_x_scaled = runs.scale_x(&summary.best_x)?;

        for (value, bound) in summary.best_x.iter().zip(bounds) {
            if !bound.contains(*value) {
                warn!(
                    param = %bound.name,
                    value,
                    "Best-fit value lies outside [{}, {}].",
                    bound.min,
                    bound.max
                );
            }
        }

        let correlation = match summary.covariance {
            Some(rows) => {
                let cov = matrix_from_rows(&rows)?;
                if cov.shape() != (n, n) {
                    return Err(AppError::config(format!(
                        "Covariance must be {n}x{n}, got {}x{}.",
                        cov.nrows(),
                        cov.ncols()
                    )));
                }
                Some(correlation_from_covariance(&cov)?)
            }
            None => None,
        };

        Ok(Self {
            best_x: summary.best_x,
            best_x_scaled,
            best_error: summary.best_error,
            objective,
            trace: summary.trace,
            correlation,
        })
    }

    /// Objective at the best-fit point.
    pub fn best_chi2(&self) -> Result<f64, AppError> {
        self.objective.chi2(&self.best_x_scaled)
    }

    pub fn n_params(&self) -> usize {
        self.best_x.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::ensemble::tests::small_ensemble;

    /// Sum of squared scaled coordinates; unweighted is half of it.
    pub(crate) struct Bowl {
        pub weighted: bool,
    }

    impl Objective for Bowl {
        fn chi2(&self, x: &[f64]) -> Result<f64, AppError> {
            Ok(x.iter().map(|v| v * v).sum())
        }

        fn unweighted_chi2(&self, x: &[f64]) -> Result<f64, AppError> {
            Ok(0.5 * self.chi2(x)?)
        }

        fn is_weighted(&self) -> bool {
            self.weighted
        }
    }

    pub(crate) fn summary() -> FitSummary {
        FitSummary {
            best_x: vec![2.0, 15.0],
            best_error: vec![0.1, 1.0],
            trace: vec![
                TracePoint { evaluations: 10, fbest: 3.0 },
                TracePoint { evaluations: 20, fbest: 1.0 },
            ],
            covariance: Some(vec![vec![0.01, 0.05], vec![0.05, 1.0]]),
        }
    }

    #[test]
    fn best_point_is_rescaled() {
        let runs = small_ensemble();
        let r = MinimizerResult::from_summary(summary(), Bowl { weighted: false }, &runs, &[])
            .unwrap();
        // Means of the run parameters: the scaled point is the origin.
        assert_eq!(r.best_x_scaled, vec![0.0, 0.0]);
        assert_eq!(r.best_chi2().unwrap(), 0.0);
        let corr = r.correlation.unwrap();
        approx::assert_relative_eq!(corr[(0, 1)], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn wrong_dimensions_are_rejected() {
        let runs = small_ensemble();
        let mut s = summary();
        s.best_x.pop();
        assert!(MinimizerResult::from_summary(s, Bowl { weighted: false }, &runs, &[]).is_err());

        let mut s = summary();
        s.covariance = Some(vec![vec![1.0]]);
        assert!(MinimizerResult::from_summary(s, Bowl { weighted: false }, &runs, &[]).is_err());
    }
}
