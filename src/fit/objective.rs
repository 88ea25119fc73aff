//! The chi2 objective the minimizer optimized, re-evaluable at any point.

use crate::data::{ObservableSet, RunEnsemble};
use crate::error::AppError;
use crate::math::chi2;
use crate::models::{Surrogate, predict_bins};

/// Objective function over scaled parameter vectors.
pub trait Objective {
    /// The objective the minimizer used (weighted when weighting is enabled).
    fn chi2(&self, x_scaled: &[f64]) -> Result<f64, AppError>;

    /// The same objective with every weight set to 1.
    fn unweighted_chi2(&self, x_scaled: &[f64]) -> Result<f64, AppError> {
        self.chi2(x_scaled)
    }

    fn is_weighted(&self) -> bool {
        false
    }
}

impl<O: Objective + ?Sized> Objective for &O {
    fn chi2(&self, x_scaled: &[f64]) -> Result<f64, AppError> {
        (**self).chi2(x_scaled)
    }

    fn unweighted_chi2(&self, x_scaled: &[f64]) -> Result<f64, AppError> {
        (**self).unweighted_chi2(x_scaled)
    }

    fn is_weighted(&self) -> bool {
        (**self).is_weighted()
    }
}

/// Chi2 of the surrogate prediction against all data bins.
///
/// Variance per bin is `data_err^2 + reperr^2` with `reperr` the mean MC run
/// error of that bin, the same combination the per-observable comparison uses.
pub struct TuneObjective<'a, M> {
    models: &'a [M],
    runs: &'a RunEnsemble,
    data_y: Vec<f64>,
    variance: Vec<f64>,
    weights: Option<Vec<f64>>,
}

impl<'a, M: Surrogate> TuneObjective<'a, M> {
    pub fn new(
        models: &'a [M],
        runs: &'a RunEnsemble,
        data: &ObservableSet,
    ) -> Result<Self, AppError> {
        if data.total_bins() != runs.n_bins() {
            return Err(AppError::config(format!(
                "Data has {} bins, runs have {}.",
                data.total_bins(),
                runs.n_bins()
            )));
        }
        if models.len() != runs.n_bins() {
            return Err(AppError::config(format!(
                "Got {} models for {} output bins.",
                models.len(),
                runs.n_bins()
            )));
        }

        let reperr = runs.mean_yerr();
        let variance: Vec<f64> = data
            .flat_yerr()
            .iter()
            .zip(&reperr)
            .map(|(d, m)| d * d + m * m)
            .collect();
        if let Some(bin) = variance.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(AppError::domain(format!(
                "Bin {bin} has zero combined data and MC error; chi2 is undefined."
            )));
        }

        Ok(Self {
            models,
            runs,
            data_y: data.flat_y(),
            variance,
            weights: data.is_weighted().then(|| data.flat_weights()),
        })
    }

    /// Unscaled prediction of every bin.
    pub fn predictions(&self, x_scaled: &[f64]) -> Result<Vec<f64>, AppError> {
        predict_bins(self.models, self.runs, x_scaled)
    }
}

impl<M: Surrogate> Objective for TuneObjective<'_, M> {
    fn chi2(&self, x_scaled: &[f64]) -> Result<f64, AppError> {
        let p = self.predictions(x_scaled)?;
        chi2(&p, &self.data_y, &self.variance, self.weights.as_deref())
    }

    fn unweighted_chi2(&self, x_scaled: &[f64]) -> Result<f64, AppError> {
        let p = self.predictions(x_scaled)?;
        chi2(&p, &self.data_y, &self.variance, None)
    }

    fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ensemble::tests::{hist, small_ensemble};
    use crate::models::evaluate::tests::ConstModel;
    use std::collections::BTreeMap;

    fn models() -> Vec<ConstModel> {
        (0..5).map(|_| ConstModel { value: 0.0, loss: vec![0.1] }).collect()
    }

    fn data(weights: &BTreeMap<String, f64>) -> ObservableSet {
        // Means of the runs, so the mean prediction matches exactly.
        ObservableSet::from_histograms(
            vec![
                hist("/A/x", &[2.0, 2.0, 2.0], &[1.0, 1.0, 1.0]),
                hist("/A/y", &[6.0, 9.0], &[1.0, 1.0]),
            ],
            weights,
        )
        .unwrap()
    }

    #[test]
    fn chi2_counts_only_mismatching_bins() {
        let runs = small_ensemble();
        let models = models();
        let obj = TuneObjective::new(&models, &runs, &data(&BTreeMap::new())).unwrap();
        assert!(!obj.is_weighted());
        // Only bin 4 differs: (7 - 9)^2 / (1 + 0.7^2), over 5 bins.
        let expected = 4.0 / (1.0 + 0.7 * 0.7) / 5.0;
        approx::assert_relative_eq!(obj.chi2(&[0.0, 0.0]).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn weighted_and_unweighted_differ_by_weight() {
        let runs = small_ensemble();
        let models = models();
        let weights = BTreeMap::from([("/A/y".to_string(), 3.0)]);
        let obj = TuneObjective::new(&models, &runs, &data(&weights)).unwrap();
        assert!(obj.is_weighted());
        let w = obj.chi2(&[0.0, 0.0]).unwrap();
        let u = obj.unweighted_chi2(&[0.0, 0.0]).unwrap();
        approx::assert_relative_eq!(w, 3.0 * u, epsilon = 1e-12);
    }
}
