//! Quality diagnostics of the surrogate ensemble against the MC runs.
//!
//! Relative differences divide by the raw run output. A bin where a run
//! produced exactly zero yields `inf` (or `NaN` for 0/0); those values are kept
//! in the matrices and summaries and skipped when plotting.

use nalgebra::DMatrix;

use crate::data::RunEnsemble;
use crate::error::AppError;
use crate::math::{mean, std_dev};
use crate::models::surrogate::Surrogate;

/// (parameter value, per-bin loss) over every run and bin, for one parameter.
#[derive(Debug, Clone)]
pub struct ParamLossScatter {
    pub param: String,
    pub points: Vec<(f64, f64)>,
}

/// Per-bin mean and standard deviation, in percent.
#[derive(Debug, Clone, Default)]
pub struct ErrorBand {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ModelDiagnostics {
    /// Loss of each model on each run (models x runs).
    pub loss_runs: DMatrix<f64>,
    /// `|prediction - y| / y` of each model on each run (models x runs).
    pub diff_runs: DMatrix<f64>,
    /// Final training loss per bin.
    pub bin_loss: Vec<f64>,
    pub avg_loss: f64,
    pub std_loss: f64,
    pub param_scatter: Vec<ParamLossScatter>,
    /// Relative MC error `yerr / y` across runs.
    pub mc_error: ErrorBand,
    /// Relative model error (`diff_runs`) across runs.
    pub model_error: ErrorBand,
}

/// Evaluate every bin model on every run.
pub fn evaluate_models<M: Surrogate>(
    models: &[M],
    runs: &RunEnsemble,
) -> Result<ModelDiagnostics, AppError> {
    let n_bins = runs.n_bins();
    let n_runs = runs.n_runs();
    if models.len() != n_bins {
        return Err(AppError::config(format!(
            "Got {} models for {n_bins} output bins.",
            models.len()
        )));
    }

    let x_runs: Vec<Vec<f64>> = (0..n_runs).map(|r| runs.run_x_scaled(r)).collect();
    let mut loss_runs = DMatrix::zeros(n_bins, n_runs);
    let mut diff_runs = DMatrix::zeros(n_bins, n_runs);
    for (i, model) in models.iter().enumerate() {
        for (r, x) in x_runs.iter().enumerate() {
            loss_runs[(i, r)] = model.evaluate(x, runs.y_scaled()[(r, i)])?;
            let pred = runs.unscale_y(i, model.predict(x)?);
            let truth = runs.y()[(r, i)];
            diff_runs[(i, r)] = (pred - truth).abs() / truth;
        }
    }

    let mut bin_loss = Vec::with_capacity(n_bins);
    for (i, model) in models.iter().enumerate() {
        let Some(loss) = model.final_loss() else {
            return Err(AppError::domain(format!(
                "Model for bin {i} has no recorded training loss."
            )));
        };
        bin_loss.push(loss);
    }
    let avg_loss = mean(&bin_loss);
    let std_loss = std_dev(&bin_loss);

    let param_scatter = runs
        .params()
        .iter()
        .enumerate()
        .map(|(p, name)| {
            let mut points = Vec::with_capacity(n_bins * n_runs);
            for bin in 0..n_bins {
                for r in 0..n_runs {
                    points.push((runs.x()[(r, p)], loss_runs[(bin, r)]));
                }
            }
            ParamLossScatter {
                param: name.clone(),
                points,
            }
        })
        .collect();

    let mut mc_error = ErrorBand::default();
    let mut model_error = ErrorBand::default();
    for bin in 0..n_bins {
        let rel: Vec<f64> = (0..n_runs)
            .map(|r| runs.yerr()[(r, bin)] / runs.y()[(r, bin)])
            .collect();
        mc_error.mean.push(mean(&rel) * 100.0);
        mc_error.std.push(std_dev(&rel) * 100.0);

        let diffs: Vec<f64> = diff_runs.row(bin).iter().copied().collect();
        model_error.mean.push(mean(&diffs) * 100.0);
        model_error.std.push(std_dev(&diffs) * 100.0);
    }

    Ok(ModelDiagnostics {
        loss_runs,
        diff_runs,
        bin_loss,
        avg_loss,
        std_loss,
        param_scatter,
        mc_error,
        model_error,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::ensemble::tests::small_ensemble;
    use crate::data::{RunEnsemble, RunRecord};
    use approx::assert_relative_eq;

    /// Returns a fixed scaled value whatever the input.
    pub(crate) struct ConstModel {
        pub value: f64,
        pub loss: Vec<f64>,
    }

    impl Surrogate for ConstModel {
        fn predict(&self, _x_scaled: &[f64]) -> Result<f64, AppError> {
            Ok(self.value)
        }

        fn loss_history(&self) -> &[f64] {
            &self.loss
        }
    }

    fn models(n: usize) -> Vec<ConstModel> {
        (0..n)
            .map(|i| ConstModel {
                value: 0.0,
                loss: vec![1.0, 0.1 * (i + 1) as f64],
            })
            .collect()
    }

    #[test]
    fn summary_uses_final_training_loss() {
        let runs = small_ensemble();
        let diag = evaluate_models(&models(5), &runs).unwrap();
        assert_eq!(diag.bin_loss.len(), 5);
        assert_relative_eq!(diag.avg_loss, 0.3, epsilon = 1e-12);
        assert_relative_eq!(diag.std_loss, 0.02_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(diag.loss_runs.shape(), (5, 2));
    }

    #[test]
    fn mean_prediction_gives_expected_relative_difference() {
        // Scaled 0 maps back to the per-bin mean: bin 0 runs are 1 and 3, mean 2.
        let runs = small_ensemble();
        let diag = evaluate_models(&models(5), &runs).unwrap();
        assert_relative_eq!(diag.diff_runs[(0, 0)], 1.0);
        assert_relative_eq!(diag.diff_runs[(0, 1)], 1.0 / 3.0);
        // Scaled targets are -1 and +1 for bin 0: squared error 1 each.
        assert_relative_eq!(diag.loss_runs[(0, 0)], 1.0);
        assert_relative_eq!(diag.mc_error.mean[0], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn scatter_has_one_point_per_run_and_bin() {
        let runs = small_ensemble();
        let diag = evaluate_models(&models(5), &runs).unwrap();
        assert_eq!(diag.param_scatter.len(), 2);
        assert_eq!(diag.param_scatter[1].points.len(), 10);
        assert_eq!(diag.param_scatter[1].points[1].0, 20.0);
    }

    #[test]
    fn zero_run_output_propagates_non_finite() {
        let h = crate::data::ensemble::tests::hist;
        let runs = RunEnsemble::new(
            vec!["p".to_string()],
            vec![
                RunRecord { params: vec![0.0], histograms: vec![h("/h", &[0.0], &[0.1])] },
                RunRecord { params: vec![1.0], histograms: vec![h("/h", &[2.0], &[0.1])] },
            ],
        )
        .unwrap();
        let diag = evaluate_models(&models(1), &runs).unwrap();
        assert!(diag.diff_runs[(0, 0)].is_infinite());
        assert!(!diag.model_error.mean[0].is_finite());
    }

    #[test]
    fn model_count_must_match_bins() {
        let runs = small_ensemble();
        assert!(evaluate_models(&models(3), &runs).is_err());
    }

    #[test]
    fn empty_loss_history_is_rejected() {
        let runs = small_ensemble();
        let mut ms = models(5);
        ms[2].loss.clear();
        assert!(evaluate_models(&ms, &runs).is_err());
    }
}
