//! Report assembly: figures, the best-fit YODA export, the CSV table and the
//! HTML pages, written under one output directory.
//!
//! ```text
//! <report>/
//!   plots/            every SVG figure
//!   best_model.yoda   best-fit prediction per observable
//!   chi2.csv          goodness-of-fit table
//!   *.html            pages (see `pages::PAGES`)
//! ```

pub mod benchmark;
pub mod compare;
pub mod format;
pub mod pages;

pub use benchmark::*;
pub use compare::*;
pub use format::*;
pub use pages::*;

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::data::{ObservableSet, RunEnsemble};
use crate::domain::{BenchmarkResults, RunCard};
use crate::error::AppError;
use crate::fit::{MinimizerResult, Objective, ParameterProfile, profile_scan};
use crate::io::{write_comparison_csv, write_yoda};
use crate::models::{ModelDiagnostics, Surrogate, evaluate_models, predict_bins};
use crate::plot;

/// Keep file names portable whatever the parameter is called.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect()
}

/// Output directory of one report.
#[derive(Debug, Clone)]
pub struct Report {
    path: PathBuf,
    plots: PathBuf,
}

impl Report {
    /// Create `<path>/plots` (idempotent).
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let plots = path.join("plots");
        fs::create_dir_all(&plots).map_err(|e| {
            AppError::io(format!("Failed to create report directory '{}': {e}", plots.display()))
        })?;
        Ok(Self { path, plots })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn plots_dir(&self) -> &Path {
        &self.plots
    }

    /// Convergence trace and one profile figure per parameter.
    pub fn plot_minimize<O: Objective>(
        &self,
        result: &MinimizerResult<O>,
        runs: &RunEnsemble,
    ) -> Result<Vec<ParameterProfile>, AppError> {
        plot::minimizer_trace(&self.plots.join("minimizer.svg"), &result.trace)?;
        let profiles = profile_scan(result, runs)?;
        for p in &profiles {
            plot::parameter_profile(&self.plots.join(format!("chi2_{}.svg", p.dim)), p)?;
        }
        Ok(profiles)
    }

    /// Correlation heatmap; identity when the minimizer gave no covariance.
    pub fn plot_correlations(
        &self,
        names: &[String],
        corr: Option<&DMatrix<f64>>,
    ) -> Result<(), AppError> {
        let identity;
        let corr = match corr {
            Some(c) => c,
            None => {
                warn!("No covariance in the fit summary; drawing an identity correlation matrix.");
                identity = DMatrix::identity(names.len(), names.len());
                &identity
            }
        };
        plot::correlations(&self.plots.join("correlations.svg"), names, corr)
    }

    /// Per-observable figures, model chi2 into `table`, then `best_model.yoda`.
    ///
    /// The export is written once, after every observable went through.
    pub fn plot_data(
        &self,
        data: &ObservableSet,
        predictions: &[f64],
        runs: &RunEnsemble,
        best_x: &[f64],
        table: &mut ComparisonTable,
    ) -> Result<PathBuf, AppError> {
        table.validate_against(data)?;
        let comparisons = compare_observables(data, predictions, runs)?;
        for c in &comparisons {
            plot::observable(&self.plots.join(format!("{}_data.svg", c.index)), c)?;
        }
        table.fill_model(&comparisons)?;

        let export = best_fit_export(&comparisons, runs.params(), best_x);
        let yoda_path = self.path.join("best_model.yoda");
        write_yoda(&yoda_path, &export)?;
        info!(path = %yoda_path.display(), "Exported YODA file with predictions.");
        Ok(yoda_path)
    }

    /// Loss summary, loss against each parameter, and the error bands.
    pub fn plot_model<M: Surrogate>(
        &self,
        models: &[M],
        runs: &RunEnsemble,
    ) -> Result<ModelDiagnostics, AppError> {
        let diag = evaluate_models(models, runs)?;
        plot::model_loss(&self.plots.join("model_loss.svg"), &diag)?;
        for (p, scatter) in diag.param_scatter.iter().enumerate() {
            plot::loss_vs_param(&self.plots.join(format!("bounds_{p}.svg")), scatter)?;
        }
        plot::error_bands(&self.plots.join("errors.svg"), &diag.mc_error, &diag.model_error)?;
        Ok(diag)
    }

    pub fn plot_benchmark(&self, results: &BenchmarkResults) -> Result<Vec<BenchmarkScatter>, AppError> {
        let scatters = benchmark_scatter(results)?;
        for s in &scatters {
            let name = format!("benchmark_{}.svg", file_stem(&s.param));
            plot::benchmark(&self.plots.join(name), s)?;
        }
        Ok(scatters)
    }

    pub fn save(
        &self,
        renderer: &dyn PageRenderer,
        context: &PageContext,
    ) -> Result<Vec<PathBuf>, AppError> {
        let pages = write_pages(&self.path, renderer, context)?;
        info!(
            index = %self.path.join("index.html").display(),
            "Generated report."
        );
        Ok(pages)
    }

    /// Write the whole report, aborting on the first failure.
    pub fn generate<M, O>(
        &self,
        inputs: &ReportInputs<'_, M, O>,
        table: &mut ComparisonTable,
        renderer: &dyn PageRenderer,
    ) -> Result<ReportSummary, AppError>
    where
        M: Surrogate,
        O: Objective,
    {
        let runs = inputs.runs;
        let result = inputs.result;

        let profiles = self.plot_minimize(result, runs)?;
        self.plot_correlations(runs.params(), result.correlation.as_ref())?;

        let predictions = predict_bins(inputs.models, runs, &result.best_x_scaled)?;
        let yoda = self.plot_data(inputs.data, &predictions, runs, &result.best_x, table)?;

        let diag = self.plot_model(inputs.models, runs)?;
        let benchmark = match inputs.benchmark {
            Some(b) => Some(self.plot_benchmark(b)?),
            None => None,
        };

        let csv = self.path.join("chi2.csv");
        write_comparison_csv(&csv, table.entries())?;
        debug!(path = %csv.display(), "Wrote comparison table.");

        let summary = ReportSummary {
            path: self.path.clone(),
            best_chi2: result.best_chi2()?,
            avg_loss: diag.avg_loss,
            std_loss: diag.std_loss,
            observables: inputs.data.len(),
            profiles: profiles.len(),
            benchmark_params: benchmark.as_ref().map_or(0, Vec::len),
            yoda,
        };
        let context = page_context(inputs, table, &summary, benchmark.as_deref())?;
        self.save(renderer, &context)?;
        Ok(summary)
    }
}

/// Borrowed inputs of one report.
pub struct ReportInputs<'a, M, O> {
    pub runcard: &'a RunCard,
    pub runs: &'a RunEnsemble,
    pub models: &'a [M],
    pub data: &'a ObservableSet,
    pub result: &'a MinimizerResult<O>,
    pub benchmark: Option<&'a BenchmarkResults>,
}

#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub best_chi2: f64,
    pub avg_loss: f64,
    pub std_loss: f64,
    pub observables: usize,
    pub profiles: usize,
    pub benchmark_params: usize,
    pub yoda: PathBuf,
}

fn to_value<T: serde::Serialize + ?Sized>(v: &T, what: &str) -> Result<Value, AppError> {
    serde_json::to_value(v).map_err(|e| AppError::io(format!("Failed to serialize {what}: {e}")))
}

fn page_context<M, O>(
    inputs: &ReportInputs<'_, M, O>,
    table: &ComparisonTable,
    summary: &ReportSummary,
    benchmark: Option<&[BenchmarkScatter]>,
) -> Result<PageContext, AppError> {
    let runs = inputs.runs;
    let result = inputs.result;
    let mut ctx = PageContext::new();
    ctx.insert(
        "generated".into(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    ctx.insert("params".into(), to_value(runs.params(), "parameters")?);
    ctx.insert("best_x".into(), to_value(&result.best_x, "best-fit point")?);
    ctx.insert("best_error".into(), to_value(&result.best_error, "best-fit errors")?);
    ctx.insert("best_chi2".into(), json!(summary.best_chi2));
    ctx.insert("avg_loss".into(), json!(summary.avg_loss));
    ctx.insert("std_loss".into(), json!(summary.std_loss));
    ctx.insert("n_runs".into(), json!(runs.n_runs()));
    ctx.insert("n_bins".into(), json!(runs.n_bins()));
    ctx.insert("observables".into(), json!(summary.observables));
    ctx.insert("comparisons".into(), to_value(table.entries(), "comparison table")?);
    ctx.insert("benchmark".into(), json!(benchmark.is_some()));
    if let Some(b) = benchmark {
        let params: Vec<&str> = b.iter().map(|s| s.param.as_str()).collect();
        ctx.insert("benchmark_params".into(), json!(params));
    }
    ctx.insert("runcard".into(), to_value(inputs.runcard, "runcard")?);
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems_are_portable() {
        assert_eq!(file_stem("alpha_s"), "alpha_s");
        assert_eq!(file_stem("pT0/ref"), "pT0_ref");
        assert_eq!(file_stem("a b"), "a_b");
    }

    #[test]
    fn new_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let r = Report::new(dir.path().join("out")).unwrap();
        assert!(r.plots_dir().is_dir());
        Report::new(dir.path().join("out")).unwrap();
    }
}
