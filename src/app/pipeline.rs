//! Shared workflow behind `nntune check` and `nntune report`.
//!
//! runcard -> run discovery -> MC runs + data -> (models + fit summary) -> report
//!
//! Relative paths in the runcard are resolved against the runcard's directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cli::ReportArgs;
use crate::data::{ObservableSet, RunEnsemble, RunRecord};
use crate::domain::{ComparisonEntry, Histogram, RunCard, Scatter2D};
use crate::error::AppError;
use crate::fit::{MinimizerResult, TuneObjective};
use crate::io::{discover_runs, load_runcard, read_benchmark, read_fit_summary, read_models, read_yoda};
use crate::report::{ComparisonTable, Report, ReportInputs, ReportSummary, SummaryPageRenderer};

/// Runcard plus everything it points at.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub runcard: RunCard,
    pub runs: RunEnsemble,
    pub data: ObservableSet,
}

/// All outputs of a single `nntune report` run.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub summary: ReportSummary,
    pub best_x: Vec<f64>,
    pub entries: Vec<ComparisonEntry>,
}

fn resolve(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() { p.to_path_buf() } else { base.join(p) }
}

/// Reference data is usually booked under `/REF/<analysis>/...`; runs use `/<analysis>/...`.
fn data_title(path: &str) -> &str {
    match path.strip_prefix("/REF") {
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

fn parse_param(scatters: &[Scatter2D], name: &str, source: &Path) -> Result<f64, AppError> {
    let Some(raw) = scatters.iter().find_map(|s| s.annotation(name)) else {
        return Err(AppError::config(format!(
            "Run '{}' has no value for parameter '{name}'.",
            source.display()
        )));
    };
    raw.trim().parse::<f64>().map_err(|e| {
        AppError::config(format!(
            "Run '{}': parameter '{name}' = '{raw}' is not a number ({e}).",
            source.display()
        ))
    })
}

/// Parameter values (from annotations) and selected histograms of one run file.
pub fn load_run(path: &Path, card: &RunCard) -> Result<RunRecord, AppError> {
    let scatters = read_yoda(path)?;
    let params = card
        .minimizer
        .bounds
        .iter()
        .map(|b| parse_param(&scatters, &b.name, path))
        .collect::<Result<Vec<_>, _>>()?;
    let histograms: Vec<Histogram> = scatters
        .iter()
        .filter(|s| card.input.selects(&s.path))
        .map(Scatter2D::to_histogram)
        .collect();
    debug!(path = %path.display(), histograms = histograms.len(), "Loaded run.");
    Ok(RunRecord { params, histograms })
}

/// Selected experimental histograms of every data file, weighted and aligned to `runs`.
pub fn load_data(card: &RunCard, base: &Path, runs: &RunEnsemble) -> Result<ObservableSet, AppError> {
    let mut histograms = Vec::new();
    for file in &card.input.expfiles {
        for s in read_yoda(&resolve(base, file))? {
            let title = data_title(&s.path);
            if card.input.selects(title) {
                let mut h = s.to_histogram();
                h.title = title.to_string();
                histograms.push(h);
            }
        }
    }
    let data = ObservableSet::from_histograms(histograms, &card.input.weights)?
        .aligned_to(runs.layout())?;
    info!(
        observables = data.len(),
        bins = data.total_bins(),
        weighted = data.is_weighted(),
        "Loaded experimental data."
    );
    Ok(data)
}

pub fn load_inputs(runcard: &Path) -> Result<LoadedInputs, AppError> {
    let card = load_runcard(runcard)?;
    let base = runcard.parent().unwrap_or_else(|| Path::new("."));

    let folders: Vec<PathBuf> = card.input.folders.iter().map(|f| resolve(base, f)).collect();
    let files = discover_runs(&folders)?;
    let records = files
        .iter()
        .map(|f| load_run(f, &card))
        .collect::<Result<Vec<_>, _>>()?;
    let runs = RunEnsemble::new(card.param_names(), records)?;
    info!(
        runs = runs.n_runs(),
        params = runs.n_params(),
        bins = runs.n_bins(),
        "Built run ensemble."
    );

    let data = load_data(&card, base, &runs)?;
    Ok(LoadedInputs { runcard: card, runs, data })
}

/// Execute the full report pipeline and return the computed outputs.
pub fn run_report(args: &ReportArgs) -> Result<ReportOutput, AppError> {
    let inputs = load_inputs(&args.runcard)?;
    let models = read_models(&args.models)?;
    let objective = TuneObjective::new(&models, &inputs.runs, &inputs.data)?;
    let result = MinimizerResult::from_summary(
        read_fit_summary(&args.fit)?,
        objective,
        &inputs.runs,
        &inputs.runcard.minimizer.bounds,
    )?;
    let benchmark = args.benchmark.as_deref().map(read_benchmark).transpose()?;

    let report = Report::new(&args.output)?;
    let mut table = ComparisonTable::for_observables(&inputs.data, &inputs.runs)?;
    let summary = report.generate(
        &ReportInputs {
            runcard: &inputs.runcard,
            runs: &inputs.runs,
            models: &models,
            data: &inputs.data,
            result: &result,
            benchmark: benchmark.as_ref(),
        },
        &mut table,
        &SummaryPageRenderer,
    )?;

    Ok(ReportOutput {
        summary,
        best_x: result.best_x.clone(),
        entries: table.entries().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_prefix_is_stripped() {
        assert_eq!(data_title("/REF/ATLAS/d01"), "/ATLAS/d01");
        assert_eq!(data_title("/ATLAS/d01"), "/ATLAS/d01");
        assert_eq!(data_title("/REFERENCE/x"), "/REFERENCE/x");
    }
}
