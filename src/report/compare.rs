//! Data vs best-fit prediction vs MC runs, one observable at a time.
//!
//! Observables tile the flattened prediction vector in order: observable `i`
//! owns `predictions[ifirst..ifirst + len_i]`. The walk must consume the whole
//! vector, otherwise the data and the models disagree on the bin layout.

use std::collections::HashMap;

use tracing::debug;

use crate::data::{ObservableBlock, ObservableSet, RunEnsemble};
use crate::domain::{ComparisonEntry, ComparisonKind, Observable, Scatter2D};
use crate::error::AppError;
use crate::math::{chi2, uniform_weights};

/// Per-bin spread of the MC runs for one observable.
#[derive(Debug, Clone, PartialEq)]
pub struct McEnvelope {
    pub up: Vec<f64>,
    pub dn: Vec<f64>,
    /// Mean run error per bin.
    pub reperr: Vec<f64>,
}

pub fn envelope(block: &ObservableBlock<'_>) -> Result<McEnvelope, AppError> {
    let n_runs = block.y.nrows();
    if n_runs == 0 {
        return Err(AppError::domain(format!(
            "Observable '{}' has no MC runs to build an envelope from.",
            block.slice.title
        )));
    }
    let mut env = McEnvelope {
        up: Vec::with_capacity(block.y.ncols()),
        dn: Vec::with_capacity(block.y.ncols()),
        reperr: Vec::with_capacity(block.y.ncols()),
    };
    for (col, err) in block.y.column_iter().zip(block.yerr.column_iter()) {
        env.up.push(col.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        env.dn.push(col.iter().copied().fold(f64::INFINITY, f64::min));
        env.reperr.push(err.iter().sum::<f64>() / n_runs as f64);
    }
    Ok(env)
}

fn variance(obs: &Observable, reperr: &[f64]) -> Vec<f64> {
    obs.histogram
        .yerr
        .iter()
        .zip(reperr)
        .map(|(d, m)| d * d + m * m)
        .collect()
}

/// Everything the report needs to show one observable.
#[derive(Debug, Clone)]
pub struct ObservableComparison<'a> {
    pub index: usize,
    pub observable: &'a Observable,
    /// Best-fit prediction for this observable's bins.
    pub prediction: Vec<f64>,
    pub envelope: McEnvelope,
    pub chi2: f64,
    /// Present only for weighted observables.
    pub weighted_chi2: Option<f64>,
}

pub fn compare_observables<'a>(
    data: &'a ObservableSet,
    predictions: &[f64],
    runs: &RunEnsemble,
) -> Result<Vec<ObservableComparison<'a>>, AppError> {
    let mut out = Vec::with_capacity(data.len());
    let mut ifirst = 0;
    for (index, obs) in data.iter().enumerate() {
        let size = obs.histogram.len();
        let Some(prediction) = predictions.get(ifirst..ifirst + size) else {
            return Err(AppError::domain(format!(
                "Prediction vector has {} bins; observable '{}' needs bins {ifirst}..{}.",
                predictions.len(),
                obs.title(),
                ifirst + size
            )));
        };
        let Some(block) = runs.observable_block(obs.title()) else {
            return Err(AppError::config(format!(
                "Data observable '{}' has no matching MC runs.",
                obs.title()
            )));
        };
        if block.slice.len != size {
            return Err(AppError::config(format!(
                "Data observable '{}' has {size} bins but runs have {}.",
                obs.title(),
                block.slice.len
            )));
        }

        let env = envelope(&block)?;
        let var = variance(obs, &env.reperr);
        let plain = chi2(prediction, &obs.histogram.y, &var, None)?;
        let weighted = match obs.weight {
            Some(w) => Some(chi2(
                prediction,
                &obs.histogram.y,
                &var,
                Some(&uniform_weights(size, w)),
            )?),
            None => None,
        };
        debug!(title = obs.title(), chi2 = plain, "Compared observable.");

        out.push(ObservableComparison {
            index,
            observable: obs,
            prediction: prediction.to_vec(),
            envelope: env,
            chi2: plain,
            weighted_chi2: weighted,
        });
        ifirst += size;
    }

    if ifirst != predictions.len() {
        return Err(AppError::domain(format!(
            "Observables cover {ifirst} bins but the prediction has {}.",
            predictions.len()
        )));
    }
    Ok(out)
}

/// One `Scatter2D` per observable carrying the best-fit prediction.
///
/// Every scatter is annotated with all parameters (name -> unscaled value).
pub fn best_fit_export(
    comparisons: &[ObservableComparison<'_>],
    params: &[String],
    best_x: &[f64],
) -> Vec<Scatter2D> {
    comparisons
        .iter()
        .map(|c| {
            let h = &c.observable.histogram;
            let mut s = Scatter2D::new(h.title.clone());
            for (name, value) in params.iter().zip(best_x) {
                s.set_annotation(name.clone(), value);
            }
            for (b, &y) in c.prediction.iter().enumerate() {
                s.add_point(h.x[b], y, (h.xerr_minus[b], h.xerr_plus[b]));
            }
            s
        })
        .collect()
}

/// Goodness-of-fit table, keyed by `(title, kind)`.
#[derive(Debug, Clone, Default)]
pub struct ComparisonTable {
    entries: Vec<ComparisonEntry>,
    index: HashMap<(String, ComparisonKind), usize>,
}

impl ComparisonTable {
    pub fn new(entries: Vec<ComparisonEntry>) -> Result<Self, AppError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            if index.insert((e.title.clone(), e.kind), i).is_some() {
                return Err(AppError::config(format!(
                    "Duplicate comparison entry '{}'.",
                    e.display_name()
                )));
            }
        }
        Ok(Self { entries, index })
    }

    /// One entry per observable (plus a weighted one where a weight applies),
    /// pre-filled with the best chi2 any single MC run reaches against data.
    pub fn for_observables(data: &ObservableSet, runs: &RunEnsemble) -> Result<Self, AppError> {
        let mut entries = Vec::with_capacity(data.len());
        for obs in data {
            let Some(block) = runs.observable_block(obs.title()) else {
                return Err(AppError::config(format!(
                    "Data observable '{}' has no matching MC runs.",
                    obs.title()
                )));
            };
            let weights = obs.weight.map(|w| uniform_weights(obs.histogram.len(), w));

            let mut best = f64::INFINITY;
            let mut best_weighted = f64::INFINITY;
            for r in 0..block.y.nrows() {
                let y: Vec<f64> = block.y.row(r).iter().copied().collect();
                let err: Vec<f64> = block.yerr.row(r).iter().copied().collect();
                let var = variance(obs, &err);
                best = best.min(chi2(&y, &obs.histogram.y, &var, None)?);
                if let Some(w) = weights.as_deref() {
                    best_weighted = best_weighted.min(chi2(&y, &obs.histogram.y, &var, Some(w))?);
                }
            }

            let mut entry = ComparisonEntry::new(obs.title(), ComparisonKind::Unweighted);
            entry.best_run = best.is_finite().then_some(best);
            entries.push(entry);
            if weights.is_some() {
                let mut entry = ComparisonEntry::new(obs.title(), ComparisonKind::Weighted);
                entry.best_run = best_weighted.is_finite().then_some(best_weighted);
                entries.push(entry);
            }
        }
        Self::new(entries)
    }

    /// Every weighted observable needs a weighted entry to report into.
    pub fn validate_against(&self, data: &ObservableSet) -> Result<(), AppError> {
        for obs in data.iter().filter(|o| o.is_weighted()) {
            let key = (obs.title().to_string(), ComparisonKind::Weighted);
            if !self.index.contains_key(&key) {
                return Err(AppError::config(format!(
                    "Observable '{}' is weighted but the comparison table has no weighted entry for it.",
                    obs.title()
                )));
            }
        }
        Ok(())
    }

    /// Write model chi2 values by exact `(title, kind)` match.
    ///
    /// Entries that match no observable are left as they are.
    pub fn fill_model(&mut self, comparisons: &[ObservableComparison<'_>]) -> Result<(), AppError> {
        for c in comparisons {
            let title = c.observable.title().to_string();
            if let Some(&i) = self.index.get(&(title.clone(), ComparisonKind::Unweighted)) {
                self.entries[i].model = Some(c.chi2);
            }
            if let Some(w) = c.weighted_chi2 {
                let Some(&i) = self.index.get(&(title, ComparisonKind::Weighted)) else {
                    return Err(AppError::config(format!(
                        "Observable '{}' is weighted but the comparison table has no weighted entry for it.",
                        c.observable.title()
                    )));
                };
                self.entries[i].model = Some(w);
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ComparisonEntry] {
        &self.entries
    }

    pub fn get(&self, title: &str, kind: ComparisonKind) -> Option<&ComparisonEntry> {
        self.index
            .get(&(title.to_string(), kind))
            .map(|&i| &self.entries[i])
    }
}
