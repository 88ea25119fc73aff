//! Shared domain types.
//!
//! These records replace loosely-keyed dictionaries: every field the report
//! reads is typed, and the weighted/unweighted distinction of a comparison is
//! an explicit discriminant.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One measured or simulated histogram, stored as a scatter of bin centres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub title: String,
    pub x: Vec<f64>,
    pub xerr_minus: Vec<f64>,
    pub xerr_plus: Vec<f64>,
    pub y: Vec<f64>,
    pub yerr: Vec<f64>,
}

impl Histogram {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Every per-bin vector must share the bin count, and there must be at least one bin.
    pub fn validate(&self) -> Result<(), AppError> {
        let n = self.y.len();
        if n == 0 {
            return Err(AppError::config(format!("Histogram '{}' has no bins.", self.title)));
        }
        let lens = [
            self.x.len(),
            self.xerr_minus.len(),
            self.xerr_plus.len(),
            self.yerr.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            return Err(AppError::config(format!(
                "Histogram '{}' has inconsistent bin arrays (y={n}, x/xerr-/xerr+/yerr={lens:?}).",
                self.title
            )));
        }
        Ok(())
    }
}

/// An experimental observable: a histogram plus an optional analysis weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Observable {
    pub histogram: Histogram,
    pub weight: Option<f64>,
}

impl Observable {
    pub fn title(&self) -> &str {
        &self.histogram.title
    }

    pub fn is_weighted(&self) -> bool {
        self.weight.is_some()
    }
}

/// Whether a comparison entry holds the plain or the weighted chi2 of an observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonKind {
    Unweighted,
    Weighted,
}

impl ComparisonKind {
    pub fn label(self) -> &'static str {
        match self {
            ComparisonKind::Unweighted => "",
            ComparisonKind::Weighted => " (weighted)",
        }
    }
}

/// One row of the goodness-of-fit table shown in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub title: String,
    pub kind: ComparisonKind,
    /// Best chi2 among the raw MC runs against data.
    pub best_run: Option<f64>,
    /// Chi2 of the best-fit model prediction against data.
    pub model: Option<f64>,
}

impl ComparisonEntry {
    pub fn new(title: impl Into<String>, kind: ComparisonKind) -> Self {
        Self {
            title: title.into(),
            kind,
            best_run: None,
            model: None,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{}{}", self.title, self.kind.label())
    }
}

/// A single point of an exported scatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
    pub xerr: (f64, f64),
    pub yerr: (f64, f64),
}

/// Portable 2D scatter (YODA `Scatter2D`) with ordered string annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Scatter2D {
    pub path: String,
    pub annotations: Vec<(String, String)>,
    pub points: Vec<Point2D>,
}

impl Scatter2D {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            annotations: Vec::new(),
            points: Vec::new(),
        }
    }

    /// Set (or overwrite) an annotation, keeping insertion order.
    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.annotations.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.annotations.push((key, value)),
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn add_point(&mut self, x: f64, y: f64, xerr: (f64, f64)) {
        self.points.push(Point2D {
            x,
            y,
            xerr,
            yerr: (0.0, 0.0),
        });
    }

    /// Histogram view: y-error is the mean of the two y half-widths.
    pub fn to_histogram(&self) -> Histogram {
        Histogram {
            title: self.path.clone(),
            x: self.points.iter().map(|p| p.x).collect(),
            xerr_minus: self.points.iter().map(|p| p.xerr.0).collect(),
            xerr_plus: self.points.iter().map(|p| p.xerr.1).collect(),
            y: self.points.iter().map(|p| p.y).collect(),
            yerr: self
                .points
                .iter()
                .map(|p| 0.5 * (p.yerr.0 + p.yerr.1))
                .collect(),
        }
    }
}

/// One step of the minimizer's convergence history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub evaluations: u64,
    pub fbest: f64,
}

/// Per-parameter record of one closure test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureDetail {
    #[serde(rename = "params")]
    pub param: String,
    #[serde(rename = "true_params")]
    pub true_value: f64,
    #[serde(rename = "predicted_params")]
    pub predicted_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureTest {
    pub details: Vec<ClosureDetail>,
}

/// A suite of closure tests: fits to pseudo-data generated at known parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResults {
    #[serde(rename = "single_closure_test_results")]
    pub tests: Vec<ClosureTest>,
}
