//! Runcard schema.
//!
//! The runcard is YAML with three nodes (`input`, `model`, `minimizer`). Only
//! `input` and `minimizer.bounds` drive the report; the training setup is kept
//! opaque and echoed into the configuration page.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCard {
    pub input: InputSection,
    pub model: ModelSection,
    pub minimizer: MinimizerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSection {
    pub folders: Vec<PathBuf>,
    pub patterns: Vec<String>,
    pub unpatterns: Vec<String>,
    pub expfiles: Vec<PathBuf>,
    /// Analysis weight per observable title.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl InputSection {
    /// An object is used if its path contains any pattern and none of the unpatterns.
    pub fn selects(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| path.contains(p.as_str()))
            && !self.unpatterns.iter().any(|p| path.contains(p.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    pub seed: u64,
    pub scan: bool,
    #[serde(default)]
    pub scan_setup: Option<serde_yaml_ng::Value>,
    #[serde(default)]
    pub noscan_setup: Option<serde_yaml_ng::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimizerSection {
    pub bounds: Vec<ParamBound>,
    pub restarts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBound {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl ParamBound {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl RunCard {
    /// Ordered parameter names (the order of `minimizer.bounds`).
    pub fn param_names(&self) -> Vec<String> {
        self.minimizer.bounds.iter().map(|b| b.name.clone()).collect()
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        let input = &self.input;
        if input.folders.is_empty() {
            return Err(AppError::config(r#"Error key "folders" in node "input" must list at least one folder."#));
        }
        if input.patterns.is_empty() {
            return Err(AppError::config(r#"Error key "patterns" in node "input" must list at least one pattern."#));
        }
        if input.expfiles.is_empty() {
            return Err(AppError::config(r#"Error key "expfiles" in node "input" must list at least one file."#));
        }
        for (title, &w) in &input.weights {
            if !(w.is_finite() && w > 0.0) {
                return Err(AppError::config(format!(
                    "Weight for '{title}' must be finite and positive, got {w}."
                )));
            }
        }

        if self.model.scan && self.model.scan_setup.is_none() {
            return Err(AppError::config(r#"Error key "scan_setup" not found in node "model""#));
        }
        if !self.model.scan && self.model.noscan_setup.is_none() {
            return Err(AppError::config(r#"Error key "noscan_setup" not found in node "model""#));
        }

        let bounds = &self.minimizer.bounds;
        if bounds.is_empty() {
            return Err(AppError::config(r#"Error key "bounds" in node "minimizer" must list at least one parameter."#));
        }
        for (i, b) in bounds.iter().enumerate() {
            if !(b.min.is_finite() && b.max.is_finite() && b.max > b.min) {
                return Err(AppError::config(format!(
                    "Invalid bounds for parameter '{}': [{}, {}] (must be finite with max>min).",
                    b.name, b.min, b.max
                )));
            }
            if bounds[..i].iter().any(|o| o.name == b.name) {
                return Err(AppError::config(format!("Duplicate parameter '{}' in bounds.", b.name)));
            }
        }
        Ok(())
    }
}
