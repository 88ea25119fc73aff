//! JSON inputs produced by the training and minimization steps.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::BenchmarkResults;
use crate::error::AppError;
use crate::fit::FitSummary;
use crate::models::{DenseNetwork, DenseNetworkFile};

/// Surrogate ensemble: one network per flattened output bin, in bin order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsFile {
    pub models: Vec<DenseNetworkFile>,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open {what} '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::config(format!("Invalid {what} '{}': {e}", path.display())))
}

pub fn read_models(path: &Path) -> Result<Vec<DenseNetwork>, AppError> {
    let file: ModelsFile = read_json(path, "models JSON")?;
    let models = file
        .models
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            DenseNetwork::from_file(m)
                .map_err(|e| AppError::config(format!("Model {i}: {}", e.message())))
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(models = models.len(), "Loaded surrogate models.");
    Ok(models)
}

pub fn read_fit_summary(path: &Path) -> Result<FitSummary, AppError> {
    read_json(path, "fit summary")
}

pub fn read_benchmark(path: &Path) -> Result<BenchmarkResults, AppError> {
    read_json(path, "benchmark results")
}
