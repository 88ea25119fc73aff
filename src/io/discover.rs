//! Locate the MC run files listed by the runcard.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::AppError;

fn yoda_files_in(folder: &Path) -> Result<Vec<PathBuf>, AppError> {
    let rd = fs::read_dir(folder)
        .map_err(|e| AppError::discovery(format!("Cannot read run folder '{}': {e}", folder.display())))?;
    let mut out = Vec::new();
    for entry in rd {
        let entry = entry
            .map_err(|e| AppError::io(format!("Failed to list '{}': {e}", folder.display())))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "yoda") {
            out.push(path);
        }
    }
    Ok(out)
}

/// Every `*.yoda` file directly inside each folder, sorted.
///
/// A folder without any match is a discovery error naming that folder.
pub fn discover_runs(folders: &[PathBuf]) -> Result<Vec<PathBuf>, AppError> {
    let mut out = Vec::new();
    for folder in folders {
        let found = yoda_files_in(folder)?;
        if found.is_empty() {
            return Err(AppError::discovery(format!(
                "No yoda files found in {}",
                folder.display()
            )));
        }
        debug!(folder = %folder.display(), files = found.len(), "Scanned run folder.");
        out.extend(found);
    }
    out.sort();
    info!(runs = out.len(), folders = folders.len(), "Discovered MC runs.");
    Ok(out)
}
