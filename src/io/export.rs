//! Export the goodness-of-fit table to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use serde::Serialize;

use crate::domain::{ComparisonEntry, ComparisonKind};
use crate::error::AppError;

#[derive(Serialize)]
struct Row<'a> {
    observable: &'a str,
    kind: ComparisonKind,
    best_run_chi2: Option<f64>,
    model_chi2: Option<f64>,
}

/// Write one row per comparison entry. Missing values are left empty.
pub fn write_comparison_csv(path: &Path, entries: &[ComparisonEntry]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    for e in entries {
        writer
            .serialize(Row {
                observable: &e.title,
                kind: e.kind,
                best_run_chi2: e.best_run,
                model_chi2: e.model,
            })
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chi2.csv");
        let mut a = ComparisonEntry::new("/A/x", ComparisonKind::Unweighted);
        a.model = Some(1.5);
        let b = ComparisonEntry::new("/A/x", ComparisonKind::Weighted);
        write_comparison_csv(&path, &[a, b]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "observable,kind,best_run_chi2,model_chi2");
        assert_eq!(lines[1], "/A/x,unweighted,,1.5");
        assert_eq!(lines[2], "/A/x,weighted,,");
    }
}
