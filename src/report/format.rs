//! Formatted terminal output.
//!
//! We keep formatting code in one place so the numerical modules stay free of
//! presentation concerns and output changes are localized.

use crate::data::{ObservableSet, RunEnsemble};
use crate::domain::{ComparisonEntry, RunCard};
use crate::report::ReportSummary;

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:>10.4}"),
        Some(x) => format!("{x:>10}"),
        None => format!("{:>10}", "-"),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

/// Summary printed by `nntune check`.
pub fn format_check_summary(card: &RunCard, runs: &RunEnsemble, data: &ObservableSet) -> String {
    let mut out = String::new();

    out.push_str("=== nntune - input check ===\n");
    out.push_str(&format!(
        "Runs: n={} | params={} | bins={}\n",
        runs.n_runs(),
        runs.n_params(),
        runs.n_bins()
    ));
    out.push_str(&format!(
        "Data: observables={} | weighted={}\n",
        data.len(),
        data.iter().filter(|o| o.is_weighted()).count()
    ));

    out.push_str("\nParameters:\n");
    for (p, bound) in card.minimizer.bounds.iter().enumerate() {
        let col = runs.x().column(p);
        let lo = col.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        out.push_str(&format!(
            "- {:<16} bounds=[{:.4}, {:.4}] runs=[{:.4}, {:.4}]\n",
            bound.name, bound.min, bound.max, lo, hi
        ));
    }

    out.push_str("\nObservables:\n");
    for obs in data {
        let weight = obs.weight.map(|w| format!(" weight={w}")).unwrap_or_default();
        out.push_str(&format!(
            "- {} ({} bins){weight}\n",
            obs.title(),
            obs.histogram.len()
        ));
    }
    out
}

/// The chi2 table as aligned text.
pub fn format_comparison_table(entries: &[ComparisonEntry]) -> String {
    let width = entries
        .iter()
        .map(|e| e.display_name().len())
        .max()
        .unwrap_or(0)
        .max("observable".len());

    let mut out = format!("{:<width$} {:>10} {:>10}\n", "observable", "best run", "model");
    for e in entries {
        out.push_str(&format!(
            "{:<width$} {} {}\n",
            e.display_name(),
            fmt_opt(e.best_run),
            fmt_opt(e.model)
        ));
    }
    out
}

/// Summary printed after `nntune report`.
pub fn format_report_summary(summary: &ReportSummary, best_x: &[f64], entries: &[ComparisonEntry]) -> String {
    let mut out = String::new();
    out.push_str("=== nntune - tune report ===\n");
    out.push_str(&format!("Best chi2/dof: {:.4}\n", summary.best_chi2));
    out.push_str(&format!("Best point  : {}\n", fmt_vec(best_x)));
    out.push_str(&format!(
        "Model loss  : {:.6} +/- {:.6}\n",
        summary.avg_loss, summary.std_loss
    ));
    out.push_str(&format!(
        "Artifacts   : {} observables, {} profiles, {} benchmark parameters\n\n",
        summary.observables, summary.profiles, summary.benchmark_params
    ));
    out.push_str(&format_comparison_table(entries));
    out.push_str(&format!("\nReport: {}\n", summary.path.join("index.html").display()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ComparisonKind;

    #[test]
    fn table_marks_weighted_rows_and_missing_values() {
        let mut a = ComparisonEntry::new("/A/x", ComparisonKind::Weighted);
        a.model = Some(1.23456);
        let text = format_comparison_table(&[a]);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("/A/x (weighted)"));
        assert!(lines[1].contains("1.2346"));
        assert!(lines[1].contains(" -"));
    }
}
