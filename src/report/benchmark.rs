//! Closure-test accuracy: how far the tuned parameters land from the truth.

use crate::domain::BenchmarkResults;
use crate::error::AppError;

/// `|predicted - true| * 100 / |true|`, in percent.
pub fn relative_error(true_value: f64, predicted: f64) -> Result<f64, AppError> {
    if true_value == 0.0 || !true_value.is_finite() {
        return Err(AppError::domain(format!(
            "Relative error is undefined for true value {true_value}."
        )));
    }
    Ok((predicted - true_value).abs() * 100.0 / true_value.abs())
}

/// True values and relative errors of one parameter across all closure tests.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkScatter {
    pub param: String,
    pub true_values: Vec<f64>,
    pub relative_errors: Vec<f64>,
}

/// Group closure-test details by parameter, in the order of the first test.
pub fn benchmark_scatter(results: &BenchmarkResults) -> Result<Vec<BenchmarkScatter>, AppError> {
    let Some(first) = results.tests.first() else {
        return Err(AppError::config("Benchmark contains no closure tests."));
    };

    let mut out: Vec<BenchmarkScatter> = first
        .details
        .iter()
        .map(|d| BenchmarkScatter {
            param: d.param.clone(),
            true_values: Vec::with_capacity(results.tests.len()),
            relative_errors: Vec::with_capacity(results.tests.len()),
        })
        .collect();

    for (t, test) in results.tests.iter().enumerate() {
        let same = test.details.len() == out.len()
            && test.details.iter().zip(&out).all(|(d, s)| d.param == s.param);
        if !same {
            return Err(AppError::config(format!(
                "Closure test {t} does not list the same parameters as test 0."
            )));
        }
        for (d, s) in test.details.iter().zip(out.iter_mut()) {
            s.true_values.push(d.true_value);
            s.relative_errors
                .push(relative_error(d.true_value, d.predicted_value)?);
        }
    }
    Ok(out)
}
