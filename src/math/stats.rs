//! Goodness-of-fit statistics.
//!
//! `chi2` is the only statistic the report needs to be strict about: every
//! comparison (model vs data, raw run vs data, profile scans) goes through it.
//! Invalid variances are rejected instead of producing `inf`/`NaN`.

use crate::error::AppError;

/// Chi-square per degree of freedom.
///
/// ```text
/// chi2 = (1/N) * Σ w_i (p_i - y_i)^2 / v_i
/// ```
///
/// `w_i = 1` when `weights` is `None`. `N` is the number of points whatever
/// the weights are, so weights are not normalized.
///
/// # Errors
/// `DomainError` if the vectors differ in length, are empty, if a variance is
/// non-positive or non-finite, or if `weights` has the wrong length.
pub fn chi2(
    prediction: &[f64],
    reference: &[f64],
    variance: &[f64],
    weights: Option<&[f64]>,
) -> Result<f64, AppError> {
    let n = prediction.len();
    if reference.len() != n || variance.len() != n {
        return Err(AppError::domain(format!(
            "chi2 length mismatch: prediction={n}, reference={}, variance={}",
            reference.len(),
            variance.len()
        )));
    }
    if n == 0 {
        return Err(AppError::domain("chi2 of an empty vector is undefined."));
    }
    if let Some(w) = weights {
        if w.len() != n {
            return Err(AppError::domain(format!(
                "chi2 weight length mismatch: expected {n}, got {}",
                w.len()
            )));
        }
    }

    let mut sum = 0.0;
    for i in 0..n {
        let v = variance[i];
        if !(v.is_finite() && v > 0.0) {
            return Err(AppError::domain(format!(
                "chi2 requires strictly positive variance (index {i}: {v})."
            )));
        }
        let w = weights.map_or(1.0, |w| w[i]);
        let r = prediction[i] - reference[i];
        sum += w * r * r / v;
    }

    Ok(sum / n as f64)
}

/// Per-point weight vector with every entry equal to `weight`.
pub fn uniform_weights(n: usize, weight: f64) -> Vec<f64> {
    vec![weight; n]
}

/// Arithmetic mean (`NaN` for an empty slice).
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `N`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
