//! Correlation matrix helpers for the parameter heatmap.

use nalgebra::DMatrix;

use crate::error::AppError;

/// Convert a covariance matrix into a correlation matrix.
///
/// `corr_ij = cov_ij / sqrt(cov_ii * cov_jj)`, diagonal forced to exactly 1.
pub fn correlation_from_covariance(cov: &DMatrix<f64>) -> Result<DMatrix<f64>, AppError> {
    if !cov.is_square() {
        return Err(AppError::domain(format!(
            "Covariance matrix must be square, got {}x{}.",
            cov.nrows(),
            cov.ncols()
        )));
    }
    let n = cov.nrows();
    let mut sigma = Vec::with_capacity(n);
    for i in 0..n {
        let v = cov[(i, i)];
        if !(v.is_finite() && v > 0.0) {
            return Err(AppError::domain(format!(
                "Covariance diagonal must be strictly positive (index {i}: {v})."
            )));
        }
        sigma.push(v.sqrt());
    }

    Ok(DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            (cov[(i, j)] / (sigma[i] * sigma[j])).clamp(-1.0, 1.0)
        }
    }))
}

/// Build a covariance matrix from nested rows (as stored in the minimizer summary).
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, AppError> {
    let n = rows.len();
    let m = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != m) {
        return Err(AppError::config("Matrix rows have differing lengths."));
    }
    Ok(DMatrix::from_fn(n, m, |i, j| rows[i][j]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn correlation_of_simple_covariance() {
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 1.0]);
        let corr = correlation_from_covariance(&cov).unwrap();
        assert_eq!(corr[(0, 0)], 1.0);
        assert_relative_eq!(corr[(0, 1)], 0.5);
        assert_relative_eq!(corr[(1, 0)], 0.5);
    }

    #[test]
    fn rejects_zero_variance() {
        let cov = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 1.0]);
        assert!(correlation_from_covariance(&cov).is_err());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(matrix_from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
