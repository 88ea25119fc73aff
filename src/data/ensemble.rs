//! Monte Carlo run ensemble.
//!
//! Every run is a parameter point plus the same ordered list of histograms.
//! The histograms are flattened into one bin axis shared by all runs, by the
//! surrogate models (one per bin) and by the experimental data.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::domain::Histogram;
use crate::error::AppError;

/// One simulation run as loaded from disk.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub params: Vec<f64>,
    pub histograms: Vec<Histogram>,
}

/// Where one observable lives on the flattened bin axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BinSlice {
    pub title: String,
    pub offset: usize,
    pub len: usize,
    pub x: Vec<f64>,
    pub xerr_minus: Vec<f64>,
    pub xerr_plus: Vec<f64>,
}

/// Ordered observable layout shared by all runs.
#[derive(Debug, Clone, Default)]
pub struct BinLayout {
    slices: Vec<BinSlice>,
    index: HashMap<String, usize>,
}

impl BinLayout {
    fn from_histograms(histograms: &[Histogram]) -> Result<Self, AppError> {
        let mut layout = Self::default();
        let mut offset = 0;
        for h in histograms {
            h.validate()?;
            if layout.index.contains_key(&h.title) {
                return Err(AppError::config(format!(
                    "Duplicate observable title '{}' in run histograms.",
                    h.title
                )));
            }
            layout.index.insert(h.title.clone(), layout.slices.len());
            layout.slices.push(BinSlice {
                title: h.title.clone(),
                offset,
                len: h.len(),
                x: h.x.clone(),
                xerr_minus: h.xerr_minus.clone(),
                xerr_plus: h.xerr_plus.clone(),
            });
            offset += h.len();
        }
        Ok(layout)
    }

    pub fn slices(&self) -> &[BinSlice] {
        &self.slices
    }

    pub fn get(&self, title: &str) -> Option<&BinSlice> {
        self.index.get(title).map(|&i| &self.slices[i])
    }

    pub fn total_bins(&self) -> usize {
        self.slices.last().map_or(0, |s| s.offset + s.len)
    }

    fn matches(&self, histograms: &[Histogram]) -> bool {
        histograms.len() == self.slices.len()
            && histograms
                .iter()
                .zip(&self.slices)
                .all(|(h, s)| h.title == s.title && h.len() == s.len)
    }
}

/// Per-column zero-mean / unit-scale transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Standardizer {
    /// Fit to the columns of `m`. Columns without spread keep `std = 1`.
    pub fn fit(m: &DMatrix<f64>) -> Self {
        let n = m.nrows() as f64;
        let mut mean = Vec::with_capacity(m.ncols());
        let mut std = Vec::with_capacity(m.ncols());
        for col in m.column_iter() {
            let mu = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / n;
            let sd = var.sqrt();
            mean.push(mu);
            std.push(if sd > 0.0 && sd.is_finite() { sd } else { 1.0 });
        }
        Self { mean, std }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn scale(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn unscale(&self, scaled: &[f64]) -> Vec<f64> {
        scaled
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| v * s + m)
            .collect()
    }

    fn apply(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(m.nrows(), m.ncols(), |r, c| (m[(r, c)] - self.mean[c]) / self.std[c])
    }
}

/// Per-run `y`/`yerr` columns of one observable (runs x bins of that observable).
#[derive(Debug, Clone)]
pub struct ObservableBlock<'a> {
    pub slice: &'a BinSlice,
    pub y: DMatrix<f64>,
    pub yerr: DMatrix<f64>,
}

/// The full set of MC runs used to train and validate the surrogate.
#[derive(Debug, Clone)]
pub struct RunEnsemble {
    params: Vec<String>,
    x: DMatrix<f64>,
    x_scaled: DMatrix<f64>,
    x_scaler: Standardizer,
    y: DMatrix<f64>,
    yerr: DMatrix<f64>,
    y_scaled: DMatrix<f64>,
    y_scaler: Standardizer,
    layout: BinLayout,
}

impl RunEnsemble {
    /// Build the ensemble. All runs must carry one value per parameter and the
    /// same histogram titles and bin counts in the same order.
    pub fn new(params: Vec<String>, runs: Vec<RunRecord>) -> Result<Self, AppError> {
        let Some(first) = runs.first() else {
            return Err(AppError::config("Run ensemble is empty."));
        };
        if params.is_empty() {
            return Err(AppError::config("Run ensemble needs at least one parameter."));
        }
        let layout = BinLayout::from_histograms(&first.histograms)?;
        let n_bins = layout.total_bins();
        if n_bins == 0 {
            return Err(AppError::config("Runs contain no selected histograms."));
        }

        let n_runs = runs.len();
        let n_params = params.len();
        let mut x = DMatrix::zeros(n_runs, n_params);
        let mut y = DMatrix::zeros(n_runs, n_bins);
        let mut yerr = DMatrix::zeros(n_runs, n_bins);

        for (r, run) in runs.iter().enumerate() {
            if run.params.len() != n_params {
                return Err(AppError::config(format!(
                    "Run {r} has {} parameter values, expected {n_params}.",
                    run.params.len()
                )));
            }
            if !layout.matches(&run.histograms) {
                return Err(AppError::config(format!(
                    "Run {r} does not share the observable layout of run 0."
                )));
            }
            for (c, &v) in run.params.iter().enumerate() {
                x[(r, c)] = v;
            }
            for (h, slice) in run.histograms.iter().zip(layout.slices()) {
                h.validate()?;
                for b in 0..slice.len {
                    y[(r, slice.offset + b)] = h.y[b];
                    yerr[(r, slice.offset + b)] = h.yerr[b];
                }
            }
        }

        let x_scaler = Standardizer::fit(&x);
        let y_scaler = Standardizer::fit(&y);
        let x_scaled = x_scaler.apply(&x);
        let y_scaled = y_scaler.apply(&y);

        Ok(Self {
            params,
            x,
            x_scaled,
            x_scaler,
            y,
            yerr,
            y_scaled,
            y_scaler,
            layout,
        })
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn n_params(&self) -> usize {
        self.params.len()
    }

    pub fn n_runs(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_bins(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    pub fn x_scaled(&self) -> &DMatrix<f64> {
        &self.x_scaled
    }

    pub fn y(&self) -> &DMatrix<f64> {
        &self.y
    }

    pub fn yerr(&self) -> &DMatrix<f64> {
        &self.yerr
    }

    pub fn y_scaled(&self) -> &DMatrix<f64> {
        &self.y_scaled
    }

    pub fn y_scaler(&self) -> &Standardizer {
        &self.y_scaler
    }

    pub fn layout(&self) -> &BinLayout {
        &self.layout
    }

    /// Scaled parameter vector of run `r` as an owned vector.
    pub fn run_x_scaled(&self, r: usize) -> Vec<f64> {
        self.x_scaled.row(r).iter().copied().collect()
    }

    pub fn scale_x(&self, raw: &[f64]) -> Result<Vec<f64>, AppError> {
        self.check_dim(raw.len())?;
        Ok(self.x_scaler.scale(raw))
    }

    pub fn unscale_x(&self, scaled: &[f64]) -> Result<Vec<f64>, AppError> {
        self.check_dim(scaled.len())?;
        Ok(self.x_scaler.unscale(scaled))
    }

    /// De-normalize a scaled prediction for flattened bin `bin`.
    pub fn unscale_y(&self, bin: usize, scaled: f64) -> f64 {
        scaled * self.y_scaler.std[bin] + self.y_scaler.mean[bin]
    }

    /// Per-bin mean of the run errors (the representative MC error).
    pub fn mean_yerr(&self) -> Vec<f64> {
        let n = self.n_runs() as f64;
        self.yerr
            .column_iter()
            .map(|c| c.iter().sum::<f64>() / n)
            .collect()
    }

    /// `y`/`yerr` of every run for the observable titled `title`.
    pub fn observable_block(&self, title: &str) -> Option<ObservableBlock<'_>> {
        let slice = self.layout.get(title)?;
        Some(ObservableBlock {
            slice,
            y: self.y.columns(slice.offset, slice.len).into_owned(),
            yerr: self.yerr.columns(slice.offset, slice.len).into_owned(),
        })
    }

    fn check_dim(&self, len: usize) -> Result<(), AppError> {
        if len != self.n_params() {
            return Err(AppError::domain(format!(
                "Parameter vector has {len} entries, expected {}.",
                self.n_params()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    pub(crate) fn hist(title: &str, y: &[f64], yerr: &[f64]) -> Histogram {
        let n = y.len();
        Histogram {
            title: title.to_string(),
            x: (0..n).map(|i| i as f64 + 0.5).collect(),
            xerr_minus: vec![0.5; n],
            xerr_plus: vec![0.5; n],
            y: y.to_vec(),
            yerr: yerr.to_vec(),
        }
    }

    pub(crate) fn small_ensemble() -> RunEnsemble {
        let runs = vec![
            RunRecord {
                params: vec![1.0, 10.0],
                histograms: vec![
                    hist("/A/x", &[1.0, 2.0, 3.0], &[0.1, 0.2, 0.3]),
                    hist("/A/y", &[5.0, 6.0], &[0.5, 0.6]),
                ],
            },
            RunRecord {
                params: vec![3.0, 20.0],
                histograms: vec![
                    hist("/A/x", &[3.0, 2.0, 1.0], &[0.3, 0.2, 0.1]),
                    hist("/A/y", &[7.0, 8.0], &[0.7, 0.8]),
                ],
            },
        ];
        RunEnsemble::new(vec!["a".to_string(), "b".to_string()], runs).unwrap()
    }

    #[test]
    fn flattens_observables_in_order() {
        let e = small_ensemble();
        assert_eq!(e.n_runs(), 2);
        assert_eq!(e.n_bins(), 5);
        assert_eq!(e.layout().get("/A/y").unwrap().offset, 3);
        assert_eq!(e.y()[(1, 4)], 8.0);
    }

    #[test]
    fn scaled_columns_have_zero_mean() {
        let e = small_ensemble();
        for col in e.x_scaled().column_iter() {
            assert_relative_eq!(col.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(e.x_scaled()[(0, 0)], -1.0);
        assert_relative_eq!(e.unscale_y(3, e.y_scaled()[(0, 3)]), 5.0);
    }

    #[test]
    fn unscale_inverts_scale_for_random_vectors() {
        let e = small_ensemble();
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let v = vec![rng.gen_range(-50.0..50.0), rng.gen_range(0.0..1e3)];
            let back = e.unscale_x(&e.scale_x(&v).unwrap()).unwrap();
            for (a, b) in v.iter().zip(&back) {
                assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn constant_column_stays_invertible() {
        let runs = vec![
            RunRecord { params: vec![2.0], histograms: vec![hist("/h", &[1.0], &[0.1])] },
            RunRecord { params: vec![2.0], histograms: vec![hist("/h", &[1.0], &[0.1])] },
        ];
        let e = RunEnsemble::new(vec!["p".to_string()], runs).unwrap();
        assert_eq!(e.scale_x(&[2.0]).unwrap(), vec![0.0]);
        assert_eq!(e.unscale_x(&[0.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn observable_block_returns_every_run() {
        let e = small_ensemble();
        let block = e.observable_block("/A/x").unwrap();
        assert_eq!(block.y.nrows(), 2);
        assert_eq!(block.y.ncols(), 3);
        assert_eq!(block.y[(1, 0)], 3.0);
        assert!(e.observable_block("/missing").is_none());
    }

    #[test]
    fn rejects_mismatched_layouts_and_duplicates() {
        let bad = vec![
            RunRecord { params: vec![1.0], histograms: vec![hist("/h", &[1.0, 2.0], &[0.1, 0.1])] },
            RunRecord { params: vec![2.0], histograms: vec![hist("/h", &[1.0], &[0.1])] },
        ];
        assert!(RunEnsemble::new(vec!["p".to_string()], bad).is_err());

        let dup = vec![RunRecord {
            params: vec![1.0],
            histograms: vec![hist("/h", &[1.0], &[0.1]), hist("/h", &[1.0], &[0.1])],
        }];
        assert!(RunEnsemble::new(vec!["p".to_string()], dup).is_err());
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let e = small_ensemble();
        assert!(e.unscale_x(&[1.0]).is_err());
    }
}
