//! Experimental observables, indexed by title.

use std::collections::{BTreeMap, HashMap};

use crate::data::ensemble::BinLayout;
use crate::domain::{Histogram, Observable};
use crate::error::AppError;

/// Ordered, duplicate-free collection of data observables.
///
/// After `aligned_to` the order and bin counts match the run layout exactly,
/// so per-observable slices tile the flattened prediction vector.
#[derive(Debug, Clone, Default)]
pub struct ObservableSet {
    items: Vec<Observable>,
    index: HashMap<String, usize>,
}

impl ObservableSet {
    pub fn new(items: Vec<Observable>) -> Result<Self, AppError> {
        let mut index = HashMap::with_capacity(items.len());
        for (i, obs) in items.iter().enumerate() {
            obs.histogram.validate()?;
            if let Some(w) = obs.weight {
                if !(w.is_finite() && w > 0.0) {
                    return Err(AppError::config(format!(
                        "Observable '{}' has invalid weight {w}.",
                        obs.title()
                    )));
                }
            }
            if index.insert(obs.title().to_string(), i).is_some() {
                return Err(AppError::config(format!(
                    "Duplicate data observable title '{}'.",
                    obs.title()
                )));
            }
        }
        Ok(Self { items, index })
    }

    /// Attach runcard weights to histograms. Weight keys must name a histogram.
    pub fn from_histograms(
        histograms: Vec<Histogram>,
        weights: &BTreeMap<String, f64>,
    ) -> Result<Self, AppError> {
        if let Some(title) = weights
            .keys()
            .find(|t| !histograms.iter().any(|h| &h.title == *t))
        {
            return Err(AppError::config(format!(
                "Weight given for '{title}', which is not a selected data observable."
            )));
        }
        let items = histograms
            .into_iter()
            .map(|h| {
                let weight = weights.get(&h.title).copied();
                Observable { histogram: h, weight }
            })
            .collect();
        Self::new(items)
    }

    /// Reorder to follow the run layout and check bin counts.
    ///
    /// Every run observable needs data and every data observable needs runs; an
    /// observable without runs would have an undefined MC envelope.
    pub fn aligned_to(self, layout: &BinLayout) -> Result<Self, AppError> {
        for obs in &self.items {
            let Some(slice) = layout.get(obs.title()) else {
                return Err(AppError::config(format!(
                    "Data observable '{}' has no matching MC runs.",
                    obs.title()
                )));
            };
            if slice.len != obs.histogram.len() {
                return Err(AppError::config(format!(
                    "Data observable '{}' has {} bins but runs have {}.",
                    obs.title(),
                    obs.histogram.len(),
                    slice.len
                )));
            }
        }

        let mut by_title: HashMap<String, Observable> = self
            .items
            .into_iter()
            .map(|o| (o.title().to_string(), o))
            .collect();
        let mut ordered = Vec::with_capacity(layout.slices().len());
        for slice in layout.slices() {
            let Some(obs) = by_title.remove(&slice.title) else {
                return Err(AppError::config(format!(
                    "MC observable '{}' has no experimental data.",
                    slice.title
                )));
            };
            ordered.push(obs);
        }
        Self::new(ordered)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observable> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, title: &str) -> Option<&Observable> {
        self.index.get(title).map(|&i| &self.items[i])
    }

    pub fn total_bins(&self) -> usize {
        self.items.iter().map(|o| o.histogram.len()).sum()
    }

    pub fn is_weighted(&self) -> bool {
        self.items.iter().any(Observable::is_weighted)
    }

    /// Data values flattened in observable order.
    pub fn flat_y(&self) -> Vec<f64> {
        self.items.iter().flat_map(|o| o.histogram.y.iter().copied()).collect()
    }

    pub fn flat_yerr(&self) -> Vec<f64> {
        self.items.iter().flat_map(|o| o.histogram.yerr.iter().copied()).collect()
    }

    /// Per-bin weights; unweighted observables count with weight 1.
    pub fn flat_weights(&self) -> Vec<f64> {
        self.items
            .iter()
            .flat_map(|o| std::iter::repeat_n(o.weight.unwrap_or(1.0), o.histogram.len()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ObservableSet {
    type Item = &'a Observable;
    type IntoIter = std::slice::Iter<'a, Observable>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ensemble::tests::{hist, small_ensemble};

    #[test]
    fn duplicate_titles_are_rejected() {
        let h = hist("/A/x", &[1.0], &[0.1]);
        let items = vec![
            Observable { histogram: h.clone(), weight: None },
            Observable { histogram: h, weight: None },
        ];
        assert!(ObservableSet::new(items).is_err());
    }

    #[test]
    fn alignment_follows_run_layout() {
        let runs = small_ensemble();
        let data = ObservableSet::from_histograms(
            vec![
                hist("/A/y", &[6.0, 7.0], &[1.0, 1.0]),
                hist("/A/x", &[2.0, 2.0, 2.0], &[1.0, 1.0, 1.0]),
            ],
            &BTreeMap::from([("/A/y".to_string(), 2.0)]),
        )
        .unwrap()
        .aligned_to(runs.layout())
        .unwrap();

        let titles: Vec<&str> = data.iter().map(Observable::title).collect();
        assert_eq!(titles, ["/A/x", "/A/y"]);
        assert_eq!(data.total_bins(), runs.n_bins());
        assert_eq!(data.flat_weights(), vec![1.0, 1.0, 1.0, 2.0, 2.0]);
        assert!(data.is_weighted());
    }

    #[test]
    fn observable_without_runs_is_a_config_error() {
        let runs = small_ensemble();
        let data = ObservableSet::from_histograms(
            vec![hist("/B/z", &[1.0], &[1.0])],
            &BTreeMap::new(),
        )
        .unwrap();
        let err = data.aligned_to(runs.layout()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn weight_for_unknown_title_is_rejected() {
        let err = ObservableSet::from_histograms(
            vec![hist("/A/x", &[1.0], &[1.0])],
            &BTreeMap::from([("/nope".to_string(), 1.0)]),
        );
        assert!(err.is_err());
    }
}
