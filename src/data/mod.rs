//! In-memory data: the MC run ensemble and the experimental observables.

pub mod ensemble;
pub mod observables;

pub use ensemble::{BinLayout, BinSlice, ObservableBlock, RunEnsemble, RunRecord, Standardizer};
pub use observables::ObservableSet;
