//! Mathematical utilities: goodness-of-fit statistics and correlations.

pub mod corr;
pub mod stats;

pub use corr::*;
pub use stats::*;
