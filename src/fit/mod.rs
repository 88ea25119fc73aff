//! Minimizer outcome and its diagnostics.
//!
//! Responsibilities:
//!
//! - the chi2 objective over the surrogate prediction (`objective`)
//! - the best-fit point loaded from the minimizer summary (`result`)
//! - one-dimensional profile scans around that point (`profile`)

pub mod objective;
pub mod profile;
pub mod result;

pub use objective::*;
pub use profile::*;
pub use result::*;
