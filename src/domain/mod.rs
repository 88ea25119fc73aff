//! Domain types used throughout the report.
//!
//! This module defines:
//!
//! - histogram/observable records and the comparison table rows (`types`)
//! - the runcard schema (`config`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
