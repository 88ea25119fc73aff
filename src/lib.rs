//! `nntune-report` library crate.
//!
//! The binary (`nntune`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the report can be driven from other tools with custom surrogates,
//!   objectives or page renderers

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
