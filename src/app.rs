//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - runs the input check or the full report pipeline
//! - prints the terminal summary

use clap::Parser;

use crate::cli::{CheckArgs, Cli, Command, ReportArgs};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `nntune` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    match cli.command {
        Command::Report(args) => handle_report(&args),
        Command::Check(args) => handle_check(&args),
    }
}

fn handle_report(args: &ReportArgs) -> Result<(), AppError> {
    let out = pipeline::run_report(args)?;
    println!(
        "{}",
        crate::report::format_report_summary(&out.summary, &out.best_x, &out.entries)
    );
    Ok(())
}

fn handle_check(args: &CheckArgs) -> Result<(), AppError> {
    let inputs = pipeline::load_inputs(&args.runcard)?;
    println!(
        "{}",
        crate::report::format_check_summary(&inputs.runcard, &inputs.runs, &inputs.data)
    );
    Ok(())
}
