//! Command-line parsing for the tune report generator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! statistics and plotting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "nntune", version, about = "Neural-network MC tune report generator")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the full report (figures, best_model.yoda, chi2.csv, pages).
    Report(ReportArgs),
    /// Load the runcard, the MC runs and the data, and print what was found.
    Check(CheckArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// Runcard (YAML).
    #[arg(short = 'r', long)]
    pub runcard: PathBuf,

    /// Trained surrogate ensemble (JSON, one model per output bin).
    #[arg(short = 'm', long)]
    pub models: PathBuf,

    /// Minimizer summary (JSON).
    #[arg(short = 'f', long)]
    pub fit: PathBuf,

    /// Output directory of the report.
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Closure-test results (JSON); adds the benchmark figures.
    #[arg(long)]
    pub benchmark: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct CheckArgs {
    /// Runcard (YAML).
    #[arg(short = 'r', long)]
    pub runcard: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_command() {
        let cli = Cli::parse_from([
            "nntune", "--log-level", "debug", "report", "-r", "card.yml", "-m", "m.json", "-f",
            "fit.json", "-o", "out",
        ]);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.output, PathBuf::from("out"));
        assert!(args.benchmark.is_none());
    }

    #[test]
    fn log_level_defaults_to_info() {
        let cli = Cli::parse_from(["nntune", "check", "--runcard", "card.yml"]);
        assert_eq!(cli.log_level, tracing::Level::INFO);
    }
}
