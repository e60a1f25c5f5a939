//! CLI argument parsing for Nectar

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nectar")]
#[command(version)]
#[command(about = "Convert honeypot JSON session logs into a single CSV dataset", long_about = None)]
pub struct Cli {
    /// Destination CSV file
    #[arg(value_name = "OUTPUT", default_value = "honeypot_data.csv")]
    pub output: PathBuf,

    /// Root directory scanned recursively for .log files
    #[arg(long = "logs-dir", value_name = "DIR", default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Diagnostic file for out-of-range duration reports
    #[arg(
        long = "validation-log",
        value_name = "PATH",
        default_value = "data_validation_errors.log"
    )]
    pub validation_log: PathBuf,

    /// Number of worker threads (default: available cores, capped at 8)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Enable verbose diagnostics on stderr
    #[arg(long)]
    pub debug: bool,
}
