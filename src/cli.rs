//! CLI argument parsing for perfgate

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format of the gate result
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable constraint report (default)
    Text,
    /// JUnit XML, one test case per constraint
    Junit,
    /// KEY=value lines for the CI environment
    Env,
    /// JSON snapshots of the evaluated build's reports
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "perfgate")]
#[command(version)]
#[command(about = "Load-test statistics and performance quality gates", long_about = None)]
pub struct Cli {
    /// Gate configuration (TOML)
    #[arg(short, long, value_name = "FILE", default_value = "perfgate.toml")]
    pub config: PathBuf,

    /// Build history with raw samples (JSON, current build has the highest number)
    #[arg(short = 'H', long, value_name = "FILE")]
    pub history: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Directory for the persisted constraint log
    #[arg(short, long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the statistics table of every report before the result
    #[arg(short = 's', long = "stats")]
    pub stats: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
