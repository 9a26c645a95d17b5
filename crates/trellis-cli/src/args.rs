//! Command-line argument definitions for the Trellis CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the input snapshot, where the state
//! report goes, the configuration file and the logging verbosity.

use std::str::FromStr;

use clap::Parser;
use log::LevelFilter;

/// Command-line arguments for the Trellis snapshot resolver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input snapshot (JSON)
    #[arg(help = "Path to the input snapshot")]
    pub input: String,

    /// Path to the JSON state report; printed to stdout when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Only report the state of this cell
    #[arg(long)]
    pub cell: Option<String>,
}

impl Args {
    /// Parses `--log-level`. On failure returns the rejected text.
    pub fn log_filter(&self) -> Result<LevelFilter, &str> {
        LevelFilter::from_str(&self.log_level).map_err(|_| self.log_level.as_str())
    }
}
