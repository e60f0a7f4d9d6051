//! CLI argument definitions using clap
//!
//! Commands:
//! - batchwrite load --config <path> [--report-file <path>]
//! - batchwrite demo

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::Severity;

/// batchwrite - Batched bulk writer for keyed remote sinks
#[derive(Parser, Debug)]
#[command(name = "batchwrite")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum log severity (trace, info, warn, error, fatal)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Severity,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read JSON ops from stdin, one per line, and write them to a sink
    Load {
        /// Path to configuration file
        #[arg(long, default_value = "./batchwrite.json")]
        config: PathBuf,

        /// Append unattended flush reports to this JSON lines file
        #[arg(long)]
        report_file: Option<PathBuf>,
    },

    /// Load sample users into a table and messages into a queue
    Demo,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
