//! CLI module for batchwrite
//!
//! Provides command-line interface for:
//! - load: Stage JSON ops from stdin and write them to a sink
//! - demo: Replay the table and queue loading walkthrough

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{demo, load, run, run_command, CliConfig, SinkConfig, SinkKind};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_op, read_ops, write_error, write_response};
