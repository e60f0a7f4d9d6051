//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::io;

use thiserror::Error;

use crate::writer::WriterError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout/report file)
    IoError,
    /// Malformed op on stdin
    InvalidInput,
    /// Writer failed
    WriteFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "BATCH_CLI_CONFIG_ERROR",
            Self::IoError => "BATCH_CLI_IO_ERROR",
            Self::InvalidInput => "BATCH_CLI_INVALID_INPUT",
            Self::WriteFailed => "BATCH_CLI_WRITE_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Malformed input on the given stdin line (1-based)
    pub fn invalid_input(line: usize, msg: impl Into<String>) -> Self {
        Self::new(
            CliErrorCode::InvalidInput,
            format!("line {}: {}", line, msg.into()),
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<WriterError> for CliError {
    fn from(e: WriterError) -> Self {
        match e {
            WriterError::InvalidConfig(msg) => Self::config_error(msg),
            other => Self::new(
                CliErrorCode::WriteFailed,
                format!("{} ({})", other, other.code()),
            ),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
