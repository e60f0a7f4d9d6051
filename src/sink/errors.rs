//! # Sink Errors
//!
//! Top-level failures of a sink call. Per-record failures are never
//! errors; they are returned as `RecordStatus::Failed`.

use thiserror::Error;

/// Result type for sink calls
pub type SinkResult<T> = Result<T, SinkError>;

/// Whole-call sink failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Sink could not be reached; nothing in the call was applied
    #[error("Sink unreachable: {0}")]
    Unreachable(String),

    /// Call was interrupted by its deadline; outcome of the call unknown
    #[error("Sink call timed out")]
    Timeout,
}
