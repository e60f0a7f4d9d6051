//! # Writer Errors
//!
//! Structural errors (`InvalidKey`, `InvalidConfig`, `CapacityExceeded`,
//! `WriterClosed`) are raised to the caller of the offending call.
//! Pipeline errors (`SinkUnreachable`, `DeadlineExceeded`) carry the flush
//! report so the caller can tell attempted ops from skipped ones.
//! Per-record failures are never errors.

use thiserror::Error;

use crate::record::{KeyError, WriteOp};
use crate::staging::StagingError;

use super::result::FlushReport;

/// Result type for writer operations
pub type WriterResult<T> = Result<T, WriterError>;

/// Batch writer errors
#[derive(Debug, Error)]
pub enum WriterError {
    /// Malformed key or record
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    /// Rejected configuration
    #[error("Invalid writer config: {0}")]
    InvalidConfig(String),

    /// Buffer full and auto-flush disabled
    #[error("Capacity exceeded: {capacity} entries staged; call flush() first")]
    CapacityExceeded { capacity: usize },

    /// Operation after close
    #[error("Writer is closed")]
    WriterClosed,

    /// Sink could not be reached; remaining chunks were not attempted
    #[error("Sink unreachable: {reason} ({} ops attempted, {} skipped)", .report.attempted(), .report.skipped())]
    SinkUnreachable { reason: String, report: FlushReport },

    /// Flush stopped at its deadline; unattempted ops stay staged
    #[error("Flush deadline exceeded ({} ops skipped)", .report.skipped())]
    DeadlineExceeded { report: FlushReport },

    /// Final flush failed; `unflushed` holds the ops that were not written
    #[error("Close failed with {} ops unflushed: {source}", .unflushed.len())]
    CloseFailed {
        source: Box<WriterError>,
        unflushed: Vec<WriteOp>,
    },
}

impl WriterError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            WriterError::InvalidKey(_) => "BATCH_INVALID_KEY",
            WriterError::InvalidConfig(_) => "BATCH_INVALID_CONFIG",
            WriterError::CapacityExceeded { .. } => "BATCH_CAPACITY_EXCEEDED",
            WriterError::WriterClosed => "BATCH_WRITER_CLOSED",
            WriterError::SinkUnreachable { .. } => "BATCH_SINK_UNREACHABLE",
            WriterError::DeadlineExceeded { .. } => "BATCH_DEADLINE_EXCEEDED",
            WriterError::CloseFailed { .. } => "BATCH_CLOSE_FAILED",
        }
    }

    /// Flush report attached to a pipeline error.
    pub fn report(&self) -> Option<&FlushReport> {
        match self {
            WriterError::SinkUnreachable { report, .. } => Some(report),
            WriterError::DeadlineExceeded { report } => Some(report),
            WriterError::CloseFailed { source, .. } => source.report(),
            _ => None,
        }
    }

    /// Whether the error was raised synchronously by a bad call, as
    /// opposed to a failed write pipeline.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            WriterError::InvalidKey(_)
                | WriterError::InvalidConfig(_)
                | WriterError::CapacityExceeded { .. }
                | WriterError::WriterClosed
        )
    }
}

impl From<StagingError> for WriterError {
    fn from(e: StagingError) -> Self {
        match e {
            StagingError::CapacityExceeded { capacity } => {
                WriterError::CapacityExceeded { capacity }
            }
            StagingError::ZeroCapacity => WriterError::InvalidConfig(e.to_string()),
            StagingError::InvalidKey(key) => WriterError::InvalidKey(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::FlushTrigger;
    use uuid::Uuid;

    #[test]
    fn test_staging_errors_convert() {
        let err: WriterError = StagingError::CapacityExceeded { capacity: 4 }.into();
        assert!(matches!(err, WriterError::CapacityExceeded { capacity: 4 }));

        let err: WriterError = StagingError::InvalidKey(KeyError::Empty).into();
        assert_eq!(err.code(), "BATCH_INVALID_KEY");
        assert!(err.is_structural());
    }

    #[test]
    fn test_close_failed_exposes_inner_report() {
        let inner = WriterError::SinkUnreachable {
            reason: "connection refused".into(),
            report: FlushReport::new(Uuid::new_v4(), FlushTrigger::Close),
        };
        let err = WriterError::CloseFailed {
            source: Box::new(inner),
            unflushed: Vec::new(),
        };
        assert!(err.report().is_some());
        assert!(!err.is_structural());
        assert!(err.to_string().contains("connection refused"));
    }
}
