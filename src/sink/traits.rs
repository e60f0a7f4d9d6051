//! Remote sink interface
//!
//! The writer's only collaborator. A sink owns its own transport, auth
//! and transient-error retries; to the writer a call is synchronous and
//! either returns one status per op or fails as a whole.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::WriteOp;

use super::errors::SinkResult;

/// Outcome of one op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum RecordStatus {
    /// Sink accepted the op
    Succeeded,
    /// Sink rejected the op, or the call carrying it failed
    Failed(String),
    /// Op was never sent; it is still staged
    Skipped,
}

impl RecordStatus {
    pub fn failed(reason: impl Into<String>) -> Self {
        RecordStatus::Failed(reason.into())
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, RecordStatus::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RecordStatus::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RecordStatus::Skipped)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Succeeded => write!(f, "succeeded"),
            RecordStatus::Failed(reason) => write!(f, "failed: {}", reason),
            RecordStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// A remote system that durably accepts batches of writes.
pub trait RemoteSink {
    /// Maximum number of ops accepted by one `submit_batch` call.
    fn max_batch_size(&self) -> usize;

    /// Apply `ops` in order.
    ///
    /// Must return exactly one status per op, in the same order.
    /// `Err` means the call failed as a whole.
    fn submit_batch(&mut self, ops: &[WriteOp]) -> SinkResult<Vec<RecordStatus>>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "sink"
    }
}

impl<S: RemoteSink + ?Sized> RemoteSink for &mut S {
    fn max_batch_size(&self) -> usize {
        (**self).max_batch_size()
    }

    fn submit_batch(&mut self, ops: &[WriteOp]) -> SinkResult<Vec<RecordStatus>> {
        (**self).submit_batch(ops)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: RemoteSink + ?Sized> RemoteSink for Box<S> {
    fn max_batch_size(&self) -> usize {
        (**self).max_batch_size()
    }

    fn submit_batch(&mut self, ops: &[WriteOp]) -> SinkResult<Vec<RecordStatus>> {
        (**self).submit_batch(ops)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json_shape() {
        let failed = serde_json::to_value(RecordStatus::failed("timeout")).unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["reason"], "timeout");

        let ok = serde_json::to_value(RecordStatus::Succeeded).unwrap();
        assert_eq!(ok["status"], "succeeded");
    }

    #[test]
    fn test_status_predicates() {
        assert!(RecordStatus::Succeeded.is_succeeded());
        assert!(RecordStatus::failed("x").is_failed());
        assert!(RecordStatus::Skipped.is_skipped());
        assert_eq!(RecordStatus::failed("x").to_string(), "failed: x");
    }
}
