//! Flush results
//!
//! Every op sent (or skipped) by a flush gets exactly one `BatchResult`,
//! in staging order.

use serde::Serialize;
use uuid::Uuid;

use crate::flush::FlushTrigger;
use crate::record::{LogicalKey, OpKind, WriteOp};
use crate::sink::RecordStatus;
use crate::staging::StagedOp;

/// Outcome of one staged op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Staging sequence number of the op
    pub sequence: u64,
    pub kind: OpKind,
    /// Logical key, when the op has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<LogicalKey>,
    #[serde(flatten)]
    pub status: RecordStatus,
}

impl BatchResult {
    pub fn new(staged: &StagedOp, status: RecordStatus) -> Self {
        let key = staged.key.clone().or_else(|| match &staged.op {
            WriteOp::Delete { key } => Some(key.clone()),
            WriteOp::Put { .. } => None,
        });
        Self {
            sequence: staged.sequence,
            kind: staged.op.kind(),
            key,
            status,
        }
    }
}

/// Aggregated results of one flush.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlushReport {
    pub writer_id: Uuid,
    pub trigger: FlushTrigger,
    /// Number of sink calls issued
    pub sink_calls: usize,
    pub results: Vec<BatchResult>,
}

impl FlushReport {
    pub fn new(writer_id: Uuid, trigger: FlushTrigger) -> Self {
        Self {
            writer_id,
            trigger,
            sink_calls: 0,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, staged: &StagedOp, status: RecordStatus) {
        self.results.push(BatchResult::new(staged, status));
    }

    /// Record the same status for every op of a chunk.
    pub fn push_all(&mut self, chunk: &[StagedOp], status: &RecordStatus) {
        for staged in chunk {
            self.push(staged, status.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.count(RecordStatus::is_succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(RecordStatus::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(RecordStatus::is_skipped)
    }

    /// Ops that were handed to the sink.
    pub fn attempted(&self) -> usize {
        self.len() - self.skipped()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.status.is_succeeded())
    }

    /// Statuses in submission order.
    pub fn statuses(&self) -> Vec<&RecordStatus> {
        self.results.iter().map(|r| &r.status).collect()
    }

    /// Sequence numbers of ops with the given predicate on their status.
    pub fn sequences_where(&self, pred: impl Fn(&RecordStatus) -> bool) -> Vec<u64> {
        self.results
            .iter()
            .filter(|r| pred(&r.status))
            .map(|r| r.sequence)
            .collect()
    }

    fn count(&self, pred: impl Fn(&RecordStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}
