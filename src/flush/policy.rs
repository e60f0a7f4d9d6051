//! Flush policy
//!
//! Decides when a batch is cut and how a drain is split into sink calls.
//!
//! Batch formation rules:
//! - Batches are formed only by sequential staging order
//! - No timers or background flushes; every flush is caused by a call
//! - Capacity and sink batch size are explicit and bounded

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// Why a flush happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushTrigger {
    /// Buffer was full and an op needed a new slot
    Capacity,
    /// Caller asked for it
    Explicit,
    /// Writer was closed
    Close,
    /// Writer was dropped without being closed
    Drop,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Capacity => "capacity",
            FlushTrigger::Explicit => "explicit",
            FlushTrigger::Close => "close",
            FlushTrigger::Drop => "drop",
        }
    }

    /// Whether no caller is waiting synchronously for the result.
    pub fn is_unattended(&self) -> bool {
        !matches!(self, FlushTrigger::Explicit)
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do before staging an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    /// Stage directly
    Accept,
    /// Flush this many entries first, then stage
    FlushFirst(usize),
    /// Refuse; the caller must flush
    Reject,
}

/// Capacity trigger plus sink batch-size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    capacity: usize,
    auto_flush: bool,
    sink_batch_max: usize,
}

impl FlushPolicy {
    /// Create a policy. A zero `sink_batch_max` is treated as 1.
    pub fn new(capacity: usize, auto_flush: bool, sink_batch_max: usize) -> Self {
        Self {
            capacity,
            auto_flush,
            sink_batch_max: sink_batch_max.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn auto_flush(&self) -> bool {
        self.auto_flush
    }

    pub fn sink_batch_max(&self) -> usize {
        self.sink_batch_max
    }

    /// Decide how to admit an op given the current buffer size.
    ///
    /// `grows` is false when the op overwrites a staged slot; such ops
    /// never overflow the buffer.
    pub fn before_stage(&self, staged: usize, grows: bool) -> StageDecision {
        if !grows || staged < self.capacity {
            return StageDecision::Accept;
        }
        if self.auto_flush {
            StageDecision::FlushFirst(self.capacity)
        } else {
            StageDecision::Reject
        }
    }

    /// Split `total` ops into consecutive sink calls.
    pub fn chunks(&self, total: usize) -> ChunkPlan {
        ChunkPlan {
            next: 0,
            total,
            step: self.sink_batch_max,
        }
    }
}

/// Consecutive index ranges, each at most `sink_batch_max` long.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    next: usize,
    total: usize,
    step: usize,
}

impl Iterator for ChunkPlan {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.next >= self.total {
            return None;
        }
        let start = self.next;
        let end = (start + self.step).min(self.total);
        self.next = end;
        Some(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_below_capacity() {
        let policy = FlushPolicy::new(4, true, 25);
        assert_eq!(policy.before_stage(3, true), StageDecision::Accept);
    }

    #[test]
    fn test_flush_first_at_capacity() {
        let policy = FlushPolicy::new(4, true, 25);
        assert_eq!(policy.before_stage(4, true), StageDecision::FlushFirst(4));
    }

    #[test]
    fn test_overwrite_never_triggers() {
        let policy = FlushPolicy::new(4, false, 25);
        assert_eq!(policy.before_stage(4, false), StageDecision::Accept);
    }

    #[test]
    fn test_reject_without_auto_flush() {
        let policy = FlushPolicy::new(4, false, 25);
        assert_eq!(policy.before_stage(4, true), StageDecision::Reject);
    }

    #[test]
    fn test_chunks_split_in_order() {
        let policy = FlushPolicy::new(100, true, 25);
        let chunks: Vec<_> = policy.chunks(60).collect();
        assert_eq!(chunks, vec![0..25, 25..50, 50..60]);
    }

    #[test]
    fn test_chunks_exact_multiple() {
        let policy = FlushPolicy::new(100, true, 25);
        assert_eq!(policy.chunks(50).count(), 2);
        assert_eq!(policy.chunks(0).count(), 0);
    }

    #[test]
    fn test_zero_sink_batch_treated_as_one() {
        let policy = FlushPolicy::new(3, true, 0);
        assert_eq!(policy.sink_batch_max(), 1);
        assert_eq!(policy.chunks(3).count(), 3);
    }

    #[test]
    fn test_trigger_attendance() {
        assert!(!FlushTrigger::Explicit.is_unattended());
        assert!(FlushTrigger::Close.is_unattended());
        assert!(FlushTrigger::Capacity.is_unattended());
    }
}
