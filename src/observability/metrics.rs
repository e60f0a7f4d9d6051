//! Writer metrics
//!
//! - Counters only, monotonic
//! - Atomic so a shared handle can be read while the writer runs

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one batch writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Ops staged into a new slot
    ops_staged: AtomicU64,
    /// Ops that replaced a staged op with the same key
    ops_overwritten: AtomicU64,
    /// Flushes of any trigger
    flushes: AtomicU64,
    /// Flushes caused by the capacity trigger
    auto_flushes: AtomicU64,
    /// Sink calls issued
    sink_calls: AtomicU64,
    /// Ops the sink accepted
    ops_succeeded: AtomicU64,
    /// Ops whose failure is final; they left the buffer
    ops_failed: AtomicU64,
    /// Ops a flush left staged for a retry (skipped or unreachable)
    ops_retained: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_staged(&self) {
        self.ops_staged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_overwritten(&self) {
        self.ops_overwritten.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flush; `auto` for capacity-triggered flushes.
    pub fn increment_flushes(&self, auto: bool) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if auto {
            self.auto_flushes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_sink_calls(&self) {
        self.sink_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the per-op outcome counts of one flush.
    pub fn add_outcomes(&self, succeeded: u64, failed: u64, retained: u64) {
        self.ops_succeeded.fetch_add(succeeded, Ordering::Relaxed);
        self.ops_failed.fetch_add(failed, Ordering::Relaxed);
        self.ops_retained.fetch_add(retained, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ops_staged: self.ops_staged.load(Ordering::Relaxed),
            ops_overwritten: self.ops_overwritten.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            auto_flushes: self.auto_flushes.load(Ordering::Relaxed),
            sink_calls: self.sink_calls.load(Ordering::Relaxed),
            ops_succeeded: self.ops_succeeded.load(Ordering::Relaxed),
            ops_failed: self.ops_failed.load(Ordering::Relaxed),
            ops_retained: self.ops_retained.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ops_staged: u64,
    pub ops_overwritten: u64,
    pub flushes: u64,
    pub auto_flushes: u64,
    pub sink_calls: u64,
    pub ops_succeeded: u64,
    pub ops_failed: u64,
    pub ops_retained: u64,
}
