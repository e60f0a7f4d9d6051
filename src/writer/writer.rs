//! Batch writer
//!
//! Ties the staging buffer, flush policy and remote sink together.
//!
//! # Lifecycle
//!
//! `Staging ⇄ Flushing`, then `Closing → Closed`. A closed writer rejects
//! put/delete/flush with `WriterClosed`.
//!
//! # Flush atomicity
//!
//! A flush dispatches a snapshot of the oldest entries chunk by chunk and
//! removes entries from the buffer only once their result is known. Ops in
//! chunks that were never sent, or whose call failed because the sink was
//! unreachable, stay staged for a retry.
//!
//! # Concurrency
//!
//! One owner per writer. All mutating calls take `&mut self`; callers that
//! want several producers put a mutex or a channel in front of one writer.
//! The sink call is the only blocking point.

use std::time::Instant;

use uuid::Uuid;

use crate::flush::{FlushPolicy, FlushTrigger, StageDecision};
use crate::observability::{
    log_event, trace_event, Event, Logger, MetricsSnapshot, ObservationScope, WriterMetrics,
};
use crate::record::{LogicalKey, Record, WriteOp};
use crate::sink::{RecordStatus, RemoteSink, SinkError};
use crate::staging::{StageOutcome, StagedOp, StagingBuffer};

use super::config::WriterConfig;
use super::errors::{WriterError, WriterResult};
use super::reporter::{LogReporter, ResultReporter};
use super::result::FlushReport;

/// Writer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting put/delete/flush/close
    Staging,
    /// Inside a flush
    Flushing,
    /// Final flush in progress
    Closing,
    /// Buffer released; everything is rejected
    Closed,
}

/// Why a flush stopped early.
enum Abort {
    Unreachable(String),
    Deadline,
}

/// Batched bulk writer over a remote sink.
pub struct BatchWriter<S: RemoteSink> {
    id: Uuid,
    sink: S,
    buffer: StagingBuffer,
    policy: FlushPolicy,
    state: WriterState,
    reporter: Box<dyn ResultReporter>,
    metrics: WriterMetrics,
}

impl<S: RemoteSink> BatchWriter<S> {
    /// Open a writer that reports unattended flushes to the log.
    pub fn open(sink: S, config: WriterConfig) -> WriterResult<Self> {
        Self::open_with_reporter(sink, config, Box::new(LogReporter::new()))
    }

    /// Open a writer with a custom reporter for unattended flushes.
    pub fn open_with_reporter(
        sink: S,
        config: WriterConfig,
        reporter: Box<dyn ResultReporter>,
    ) -> WriterResult<Self> {
        let schema = config.validate()?;
        let buffer = StagingBuffer::new(config.capacity, schema)?;
        let policy = FlushPolicy::new(config.capacity, config.auto_flush, sink.max_batch_size());
        let id = Uuid::new_v4();

        let id_str = id.to_string();
        let capacity = config.capacity.to_string();
        let batch_max = policy.sink_batch_max().to_string();
        let dedup = config
            .dedup_keys
            .as_ref()
            .map(|keys| keys.join(","))
            .unwrap_or_default();
        log_event(
            Event::WriterOpen,
            &[
                ("writer_id", &id_str),
                ("sink", sink.name()),
                ("capacity", &capacity),
                ("sink_batch_max", &batch_max),
                ("dedup_keys", &dedup),
                ("auto_flush", if config.auto_flush { "true" } else { "false" }),
            ],
        );

        Ok(Self {
            id,
            sink,
            buffer,
            policy,
            state: WriterState::Staging,
            reporter,
            metrics: WriterMetrics::new(),
        })
    }

    /// Stage a put.
    pub fn put(&mut self, record: Record) -> WriterResult<()> {
        self.submit(WriteOp::put(record))
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: LogicalKey) -> WriterResult<()> {
        self.submit(WriteOp::delete(key))
    }

    /// Stage an op, flushing first if it would overflow the buffer.
    ///
    /// With `auto_flush` off, an op that needs a new slot in a full buffer
    /// fails with `CapacityExceeded`. If the automatic flush fails, the op
    /// is not staged and the flush error is returned.
    pub fn submit(&mut self, op: WriteOp) -> WriterResult<()> {
        self.ensure_open()?;
        let prepared = self.buffer.prepare(op)?;

        match self
            .policy
            .before_stage(self.buffer.len(), self.buffer.would_grow(&prepared))
        {
            StageDecision::Accept => {}
            StageDecision::FlushFirst(count) => {
                self.flush_front(FlushTrigger::Capacity, count, None)?;
            }
            StageDecision::Reject => {
                let capacity = self.policy.capacity().to_string();
                log_event(Event::CapacityExceeded, &[("capacity", &capacity)]);
                return Err(WriterError::CapacityExceeded {
                    capacity: self.policy.capacity(),
                });
            }
        }

        let outcome = self.buffer.stage(prepared)?;
        let sequence = outcome.sequence().to_string();
        match outcome {
            StageOutcome::Appended { .. } => {
                self.metrics.increment_staged();
                trace_event(Event::OpStaged, &[("sequence", &sequence)]);
            }
            StageOutcome::Overwrote { .. } => {
                self.metrics.increment_overwritten();
                trace_event(Event::OpOverwritten, &[("sequence", &sequence)]);
            }
        }
        Ok(())
    }

    /// Flush everything staged.
    ///
    /// Per-record failures are returned in the report. Fails only when the
    /// sink is unreachable (`SinkUnreachable`) or a sink call times out
    /// (`DeadlineExceeded`); the error carries the report.
    pub fn flush(&mut self) -> WriterResult<FlushReport> {
        self.ensure_open()?;
        self.flush_front(FlushTrigger::Explicit, self.buffer.len(), None)
    }

    /// Flush everything staged, starting no sink call after `deadline`.
    ///
    /// Chunks not started in time are reported `Skipped` and stay staged.
    pub fn flush_until(&mut self, deadline: Instant) -> WriterResult<FlushReport> {
        self.ensure_open()?;
        self.flush_front(FlushTrigger::Explicit, self.buffer.len(), Some(deadline))
    }

    /// Final flush, then release the buffer.
    ///
    /// The report goes to the reporter and is returned. If the final flush
    /// fails, the ops that could not be written are returned in
    /// `CloseFailed::unflushed`. The writer is closed either way.
    pub fn close(&mut self) -> WriterResult<FlushReport> {
        self.ensure_open()?;
        self.finish(FlushTrigger::Close)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    /// Number of staged entries.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.policy.capacity()
    }

    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    /// Staged entries, oldest first.
    pub fn staged(&self) -> impl Iterator<Item = &StagedOp> {
        self.buffer.iter()
    }

    /// Staged entry for a key (only with de-dup keys configured).
    pub fn staged_for(&self, key: &LogicalKey) -> Option<&StagedOp> {
        self.buffer.get(key)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn ensure_open(&self) -> WriterResult<()> {
        match self.state {
            WriterState::Closing | WriterState::Closed => Err(WriterError::WriterClosed),
            WriterState::Staging | WriterState::Flushing => Ok(()),
        }
    }

    /// Final flush for close and drop.
    fn finish(&mut self, trigger: FlushTrigger) -> WriterResult<FlushReport> {
        self.state = WriterState::Closing;
        let outcome = match self.flush_front(trigger, self.buffer.len(), None) {
            Ok(report) => Ok(report),
            Err(err) => {
                let unflushed: Vec<WriteOp> = self
                    .buffer
                    .drain(self.buffer.len())
                    .into_iter()
                    .map(|staged| staged.op)
                    .collect();
                Err(WriterError::CloseFailed {
                    source: Box::new(err),
                    unflushed,
                })
            }
        };
        self.state = WriterState::Closed;

        let id = self.id.to_string();
        let metrics = self.metrics.snapshot();
        let succeeded = metrics.ops_succeeded.to_string();
        let failed = metrics.ops_failed.to_string();
        let flushes = metrics.flushes.to_string();
        log_event(
            Event::WriterClose,
            &[
                ("writer_id", &id),
                ("trigger", trigger.as_str()),
                ("flushes", &flushes),
                ("succeeded", &succeeded),
                ("failed", &failed),
            ],
        );
        outcome
    }

    /// Dispatch the oldest `count` entries in sink-sized chunks.
    ///
    /// Reports of unattended triggers go to the reporter, whether the flush
    /// succeeded or not. Nothing is reported when nothing was staged.
    fn flush_front(
        &mut self,
        trigger: FlushTrigger,
        count: usize,
        deadline: Option<Instant>,
    ) -> WriterResult<FlushReport> {
        let total = count.min(self.buffer.len());
        let mut report = FlushReport::new(self.id, trigger);
        if total == 0 {
            return Ok(report);
        }

        let resume = self.state;
        self.state = WriterState::Flushing;

        let id = self.id.to_string();
        let ops_field = total.to_string();
        let scope = ObservationScope::with_fields(
            "FLUSH",
            &[
                ("writer_id", &id),
                ("trigger", trigger.as_str()),
                ("ops", &ops_field),
            ],
        );

        let pending: Vec<StagedOp> = self.buffer.front(total).cloned().collect();
        // Leading entries whose results are final and may leave the buffer
        let mut settled = 0;
        let mut abort: Option<Abort> = None;

        for range in self.policy.chunks(total) {
            let chunk = &pending[range.clone()];

            if abort.is_none() && deadline.map_or(false, |d| Instant::now() >= d) {
                abort = Some(Abort::Deadline);
            }
            if abort.is_some() {
                report.push_all(chunk, &RecordStatus::Skipped);
                continue;
            }

            let ops: Vec<WriteOp> = chunk.iter().map(|staged| staged.op.clone()).collect();
            self.metrics.increment_sink_calls();
            report.sink_calls += 1;

            match self.sink.submit_batch(&ops) {
                Ok(statuses) if statuses.len() == ops.len() => {
                    for (staged, status) in chunk.iter().zip(statuses) {
                        report.push(staged, status);
                    }
                    settled = range.end;
                }
                Ok(statuses) => {
                    let reason = format!(
                        "sink returned {} statuses for {} ops",
                        statuses.len(),
                        ops.len()
                    );
                    report.push_all(chunk, &RecordStatus::Failed(reason));
                    settled = range.end;
                }
                Err(SinkError::Timeout) => {
                    report.push_all(chunk, &RecordStatus::failed("timeout"));
                    settled = range.end;
                    abort = Some(Abort::Deadline);
                }
                Err(SinkError::Unreachable(reason)) => {
                    let status = RecordStatus::Failed(format!("sink unreachable: {}", reason));
                    report.push_all(chunk, &status);
                    abort = Some(Abort::Unreachable(reason));
                }
            }

            let size = chunk.len().to_string();
            Logger::trace(
                Event::SinkCall.as_str(),
                &[("writer_id", &id), ("sink", self.sink.name()), ("ops", &size)],
            );
        }

        self.buffer.drain(settled);
        self.state = resume;

        // Results line up with `pending`; only the settled prefix is final
        let settled_failed = report.results[..settled]
            .iter()
            .filter(|r| r.status.is_failed())
            .count();
        self.metrics
            .increment_flushes(trigger == FlushTrigger::Capacity);
        self.metrics.add_outcomes(
            report.succeeded() as u64,
            settled_failed as u64,
            (total - settled) as u64,
        );

        let succeeded = report.succeeded().to_string();
        let failed = report.failed().to_string();
        let skipped = report.skipped().to_string();
        let outcome = match abort {
            None => {
                scope.complete_with_fields(&[
                    ("succeeded", &succeeded),
                    ("failed", &failed),
                    ("sink_calls", &report.sink_calls.to_string()),
                ]);
                Ok(report)
            }
            Some(Abort::Unreachable(reason)) => {
                log_event(
                    Event::SinkUnreachable,
                    &[("writer_id", &id), ("reason", &reason), ("skipped", &skipped)],
                );
                scope.fail(&reason);
                Err(WriterError::SinkUnreachable { reason, report })
            }
            Some(Abort::Deadline) => {
                log_event(
                    Event::DeadlineExceeded,
                    &[("writer_id", &id), ("skipped", &skipped)],
                );
                scope.fail("deadline exceeded");
                Err(WriterError::DeadlineExceeded { report })
            }
        };

        if trigger.is_unattended() {
            let delivered = match &outcome {
                Ok(report) => Some(report),
                Err(err) => err.report(),
            };
            if let Some(report) = delivered {
                self.deliver(report);
            }
        }
        outcome
    }

    /// Hand an unattended flush report to the reporter.
    fn deliver(&self, report: &FlushReport) {
        if let Err(e) = self.reporter.report(report) {
            let id = self.id.to_string();
            log_event(
                Event::ReportFailed,
                &[("writer_id", &id), ("error", &e.to_string())],
            );
        }
    }
}

impl<S: RemoteSink> Drop for BatchWriter<S> {
    fn drop(&mut self) {
        if self.state == WriterState::Closed {
            return;
        }
        if self.buffer.is_empty() {
            self.state = WriterState::Closed;
            return;
        }
        let id = self.id.to_string();
        let staged = self.buffer.len().to_string();
        log_event(
            Event::WriterDropped,
            &[("writer_id", &id), ("staged", &staged)],
        );
        if let Err(e) = self.finish(FlushTrigger::Drop) {
            Logger::error(
                "WRITER_DROP_FLUSH_FAILED",
                &[("writer_id", &id), ("error", &e.to_string())],
            );
        }
    }
}

impl<S: RemoteSink> std::fmt::Debug for BatchWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("id", &self.id)
            .field("sink", &self.sink.name())
            .field("state", &self.state)
            .field("staged", &self.buffer.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::KeySchema;
    use crate::sink::{SinkResult, TableSink};
    use crate::writer::reporter::MemoryReporter;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        Record::from_json(value).unwrap()
    }

    fn users() -> TableSink {
        TableSink::new("users", KeySchema::new(["username"]).unwrap())
    }

    /// Fails every call as unreachable.
    struct DownSink;

    impl RemoteSink for DownSink {
        fn max_batch_size(&self) -> usize {
            25
        }

        fn submit_batch(&mut self, _ops: &[WriteOp]) -> SinkResult<Vec<RecordStatus>> {
            Err(SinkError::Unreachable("connection refused".into()))
        }
    }

    #[test]
    fn test_explicit_flush_writes_and_empties() {
        let mut table = users();
        let mut writer = BatchWriter::open(&mut table, WriterConfig::default()).unwrap();
        writer.put(record(json!({"username": "janedoe"}))).unwrap();
        writer.put(record(json!({"username": "johndoe"}))).unwrap();

        let report = writer.flush().unwrap();
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.sink_calls, 1);
        assert!(writer.is_empty());
        assert_eq!(writer.state(), WriterState::Staging);

        writer.close().unwrap();
        drop(writer);
        assert_eq!(table.item_count(), 2);
    }

    #[test]
    fn test_empty_flush_makes_no_call() {
        let mut writer = BatchWriter::open(users(), WriterConfig::default()).unwrap();
        let report = writer.flush().unwrap();
        assert!(report.is_empty());
        assert_eq!(writer.sink().calls(), 0);
    }

    #[test]
    fn test_capacity_reject_without_auto_flush() {
        let config = WriterConfig::with_capacity(2).auto_flush(false);
        let mut writer = BatchWriter::open(users(), config).unwrap();
        writer.put(record(json!({"username": "a"}))).unwrap();
        writer.put(record(json!({"username": "b"}))).unwrap();

        let err = writer.put(record(json!({"username": "c"}))).unwrap_err();
        assert!(matches!(err, WriterError::CapacityExceeded { capacity: 2 }));
        assert_eq!(writer.len(), 2);
        assert_eq!(writer.sink().calls(), 0);
    }

    #[test]
    fn test_capacity_flush_goes_to_reporter() {
        let reporter = MemoryReporter::new();
        let mut writer = BatchWriter::open_with_reporter(
            users(),
            WriterConfig::with_capacity(2),
            Box::new(reporter.clone()),
        )
        .unwrap();
        for name in ["a", "b", "c"] {
            writer.put(record(json!({"username": name}))).unwrap();
        }

        assert_eq!(writer.len(), 1);
        assert_eq!(reporter.len(), 1);
        assert_eq!(reporter.reports()[0].trigger, FlushTrigger::Capacity);
        assert_eq!(writer.metrics().auto_flushes, 1);

        // Explicit flush results are returned, not reported
        writer.flush().unwrap();
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let config = WriterConfig::default().dedup_by(["username"]);
        let mut writer = BatchWriter::open(users(), config).unwrap();
        writer.put(record(json!({"username": "a", "v": 1}))).unwrap();
        writer.put(record(json!({"username": "b", "v": 1}))).unwrap();
        writer.put(record(json!({"username": "a", "v": 2}))).unwrap();

        let staged: Vec<u64> = writer.staged().map(|s| s.sequence).collect();
        assert_eq!(staged, vec![0, 1]);
        let key = LogicalKey::new([("username", "a")]).unwrap();
        let slot = writer.staged_for(&key).unwrap();
        assert_eq!(slot.op.record().unwrap().get("v"), Some(&json!(2)));
        assert_eq!(writer.metrics().ops_overwritten, 1);
    }

    #[test]
    fn test_unreachable_keeps_ops_staged() {
        let mut writer = BatchWriter::open(DownSink, WriterConfig::default()).unwrap();
        writer.put(record(json!({"id": 1}))).unwrap();

        let err = writer.flush().unwrap_err();
        let report = err.report().unwrap();
        assert!(report.results[0].status.is_failed());
        assert_eq!(writer.len(), 1);
        assert_eq!(err.code(), "BATCH_SINK_UNREACHABLE");
    }

    #[test]
    fn test_closed_writer_rejects_everything() {
        let mut writer = BatchWriter::open(users(), WriterConfig::default()).unwrap();
        writer.close().unwrap();

        assert!(writer.is_closed());
        assert!(matches!(
            writer.put(record(json!({"username": "a"}))),
            Err(WriterError::WriterClosed)
        ));
        assert!(matches!(
            writer.delete(LogicalKey::new([("username", "a")]).unwrap()),
            Err(WriterError::WriterClosed)
        ));
        assert!(matches!(writer.flush(), Err(WriterError::WriterClosed)));
        assert!(matches!(writer.close(), Err(WriterError::WriterClosed)));
    }

    #[test]
    fn test_close_failure_returns_unflushed_ops() {
        let mut writer = BatchWriter::open(DownSink, WriterConfig::default()).unwrap();
        writer.put(record(json!({"id": 1}))).unwrap();
        writer.put(record(json!({"id": 2}))).unwrap();

        match writer.close() {
            Err(WriterError::CloseFailed { unflushed, source }) => {
                assert_eq!(unflushed.len(), 2);
                assert_eq!(source.code(), "BATCH_SINK_UNREACHABLE");
            }
            other => panic!("unexpected close outcome: {:?}", other),
        }
        assert!(writer.is_closed());
        assert!(writer.is_empty());
    }

    #[test]
    fn test_drop_flushes_staged_ops() {
        let mut table = users();
        {
            let mut writer = BatchWriter::open(&mut table, WriterConfig::default()).unwrap();
            writer.put(record(json!({"username": "dropped"}))).unwrap();
        }
        let key = LogicalKey::new([("username", "dropped")]).unwrap();
        assert!(table.get_item(&key).is_some());
    }

    #[test]
    fn test_empty_drop_reports_nothing() {
        let reporter = MemoryReporter::new();
        {
            let _writer = BatchWriter::open_with_reporter(
                users(),
                WriterConfig::default(),
                Box::new(reporter.clone()),
            )
            .unwrap();
        }
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_unreachable_ops_count_as_retained_not_failed() {
        let mut writer = BatchWriter::open(DownSink, WriterConfig::default()).unwrap();
        writer.put(record(json!({"id": 1}))).unwrap();
        writer.put(record(json!({"id": 2}))).unwrap();
        assert!(writer.flush().is_err());

        let metrics = writer.metrics();
        assert_eq!(metrics.ops_failed, 0);
        assert_eq!(metrics.ops_retained, 2);
    }

    #[test]
    fn test_invalid_config_rejected_at_open() {
        let err = BatchWriter::open(users(), WriterConfig::with_capacity(0)).unwrap_err();
        assert_eq!(err.code(), "BATCH_INVALID_CONFIG");
    }
}
