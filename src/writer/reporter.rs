//! Result reporters
//!
//! Close-, drop- and capacity-triggered flushes have no caller waiting for
//! their results, so the writer hands those reports to a reporter:
//! - `LogReporter`: one structured log line per report, one per failed op
//! - `MemoryReporter`: keeps reports in memory
//! - `FileReporter`: append-only JSON lines, flushed after each report

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::observability::{log_event, Event, Logger};

use super::result::FlushReport;

/// Destination for flush reports nobody is waiting on.
pub trait ResultReporter: Send + Sync {
    /// Deliver a report. Must be synchronous.
    fn report(&self, report: &FlushReport) -> io::Result<()>;
}

/// Reports through the structured logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ResultReporter for LogReporter {
    fn report(&self, report: &FlushReport) -> io::Result<()> {
        let writer_id = report.writer_id.to_string();
        for result in report.results.iter().filter(|r| r.status.is_failed()) {
            let sequence = result.sequence.to_string();
            let status = result.status.to_string();
            Logger::warn(
                Event::RecordFailed.as_str(),
                &[
                    ("writer_id", &writer_id),
                    ("sequence", &sequence),
                    ("kind", result.kind.as_str()),
                    ("status", &status),
                ],
            );
        }

        let succeeded = report.succeeded().to_string();
        let failed = report.failed().to_string();
        let skipped = report.skipped().to_string();
        log_event(
            Event::ReportDelivered,
            &[
                ("writer_id", &writer_id),
                ("trigger", report.trigger.as_str()),
                ("succeeded", &succeeded),
                ("failed", &failed),
                ("skipped", &skipped),
            ],
        );
        Ok(())
    }
}

/// Keeps every report; clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    reports: Arc<Mutex<Vec<FlushReport>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports received so far.
    pub fn reports(&self) -> Vec<FlushReport> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FlushReport>> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResultReporter for MemoryReporter {
    fn report(&self, report: &FlushReport) -> io::Result<()> {
        self.lock().push(report.clone());
        Ok(())
    }
}

/// Appends one JSON line per report: `{"ts": <rfc3339>, "report": {...}}`.
pub struct FileReporter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileReporter {
    /// Open or create a report file.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultReporter for FileReporter {
    fn report(&self, report: &FlushReport) -> io::Result<()> {
        let line = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "report": report,
        });
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_writer(&mut *writer, &line)?;
        writeln!(writer)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::FlushTrigger;
    use crate::record::{Record, WriteOp};
    use crate::sink::RecordStatus;
    use crate::staging::StagedOp;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn report(trigger: FlushTrigger) -> FlushReport {
        let mut report = FlushReport::new(Uuid::new_v4(), trigger);
        let staged = StagedOp {
            sequence: 0,
            key: None,
            op: WriteOp::put(Record::from_json(json!({"username": "user_0"})).unwrap()),
        };
        report.push(&staged, RecordStatus::failed("duplicate key in batch"));
        report
    }

    #[test]
    fn test_log_reporter_never_fails() {
        assert!(LogReporter::new().report(&report(FlushTrigger::Close)).is_ok());
    }

    #[test]
    fn test_memory_reporter_shares_storage() {
        let reporter = MemoryReporter::new();
        let handle = reporter.clone();

        reporter.report(&report(FlushTrigger::Capacity)).unwrap();
        reporter.report(&report(FlushTrigger::Close)).unwrap();

        assert_eq!(handle.len(), 2);
        assert_eq!(handle.reports()[1].trigger, FlushTrigger::Close);
    }

    #[test]
    fn test_file_reporter_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.jsonl");

        let reporter = FileReporter::open(&path).unwrap();
        reporter.report(&report(FlushTrigger::Capacity)).unwrap();
        reporter.report(&report(FlushTrigger::Close)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["report"]["trigger"], "close");
        assert_eq!(second["report"]["results"][0]["status"], "failed");
        assert!(second["ts"].as_str().unwrap().contains('T'));
    }
}
