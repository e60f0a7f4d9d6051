//! Observable writer events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events of a batch writer's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Writer opened, buffer allocated
    WriterOpen,
    /// Writer closed, buffer released
    WriterClose,
    /// Writer dropped without close; final flush attempted
    WriterDropped,

    // Staging
    /// Op staged into a new slot
    OpStaged,
    /// Op replaced a staged op with the same key
    OpOverwritten,
    /// Op rejected because the buffer is full
    CapacityExceeded,

    // Flush
    /// One sink call completed
    SinkCall,
    /// Sink call returned a per-record failure
    RecordFailed,
    /// Sink could not be reached; flush aborted
    SinkUnreachable,
    /// Flush stopped at its deadline
    DeadlineExceeded,

    // Reporting
    /// Flush report delivered to a reporter
    ReportDelivered,
    /// Reporter failed to persist a report
    ReportFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::WriterOpen => "WRITER_OPEN",
            Event::WriterClose => "WRITER_CLOSE",
            Event::WriterDropped => "WRITER_DROPPED",

            Event::OpStaged => "OP_STAGED",
            Event::OpOverwritten => "OP_OVERWRITTEN",
            Event::CapacityExceeded => "CAPACITY_EXCEEDED",

            Event::SinkCall => "SINK_CALL",
            Event::RecordFailed => "RECORD_FAILED",
            Event::SinkUnreachable => "SINK_UNREACHABLE",
            Event::DeadlineExceeded => "DEADLINE_EXCEEDED",

            Event::ReportDelivered => "REPORT_DELIVERED",
            Event::ReportFailed => "REPORT_FAILED",
        }
    }

    /// Returns true if this event indicates a failed operation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::SinkUnreachable | Event::DeadlineExceeded | Event::ReportFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
