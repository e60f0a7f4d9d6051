//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed writer events
//! - Per-writer counters
//! - Scope-based begin/complete logging for flushes
//!
//! Observability never changes writer behavior: logging failures are
//! swallowed and no background threads are started.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, WriterMetrics};
pub use scope::ObservationScope;

/// Log a writer event with fields, at WARN for failures and INFO otherwise
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a per-op event at TRACE
pub fn trace_event(event: Event, fields: &[(&str, &str)]) {
    Logger::trace(event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Verifies no panic
        log_event(Event::WriterOpen, &[("capacity", "25")]);
        log_event(Event::SinkUnreachable, &[("reason", "connection refused")]);
        trace_event(Event::OpStaged, &[("sequence", "0")]);
    }
}
