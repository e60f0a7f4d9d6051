//! Scoped writer use
//!
//! `with_writer` opens a writer, runs a body against it and always closes
//! it afterwards, on success or failure of the body. Errors from the body
//! and from the final flush are both surfaced; neither hides the other.

use thiserror::Error;

use crate::flush::FlushTrigger;
use crate::sink::RemoteSink;

use super::config::WriterConfig;
use super::errors::WriterError;
use super::reporter::{LogReporter, ResultReporter};
use super::result::FlushReport;
use super::writer::BatchWriter;

/// Failure of a scoped writer use.
#[derive(Debug, Error)]
pub enum ScopeError<E> {
    /// The writer could not be opened; the body never ran
    #[error("Failed to open writer: {0}")]
    Open(#[source] WriterError),

    /// The body failed; the close succeeded
    #[error("{0}")]
    Body(#[source] E),

    /// The body succeeded; the close failed
    #[error("{0}")]
    Close(#[source] WriterError),

    /// Both the body and the close failed
    #[error("{body} (and close failed: {close})")]
    Both {
        #[source]
        body: E,
        close: WriterError,
    },
}

impl<E> ScopeError<E> {
    /// Body error, if the body failed.
    pub fn body(&self) -> Option<&E> {
        match self {
            ScopeError::Body(body) | ScopeError::Both { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Close error, if the final flush failed.
    pub fn close(&self) -> Option<&WriterError> {
        match self {
            ScopeError::Close(close) | ScopeError::Both { close, .. } => Some(close),
            _ => None,
        }
    }
}

/// Run `body` against a fresh writer, then close it.
///
/// Returns the body's value and the close report.
pub fn with_writer<S, T, E, F>(
    sink: S,
    config: WriterConfig,
    body: F,
) -> Result<(T, FlushReport), ScopeError<E>>
where
    S: RemoteSink,
    F: FnOnce(&mut BatchWriter<S>) -> Result<T, E>,
{
    with_writer_and_reporter(sink, config, Box::new(LogReporter::new()), body)
}

/// As `with_writer`, with a custom reporter for unattended flushes.
pub fn with_writer_and_reporter<S, T, E, F>(
    sink: S,
    config: WriterConfig,
    reporter: Box<dyn ResultReporter>,
    body: F,
) -> Result<(T, FlushReport), ScopeError<E>>
where
    S: RemoteSink,
    F: FnOnce(&mut BatchWriter<S>) -> Result<T, E>,
{
    let mut writer =
        BatchWriter::open_with_reporter(sink, config, reporter).map_err(ScopeError::Open)?;
    let outcome = body(&mut writer);

    let closed = if writer.is_closed() {
        // The body closed it already
        Ok(FlushReport::new(writer.id(), FlushTrigger::Close))
    } else {
        writer.close()
    };

    match (outcome, closed) {
        (Ok(value), Ok(report)) => Ok((value, report)),
        (Err(body), Ok(_)) => Err(ScopeError::Body(body)),
        (Ok(_), Err(close)) => Err(ScopeError::Close(close)),
        (Err(body), Err(close)) => Err(ScopeError::Both { body, close }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::fmt;
    use crate::record::{KeySchema, Record};
    use crate::sink::TableSink;
    use serde_json::json;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    fn users() -> TableSink {
        TableSink::new("users", KeySchema::new(["username"]).unwrap())
    }

    #[test]
    fn test_scope_closes_after_success() {
        let mut table = users();
        let (count, report) = with_writer(&mut table, WriterConfig::default(), |w| {
            w.put(Record::from_json(json!({"username": "a"})).unwrap())?;
            Ok::<_, WriterError>(w.len())
        })
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(table.item_count(), 1);
    }

    #[test]
    fn test_scope_closes_after_body_failure() {
        let mut table = users();
        let err = with_writer(&mut table, WriterConfig::default(), |w| {
            w.put(Record::from_json(json!({"username": "kept"})).unwrap())
                .map_err(|_| Boom)?;
            Err::<(), _>(Boom)
        })
        .unwrap_err();

        assert!(matches!(err, ScopeError::Body(Boom)));
        assert!(err.close().is_none());
        assert_eq!(table.item_count(), 1);
    }

    #[test]
    fn test_scope_body_may_close() {
        let (_, report) = with_writer(users(), WriterConfig::default(), |w| w.close())
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_both_errors_display_and_source() {
        let err: ScopeError<Boom> = ScopeError::Both {
            body: Boom,
            close: WriterError::WriterClosed,
        };
        assert_eq!(err.to_string(), "boom (and close failed: Writer is closed)");
        assert_eq!(err.source().map(|e| e.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn test_scope_open_failure() {
        let err = with_writer(users(), WriterConfig::with_capacity(0), |_| Ok::<_, Boom>(()))
            .unwrap_err();
        assert!(matches!(err, ScopeError::Open(_)));
    }
}
