//! Batch writer subsystem
//!
//! The public face of the crate:
//! - `BatchWriter`: stage puts/deletes, flush in sink-sized chunks, close
//! - `WriterConfig`: capacity, de-dup keys, auto-flush
//! - `FlushReport`: per-op outcome of a flush, in staging order
//! - `ResultReporter`: where unattended flush reports go
//! - `with_writer`: open, use, always close

mod config;
mod errors;
mod reporter;
mod result;
mod scope;
#[allow(clippy::module_inception)]
mod writer;

pub use config::WriterConfig;
pub use errors::{WriterError, WriterResult};
pub use reporter::{FileReporter, LogReporter, MemoryReporter, ResultReporter};
pub use result::{BatchResult, FlushReport};
pub use scope::{with_writer, with_writer_and_reporter, ScopeError};
pub use writer::{BatchWriter, WriterState};
