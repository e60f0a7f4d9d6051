//! batchwrite - A bounded, keyed-overwrite batch writer for remote sinks
//!
//! Writes are staged in memory, optionally collapsed by logical key, and
//! dispatched to a `RemoteSink` in chunks no larger than the sink accepts.
//! Every staged op gets exactly one result; unreachable sinks and missed
//! deadlines leave unattempted ops staged.

pub mod cli;
pub mod flush;
pub mod observability;
pub mod record;
pub mod sink;
pub mod staging;
pub mod writer;

pub use record::{KeySchema, LogicalKey, Record, WriteOp};
pub use sink::{RecordStatus, RemoteSink, SinkError};
pub use writer::{with_writer, BatchWriter, FlushReport, WriterConfig, WriterError};
