//! Remote sink subsystem
//!
//! The `RemoteSink` trait is the writer's only external collaborator.
//! Two in-process sinks stand in for the managed services:
//! - `TableSink`: keyed table, 25 requests per call
//! - `QueueSink`: message queue, 10 entries per call

mod errors;
mod queue;
mod table;
mod traits;

pub use errors::{SinkError, SinkResult};
pub use queue::{Message, QueueSink, DEFAULT_MAX_MESSAGE_BYTES, QUEUE_BATCH_MAX};
pub use table::{TableSink, TABLE_BATCH_MAX};
pub use traits::{RecordStatus, RemoteSink};
