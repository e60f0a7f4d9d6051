//! Staging subsystem
//!
//! In-memory accumulation of writes prior to dispatch, with optional
//! overwrite by logical key.

mod buffer;
mod errors;

pub use buffer::{PreparedOp, StageOutcome, StagedOp, StagingBuffer};
pub use errors::{StagingError, StagingResult};
