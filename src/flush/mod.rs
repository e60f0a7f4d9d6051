//! Flush policy subsystem
//!
//! Two triggers cut batches: the staging capacity (before an op that would
//! overflow) and the explicit/close flush. Every drain is split into sink
//! calls no larger than the sink's declared batch limit.

mod policy;

pub use policy::{ChunkPlan, FlushPolicy, FlushTrigger, StageDecision};
