//! Record and key model
//!
//! Defines what a write request is:
//! - `Record`: attribute map payload
//! - `KeyValue`: key scalar (string, number, bytes)
//! - `LogicalKey`: ordered tuple of named scalars identifying a slot
//! - `KeySchema`: the field names a logical key is derived from
//! - `WriteOp`: put or delete

mod errors;
mod key;
mod op;
mod value;

pub use errors::{KeyError, KeyResult};
pub use key::{KeyField, KeySchema, LogicalKey};
pub use op::{OpKind, Record, WriteOp};
pub use value::KeyValue;
