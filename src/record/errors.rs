//! # Record Errors
//!
//! Error types for key and record construction.

use thiserror::Error;

/// Result type for key and record construction
pub type KeyResult<T> = Result<T, KeyError>;

/// Malformed logical key or record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A key needs at least one field
    #[error("Invalid key: a logical key needs at least one field")]
    Empty,

    /// Field value is not a key scalar (string, number, bytes)
    #[error("Invalid key: field '{field}' has unsupported type {found}")]
    UnsupportedType { field: String, found: &'static str },

    /// Bytes attribute is not valid base64
    #[error("Invalid key: field '{field}' has malformed bytes: {reason}")]
    InvalidBytes { field: String, reason: String },

    /// Field name appears more than once
    #[error("Invalid key: duplicate field '{0}'")]
    DuplicateField(String),

    /// Record or key does not carry a field the key schema requires
    #[error("Invalid key: missing key field '{0}'")]
    MissingField(String),

    /// Record payload is not an attribute map
    #[error("Invalid record: expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}
