//! # Staging Errors

use thiserror::Error;

use crate::record::KeyError;

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

/// Staging buffer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    /// Buffer is full and the op would add a new slot
    #[error("Capacity exceeded: staging buffer holds {capacity} entries; flush first")]
    CapacityExceeded { capacity: usize },

    /// Buffer capacity must be positive
    #[error("Staging capacity must be > 0")]
    ZeroCapacity,

    /// Op key could not be derived
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
}
