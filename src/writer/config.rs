//! Writer configuration
//!
//! Exactly three options:
//! - `capacity`: maximum staged entries (> 0, default 25)
//! - `dedup_keys`: ordered key field names enabling keyed overwrite
//! - `auto_flush`: flush at capacity instead of rejecting (default true)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::record::KeySchema;

use super::errors::{WriterError, WriterResult};

/// Batch writer options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Maximum number of staged entries
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Key fields for overwrite-by-key de-duplication (None disables it)
    #[serde(default)]
    pub dedup_keys: Option<Vec<String>>,

    /// Flush automatically when an op would overflow the buffer
    #[serde(default = "default_auto_flush")]
    pub auto_flush: bool,
}

fn default_capacity() -> usize {
    25
}

fn default_auto_flush() -> bool {
    true
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            dedup_keys: None,
            auto_flush: default_auto_flush(),
        }
    }
}

impl WriterConfig {
    /// Config with the given capacity and defaults otherwise.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Enable overwrite by the given key fields.
    pub fn dedup_by<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.dedup_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn auto_flush(mut self, enabled: bool) -> Self {
        self.auto_flush = enabled;
        self
    }

    /// Validate and return the de-dup key schema, if any.
    pub fn validate(&self) -> WriterResult<Option<KeySchema>> {
        if self.capacity == 0 {
            return Err(WriterError::InvalidConfig("capacity must be > 0".into()));
        }
        self.dedup_keys
            .as_ref()
            .map(|keys| {
                KeySchema::new(keys.iter().cloned())
                    .map_err(|e| WriterError::InvalidConfig(format!("dedup_keys: {}", e)))
            })
            .transpose()
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(content: &str) -> WriterResult<Self> {
        let config: WriterConfig = serde_json::from_str(content)
            .map_err(|e| WriterError::InvalidConfig(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> WriterResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WriterError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}
