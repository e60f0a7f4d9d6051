//! Staging buffer
//!
//! Ordered in-memory accumulation of write ops prior to dispatch.
//!
//! - With a key schema, at most one op per logical key is staged. A later
//!   op for a staged key replaces the earlier one in place: the value is
//!   the latest, the position and sequence number are the first.
//! - Without a key schema, ops are appended unconditionally.
//! - Entries leave only from the front, so staged sequence numbers are
//!   always contiguous from the front entry.

use std::collections::{HashMap, VecDeque};

use crate::record::{KeySchema, LogicalKey, Record, WriteOp};

use super::errors::{StagingError, StagingResult};

/// An op held in the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedOp {
    /// Staging sequence number, assigned at first insertion of the slot.
    pub sequence: u64,
    /// Logical key under the buffer's schema (None without a schema).
    pub key: Option<LogicalKey>,
    pub op: WriteOp,
}

/// An op whose key has been derived and that is ready to stage.
#[derive(Debug, Clone)]
pub struct PreparedOp {
    key: Option<LogicalKey>,
    op: WriteOp,
}

/// What staging an op did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// A new slot was added
    Appended { sequence: u64 },
    /// An existing slot's op was replaced
    Overwrote { sequence: u64 },
}

impl StageOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            StageOutcome::Appended { sequence } | StageOutcome::Overwrote { sequence } => {
                *sequence
            }
        }
    }
}

/// Bounded, ordered staging buffer with optional keyed overwrite.
#[derive(Debug)]
pub struct StagingBuffer {
    capacity: usize,
    schema: Option<KeySchema>,
    entries: VecDeque<StagedOp>,
    /// Staged keys and their sequence numbers (only with a schema).
    slots: HashMap<LogicalKey, u64>,
    next_sequence: u64,
}

impl StagingBuffer {
    /// Create a buffer. `capacity` must be > 0.
    pub fn new(capacity: usize, schema: Option<KeySchema>) -> StagingResult<Self> {
        if capacity == 0 {
            return Err(StagingError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            schema,
            entries: VecDeque::with_capacity(capacity),
            slots: HashMap::new(),
            next_sequence: 0,
        })
    }

    /// Derive the op's key under the buffer's schema.
    pub fn prepare(&self, op: WriteOp) -> StagingResult<PreparedOp> {
        let key = match &self.schema {
            Some(schema) => Some(op.key_for(schema)?),
            None => None,
        };
        Ok(PreparedOp { key, op })
    }

    /// Whether staging `prepared` would add a new slot.
    pub fn would_grow(&self, prepared: &PreparedOp) -> bool {
        match &prepared.key {
            Some(key) => !self.slots.contains_key(key),
            None => true,
        }
    }

    /// Stage a prepared op with replace-or-append semantics.
    ///
    /// Fails with `CapacityExceeded` when the buffer is full and the op
    /// would add a new slot. Overwrites are always accepted.
    pub fn stage(&mut self, prepared: PreparedOp) -> StagingResult<StageOutcome> {
        if let Some(key) = &prepared.key {
            if let Some(&sequence) = self.slots.get(key) {
                let index = self.index_of(sequence);
                self.entries[index].op = prepared.op;
                return Ok(StageOutcome::Overwrote { sequence });
            }
        }

        if self.is_full() {
            return Err(StagingError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        if let Some(key) = &prepared.key {
            self.slots.insert(key.clone(), sequence);
        }
        self.entries.push_back(StagedOp {
            sequence,
            key: prepared.key,
            op: prepared.op,
        });
        Ok(StageOutcome::Appended { sequence })
    }

    /// Stage a put.
    pub fn put(&mut self, record: Record) -> StagingResult<StageOutcome> {
        let prepared = self.prepare(WriteOp::put(record))?;
        self.stage(prepared)
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: LogicalKey) -> StagingResult<StageOutcome> {
        let prepared = self.prepare(WriteOp::delete(key))?;
        self.stage(prepared)
    }

    /// Remove and return up to `max` entries, oldest first.
    pub fn drain(&mut self, max: usize) -> Vec<StagedOp> {
        let count = max.min(self.entries.len());
        let drained: Vec<StagedOp> = self.entries.drain(..count).collect();
        for staged in &drained {
            if let Some(key) = &staged.key {
                self.slots.remove(key);
            }
        }
        drained
    }

    /// The oldest `max` entries, without removing them.
    pub fn front(&self, max: usize) -> impl Iterator<Item = &StagedOp> {
        self.entries.iter().take(max)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedOp> {
        self.entries.iter()
    }

    /// Staged entry for a key (only with a schema).
    pub fn get(&self, key: &LogicalKey) -> Option<&StagedOp> {
        let sequence = *self.slots.get(key)?;
        self.entries.get(self.index_of(sequence))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index_of(&self, sequence: u64) -> usize {
        let head = self.entries.front().map_or(sequence, |e| e.sequence);
        (sequence - head) as usize
    }
}
