//! In-process message queue sink
//!
//! Each put becomes one message whose body is the record's JSON. Like a
//! managed queue's batch send, one call carries at most 10 entries and
//! every accepted message gets an id and a body checksum. Queues have no
//! keyed delete, so delete ops fail per record.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::record::WriteOp;

use super::errors::SinkResult;
use super::traits::{RecordStatus, RemoteSink};

/// Batch-send entry limit of a queue.
pub const QUEUE_BATCH_MAX: usize = 10;

/// Default maximum message body size (256 KiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 256 * 1024;

/// A message accepted by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    /// Position of the message's entry within its send call
    pub entry_id: String,
    pub body: String,
    /// CRC32 of the body bytes
    pub body_checksum: u32,
}

/// In-memory FIFO queue.
#[derive(Debug)]
pub struct QueueSink {
    name: String,
    messages: VecDeque<Message>,
    max_batch_size: usize,
    max_message_bytes: usize,
    calls: usize,
}

impl QueueSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: VecDeque::new(),
            max_batch_size: QUEUE_BATCH_MAX,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            calls: 0,
        }
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    /// Messages currently in the queue, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Remove and return up to `max` messages, oldest first.
    pub fn receive(&mut self, max: usize) -> Vec<Message> {
        let count = max.min(self.messages.len());
        self.messages.drain(..count).collect()
    }

    /// Number of `submit_batch` calls received.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn send(&mut self, entry: usize, op: &WriteOp) -> RecordStatus {
        let record = match op {
            WriteOp::Put { item } => item,
            WriteOp::Delete { .. } => {
                return RecordStatus::failed("queue does not support delete")
            }
        };
        let body = match serde_json::to_string(record) {
            Ok(body) => body,
            Err(e) => return RecordStatus::failed(format!("unencodable body: {}", e)),
        };
        if body.len() > self.max_message_bytes {
            return RecordStatus::failed(format!(
                "message body of {} bytes exceeds {} bytes",
                body.len(),
                self.max_message_bytes
            ));
        }
        self.messages.push_back(Message {
            id: Uuid::new_v4(),
            entry_id: entry.to_string(),
            body_checksum: crc32fast::hash(body.as_bytes()),
            body,
        });
        RecordStatus::Succeeded
    }
}

impl RemoteSink for QueueSink {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn submit_batch(&mut self, ops: &[WriteOp]) -> SinkResult<Vec<RecordStatus>> {
        self.calls += 1;
        Ok(ops
            .iter()
            .enumerate()
            .map(|(entry, op)| self.send(entry, op))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LogicalKey, Record};
    use serde_json::json;

    fn message(body: &str, author: &str) -> WriteOp {
        WriteOp::put(Record::from_json(json!({"body": body, "author": author})).unwrap())
    }

    #[test]
    fn test_send_assigns_id_and_checksum() {
        let mut queue = QueueSink::new("test");
        let statuses = queue
            .submit_batch(&[message("hello test", "Daniel"), message("boto3", "Oscar Wilde")])
            .unwrap();

        assert_eq!(statuses, vec![RecordStatus::Succeeded, RecordStatus::Succeeded]);
        let sent: Vec<&Message> = queue.messages().collect();
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0].id, sent[1].id);
        assert_eq!(sent[1].entry_id, "1");
        assert_eq!(sent[0].body_checksum, crc32fast::hash(sent[0].body.as_bytes()));
    }

    #[test]
    fn test_delete_fails_per_record() {
        let mut queue = QueueSink::new("test");
        let key = LogicalKey::new([("id", "3")]).unwrap();
        let statuses = queue
            .submit_batch(&[WriteOp::delete(key), message("still sent", "Daniel")])
            .unwrap();

        assert!(statuses[0].is_failed());
        assert!(statuses[1].is_succeeded());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_oversized_body_fails() {
        let mut queue = QueueSink::new("test").with_max_message_bytes(16);
        let statuses = queue
            .submit_batch(&[message("a body well past sixteen bytes", "Daniel")])
            .unwrap();
        assert!(statuses[0].is_failed());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_receive_is_fifo() {
        let mut queue = QueueSink::new("test");
        queue
            .submit_batch(&[message("1", "a"), message("2", "b"), message("3", "c")])
            .unwrap();

        let received = queue.receive(2);
        assert_eq!(received.len(), 2);
        assert!(received[0].body.contains("\"1\""));
        assert_eq!(queue.len(), 1);
    }
}
