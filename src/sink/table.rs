//! In-process key-value table sink
//!
//! A table with a partition key and optional sort key. Puts replace the
//! item stored at the item's key, deletes remove it. Like a managed table's
//! batch write, one call accepts at most 25 requests and may not address
//! the same key twice; such duplicates are failed per record.

use std::collections::{HashMap, HashSet};

use crate::record::{KeySchema, KeyValue, LogicalKey, Record, WriteOp};

use super::errors::SinkResult;
use super::traits::{RecordStatus, RemoteSink};

/// Batch-write request limit of a table.
pub const TABLE_BATCH_MAX: usize = 25;

/// In-memory keyed table.
#[derive(Debug)]
pub struct TableSink {
    name: String,
    key_schema: KeySchema,
    items: HashMap<LogicalKey, Record>,
    max_batch_size: usize,
    calls: usize,
}

impl TableSink {
    /// Create an empty table keyed by `key_schema` (partition key first).
    pub fn new(name: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            name: name.into(),
            key_schema,
            items: HashMap::new(),
            max_batch_size: TABLE_BATCH_MAX,
            calls: 0,
        }
    }

    /// Override the per-call request limit.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Item stored at `key`. The key may list its fields in any order.
    pub fn get_item(&self, key: &LogicalKey) -> Option<&Record> {
        let key = key.project(&self.key_schema).ok()?;
        self.items.get(&key)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items whose attribute `field` equals `value`, ordered by key.
    pub fn query(&self, field: &str, value: &KeyValue) -> Vec<&Record> {
        let mut hits: Vec<(String, &Record)> = self
            .items
            .iter()
            .filter(|(_, record)| record.get(field).map_or(false, |v| value.matches_json(v)))
            .map(|(key, record)| (key.to_string(), record))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits.into_iter().map(|(_, record)| record).collect()
    }

    /// Number of `submit_batch` calls received.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl RemoteSink for TableSink {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn submit_batch(&mut self, ops: &[WriteOp]) -> SinkResult<Vec<RecordStatus>> {
        self.calls += 1;

        let mut seen = HashSet::with_capacity(ops.len());
        let mut statuses = Vec::with_capacity(ops.len());

        for op in ops {
            let key = match op.key_for(&self.key_schema) {
                Ok(key) => key,
                Err(e) => {
                    statuses.push(RecordStatus::failed(e.to_string()));
                    continue;
                }
            };
            if !seen.insert(key.clone()) {
                statuses.push(RecordStatus::failed(format!(
                    "duplicate key in batch: {}",
                    key
                )));
                continue;
            }
            match op {
                WriteOp::Put { item } => {
                    self.items.insert(key, item.clone());
                }
                WriteOp::Delete { .. } => {
                    self.items.remove(&key);
                }
            }
            statuses.push(RecordStatus::Succeeded);
        }

        Ok(statuses)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn users_table() -> TableSink {
        TableSink::new("users", KeySchema::new(["username", "last_name"]).unwrap())
    }

    fn put(value: Value) -> WriteOp {
        WriteOp::put(Record::from_json(value).unwrap())
    }

    #[test]
    fn test_put_get_delete() {
        let mut table = users_table();
        let statuses = table
            .submit_batch(&[put(json!({
                "username": "Homer_Jay",
                "first_name": "Homer",
                "last_name": "Simpson",
                "age": 39,
                "account_type": "standard_user",
            }))])
            .unwrap();
        assert_eq!(statuses, vec![RecordStatus::Succeeded]);

        let key = LogicalKey::new([("username", "Homer_Jay"), ("last_name", "Simpson")]).unwrap();
        assert_eq!(table.get_item(&key).unwrap().get("age"), Some(&json!(39)));

        table.submit_batch(&[WriteOp::delete(key.clone())]).unwrap();
        assert!(table.get_item(&key).is_none());
        assert_eq!(table.calls(), 2);
    }

    #[test]
    fn test_duplicate_keys_in_one_call_fail() {
        let mut table = users_table();
        let statuses = table
            .submit_batch(&[
                put(json!({"username": "harry", "last_name": "potter", "age": 1})),
                put(json!({"username": "harry", "last_name": "potter", "age": 2})),
            ])
            .unwrap();

        assert!(statuses[0].is_succeeded());
        assert!(statuses[1].is_failed());
        assert_eq!(table.item_count(), 1);
    }

    #[test]
    fn test_missing_key_attribute_fails_record() {
        let mut table = users_table();
        let statuses = table
            .submit_batch(&[put(json!({"username": "RONALD"}))])
            .unwrap();
        assert!(statuses[0].is_failed());
        assert_eq!(table.item_count(), 0);
    }

    #[test]
    fn test_query_by_attribute() {
        let mut table = users_table();
        table
            .submit_batch(&[
                put(json!({"username": "johndoe", "last_name": "Doe", "age": 25})),
                put(json!({"username": "alicedoe", "last_name": "Doe", "age": 27})),
                put(json!({"username": "bobsmith", "last_name": "Smith", "age": 18})),
            ])
            .unwrap();

        let does = table.query("last_name", &KeyValue::from("Doe"));
        assert_eq!(does.len(), 2);
        assert_eq!(does[0].get("username"), Some(&json!("alicedoe")));
    }

    #[test]
    fn test_bytes_keys_round_trip() {
        let mut table = TableSink::new("blobs", KeySchema::new(["id"]).unwrap());
        table
            .submit_batch(&[put(json!({"id": {"B": "AQI="}, "size": 2}))])
            .unwrap();

        let key = LogicalKey::new([("id", vec![1u8, 2])]).unwrap();
        assert_eq!(table.get_item(&key).unwrap().get("size"), Some(&json!(2)));
        assert_eq!(table.query("id", &KeyValue::Bytes(vec![1, 2])).len(), 1);

        table.submit_batch(&[WriteOp::delete(key)]).unwrap();
        assert_eq!(table.item_count(), 0);
    }
}
