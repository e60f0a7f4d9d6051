//! Records and write operations

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{KeyError, KeyResult};
use super::key::{KeySchema, LogicalKey};
use super::value::json_type_name;

/// An attribute map. Opaque to the writer apart from its key fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    attributes: Map<String, Value>,
}

impl Record {
    /// Wrap a JSON object as a record.
    pub fn from_json(value: Value) -> KeyResult<Self> {
        match value {
            Value::Object(attributes) => Ok(Self { attributes }),
            other => Err(KeyError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Attribute by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.attributes)
    }
}

/// Kind of a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Put,
    Delete,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Put => "put",
            OpKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single staged write. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WriteOp {
    /// Write (or replace) a whole record
    Put { item: Record },
    /// Remove the record at a key
    Delete { key: LogicalKey },
}

impl WriteOp {
    pub fn put(record: Record) -> Self {
        WriteOp::Put { item: record }
    }

    pub fn delete(key: LogicalKey) -> Self {
        WriteOp::Delete { key }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            WriteOp::Put { .. } => OpKind::Put,
            WriteOp::Delete { .. } => OpKind::Delete,
        }
    }

    /// Logical key of this op under `schema`.
    ///
    /// Puts derive it from their attributes, deletes project their key.
    pub fn key_for(&self, schema: &KeySchema) -> KeyResult<LogicalKey> {
        match self {
            WriteOp::Put { item } => LogicalKey::extract(item, schema),
            WriteOp::Delete { key } => key.project(schema),
        }
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            WriteOp::Put { item } => Some(item),
            WriteOp::Delete { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_must_be_object() {
        assert_eq!(
            Record::from_json(json!(["a"])).unwrap_err(),
            KeyError::NotAnObject("array")
        );
    }

    #[test]
    fn test_key_for_put_and_delete_agree() {
        let schema = KeySchema::new(["username", "last_name"]).unwrap();
        let put = WriteOp::put(
            Record::from_json(json!({"username": "bobsmith", "last_name": "Smith", "age": 18}))
                .unwrap(),
        );
        let delete = WriteOp::delete(
            LogicalKey::new([("last_name", "Smith"), ("username", "bobsmith")]).unwrap(),
        );

        assert_eq!(put.key_for(&schema).unwrap(), delete.key_for(&schema).unwrap());
    }

    #[test]
    fn test_op_json_shape() {
        let op: WriteOp = serde_json::from_value(json!({
            "op": "put",
            "item": {"username": "alicedoe", "age": 27}
        }))
        .unwrap();
        assert_eq!(op.kind(), OpKind::Put);
        assert_eq!(op.record().unwrap().get("age"), Some(&json!(27)));
    }

    #[test]
    fn test_delete_with_empty_key_rejected() {
        let op = serde_json::from_value::<WriteOp>(json!({
            "op": "delete",
            "key": {"fields": []}
        }));
        assert!(op.is_err());
    }
}
