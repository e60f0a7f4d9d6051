//! Logical keys and key schemas
//!
//! A logical key is an ordered tuple of named scalar fields. Two records
//! whose keys carry the same field names and values in the same order
//! occupy the same logical slot.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{KeyError, KeyResult};
use super::op::Record;
use super::value::KeyValue;

/// One named field of a logical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyField {
    pub name: String,
    pub value: KeyValue,
}

/// Ordered tuple of named scalar fields identifying a record's slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLogicalKey")]
pub struct LogicalKey {
    fields: Vec<KeyField>,
}

/// Wire form of a key; validated into a `LogicalKey` on deserialize.
#[derive(Deserialize)]
struct RawLogicalKey {
    fields: Vec<KeyField>,
}

impl TryFrom<RawLogicalKey> for LogicalKey {
    type Error = KeyError;

    fn try_from(raw: RawLogicalKey) -> KeyResult<Self> {
        Self::from_fields(raw.fields)
    }
}

impl LogicalKey {
    /// Build a key from 1..N named scalar fields.
    pub fn new<N, V, I>(fields: I) -> KeyResult<Self>
    where
        N: Into<String>,
        V: Into<KeyValue>,
        I: IntoIterator<Item = (N, V)>,
    {
        let fields: Vec<KeyField> = fields
            .into_iter()
            .map(|(name, value)| KeyField {
                name: name.into(),
                value: value.into(),
            })
            .collect();
        Self::from_fields(fields)
    }

    /// Build a key from JSON attribute values.
    ///
    /// Fails if a value is not a string or number.
    pub fn from_json<'a, I>(fields: I) -> KeyResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, value)| {
                Ok(KeyField {
                    name: name.to_string(),
                    value: KeyValue::from_json(name, value)?,
                })
            })
            .collect::<KeyResult<Vec<_>>>()?;
        Self::from_fields(fields)
    }

    /// Build a key from a JSON object, in the object's iteration order.
    pub fn from_json_object(value: &Value) -> KeyResult<Self> {
        match value {
            Value::Object(map) => Self::from_json(map.iter().map(|(k, v)| (k.as_str(), v))),
            other => Err(KeyError::NotAnObject(super::value::json_type_name(other))),
        }
    }

    fn from_fields(fields: Vec<KeyField>) -> KeyResult<Self> {
        if fields.is_empty() {
            return Err(KeyError::Empty);
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(KeyError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    /// Derive the key of `record` under `schema`.
    pub fn extract(record: &Record, schema: &KeySchema) -> KeyResult<Self> {
        let fields = schema
            .fields()
            .iter()
            .map(|name| {
                let value = record
                    .get(name)
                    .ok_or_else(|| KeyError::MissingField(name.clone()))?;
                Ok(KeyField {
                    name: name.clone(),
                    value: KeyValue::from_json(name, value)?,
                })
            })
            .collect::<KeyResult<Vec<_>>>()?;
        Self::from_fields(fields)
    }

    /// Re-order this key onto `schema`, dropping fields it does not name.
    pub fn project(&self, schema: &KeySchema) -> KeyResult<Self> {
        let fields = schema
            .fields()
            .iter()
            .map(|name| {
                self.get(name)
                    .map(|value| KeyField {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .ok_or_else(|| KeyError::MissingField(name.clone()))
            })
            .collect::<KeyResult<Vec<_>>>()?;
        Self::from_fields(fields)
    }

    /// Value of the named field, if present.
    pub fn get(&self, name: &str) -> Option<&KeyValue> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    pub fn fields(&self) -> &[KeyField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false; a key has at least one field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", field.name, field.value)?;
        }
        Ok(())
    }
}

/// Ordered, duplicate-free set of field names that form a logical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KeySchema {
    fields: Vec<String>,
}

impl KeySchema {
    /// Create a schema. Fails on an empty or repeating field list.
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> KeyResult<Self> {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(KeyError::Empty);
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for name in &fields {
            if !seen.insert(name.as_str()) {
                return Err(KeyError::DuplicateField(name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether `name` participates in the key.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

impl TryFrom<Vec<String>> for KeySchema {
    type Error = KeyError;

    fn try_from(fields: Vec<String>) -> KeyResult<Self> {
        Self::new(fields)
    }
}

impl From<KeySchema> for Vec<String> {
    fn from(schema: KeySchema) -> Self {
        schema.fields
    }
}
