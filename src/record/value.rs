//! Key scalar values
//!
//! Only three attribute types may participate in a logical key:
//! - string: UTF-8 string
//! - number: decimal number, compared by its canonical text
//! - bytes: opaque binary, written in a record as `{"B": "<base64>"}`
//!
//! Everything else a record may carry (bool, null, list, map) is payload.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{KeyError, KeyResult};

/// A scalar value that can identify a record's slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum KeyValue {
    /// UTF-8 string
    String(String),
    /// Number in canonical decimal form ("25", "2.5")
    Number(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
}

impl KeyValue {
    /// Convert a JSON attribute into a key scalar.
    ///
    /// `field` is only used for error context.
    pub fn from_json(field: &str, value: &Value) -> KeyResult<Self> {
        match value {
            Value::String(s) => Ok(KeyValue::String(s.clone())),
            Value::Number(n) => Ok(KeyValue::Number(n.to_string())),
            Value::Object(map) if map.len() == 1 && map.contains_key(BYTES_TAG) => {
                let encoded = map
                    .get(BYTES_TAG)
                    .and_then(Value::as_str)
                    .ok_or_else(|| KeyError::InvalidBytes {
                        field: field.to_string(),
                        reason: "expected a base64 string".to_string(),
                    })?;
                STANDARD
                    .decode(encoded)
                    .map(KeyValue::Bytes)
                    .map_err(|e| KeyError::InvalidBytes {
                        field: field.to_string(),
                        reason: e.to_string(),
                    })
            }
            other => Err(KeyError::UnsupportedType {
                field: field.to_string(),
                found: json_type_name(other),
            }),
        }
    }

    /// Whether this scalar equals the given JSON attribute.
    pub fn matches_json(&self, value: &Value) -> bool {
        KeyValue::from_json("", value).map_or(false, |other| &other == self)
    }
}

/// Attribute tag marking a base64 bytes value.
pub const BYTES_TAG: &str = "B";

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::String(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::String(s)
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        KeyValue::Number(n.to_string())
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(b: Vec<u8>) -> Self {
        KeyValue::Bytes(b)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::String(s) => write!(f, "{}", s),
            KeyValue::Number(n) => write!(f, "{}", n),
            KeyValue::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// JSON type name used in error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_convert() {
        assert_eq!(
            KeyValue::from_json("username", &json!("johndoe")).unwrap(),
            KeyValue::String("johndoe".into())
        );
        assert_eq!(
            KeyValue::from_json("age", &json!(25)).unwrap(),
            KeyValue::Number("25".into())
        );
    }

    #[test]
    fn test_non_scalars_rejected() {
        for value in [json!(null), json!(true), json!([1, 2]), json!({"city": "LA"})] {
            let err = KeyValue::from_json("address", &value).unwrap_err();
            assert!(matches!(err, KeyError::UnsupportedType { .. }));
        }
    }

    #[test]
    fn test_matches_json() {
        assert!(KeyValue::from("doe").matches_json(&json!("doe")));
        assert!(KeyValue::from(40).matches_json(&json!(40)));
        assert!(!KeyValue::from(40).matches_json(&json!("40")));
    }

    #[test]
    fn test_bytes_attribute_decodes() {
        let value = KeyValue::from_json("id", &json!({"B": "AQI="})).unwrap();
        assert_eq!(value, KeyValue::Bytes(vec![1, 2]));
        assert!(value.matches_json(&json!({"B": "AQI="})));
        assert!(!value.matches_json(&json!([1, 2])));

        let err = KeyValue::from_json("id", &json!({"B": "not base64!"})).unwrap_err();
        assert!(matches!(err, KeyError::InvalidBytes { .. }));
        assert!(KeyValue::from_json("id", &json!({"B": 7})).is_err());
    }

    #[test]
    fn test_bytes_display_as_hex() {
        assert_eq!(KeyValue::Bytes(vec![0xde, 0xad]).to_string(), "0xdead");
    }
}
