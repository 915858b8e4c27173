//! Record keys
//!
//! Keys follow the ordering of browser key-value engines: every number sorts
//! before every string, and every string before every array. Arrays compare
//! element-wise.

use std::fmt;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// A record key usable by keyed and persistent stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Number(i64),
    String(String),
    Array(Vec<Key>),
}

impl Key {
    /// Convert a JSON value into a key.
    ///
    /// Integers, strings, and arrays of those are valid keys. Floats with a
    /// fractional part, booleans, null, and objects are rejected.
    pub fn from_value(value: &Value) -> StoreResult<Key> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Key::Number(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Key::Number(f as i64))
                    }
                    _ => Err(StoreError::InvalidKey(n.to_string())),
                }
            }
            Value::String(s) => Ok(Key::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<StoreResult<Vec<_>>>()
                .map(Key::Array),
            other => Err(StoreError::InvalidKey(other.to_string())),
        }
    }

    /// Convert the key back into a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Number(n) => Value::from(*n),
            Key::String(s) => Value::String(s.clone()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_value).collect()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Key::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{}", n),
            Key::String(s) => write!(f, "{:?}", s),
            Key::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Number(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Number(n as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_ordering() {
        let mut keys = vec![
            Key::from("b"),
            Key::Array(vec![Key::from(1)]),
            Key::from(10),
            Key::from("a"),
            Key::from(-3),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::from(-3),
                Key::from(10),
                Key::from("a"),
                Key::from("b"),
                Key::Array(vec![Key::from(1)]),
            ]
        );
    }

    #[test]
    fn test_from_value() {
        assert_eq!(Key::from_value(&json!(7)).unwrap(), Key::Number(7));
        assert_eq!(Key::from_value(&json!(7.0)).unwrap(), Key::Number(7));
        assert_eq!(Key::from_value(&json!("x")).unwrap(), Key::from("x"));
        assert_eq!(
            Key::from_value(&json!([1, "a"])).unwrap(),
            Key::Array(vec![Key::from(1), Key::from("a")])
        );
        assert!(Key::from_value(&json!(1.5)).is_err());
        assert!(Key::from_value(&json!(null)).is_err());
        assert!(Key::from_value(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::Array(vec![Key::from(1), Key::from("a")]).to_string(), "[1, \"a\"]");
    }
}
