//! Map-backed collection (any JSON value as key, insertion ordered)

use serde_json::Value;

use super::collection::Collection;
use crate::error::{StoreError, StoreResult};

/// Entries in insertion order. Keys compare by JSON equality, so numbers,
/// objects and arrays are all valid keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapCollection {
    entries: Vec<(Value, Value)>,
}

impl MapCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl FromIterator<(Value, Value)> for MapCollection {
    /// Later duplicates replace the value of the first occurrence.
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = MapCollection::new();
        for (key, value) in iter {
            match map.position(&key) {
                Some(pos) => map.entries[pos].1 = value,
                None => map.entries.push((key, value)),
            }
        }
        map
    }
}

impl Collection for MapCollection {
    type Key = Value;

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|pos| &self.entries[pos].1)
    }

    fn insert(
        &mut self,
        element: Value,
        key: Option<Value>,
        _position: Option<usize>,
    ) -> StoreResult<Value> {
        let key = key.ok_or_else(|| StoreError::InvalidKey("map stores require a key".into()))?;
        if self.position(&key).is_some() {
            return Err(StoreError::Duplicate(key.to_string()));
        }
        self.entries.push((key.clone(), element));
        Ok(key)
    }

    fn remove(&mut self, key: &Value) -> StoreResult<bool> {
        match self.position(key) {
            Some(pos) => {
                self.entries.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (Value, &Value)> + '_> {
        Box::new(self.entries.iter().map(|(k, v)| (k.clone(), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_removal_keeps_order() {
        let mut map: MapCollection = vec![
            (json!(1), json!("one")),
            (json!("two"), json!(2)),
            (json!([3]), json!([3])),
        ]
        .into_iter()
        .collect();

        assert!(map.remove(&json!(1)).unwrap());
        assert!(!map.remove(&json!(1)).unwrap());
        assert_eq!(map.get(&json!("two")), Some(&json!(2)));
        assert_eq!(map.get(&json!([3])), Some(&json!([3])));
        assert_eq!(
            map.entries().map(|(k, _)| k).collect::<Vec<_>>(),
            vec![json!("two"), json!([3])]
        );
    }

    #[test]
    fn test_float_and_object_keys() {
        let mut map = MapCollection::new();
        map.insert(json!("half"), Some(json!(1.5)), None).unwrap();
        map.insert(json!("obj"), Some(json!({"k": 1})), None).unwrap();
        map.insert(json!("null"), Some(Value::Null), None).unwrap();

        assert_eq!(map.get(&json!(1.5)), Some(&json!("half")));
        assert_eq!(map.get(&json!({"k": 1})), Some(&json!("obj")));
        assert!(map.contains_key(&Value::Null));
        assert!(!map.contains_key(&json!({"k": 2})));
        assert!(matches!(
            map.insert(json!("again"), Some(json!({"k": 1})), None),
            Err(StoreError::Duplicate(_))
        ));
        assert!(map.remove(&json!(1.5)).unwrap());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_duplicate_key() {
        let mut map = MapCollection::new();
        map.insert(json!(1), Some(json!("k")), None).unwrap();
        assert_eq!(
            map.insert(json!(2), Some(json!("k")), None).unwrap_err(),
            StoreError::Duplicate("\"k\"".into())
        );
        assert!(matches!(
            map.insert(json!(3), None, None),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
