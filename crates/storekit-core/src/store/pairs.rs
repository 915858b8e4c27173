//! Collection of `[key, value]` pairs

use serde_json::Value;

use super::collection::Collection;
use crate::error::{StoreError, StoreResult};
use crate::key::Key;

/// Keyed pairs kept in array order. Keys are unique; positions are honoured
/// on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayPairsCollection {
    pairs: Vec<(Key, Value)>,
}

impl ArrayPairsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[(Key, Value)] {
        &self.pairs
    }

    fn position(&self, key: &Key) -> Option<usize> {
        self.pairs.iter().position(|(k, _)| k == key)
    }
}

impl TryFrom<Vec<(Key, Value)>> for ArrayPairsCollection {
    type Error = StoreError;

    fn try_from(pairs: Vec<(Key, Value)>) -> StoreResult<Self> {
        let mut collection = ArrayPairsCollection::new();
        for (key, value) in pairs {
            collection.insert(value, Some(key), None)?;
        }
        Ok(collection)
    }
}

impl Collection for ArrayPairsCollection {
    type Key = Key;

    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn contains_key(&self, key: &Key) -> bool {
        self.position(key).is_some()
    }

    fn get(&self, key: &Key) -> Option<&Value> {
        self.position(key).map(|pos| &self.pairs[pos].1)
    }

    fn insert(
        &mut self,
        element: Value,
        key: Option<Key>,
        position: Option<usize>,
    ) -> StoreResult<Key> {
        let key = key.ok_or_else(|| StoreError::InvalidKey("pair stores require a key".into()))?;
        if self.position(&key).is_some() {
            return Err(StoreError::Duplicate(key.to_string()));
        }
        match position {
            Some(position) if position > self.pairs.len() => {
                return Err(StoreError::InvalidPosition {
                    position,
                    len: self.pairs.len(),
                })
            }
            Some(position) => self.pairs.insert(position, (key.clone(), element)),
            None => self.pairs.push((key.clone(), element)),
        }
        Ok(key)
    }

    fn remove(&mut self, key: &Key) -> StoreResult<bool> {
        match self.position(key) {
            Some(pos) => {
                self.pairs.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (Key, &Value)> + '_> {
        Box::new(self.pairs.iter().map(|(k, v)| (k.clone(), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_try_from_rejects_duplicates() {
        let result = ArrayPairsCollection::try_from(vec![
            (Key::from("a"), json!(1)),
            (Key::from("a"), json!(2)),
        ]);
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn test_insert_at_position() {
        let mut pairs =
            ArrayPairsCollection::try_from(vec![(Key::from("a"), json!(1)), (Key::from("c"), json!(3))])
                .unwrap();
        pairs.insert(json!(2), Some(Key::from("b")), Some(1)).unwrap();
        let keys: Vec<Key> = pairs.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Key::from("a"), Key::from("b"), Key::from("c")]);
    }
}
