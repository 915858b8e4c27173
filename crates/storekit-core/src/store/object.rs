//! Object-backed collection (string keys, insertion ordered)

use serde_json::{Map, Value};

use super::collection::Collection;
use crate::error::{StoreError, StoreResult};

/// Elements stored as the properties of a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCollection {
    items: Map<String, Value>,
}

impl ObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.items
    }
}

impl From<Map<String, Value>> for ObjectCollection {
    fn from(items: Map<String, Value>) -> Self {
        Self { items }
    }
}

impl Collection for ObjectCollection {
    type Key = String;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn contains_key(&self, key: &String) -> bool {
        self.items.contains_key(key)
    }

    fn get(&self, key: &String) -> Option<&Value> {
        self.items.get(key)
    }

    fn insert(
        &mut self,
        element: Value,
        key: Option<String>,
        _position: Option<usize>,
    ) -> StoreResult<String> {
        let key = key.ok_or_else(|| StoreError::InvalidKey("object stores require a key".into()))?;
        if self.items.contains_key(&key) {
            return Err(StoreError::Duplicate(key));
        }
        self.items.insert(key.clone(), element);
        Ok(key)
    }

    fn remove(&mut self, key: &String) -> StoreResult<bool> {
        Ok(self.items.shift_remove(key).is_some())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (String, &Value)> + '_> {
        Box::new(self.items.iter().map(|(k, v)| (k.clone(), v)))
    }
}
