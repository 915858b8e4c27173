//! Array-backed collection (dense integer keys)

use serde_json::Value;

use super::collection::Collection;
use crate::error::{StoreError, StoreResult};

/// Elements keyed by their index.
///
/// Removing an element shifts every later index down by one. Additions
/// append unless an explicit position is given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayCollection {
    items: Vec<Value>,
}

impl ArrayCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }
}

impl From<Vec<Value>> for ArrayCollection {
    fn from(items: Vec<Value>) -> Self {
        Self { items }
    }
}

impl Collection for ArrayCollection {
    type Key = usize;

    const IS_DENSE: bool = true;
    const KEYED: bool = false;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn contains_key(&self, key: &usize) -> bool {
        *key < self.items.len()
    }

    fn get(&self, key: &usize) -> Option<&Value> {
        self.items.get(*key)
    }

    fn insert(
        &mut self,
        element: Value,
        _key: Option<usize>,
        position: Option<usize>,
    ) -> StoreResult<usize> {
        match position {
            Some(position) if position > self.items.len() => Err(StoreError::InvalidPosition {
                position,
                len: self.items.len(),
            }),
            Some(position) => {
                self.items.insert(position, element);
                Ok(position)
            }
            None => {
                self.items.push(element);
                Ok(self.items.len() - 1)
            }
        }
    }

    fn remove(&mut self, key: &usize) -> StoreResult<bool> {
        if *key >= self.items.len() {
            return Ok(false);
        }
        self.items.remove(*key);
        Ok(true)
    }

    /// Each successful removal shifts the higher indices down by one, so the
    /// requested keys are processed in ascending order with a running offset.
    /// Keys in the report are the caller's original indices. A repeated key
    /// is reported as not found after its first removal.
    fn remove_many(&mut self, keys: &[usize]) -> Vec<(usize, StoreResult<bool>)> {
        let mut sorted = keys.to_vec();
        sorted.sort_unstable();

        let mut offset = 0;
        let mut previous = None;
        sorted
            .into_iter()
            .map(|key| {
                if previous.replace(key) == Some(key) {
                    return (key, Ok(false));
                }
                let outcome = self.remove(&(key - offset));
                if matches!(outcome, Ok(true)) {
                    offset += 1;
                }
                (key, outcome)
            })
            .collect()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (usize, &Value)> + '_> {
        Box::new(self.items.iter().enumerate())
    }
}
