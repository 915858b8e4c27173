//! Set-backed collection (each value is its own key)

use serde_json::Value;

use super::collection::Collection;
use crate::error::StoreResult;

/// Distinct values in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetCollection {
    values: Vec<Value>,
}

impl SetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

impl FromIterator<Value> for SetCollection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = SetCollection::new();
        for value in iter {
            if set.position(&value).is_none() {
                set.values.push(value);
            }
        }
        set
    }
}

impl Collection for SetCollection {
    type Key = Value;

    const KEYED: bool = false;

    fn len(&self) -> usize {
        self.values.len()
    }

    fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|pos| &self.values[pos])
    }

    fn insert(
        &mut self,
        element: Value,
        _key: Option<Value>,
        _position: Option<usize>,
    ) -> StoreResult<Value> {
        // Adding a member again leaves the set unchanged.
        if self.position(&element).is_none() {
            self.values.push(element.clone());
        }
        Ok(element)
    }

    fn remove(&mut self, key: &Value) -> StoreResult<bool> {
        match self.position(key) {
            Some(pos) => {
                self.values.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (Value, &Value)> + '_> {
        Box::new(self.values.iter().map(|v| (v.clone(), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_is_key() {
        let mut set: SetCollection = vec![json!("a"), json!("b"), json!("a")].into_iter().collect();
        assert_eq!(set.len(), 2);

        let key = set.insert(json!({"x": 1}), Some(json!("ignored")), None).unwrap();
        assert_eq!(key, json!({"x": 1}));
        assert!(set.contains_key(&json!({"x": 1})));
        assert!(!set.contains_key(&json!("ignored")));
        assert_eq!(set.insert(json!("b"), None, None).unwrap(), json!("b"));
        assert_eq!(set.len(), 3);
        assert_eq!(
            set.entries().map(|(k, _)| k).collect::<Vec<_>>(),
            vec![json!("a"), json!("b"), json!({"x": 1})]
        );
    }
}
