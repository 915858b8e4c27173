//! Backing collection trait

use std::fmt::Debug;

use serde_json::Value;

use crate::error::StoreResult;

/// A keyed container that a [`StoreManager`](super::StoreManager) manages.
///
/// Implementations decide the key semantics (dense indices, caller-supplied
/// keys, value-as-key) and the delete strategy. Managers only orchestrate
/// events and the search pipeline on top.
pub trait Collection {
    type Key: Clone + PartialEq + Debug;

    /// Keys are contiguous indices that shift when an element is removed.
    const IS_DENSE: bool = false;

    /// Keys are caller-supplied (and reported in `add` events).
    const KEYED: bool = true;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains_key(&self, key: &Self::Key) -> bool;

    fn get(&self, key: &Self::Key) -> Option<&Value>;

    /// Insert an element and return the key it is now stored under.
    ///
    /// `key` and `position` are honoured or ignored depending on the
    /// collection.
    fn insert(
        &mut self,
        element: Value,
        key: Option<Self::Key>,
        position: Option<usize>,
    ) -> StoreResult<Self::Key>;

    /// Remove a key. `Ok(false)` when the key does not exist.
    fn remove(&mut self, key: &Self::Key) -> StoreResult<bool>;

    /// Remove several keys, reporting the outcome for each requested key.
    fn remove_many(&mut self, keys: &[Self::Key]) -> Vec<(Self::Key, StoreResult<bool>)> {
        keys.iter().map(|k| (k.clone(), self.remove(k))).collect()
    }

    /// Entries in inspection order.
    fn entries(&self) -> Box<dyn Iterator<Item = (Self::Key, &Value)> + '_>;
}
