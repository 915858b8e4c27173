//! In-memory store managers
//!
//! A [`StoreManager`] owns a [`Collection`] and an event emitter. Mutations
//! go through the collection, and listeners are notified after they succeed.

use serde_json::{Map, Value};

use super::array::ArrayCollection;
use super::collection::Collection;
use super::map::MapCollection;
use super::object::ObjectCollection;
use super::pairs::ArrayPairsCollection;
use super::report::DeleteReport;
use super::set::SetCollection;
use crate::error::StoreResult;
use crate::events::{EventEmitter, StoreEvent};
use crate::key::Key;
use crate::params::{AppliedParams, SearchOutcome, SearchParams};
use crate::pipeline;
use crate::search::SearchOptions;

/// Options for [`StoreManager::add`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Insert at this position instead of appending (ordered collections only)
    pub position: Option<usize>,
}

impl AddOptions {
    pub fn at(position: usize) -> Self {
        Self {
            position: Some(position),
        }
    }
}

pub type ArrayStoreManager = StoreManager<ArrayCollection>;
pub type ObjectStoreManager = StoreManager<ObjectCollection>;
pub type MapStoreManager = StoreManager<MapCollection>;
pub type SetStoreManager = StoreManager<SetCollection>;
pub type ArrayPairsStoreManager = StoreManager<ArrayPairsCollection>;

/// Manages a backing collection and notifies listeners of mutations.
#[derive(Debug)]
pub struct StoreManager<C: Collection> {
    collection: C,
    events: EventEmitter<StoreEvent<C::Key>>,
    search: SearchOptions,
}

impl<C: Collection> StoreManager<C> {
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            events: EventEmitter::new(),
            search: SearchOptions::default(),
        }
    }

    pub fn with_search_options(mut self, options: SearchOptions) -> Self {
        self.search = options;
        self
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    pub fn into_inner(self) -> C {
        self.collection
    }

    pub fn events(&self) -> &EventEmitter<StoreEvent<C::Key>> {
        &self.events
    }

    pub fn search_options(&self) -> &SearchOptions {
        &self.search
    }

    /// Add an element and return the key it was stored under.
    pub fn add(
        &mut self,
        element: Value,
        key: Option<C::Key>,
        options: AddOptions,
    ) -> StoreResult<C::Key> {
        let stored = self
            .collection
            .insert(element.clone(), key, options.position)?;

        self.events.emit(&StoreEvent::Add {
            element,
            key: C::KEYED.then(|| stored.clone()),
            position: options.position,
        });
        Ok(stored)
    }

    /// Delete one key. `Ok(false)` when the key does not exist.
    pub fn delete(&mut self, key: &C::Key, reason: Option<&str>) -> StoreResult<bool> {
        if !self.collection.remove(key)? {
            return Ok(false);
        }
        self.events.emit(&StoreEvent::Delete {
            key: key.clone(),
            // One record removed; see `StoreEvent::Delete::total`.
            total: 1,
            reason: reason.map(str::to_string),
        });
        Ok(true)
    }

    /// Delete several keys. A failure on one key does not stop the batch.
    pub fn delete_many(&mut self, keys: &[C::Key], reason: Option<&str>) -> DeleteReport<C::Key> {
        let report: DeleteReport<C::Key> = self.collection.remove_many(keys).into_iter().collect();

        if !report.success_keys.is_empty() {
            self.events.emit(&StoreEvent::DeleteMany {
                keys: report.success_keys.clone(),
                total: report.success_count(),
                reason: reason.map(str::to_string),
            });
        }
        if !report.not_found_keys.is_empty() {
            self.events.emit(&StoreEvent::DeleteNotFound {
                keys: report.not_found_keys.clone(),
                total: report.not_found_keys.len(),
            });
        }
        report
    }

    pub fn has_key(&self, key: &C::Key) -> bool {
        self.collection.contains_key(key)
    }

    pub fn get(&self, key: &C::Key) -> Option<&Value> {
        self.collection.get(key)
    }

    pub fn size(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn is_dense(&self) -> bool {
        C::IS_DENSE
    }

    pub fn entries(&self) -> impl Iterator<Item = (C::Key, &Value)> + '_ {
        self.collection.entries()
    }

    /// Search, sort and paginate the collection.
    pub fn apply_search_params(&self, params: &SearchParams) -> StoreResult<SearchOutcome<C::Key>> {
        self.apply_search_params_with(params, AppliedParams::default())
    }

    /// Like [`apply_search_params`](Self::apply_search_params), continuing
    /// from parameters an outer stage already applied.
    pub fn apply_search_params_with(
        &self,
        params: &SearchParams,
        applied: AppliedParams,
    ) -> StoreResult<SearchOutcome<C::Key>> {
        pipeline::apply_to_entries(self.collection.entries(), params, &self.search, applied)
    }
}

impl<C: Collection + Default> Default for StoreManager<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl ArrayStoreManager {
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self::new(ArrayCollection::from(items))
    }
}

impl ObjectStoreManager {
    pub fn from_map(items: Map<String, Value>) -> Self {
        Self::new(ObjectCollection::from(items))
    }
}

impl MapStoreManager {
    pub fn from_entries(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::new(entries.into_iter().collect())
    }
}

impl SetStoreManager {
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::new(values.into_iter().collect())
    }
}

impl ArrayPairsStoreManager {
    pub fn from_pairs(pairs: Vec<(Key, Value)>) -> StoreResult<Self> {
        ArrayPairsCollection::try_from(pairs).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SortOrder;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn recorder<K: Clone + Send + 'static>(
        emitter: &EventEmitter<StoreEvent<K>>,
    ) -> Arc<Mutex<Vec<StoreEvent<K>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        emitter.on(move |e: &StoreEvent<K>| sink.lock().push(e.clone()));
        seen
    }

    #[test]
    fn test_add_event_carries_key_only_when_keyed() {
        let mut array = ArrayStoreManager::default();
        let array_events = recorder(array.events());
        array.add(json!("x"), Some(9), AddOptions::default()).unwrap();

        let mut object = ObjectStoreManager::default();
        let object_events = recorder(object.events());
        object
            .add(json!("y"), Some("k".into()), AddOptions::default())
            .unwrap();

        assert_eq!(
            array_events.lock().as_slice(),
            &[StoreEvent::Add {
                element: json!("x"),
                key: None,
                position: None
            }]
        );
        assert_eq!(
            object_events.lock().as_slice(),
            &[StoreEvent::Add {
                element: json!("y"),
                key: Some("k".to_string()),
                position: None
            }]
        );
    }

    #[test]
    fn test_delete_reports_missing_key() {
        let mut store = ObjectStoreManager::default();
        let events = recorder(store.events());
        for key in ["a", "b", "c"] {
            store.add(json!(1), Some(key.into()), AddOptions::default()).unwrap();
        }

        assert!(store.delete(&"a".to_string(), Some("cleanup")).unwrap());
        assert!(!store.delete(&"a".to_string(), None).unwrap());
        assert_eq!(store.size(), 2);

        // `total` counts removed records, not what is left.
        let events = events.lock();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[3],
            StoreEvent::Delete {
                key: "a".to_string(),
                total: 1,
                reason: Some("cleanup".to_string())
            }
        );
    }

    #[test]
    fn test_delete_many_emits_once_per_kind() {
        let mut store = MapStoreManager::from_entries(vec![
            (json!(1), json!("a")),
            (json!(2), json!("b")),
            (json!(3), json!("c")),
        ]);
        let events = recorder(store.events());

        let report = store.delete_many(&[json!(1), json!(7), json!(3)], None);

        assert_eq!(report.success_keys, vec![json!(1), json!(3)]);
        assert_eq!(report.not_found_keys, vec![json!(7)]);
        assert_eq!(store.size(), 1);

        let names: Vec<&str> = events.lock().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["deletemany", "deletenotfound"]);
    }

    #[test]
    fn test_set_add_is_idempotent() {
        let mut store = SetStoreManager::from_values(vec![json!("a")]);
        let events = recorder(store.events());

        assert_eq!(
            store.add(json!("a"), None, AddOptions::default()).unwrap(),
            json!("a")
        );
        assert_eq!(store.size(), 1);
        assert_eq!(
            store.add(json!("b"), None, AddOptions::default()).unwrap(),
            json!("b")
        );
        assert_eq!(store.size(), 2);

        let names: Vec<&str> = events.lock().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["add", "add"]);
    }

    #[test]
    fn test_pairs_search_returns_keys() {
        let store = ArrayPairsStoreManager::from_pairs(vec![
            (Key::from("b"), json!({"name": "Beta"})),
            (Key::from("a"), json!({"name": "Alpha"})),
            (Key::from("g"), json!({"name": "Gamma"})),
        ])
        .unwrap();

        let outcome = store
            .apply_search_params(&SearchParams::new().sort("name").order(SortOrder::Asc))
            .unwrap();

        let keys: Vec<&Key> = outcome.keys().collect();
        assert_eq!(keys, vec![&Key::from("a"), &Key::from("b"), &Key::from("g")]);
        assert_eq!(outcome.applied_params.sort.as_deref(), Some("name"));
    }

    #[test]
    fn test_is_dense() {
        assert!(ArrayStoreManager::default().is_dense());
        assert!(!MapStoreManager::default().is_dense());
    }
}
