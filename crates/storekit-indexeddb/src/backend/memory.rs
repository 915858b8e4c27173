//! In-memory storage engine
//!
//! Follows IndexedDB semantics closely enough to stand in for the browser
//! engine: versioned databases with upgrade callbacks, key paths with
//! auto-increment, unique indexes, and ordered cursors. Every operation
//! suspends once before touching data, the way engine callbacks do.
//!
//! Data lives behind a shared handle, so databases survive their connections
//! and clones of a [`MemoryBackend`] see the same databases. The engine also
//! counts what it does ([`BackendStats`]) so callers can verify how much work
//! an operation caused.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;

use parking_lot::Mutex;
use serde_json::Value;
use storekit::tracing::prefix;
use storekit_core::Key;
use tracing::debug;

use super::{Backend, Connection, CursorDirection, CursorStep, UpgradeContext, UpgradeFn};
use crate::error::{IndexedDbError, Result};

/// Counters of engine activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub opens: usize,
    pub closes: usize,
    pub upgrades: usize,
    pub active_connections: usize,
    /// Calls to the cursor advance primitive
    pub cursor_steps: usize,
    /// Records handed out by gets and cursor steps
    pub records_read: usize,
}

#[derive(Debug, Clone)]
struct MemStore {
    key_path: Option<String>,
    auto_increment: bool,
    next_key: i64,
    indexes: Vec<(String, bool)>,
    records: BTreeMap<Key, Value>,
}

impl MemStore {
    fn new(key_path: Option<&str>, auto_increment: bool) -> Self {
        Self {
            key_path: key_path.map(str::to_string),
            auto_increment,
            next_key: 1,
            indexes: Vec::new(),
            records: BTreeMap::new(),
        }
    }

    fn generate_key(&mut self) -> Key {
        let key = Key::Number(self.next_key);
        self.next_key += 1;
        key
    }

    fn resolve_key(&mut self, value: &mut Value, key: Option<&Key>) -> Result<Key> {
        let Some(path) = self.key_path.clone() else {
            return match key {
                Some(key) => Ok(key.clone()),
                None if self.auto_increment => Ok(self.generate_key()),
                None => Err(IndexedDbError::InvalidKey(
                    "store has no key path, a key is required".into(),
                )),
            };
        };

        if key.is_some() {
            return Err(IndexedDbError::InvalidKey(format!(
                "store uses key path {}, explicit keys are not allowed",
                path
            )));
        }

        let inline = value
            .get(&path)
            .map(Key::from_value)
            .transpose()
            .map_err(|e| IndexedDbError::InvalidKey(e.to_string()))?;

        match inline {
            Some(key) => Ok(key),
            None if self.auto_increment => {
                let key = self.generate_key();
                let record = value.as_object_mut().ok_or_else(|| {
                    IndexedDbError::InvalidKey("generated keys need an object record".into())
                })?;
                record.insert(path, key.to_value());
                Ok(key)
            }
            None => Err(IndexedDbError::InvalidKey(format!(
                "record has no {} field",
                path
            ))),
        }
    }

    fn check_unique(&self, key: &Key, value: &Value) -> Result<()> {
        for (index, _) in self.indexes.iter().filter(|(_, unique)| *unique) {
            let Some(field) = value.get(index) else {
                continue;
            };
            let clash = self
                .records
                .iter()
                .any(|(k, v)| k != key && v.get(index) == Some(field));
            if clash {
                return Err(IndexedDbError::Constraint(format!(
                    "{} = {} violates unique index",
                    index, field
                )));
            }
        }
        Ok(())
    }

    fn write(&mut self, mut value: Value, key: Option<&Key>, overwrite: bool) -> Result<Key> {
        let key = self.resolve_key(&mut value, key)?;
        if !overwrite && self.records.contains_key(&key) {
            return Err(IndexedDbError::Constraint(key.to_string()));
        }
        self.check_unique(&key, &value)?;

        if let Key::Number(n) = key {
            if self.auto_increment && n >= self.next_key {
                self.next_key = n + 1;
            }
        }
        self.records.insert(key.clone(), value);
        Ok(key)
    }

    fn step(&self, step: CursorStep<'_>) -> Option<(Key, Value)> {
        let mut entries: Box<dyn Iterator<Item = (&Key, &Value)> + '_> =
            match (step.direction, step.after) {
                (CursorDirection::Next, Some(after)) => Box::new(
                    self.records
                        .range((Bound::Excluded(after), Bound::Unbounded)),
                ),
                (CursorDirection::Next, None) => Box::new(self.records.iter()),
                (CursorDirection::Prev, Some(after)) => {
                    Box::new(self.records.range(..after).rev())
                }
                (CursorDirection::Prev, None) => Box::new(self.records.iter().rev()),
            };
        entries
            .nth(step.skip)
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}

#[derive(Debug, Default)]
struct MemDatabase {
    version: u32,
    stores: BTreeMap<String, MemStore>,
}

#[derive(Debug, Default)]
struct Engine {
    databases: HashMap<String, MemDatabase>,
    stats: BackendStats,
}

/// Suspend once, as an engine request callback would.
async fn engine_tick() {
    let mut ready = false;
    futures::future::poll_fn(|cx| {
        if ready {
            Poll::Ready(())
        } else {
            ready = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}

/// Stores being reshaped during an upgrade. Committed only if the upgrade
/// callback succeeds.
struct StagedUpgrade {
    stores: BTreeMap<String, MemStore>,
}

impl UpgradeContext for StagedUpgrade {
    fn store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    fn create_store(
        &mut self,
        name: &str,
        key_path: Option<&str>,
        auto_increment: bool,
    ) -> Result<()> {
        if self.stores.contains_key(name) {
            return Err(IndexedDbError::Constraint(format!(
                "store {} already exists",
                name
            )));
        }
        self.stores
            .insert(name.to_string(), MemStore::new(key_path, auto_increment));
        Ok(())
    }

    fn index_names(&self, store: &str) -> Result<Vec<String>> {
        self.stores
            .get(store)
            .map(|s| s.indexes.iter().map(|(name, _)| name.clone()).collect())
            .ok_or_else(|| IndexedDbError::UnknownStore(store.to_string()))
    }

    fn create_index(&mut self, store: &str, name: &str, unique: bool) -> Result<()> {
        let data = self
            .stores
            .get_mut(store)
            .ok_or_else(|| IndexedDbError::UnknownStore(store.to_string()))?;
        if data.indexes.iter().any(|(n, _)| n == name) {
            return Err(IndexedDbError::Constraint(format!(
                "index {}.{} already exists",
                store, name
            )));
        }
        data.indexes.push((name.to_string(), unique));
        if unique {
            // Existing records must already satisfy a new unique index.
            for (key, value) in &data.records {
                data.check_unique(key, value)?;
            }
        }
        Ok(())
    }
}

/// In-memory engine. Cloning shares the underlying databases.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    engine: Arc<Mutex<Engine>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> BackendStats {
        self.engine.lock().stats.clone()
    }

    /// Zero the counters, except for the connections still open.
    pub fn reset_stats(&self) {
        let mut engine = self.engine.lock();
        let active = engine.stats.active_connections;
        engine.stats = BackendStats {
            active_connections: active,
            ..BackendStats::default()
        };
    }

    /// Stored version of a database, if it exists.
    pub fn version_of(&self, name: &str) -> Option<u32> {
        self.engine
            .lock()
            .databases
            .get(name)
            .map(|db| db.version)
            .filter(|v| *v > 0)
    }
}

impl Backend for MemoryBackend {
    type Connection = MemoryConnection;

    async fn open(&self, name: &str, version: u32, upgrade: UpgradeFn) -> Result<MemoryConnection> {
        engine_tick().await;
        if version == 0 {
            return Err(IndexedDbError::Open("version must be at least 1".into()));
        }

        let (current, stores) = {
            let engine = self.engine.lock();
            match engine.databases.get(name) {
                Some(db) => (db.version, db.stores.clone()),
                None => (0, BTreeMap::new()),
            }
        };
        if version < current {
            return Err(IndexedDbError::Version {
                requested: version,
                current,
            });
        }

        if version > current {
            let mut staged = StagedUpgrade { stores };
            upgrade(&mut staged)?;

            let mut guard = self.engine.lock();
            let engine = &mut *guard;
            let db = engine.databases.entry(name.to_string()).or_default();
            db.version = version;
            db.stores = staged.stores;
            engine.stats.upgrades += 1;
            debug!(
                "{} upgraded {} from v{} to v{}",
                prefix::STORE,
                name,
                current,
                version
            );
        }

        let mut engine = self.engine.lock();
        engine.stats.opens += 1;
        engine.stats.active_connections += 1;

        Ok(MemoryConnection {
            name: name.to_string(),
            version,
            engine: Arc::clone(&self.engine),
            closed: AtomicBool::new(false),
        })
    }

    async fn delete_database(&self, name: &str) -> Result<()> {
        engine_tick().await;
        self.engine.lock().databases.remove(name);
        Ok(())
    }
}

/// Connection to an in-memory database.
#[derive(Debug)]
pub struct MemoryConnection {
    name: String,
    version: u32,
    engine: Arc<Mutex<Engine>>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn transaction<T>(
        &self,
        store: &str,
        f: impl FnOnce(&mut MemStore, &mut BackendStats) -> Result<T>,
    ) -> Result<T> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(IndexedDbError::Transaction(format!(
                "connection to {} is closed",
                self.name
            )));
        }
        let mut guard = self.engine.lock();
        let engine = &mut *guard;
        let db = engine.databases.get_mut(&self.name).ok_or_else(|| {
            IndexedDbError::Transaction(format!("database {} was deleted", self.name))
        })?;
        let data = db
            .stores
            .get_mut(store)
            .ok_or_else(|| IndexedDbError::UnknownStore(store.to_string()))?;
        f(data, &mut engine.stats)
    }
}

impl Connection for MemoryConnection {
    fn version(&self) -> u32 {
        self.version
    }

    fn store_names(&self) -> Vec<String> {
        self.engine
            .lock()
            .databases
            .get(&self.name)
            .map(|db| db.stores.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn put(&self, store: &str, value: Value, key: Option<&Key>) -> Result<Key> {
        engine_tick().await;
        self.transaction(store, |data, _| data.write(value, key, true))
    }

    async fn add(&self, store: &str, value: Value, key: Option<&Key>) -> Result<Key> {
        engine_tick().await;
        self.transaction(store, |data, _| data.write(value, key, false))
    }

    async fn get(&self, store: &str, key: &Key) -> Result<Option<Value>> {
        engine_tick().await;
        self.transaction(store, |data, stats| {
            let value = data.records.get(key).cloned();
            if value.is_some() {
                stats.records_read += 1;
            }
            Ok(value)
        })
    }

    async fn delete(&self, store: &str, key: &Key) -> Result<()> {
        engine_tick().await;
        self.transaction(store, |data, _| {
            data.records.remove(key);
            Ok(())
        })
    }

    async fn delete_batch(&self, store: &str, keys: &[Key]) -> Result<()> {
        engine_tick().await;
        self.transaction(store, |data, _| {
            for key in keys {
                data.records.remove(key);
            }
            Ok(())
        })
    }

    async fn count(&self, store: &str) -> Result<usize> {
        engine_tick().await;
        self.transaction(store, |data, _| Ok(data.records.len()))
    }

    async fn clear(&self, store: &str) -> Result<()> {
        engine_tick().await;
        self.transaction(store, |data, _| {
            data.records.clear();
            Ok(())
        })
    }

    async fn cursor_step(&self, store: &str, step: CursorStep<'_>) -> Result<Option<(Key, Value)>> {
        engine_tick().await;
        self.transaction(store, |data, stats| {
            let entry = data.step(step);
            stats.cursor_steps += 1;
            if entry.is_some() {
                stats.records_read += 1;
            }
            Ok(entry)
        })
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut engine = self.engine.lock();
        engine.stats.closes += 1;
        engine.stats.active_connections = engine.stats.active_connections.saturating_sub(1);
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DatabaseSchema, IndexOptions};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::rc::Rc;

    fn schema_upgrade(schema: DatabaseSchema) -> UpgradeFn {
        Rc::new(move |ctx: &mut dyn UpgradeContext| schema.apply(ctx))
    }

    fn users() -> DatabaseSchema {
        DatabaseSchema::new().store(
            "users",
            [
                ("id", IndexOptions::auto_increment()),
                ("email", IndexOptions::unique()),
            ],
        )
    }

    #[tokio::test]
    async fn test_auto_increment_writes_key_path() {
        let backend = MemoryBackend::new();
        let conn = backend.open("db", 1, schema_upgrade(users())).await.unwrap();

        let first = conn.put("users", json!({"email": "a@x"}), None).await.unwrap();
        let explicit = conn
            .put("users", json!({"id": 10, "email": "b@x"}), None)
            .await
            .unwrap();
        let next = conn.put("users", json!({"email": "c@x"}), None).await.unwrap();

        assert_eq!(first, Key::from(1));
        assert_eq!(explicit, Key::from(10));
        assert_eq!(next, Key::from(11));
        assert_eq!(
            conn.get("users", &Key::from(1)).await.unwrap(),
            Some(json!({"email": "a@x", "id": 1}))
        );
    }

    #[tokio::test]
    async fn test_add_and_unique_index_constraints() {
        let backend = MemoryBackend::new();
        let conn = backend.open("db", 1, schema_upgrade(users())).await.unwrap();

        conn.add("users", json!({"id": 1, "email": "a@x"}), None)
            .await
            .unwrap();
        assert!(matches!(
            conn.add("users", json!({"id": 1, "email": "z@x"}), None).await,
            Err(IndexedDbError::Constraint(_))
        ));
        assert!(matches!(
            conn.put("users", json!({"id": 2, "email": "a@x"}), None).await,
            Err(IndexedDbError::Constraint(_))
        ));
        // Replacing a record under its own key keeps its unique value.
        conn.put("users", json!({"id": 1, "email": "a@x", "n": 2}), None)
            .await
            .unwrap();
        assert!(matches!(
            conn.put("users", json!({"email": "q@x"}), Some(&Key::from(5))).await,
            Err(IndexedDbError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_cursor_step_skips_and_reverses() {
        let backend = MemoryBackend::new();
        let schema = DatabaseSchema::new().store("n", [("k", IndexOptions::default())]);
        let conn = backend.open("db", 1, schema_upgrade(schema)).await.unwrap();
        for k in 1..=5 {
            conn.put("n", json!({ "k": k }), None).await.unwrap();
        }

        let three = Key::from(3);
        let step = |direction, after, skip| CursorStep {
            direction,
            after,
            skip,
        };
        let first = conn
            .cursor_step("n", step(CursorDirection::Next, None, 2))
            .await
            .unwrap();
        assert_eq!(first.map(|(k, _)| k), Some(Key::from(3)));

        let prev = conn
            .cursor_step("n", step(CursorDirection::Prev, Some(&three), 0))
            .await
            .unwrap();
        assert_eq!(prev.map(|(k, _)| k), Some(Key::from(2)));

        let past_end = conn
            .cursor_step("n", step(CursorDirection::Next, Some(&three), 5))
            .await
            .unwrap();
        assert!(past_end.is_none());
        assert_eq!(backend.stats().cursor_steps, 3);
        assert_eq!(backend.stats().records_read, 2);
    }

    #[tokio::test]
    async fn test_version_checks_and_failed_upgrade() {
        let backend = MemoryBackend::new();
        let conn = backend.open("db", 2, schema_upgrade(users())).await.unwrap();
        conn.close();

        assert!(matches!(
            backend.open("db", 1, schema_upgrade(users())).await,
            Err(IndexedDbError::Version {
                requested: 1,
                current: 2
            })
        ));

        let failing: UpgradeFn =
            Rc::new(|_: &mut dyn UpgradeContext| Err(IndexedDbError::Open("nope".into())));
        assert!(backend.open("db", 3, failing).await.is_err());
        assert_eq!(backend.version_of("db"), Some(2));
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_operations() {
        let backend = MemoryBackend::new();
        let conn = backend.open("db", 1, schema_upgrade(users())).await.unwrap();
        conn.close();
        conn.close();

        assert!(matches!(
            conn.count("users").await,
            Err(IndexedDbError::Transaction(_))
        ));
        let stats = backend.stats();
        assert_eq!((stats.opens, stats.closes, stats.active_connections), (1, 1, 0));
    }
}
