//! Lifecycle wrapper around one persistent database

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use storekit::tracing::prefix;
use storekit::StoreKitConfig;
use storekit_core::{DeleteMode, DeleteReport, Key, StatusHolder, StoreError, StoreResult};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Connection, UpgradeContext, UpgradeFn};
use crate::cursor::{RecordCursor, RecordsQuery};
use crate::error::IndexedDbError;
use crate::schema::DatabaseSchema;

/// Connection state of an [`IndexedDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DbState {
    #[default]
    Closed,
    Opening,
    Open,
}

impl DbState {
    pub const ALL: [DbState; 3] = [DbState::Closed, DbState::Opening, DbState::Open];

    pub fn as_str(&self) -> &'static str {
        match self {
            DbState::Closed => "closed",
            DbState::Opening => "opening",
            DbState::Open => "open",
        }
    }
}

impl FromStr for DbState {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DbState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| StoreError::UnknownVariant {
                kind: "database state",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for DbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, versioned database with a declared schema.
///
/// The schema is applied additively whenever the database is opened at a
/// newer version than the one stored.
pub struct IndexedDatabase<B: Backend> {
    name: String,
    version: u32,
    schema: Rc<DatabaseSchema>,
    backend: B,
    status: StatusHolder<DbState>,
    connection: Mutex<Option<Arc<B::Connection>>>,
    open_lock: futures::lock::Mutex<()>,
}

impl<B: Backend> IndexedDatabase<B> {
    pub fn new(name: impl Into<String>, version: u32, schema: DatabaseSchema, backend: B) -> Self {
        Self {
            name: name.into(),
            version,
            schema: Rc::new(schema),
            backend,
            status: StatusHolder::new(DbState::Closed),
            connection: Mutex::new(None),
            open_lock: futures::lock::Mutex::new(()),
        }
    }

    /// Create a database at the configured `database_version`.
    pub fn from_config(
        name: impl Into<String>,
        schema: DatabaseSchema,
        backend: B,
        config: &StoreKitConfig,
    ) -> Self {
        Self::new(name, config.database_version, schema, backend)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> DbState {
        self.status.get()
    }

    pub fn status(&self) -> &StatusHolder<DbState> {
        &self.status
    }

    /// Open the connection. Does nothing when already open.
    ///
    /// Concurrent callers are not coordinated here; use
    /// [`open_if_closed`](Self::open_if_closed) for that.
    pub async fn open(&self) -> StoreResult<()> {
        if self.status.is(DbState::Open) {
            return Ok(());
        }
        self.status.set(DbState::Opening);

        let schema = Rc::clone(&self.schema);
        let upgrade: UpgradeFn = Rc::new(move |ctx: &mut dyn UpgradeContext| schema.apply(ctx));

        match self.backend.open(&self.name, self.version, upgrade).await {
            Ok(conn) => {
                if let Some(previous) = self.connection.lock().replace(Arc::new(conn)) {
                    previous.close();
                }
                self.status.set(DbState::Open);
                info!("{} opened {} v{}", prefix::OPEN, self.name, self.version);
                Ok(())
            }
            Err(e) => {
                self.status.set(DbState::Closed);
                warn!("{} failed to open {}: {}", prefix::STORE, self.name, e);
                Err(e.into())
            }
        }
    }

    /// Open unless already open, serialising concurrent openers.
    pub async fn open_if_closed(&self) -> StoreResult<()> {
        let _guard = self.open_lock.lock().await;
        if self.status.is(DbState::Open) {
            return Ok(());
        }
        self.open().await
    }

    /// Close the connection. Cursors created from it stop working.
    pub fn close(&self) {
        let conn = self.connection.lock().take();
        if let Some(conn) = conn {
            conn.close();
            debug!("{} closed {}", prefix::CLOSE, self.name);
        }
        self.status.set(DbState::Closed);
    }

    /// Close and remove the whole database.
    pub async fn delete_database(&self) -> StoreResult<()> {
        self.close();
        self.backend.delete_database(&self.name).await?;
        info!("{} deleted {}", prefix::STORE, self.name);
        Ok(())
    }

    fn connection(&self) -> StoreResult<Arc<B::Connection>> {
        self.connection.lock().clone().ok_or_else(|| {
            IndexedDbError::Transaction(format!("database {} is not open", self.name)).into()
        })
    }

    /// Key path of a store, read from the schema.
    pub fn key_path(&self, store: &str) -> Option<&str> {
        self.schema.get(store).and_then(|s| s.key_path())
    }

    pub fn store_names(&self) -> StoreResult<Vec<String>> {
        Ok(self.connection()?.store_names())
    }

    /// Insert or replace a record and return its key.
    pub async fn put_record(&self, store: &str, value: Value, key: Option<&Key>) -> StoreResult<Key> {
        let conn = self.connection()?;
        Ok(conn.put(store, value, key).await?)
    }

    /// Insert a record, failing with `Duplicate` when its key is taken.
    pub async fn add_record(&self, store: &str, value: Value, key: Option<&Key>) -> StoreResult<Key> {
        let conn = self.connection()?;
        Ok(conn.add(store, value, key).await?)
    }

    /// `Ok(None)` when there is no record under `key`.
    pub async fn get_record(&self, store: &str, key: &Key) -> StoreResult<Option<Value>> {
        let conn = self.connection()?;
        Ok(conn.get(store, key).await?)
    }

    /// Delete a record. With `check_existence`, a missing key is `NotFound`.
    pub async fn delete_record(&self, store: &str, key: &Key, check_existence: bool) -> StoreResult<()> {
        let conn = self.connection()?;
        if check_existence && conn.get(store, key).await?.is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(conn.delete(store, key).await?)
    }

    /// Delete several records.
    ///
    /// With `check_existence`, each key is checked and deleted on its own and
    /// missing keys land in `not_found_keys`. Otherwise all keys go through a
    /// single transaction that succeeds or fails as a whole. A failure ends
    /// the batch with `Err` in [`DeleteMode::FailFast`] and is recorded per
    /// key in [`DeleteMode::Settled`].
    pub async fn delete_multiple_records(
        &self,
        store: &str,
        keys: &[Key],
        mode: DeleteMode,
        check_existence: bool,
    ) -> StoreResult<DeleteReport<Key>> {
        let conn = self.connection()?;
        let mut report = DeleteReport::new();

        if !check_existence {
            match conn.delete_batch(store, keys).await {
                Ok(()) => report.success_keys.extend(keys.iter().cloned()),
                Err(e) if mode == DeleteMode::FailFast => return Err(e.into()),
                Err(e) => {
                    let err = StoreError::from(e);
                    report
                        .errors
                        .extend(keys.iter().map(|k| (k.clone(), err.clone())));
                }
            }
            return Ok(report);
        }

        for key in keys {
            let outcome = match conn.get(store, key).await {
                Ok(None) => Ok(false),
                Ok(Some(_)) => conn.delete(store, key).await.map(|()| true),
                Err(e) => Err(e),
            };
            match outcome {
                Err(e) if mode == DeleteMode::FailFast => return Err(e.into()),
                outcome => report.record(key.clone(), outcome.map_err(StoreError::from)),
            }
        }

        debug!(
            "{} deleted {}/{} from {}.{} ({} not found)",
            prefix::STORE,
            report.success_count(),
            keys.len(),
            self.name,
            store,
            report.not_found_keys.len()
        );
        Ok(report)
    }

    pub async fn record_count(&self, store: &str) -> StoreResult<usize> {
        let conn = self.connection()?;
        Ok(conn.count(store).await?)
    }

    pub async fn clear_store(&self, store: &str) -> StoreResult<()> {
        let conn = self.connection()?;
        Ok(conn.clear(store).await?)
    }

    /// Lazy cursor over a store's records.
    pub fn records(&self, store: &str, query: RecordsQuery) -> StoreResult<RecordCursor<'static, B::Connection>> {
        Ok(RecordCursor::new(self.connection()?, store, query))
    }
}

impl<B: Backend> fmt::Debug for IndexedDatabase<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedDatabase")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("state", &self.state())
            .finish()
    }
}
