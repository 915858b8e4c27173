//! Open → operate → close coordination
//!
//! [`IndexedDatabaseManager`] runs every operation inside a frame that opens
//! the database if needed and counts itself as an open request. The last
//! frame to finish closes the connection, so back-to-back or concurrent
//! operations share one connection.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use storekit::tracing::prefix;
use storekit_core::search::marked;
use storekit_core::{search_value_in, DeleteMode, DeleteReport, Key, SearchOptions, StoreResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::backend::{Backend, CursorDirection};
use crate::cursor::{CursorItem, RecordsQuery};
use crate::database::IndexedDatabase;
use crate::tasks::TaskRunner;

/// Options for [`IndexedDatabaseManager::records_with_search_term`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTermQuery {
    /// Only search these properties of object records
    pub fields: Option<Vec<String>>,
    pub options: SearchOptions,
    pub return_pairs: bool,
    pub direction: CursorDirection,
}

impl SearchTermQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pairs(mut self) -> Self {
        self.return_pairs = true;
        self
    }

    pub fn direction(mut self, direction: CursorDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Decrements the open-request count when a frame ends, however it ends.
struct OpenRequest<'m, B: Backend> {
    manager: &'m IndexedDatabaseManager<B>,
}

impl<B: Backend> Drop for OpenRequest<'_, B> {
    fn drop(&mut self) {
        let remaining = self.manager.open_requests.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            trace!("{} last open request finished", prefix::TASK);
            self.manager.database.close();
        }
    }
}

/// Coordinates access to one [`IndexedDatabase`].
#[derive(Debug)]
pub struct IndexedDatabaseManager<B: Backend> {
    database: IndexedDatabase<B>,
    open_requests: AtomicUsize,
}

impl<B: Backend> IndexedDatabaseManager<B> {
    pub fn new(database: IndexedDatabase<B>) -> Self {
        Self {
            database,
            open_requests: AtomicUsize::new(0),
        }
    }

    pub fn database(&self) -> &IndexedDatabase<B> {
        &self.database
    }

    /// Frames currently holding the connection open.
    pub fn open_requests_count(&self) -> usize {
        self.open_requests.load(Ordering::SeqCst)
    }

    /// Run `work` as the `task` step of an open → task series.
    ///
    /// `work` is not polled until the database is open.
    async fn frame<T>(
        &self,
        token: &CancellationToken,
        task: &str,
        work: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        self.open_requests.fetch_add(1, Ordering::SeqCst);
        let _request = OpenRequest { manager: self };

        let runner = TaskRunner::new(token);
        runner.step("open", self.database.open_if_closed()).await?;
        runner.step(task, work).await
    }

    pub fn key_path(&self, store: &str) -> Option<&str> {
        self.database.key_path(store)
    }

    pub async fn store_names(&self, token: &CancellationToken) -> StoreResult<Vec<String>> {
        self.frame(token, "store_names", async { self.database.store_names() })
            .await
    }

    pub async fn put_record(
        &self,
        store: &str,
        value: Value,
        key: Option<&Key>,
        token: &CancellationToken,
    ) -> StoreResult<Key> {
        self.frame(token, "put_record", self.database.put_record(store, value, key))
            .await
    }

    pub async fn add_record(
        &self,
        store: &str,
        value: Value,
        key: Option<&Key>,
        token: &CancellationToken,
    ) -> StoreResult<Key> {
        self.frame(token, "add_record", self.database.add_record(store, value, key))
            .await
    }

    pub async fn get_record(
        &self,
        store: &str,
        key: &Key,
        token: &CancellationToken,
    ) -> StoreResult<Option<Value>> {
        self.frame(token, "get_record", self.database.get_record(store, key))
            .await
    }

    pub async fn delete_record(
        &self,
        store: &str,
        key: &Key,
        check_existence: bool,
        token: &CancellationToken,
    ) -> StoreResult<()> {
        self.frame(
            token,
            "delete_record",
            self.database.delete_record(store, key, check_existence),
        )
        .await
    }

    pub async fn delete_multiple_records(
        &self,
        store: &str,
        keys: &[Key],
        mode: DeleteMode,
        check_existence: bool,
        token: &CancellationToken,
    ) -> StoreResult<DeleteReport<Key>> {
        self.frame(
            token,
            "delete_multiple_records",
            self.database
                .delete_multiple_records(store, keys, mode, check_existence),
        )
        .await
    }

    pub async fn record_count(&self, store: &str, token: &CancellationToken) -> StoreResult<usize> {
        self.frame(token, "record_count", self.database.record_count(store))
            .await
    }

    pub async fn clear_store(&self, store: &str, token: &CancellationToken) -> StoreResult<()> {
        self.frame(token, "clear_store", self.database.clear_store(store))
            .await
    }

    /// Read records, draining the cursor before the frame closes.
    pub async fn records(
        &self,
        store: &str,
        query: RecordsQuery,
        token: &CancellationToken,
    ) -> StoreResult<Vec<CursorItem>> {
        self.frame(token, "records", async {
            self.database.records(store, query)?.collect_all().await
        })
        .await
    }

    /// Records with at least one match of `term`, marked.
    ///
    /// Pair keys are taken from the record's own key-path value (looking
    /// through a kept-original wrapper), falling back to the cursor key.
    pub async fn records_with_search_term(
        &self,
        store: &str,
        term: &str,
        query: SearchTermQuery,
        token: &CancellationToken,
    ) -> StoreResult<Vec<CursorItem>> {
        let key_path = self.database.key_path(store);
        let records = RecordsQuery::new()
            .direction(query.direction)
            .pairs();
        let SearchTermQuery {
            fields,
            options,
            return_pairs,
            ..
        } = query;

        let items = self
            .frame(token, "records_with_search_term", async {
                self.database
                    .records(store, records)?
                    .with_filter(|_, value| search_value_in(&value, term, &options, fields.as_deref()))
                    .collect_all()
                    .await
            })
            .await?;

        debug!(
            "{} {} records in {} match {:?}",
            prefix::STORE,
            items.len(),
            store,
            term
        );

        Ok(items
            .into_iter()
            .filter_map(CursorItem::into_pair)
            .map(|(cursor_key, value)| {
                if !return_pairs {
                    return CursorItem::Record(value);
                }
                let key = key_path
                    .and_then(|path| value.get(path))
                    .map(marked::unwrap_original)
                    .and_then(|v| Key::from_value(v).ok())
                    .unwrap_or(cursor_key);
                CursorItem::Pair(key, value)
            })
            .collect())
    }
}
