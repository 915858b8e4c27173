//! Store manager over one persistent object store
//!
//! [`IndexedDbStoreManager`] offers the same surface as the in-memory
//! managers, asynchronously. Every call goes through the shared
//! [`IndexedDatabaseManager`], so the connection is opened on demand and
//! closed once no call is in flight.

use std::rc::Rc;

use serde_json::Value;
use storekit::tracing::prefix;
use storekit_core::pipeline::{self, Hit};
use storekit_core::search::marked;
use storekit_core::{
    AppliedParams, DeleteMode, DeleteReport, EventEmitter, Key, SearchOptions, SearchOutcome,
    SearchParams, SortOrder, StoreError, StoreEvent, StoreResult,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::Backend;
use crate::cursor::{CursorItem, RecordsQuery};
use crate::manager::{IndexedDatabaseManager, SearchTermQuery};

/// Async store manager for one object store.
#[derive(Debug)]
pub struct IndexedDbStoreManager<B: Backend> {
    manager: Rc<IndexedDatabaseManager<B>>,
    store: String,
    events: EventEmitter<StoreEvent<Key>>,
    search: SearchOptions,
    token: CancellationToken,
}

impl<B: Backend> IndexedDbStoreManager<B> {
    pub fn new(manager: Rc<IndexedDatabaseManager<B>>, store: impl Into<String>) -> Self {
        Self {
            manager,
            store: store.into(),
            events: EventEmitter::new(),
            search: SearchOptions::default(),
            token: CancellationToken::new(),
        }
    }

    pub fn with_search_options(mut self, options: SearchOptions) -> Self {
        self.search = options;
        self
    }

    pub fn store(&self) -> &str {
        &self.store
    }

    pub fn events(&self) -> &EventEmitter<StoreEvent<Key>> {
        &self.events
    }

    pub fn search_options(&self) -> &SearchOptions {
        &self.search
    }

    /// Cancelling this token aborts every call in flight and every later
    /// call.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Add a record, failing with `Duplicate` when its key is taken.
    ///
    /// A key supplied for a store with a key path is written into the
    /// record, which must then be an object.
    pub async fn add(&self, element: Value, key: Option<Key>) -> StoreResult<Key> {
        let mut record = element.clone();
        let explicit = match (key, self.manager.key_path(&self.store)) {
            (Some(key), Some(path)) => {
                let Value::Object(fields) = &mut record else {
                    return Err(StoreError::InvalidKey(format!(
                        "{} needs an object record to hold key path {:?}",
                        key, path
                    )));
                };
                fields.insert(path.to_string(), key.to_value());
                None
            }
            (key, _) => key,
        };

        let stored = self
            .manager
            .add_record(&self.store, record, explicit.as_ref(), &self.token)
            .await
            .map_err(surface)?;

        self.events.emit(&StoreEvent::Add {
            element,
            key: Some(stored.clone()),
            position: None,
        });
        Ok(stored)
    }

    /// Delete one record. `Ok(false)` when it does not exist.
    pub async fn delete(&self, key: &Key, reason: Option<&str>) -> StoreResult<bool> {
        match self
            .manager
            .delete_record(&self.store, key, true, &self.token)
            .await
        {
            Ok(()) => {}
            Err(e) if matches!(e.cause(), StoreError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        }

        self.events.emit(&StoreEvent::Delete {
            key: key.clone(),
            // One record removed; see `StoreEvent::Delete::total`.
            total: 1,
            reason: reason.map(str::to_string),
        });
        Ok(true)
    }

    /// Delete several records, reporting each key's outcome.
    pub async fn delete_many(
        &self,
        keys: &[Key],
        reason: Option<&str>,
    ) -> StoreResult<DeleteReport<Key>> {
        let report = self
            .manager
            .delete_multiple_records(&self.store, keys, DeleteMode::Settled, true, &self.token)
            .await?;

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
        Ok(report)
    }

    pub async fn has_key(&self, key: &Key) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    pub async fn get(&self, key: &Key) -> StoreResult<Option<Value>> {
        self.manager
            .get_record(&self.store, key, &self.token)
            .await
    }

    pub async fn size(&self) -> StoreResult<usize> {
        self.manager.record_count(&self.store, &self.token).await
    }

    /// Search, sort and paginate the store.
    pub async fn apply_search_params(&self, params: &SearchParams) -> StoreResult<SearchOutcome<Key>> {
        self.apply_search_params_with(params, AppliedParams::default())
            .await
    }

    /// Like [`apply_search_params`](Self::apply_search_params), continuing
    /// from parameters an outer stage already applied.
    ///
    /// A plain page in natural order is read straight from the cursor.
    /// Anything else is materialised and run through the shared pipeline.
    pub async fn apply_search_params_with(
        &self,
        params: &SearchParams,
        mut applied: AppliedParams,
    ) -> StoreResult<SearchOutcome<Key>> {
        pipeline::validate_params(params)?;

        if let Some((page, per_page)) = params.paging() {
            if params.search_term().is_none() && params.order == Some(SortOrder::Natural) {
                return self.natural_page(page, per_page, applied).await;
            }
        }

        let hits = match params.search_term() {
            Some(term) => {
                applied.search = Some(term.to_string());
                self.search_hits(term).await?
            }
            None => self
                .manager
                .records(&self.store, RecordsQuery::new().pairs(), &self.token)
                .await?
                .into_iter()
                .filter_map(CursorItem::into_pair)
                .map(|(key, value)| Hit::unmarked(key, value))
                .collect(),
        };

        let store_total = if hits.is_empty() { self.size().await? } else { 0 };
        pipeline::finish(hits, store_total, params, applied)
    }

    async fn natural_page(
        &self,
        page: usize,
        per_page: usize,
        mut applied: AppliedParams,
    ) -> StoreResult<SearchOutcome<Key>> {
        let total = self.size().await?;
        applied.order = Some(SortOrder::Natural);
        // No store holds enough records to reach an offset past usize.
        let Some(offset) = (page - 1).checked_mul(per_page) else {
            return Ok(SearchOutcome {
                result: Vec::new(),
                total,
                applied_params: applied,
            });
        };
        let query = RecordsQuery::new().offset(offset).limit(per_page).pairs();
        let result: Vec<(Key, Value)> = self
            .manager
            .records(&self.store, query, &self.token)
            .await?
            .into_iter()
            .filter_map(CursorItem::into_pair)
            .collect();

        debug!(
            "{} page {} of {} read {} records from cursor",
            prefix::STORE,
            page,
            self.store,
            result.len()
        );
        Ok(SearchOutcome {
            result,
            total,
            applied_params: applied,
        })
    }

    /// Matching records, keeping the unmarked form for sorting.
    async fn search_hits(&self, term: &str) -> StoreResult<Vec<Hit<Key>>> {
        let query = SearchTermQuery::new()
            .options(self.search.clone().keep_original(true))
            .pairs();
        let items = self
            .manager
            .records_with_search_term(&self.store, term, query, &self.token)
            .await?;

        Ok(items
            .into_iter()
            .filter_map(CursorItem::into_pair)
            .map(|(key, value)| Hit {
                key,
                original: marked::original_of(&value),
                value: if self.search.keep_original {
                    value
                } else {
                    marked::marked_of(&value)
                },
            })
            .collect())
    }
}

/// Errors the caller can act on are reported without the task wrapper.
fn surface(err: StoreError) -> StoreError {
    match err.cause() {
        cause @ (StoreError::Duplicate(_) | StoreError::InvalidKey(_)) => cause.clone(),
        _ => err,
    }
}
