//! Browser IndexedDB engine using web-sys
//!
//! Wraps the callback-based IndexedDB API into Rust futures using
//! `wasm_bindgen_futures::JsFuture` and `js_sys::Promise`. Records cross the
//! boundary as JSON, so stored values are plain JS objects.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use serde_json::Value;
use storekit::tracing::prefix;
use storekit_core::Key;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbCursorDirection, IdbCursorWithValue, IdbDatabase, IdbFactory, IdbKeyRange, IdbObjectStore,
    IdbOpenDbRequest, IdbRequest, IdbTransaction, IdbTransactionMode,
};

use super::{Backend, Connection, CursorDirection, CursorStep, UpgradeContext, UpgradeFn};
use crate::error::{IndexedDbError, Result};

type UpgradeClosure = Rc<RefCell<Option<Closure<dyn FnMut(web_sys::IdbVersionChangeEvent)>>>>;

type ClosurePair = (
    Closure<dyn FnMut(web_sys::Event)>,
    Closure<dyn FnMut(web_sys::Event)>,
);

/// Get the global IndexedDB factory.
fn idb_factory() -> Result<IdbFactory> {
    let global = js_sys::global();

    let idb: JsValue = js_sys::Reflect::get(&global, &"indexedDB".into())
        .map_err(|_| IndexedDbError::NotAvailable("no indexedDB on global".into()))?;

    if idb.is_undefined() || idb.is_null() {
        return Err(IndexedDbError::NotAvailable(
            "indexedDB is null/undefined".into(),
        ));
    }

    idb.dyn_into::<IdbFactory>()
        .map_err(|_| IndexedDbError::NotAvailable("indexedDB is not IdbFactory".into()))
}

/// Resolve with the request's next result.
///
/// Handlers are installed per call, so a cursor request can be awaited again
/// after `continue`/`advance`.
fn request_to_promise(req: &IdbRequest) -> Promise {
    let req = req.clone();

    Promise::new(&mut move |resolve, reject| {
        let closures: Rc<RefCell<Option<ClosurePair>>> = Rc::new(RefCell::new(None));

        let req_s = req.clone();
        let done_s = closures.clone();
        let on_success = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let result = req_s.result().unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::UNDEFINED, &result);
            *done_s.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let req_e = req.clone();
        let done_e = closures.clone();
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let msg = req_e
                .error()
                .ok()
                .flatten()
                .map(|e| JsValue::from(format!("{}: {}", e.name(), e.message())))
                .unwrap_or_else(|| JsValue::from_str("unknown IDB error"));
            let _ = reject.call1(&JsValue::UNDEFINED, &msg);
            *done_e.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        req.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
        req.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        *closures.borrow_mut() = Some((on_success, on_error));
    })
}

/// Resolve once the transaction commits.
fn transaction_to_promise(tx: &IdbTransaction) -> Promise {
    let tx = tx.clone();

    Promise::new(&mut move |resolve, reject| {
        let closures: Rc<RefCell<Option<ClosurePair>>> = Rc::new(RefCell::new(None));

        let done_c = closures.clone();
        let on_complete = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let _ = resolve.call0(&JsValue::UNDEFINED);
            *done_c.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let tx_e = tx.clone();
        let done_e = closures.clone();
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let msg = tx_e
                .error()
                .map(|e| JsValue::from(format!("{}: {}", e.name(), e.message())))
                .unwrap_or_else(|| JsValue::from_str("transaction error"));
            let _ = reject.call1(&JsValue::UNDEFINED, &msg);
            *done_e.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        tx.set_oncomplete(Some(on_complete.as_ref().unchecked_ref()));
        tx.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        *closures.borrow_mut() = Some((on_complete, on_error));
    })
}

async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    wasm_bindgen_futures::JsFuture::from(request_to_promise(req))
        .await
        .map_err(|e| request_error(&e))
}

async fn await_transaction(tx: &IdbTransaction) -> Result<()> {
    wasm_bindgen_futures::JsFuture::from(transaction_to_promise(tx))
        .await
        .map_err(|e| IndexedDbError::Transaction(js_message(&e)))?;
    Ok(())
}

fn js_message(val: &JsValue) -> String {
    val.as_string().unwrap_or_else(|| format!("{:?}", val))
}

fn request_error(val: &JsValue) -> IndexedDbError {
    let msg = js_message(val);
    if msg.starts_with("ConstraintError") {
        IndexedDbError::Constraint(msg)
    } else if msg.starts_with("DataError") {
        IndexedDbError::InvalidKey(msg)
    } else {
        IndexedDbError::Request(msg)
    }
}

fn key_to_js(key: &Key) -> JsValue {
    match key {
        Key::Number(n) => JsValue::from_f64(*n as f64),
        Key::String(s) => JsValue::from_str(s),
        Key::Array(items) => items.iter().map(key_to_js).collect::<js_sys::Array>().into(),
    }
}

fn js_to_key(val: &JsValue) -> Result<Key> {
    if let Some(n) = val.as_f64() {
        if n.fract() == 0.0 {
            return Ok(Key::Number(n as i64));
        }
        return Err(IndexedDbError::InvalidKey(n.to_string()));
    }
    if let Some(s) = val.as_string() {
        return Ok(Key::String(s));
    }
    if js_sys::Array::is_array(val) {
        return js_sys::Array::from(val)
            .iter()
            .map(|item| js_to_key(&item))
            .collect::<Result<Vec<_>>>()
            .map(Key::Array);
    }
    Err(IndexedDbError::InvalidKey(js_message(val)))
}

fn value_to_js(value: &Value) -> Result<JsValue> {
    let json = serde_json::to_string(value)?;
    js_sys::JSON::parse(&json).map_err(|e| IndexedDbError::JsValue(js_message(&e)))
}

fn js_to_value(val: &JsValue) -> Result<Value> {
    if val.is_undefined() {
        return Ok(Value::Null);
    }
    let json: String = js_sys::JSON::stringify(val)
        .map_err(|e| IndexedDbError::JsValue(js_message(&e)))?
        .into();
    Ok(serde_json::from_str(&json)?)
}

fn string_list(list: &web_sys::DomStringList) -> Vec<String> {
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

/// Schema access during `onupgradeneeded`.
struct BrowserUpgrade {
    db: IdbDatabase,
    tx: IdbTransaction,
}

impl UpgradeContext for BrowserUpgrade {
    fn store_names(&self) -> Vec<String> {
        string_list(&self.db.object_store_names())
    }

    fn create_store(
        &mut self,
        name: &str,
        key_path: Option<&str>,
        auto_increment: bool,
    ) -> Result<()> {
        let params = web_sys::IdbObjectStoreParameters::new();
        if let Some(path) = key_path {
            js_sys::Reflect::set(&params, &"keyPath".into(), &path.into())?;
        }
        js_sys::Reflect::set(&params, &"autoIncrement".into(), &auto_increment.into())?;
        self.db
            .create_object_store_with_optional_parameters(name, &params)
            .map_err(|e| IndexedDbError::Open(format!("create store {}: {:?}", name, e)))?;
        Ok(())
    }

    fn index_names(&self, store: &str) -> Result<Vec<String>> {
        let store = self
            .tx
            .object_store(store)
            .map_err(|_| IndexedDbError::UnknownStore(store.to_string()))?;
        Ok(string_list(&store.index_names()))
    }

    fn create_index(&mut self, store: &str, name: &str, unique: bool) -> Result<()> {
        let object_store = self
            .tx
            .object_store(store)
            .map_err(|_| IndexedDbError::UnknownStore(store.to_string()))?;
        let params = web_sys::IdbIndexParameters::new();
        js_sys::Reflect::set(&params, &"unique".into(), &unique.into())?;
        object_store
            .create_index_with_str_and_optional_parameters(name, name, &params)
            .map_err(|e| IndexedDbError::Open(format!("create index {}.{}: {:?}", store, name, e)))?;
        Ok(())
    }
}

/// The browser's IndexedDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserBackend;

impl BrowserBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for BrowserBackend {
    type Connection = BrowserConnection;

    async fn open(&self, name: &str, version: u32, upgrade: UpgradeFn) -> Result<BrowserConnection> {
        let factory = idb_factory()?;

        let open_req: IdbOpenDbRequest = factory
            .open_with_u32(name, version)
            .map_err(|e| IndexedDbError::Open(format!("{:?}", e)))?;

        let upgrade_closure: UpgradeClosure = Rc::new(RefCell::new(None));
        let upgrade_error: Rc<RefCell<Option<IndexedDbError>>> = Rc::new(RefCell::new(None));

        let req_u = open_req.clone();
        let error_slot = upgrade_error.clone();
        let db_name = name.to_string();
        let on_upgrade = Closure::wrap(Box::new(move |event: web_sys::IdbVersionChangeEvent| {
            let outcome = (|| -> Result<()> {
                let db: IdbDatabase = req_u.result()?.dyn_into().map_err(|_| {
                    IndexedDbError::Open("upgrade result is not IdbDatabase".into())
                })?;
                let tx = req_u
                    .transaction()
                    .ok_or_else(|| IndexedDbError::Open("upgrade has no transaction".into()))?;
                debug!(
                    "{} upgrading {} from v{}",
                    prefix::STORE,
                    db_name,
                    event.old_version()
                );
                let mut ctx = BrowserUpgrade { db, tx };
                let result = upgrade(&mut ctx);
                if result.is_err() {
                    let _ = ctx.tx.abort();
                }
                result
            })();
            if let Err(e) = outcome {
                *error_slot.borrow_mut() = Some(e);
            }
        }) as Box<dyn FnMut(web_sys::IdbVersionChangeEvent)>);

        open_req.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));
        *upgrade_closure.borrow_mut() = Some(on_upgrade);

        let result = wasm_bindgen_futures::JsFuture::from(request_to_promise(open_req.unchecked_ref()))
            .await;
        *upgrade_closure.borrow_mut() = None;

        if let Some(e) = upgrade_error.borrow_mut().take() {
            return Err(e);
        }
        let db = result
            .map_err(|e| {
                let msg = js_message(&e);
                if msg.starts_with("VersionError") {
                    IndexedDbError::Version {
                        requested: version,
                        current: 0,
                    }
                } else {
                    IndexedDbError::Open(msg)
                }
            })?
            .dyn_into::<IdbDatabase>()
            .map_err(|_| IndexedDbError::Open("result is not IdbDatabase".into()))?;

        Ok(BrowserConnection { db })
    }

    async fn delete_database(&self, name: &str) -> Result<()> {
        let factory = idb_factory()?;
        let req = factory
            .delete_database(name)
            .map_err(|e| IndexedDbError::Open(format!("delete db: {:?}", e)))?;
        await_request(req.unchecked_ref()).await?;
        Ok(())
    }
}

/// An open browser database.
#[derive(Debug)]
pub struct BrowserConnection {
    db: IdbDatabase,
}

impl BrowserConnection {
    fn begin(&self, store: &str, mode: IdbTransactionMode) -> Result<(IdbTransaction, IdbObjectStore)> {
        let tx = self
            .db
            .transaction_with_str_and_mode(store, mode)
            .map_err(|e| {
                if string_list(&self.db.object_store_names()).iter().any(|s| s == store) {
                    IndexedDbError::Transaction(format!("{:?}", e))
                } else {
                    IndexedDbError::UnknownStore(store.to_string())
                }
            })?;
        let object_store = tx
            .object_store(store)
            .map_err(|e| IndexedDbError::Request(format!("{:?}", e)))?;
        Ok((tx, object_store))
    }

    async fn write(&self, store: &str, value: Value, key: Option<&Key>, overwrite: bool) -> Result<Key> {
        let (tx, object_store) = self.begin(store, IdbTransactionMode::Readwrite)?;
        let record = value_to_js(&value)?;
        let req = match (key, overwrite) {
            (Some(key), true) => object_store.put_with_key(&record, &key_to_js(key)),
            (None, true) => object_store.put(&record),
            (Some(key), false) => object_store.add_with_key(&record, &key_to_js(key)),
            (None, false) => object_store.add(&record),
        }
        .map_err(|e| request_error(&e))?;
        let key = await_request(&req).await?;
        await_transaction(&tx).await?;
        js_to_key(&key)
    }
}

impl Connection for BrowserConnection {
    fn version(&self) -> u32 {
        self.db.version() as u32
    }

    fn store_names(&self) -> Vec<String> {
        string_list(&self.db.object_store_names())
    }

    async fn put(&self, store: &str, value: Value, key: Option<&Key>) -> Result<Key> {
        self.write(store, value, key, true).await
    }

    async fn add(&self, store: &str, value: Value, key: Option<&Key>) -> Result<Key> {
        self.write(store, value, key, false).await
    }

    async fn get(&self, store: &str, key: &Key) -> Result<Option<Value>> {
        let (tx, object_store) = self.begin(store, IdbTransactionMode::Readonly)?;
        let req = object_store
            .get(&key_to_js(key))
            .map_err(|e| request_error(&e))?;
        let result = await_request(&req).await?;
        await_transaction(&tx).await?;

        if result.is_undefined() {
            return Ok(None);
        }
        js_to_value(&result).map(Some)
    }

    async fn delete(&self, store: &str, key: &Key) -> Result<()> {
        self.delete_batch(store, std::slice::from_ref(key)).await
    }

    async fn delete_batch(&self, store: &str, keys: &[Key]) -> Result<()> {
        let (tx, object_store) = self.begin(store, IdbTransactionMode::Readwrite)?;
        for key in keys {
            object_store
                .delete(&key_to_js(key))
                .map_err(|e| request_error(&e))?;
        }
        await_transaction(&tx).await
    }

    async fn count(&self, store: &str) -> Result<usize> {
        let (tx, object_store) = self.begin(store, IdbTransactionMode::Readonly)?;
        let req = object_store.count().map_err(|e| request_error(&e))?;
        let result = await_request(&req).await?;
        await_transaction(&tx).await?;
        Ok(result.as_f64().unwrap_or(0.0) as usize)
    }

    async fn clear(&self, store: &str) -> Result<()> {
        let (tx, object_store) = self.begin(store, IdbTransactionMode::Readwrite)?;
        object_store.clear().map_err(|e| request_error(&e))?;
        await_transaction(&tx).await
    }

    /// Each step opens a fresh cursor just past the last key seen, so no
    /// transaction is kept alive while the consumer holds a record.
    async fn cursor_step(&self, store: &str, step: CursorStep<'_>) -> Result<Option<(Key, Value)>> {
        let (_tx, object_store) = self.begin(store, IdbTransactionMode::Readonly)?;

        let range = match (step.after, step.direction) {
            (Some(after), CursorDirection::Next) => {
                Some(IdbKeyRange::lower_bound_with_open(&key_to_js(after), true)?)
            }
            (Some(after), CursorDirection::Prev) => {
                Some(IdbKeyRange::upper_bound_with_open(&key_to_js(after), true)?)
            }
            (None, _) => None,
        };
        let direction = match step.direction {
            CursorDirection::Next => IdbCursorDirection::Next,
            CursorDirection::Prev => IdbCursorDirection::Prev,
        };
        let range = range.map(JsValue::from).unwrap_or(JsValue::UNDEFINED);
        let req = object_store
            .open_cursor_with_range_and_direction(&range, direction)
            .map_err(|e| request_error(&e))?;

        let mut cursor = await_request(&req).await?;
        if step.skip > 0 && !cursor.is_null() {
            // IndexedDB counts at most u32::MAX records per store.
            let Ok(skip) = u32::try_from(step.skip) else {
                return Ok(None);
            };
            let positioned: IdbCursorWithValue = cursor.clone().unchecked_into();
            positioned
                .advance(skip)
                .map_err(|e| request_error(&e))?;
            cursor = await_request(&req).await?;
        }
        if cursor.is_null() || cursor.is_undefined() {
            return Ok(None);
        }

        let cursor: IdbCursorWithValue = cursor.unchecked_into();
        let key = js_to_key(&cursor.primary_key()?)?;
        let value = js_to_value(&cursor.value()?)?;
        Ok(Some((key, value)))
    }

    fn close(&self) {
        self.db.close();
    }
}
