//! Store manager tests over the public API

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use storekit_core::{
    AddOptions, ArrayStoreManager, ObjectStoreManager, SearchOptions, SearchParams, SortOrder,
    StoreError, StoreEvent,
};

fn letters(n: usize) -> Vec<Value> {
    (b'a'..).take(n).map(|c| json!((c as char).to_string())).collect()
}

fn numbers() -> ArrayStoreManager {
    ArrayStoreManager::from_vec(
        ["One", "Two", "Three", "Four", "Five"]
            .iter()
            .map(|s| json!(s))
            .collect(),
    )
}

#[test]
fn test_array_add_delete_roundtrip() {
    let mut store = ArrayStoreManager::default();

    let key = store.add(json!("first"), None, AddOptions::default()).unwrap();
    assert_eq!(key, 0);
    assert_eq!(store.get(&0), Some(&json!("first")));

    assert!(store.delete(&key, None).unwrap());
    assert!(store.is_empty());
    assert!(!store.delete(&key, None).unwrap());
}

#[test]
fn test_array_delete_many_then_add() {
    let mut store = ArrayStoreManager::from_vec(letters(7));

    let report = store.delete_many(&[1, 2], Some("trim"));
    assert_eq!(report.success_keys, vec![1, 2]);
    assert_eq!(report.error_count(), 0);
    assert!(report.not_found_keys.is_empty());

    let remaining: Vec<&Value> = store.entries().map(|(_, v)| v).collect();
    assert_eq!(
        remaining,
        vec![&json!("a"), &json!("d"), &json!("e"), &json!("f"), &json!("g")]
    );

    // Keys stay dense after the batch.
    let key = store.add(json!("h"), None, AddOptions::default()).unwrap();
    assert_eq!(key, 5);
    assert_eq!(store.get(&5), Some(&json!("h")));
}

#[test]
fn test_array_delete_many_accounts_for_every_key() {
    let mut store = ArrayStoreManager::from_vec(letters(4));

    let report = store.delete_many(&[2, 2, 0], None);
    assert_eq!(report.success_keys, vec![0, 2]);
    assert_eq!(report.not_found_keys, vec![2]);
    assert_eq!(
        report.success_keys.len() + report.not_found_keys.len() + report.error_count(),
        3
    );
    assert_eq!(store.size(), 2);
}

#[test]
fn test_array_insert_at_position() {
    let mut store = ArrayStoreManager::from_vec(letters(3));
    let key = store.add(json!("z"), None, AddOptions::at(1)).unwrap();
    assert_eq!(key, 1);
    assert_eq!(store.get(&2), Some(&json!("b")));

    assert_eq!(
        store.add(json!("y"), None, AddOptions::at(10)).unwrap_err(),
        StoreError::InvalidPosition { position: 10, len: 4 }
    );
}

#[test]
fn test_search_highlighting() {
    let outcome = numbers()
        .apply_search_params(&SearchParams::new().search("e"))
        .unwrap();

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.keys().copied().collect::<Vec<_>>(), vec![0, 2, 4]);
    assert_eq!(
        outcome.values().cloned().collect::<Vec<_>>(),
        vec![
            json!("On<mark>e</mark>"),
            json!("Thr<mark>e</mark><mark>e</mark>"),
            json!("Fiv<mark>e</mark>"),
        ]
    );
    assert_eq!(outcome.applied_params.search.as_deref(), Some("e"));
}

#[test]
fn test_search_without_matches_reports_store_size() {
    let outcome = numbers()
        .apply_search_params(&SearchParams::new().search("xyz"))
        .unwrap();
    assert!(outcome.result.is_empty());
    assert_eq!(outcome.total, 5);
}

#[test]
fn test_search_sort_and_paginate() {
    let params = SearchParams::new()
        .search("o")
        .order(SortOrder::Desc)
        .page(2, 1);
    let outcome = numbers().apply_search_params(&params).unwrap();

    // "One", "Two", "Four" match; sorted desc: Two, One, Four.
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.result, vec![(0, json!("<mark>O</mark>ne"))]);
    assert_eq!(outcome.applied_params.page, Some(2));
    assert_eq!(outcome.applied_params.per_page, Some(1));
    assert_eq!(outcome.applied_params.order, Some(SortOrder::Desc));
}

#[test]
fn test_page_past_end_is_empty() {
    let outcome = numbers()
        .apply_search_params(&SearchParams::new().page(4, 2))
        .unwrap();
    assert!(outcome.result.is_empty());
    assert_eq!(outcome.total, 5);
}

#[test]
fn test_invalid_paging_params() {
    let store = numbers();
    assert_eq!(
        store
            .apply_search_params(&SearchParams::new().page(1, 0))
            .unwrap_err(),
        StoreError::InvalidPerPage
    );
    assert!(store
        .apply_search_params(&SearchParams::new().page(0, 2))
        .unwrap_err()
        .is_validation());
}

#[test]
fn test_object_search_by_field_keeps_original() {
    let mut store = ObjectStoreManager::default()
        .with_search_options(SearchOptions::default().keep_original(true));
    store
        .add(json!({"name": "Zoë", "city": "Oslo"}), Some("u1".into()), AddOptions::default())
        .unwrap();
    store
        .add(json!({"name": "Noah", "city": "Rome"}), Some("u2".into()), AddOptions::default())
        .unwrap();

    let outcome = store
        .apply_search_params(&SearchParams::new().search("oe"))
        .unwrap();

    assert_eq!(outcome.total, 1);
    assert_eq!(
        outcome.result[0],
        (
            "u1".to_string(),
            json!({
                "name": {"original": "Zoë", "marked": "Z<mark>oë</mark>"},
                "city": "Oslo"
            })
        )
    );
}

#[test]
fn test_listener_sees_delete_many_once() {
    let mut store = ArrayStoreManager::from_vec(letters(4));
    let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    store.events().on(move |e: &StoreEvent<usize>| sink.lock().push(e.clone()));

    store.delete_many(&[0, 3, 9], Some("batch"));

    assert_eq!(
        *seen.lock(),
        vec![
            StoreEvent::DeleteMany {
                keys: vec![0, 3],
                total: 2,
                reason: Some("batch".to_string()),
            },
            StoreEvent::DeleteNotFound {
                keys: vec![9],
                total: 1,
            },
        ]
    );
}
