//! The search → sort → paginate pipeline behind `apply_search_params`.
//!
//! Shared by the in-memory managers (which feed it their collection
//! directly) and the persistent manager (which feeds it materialised cursor
//! output).

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::paging::{page_count_for, PagingCalculator};
use crate::params::{AppliedParams, SearchOutcome, SearchParams, SortOrder};
use crate::search::{search_value, SearchOptions};

/// An entry that survived the search stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<K> {
    pub key: K,
    /// Unmarked element, used for sorting
    pub original: Value,
    /// Element as returned to the caller (marked when searched)
    pub value: Value,
}

impl<K> Hit<K> {
    pub fn unmarked(key: K, value: Value) -> Self {
        Self {
            key,
            original: value.clone(),
            value,
        }
    }
}

/// Reject paging parameters that can never be valid.
pub fn validate_params(params: &SearchParams) -> StoreResult<()> {
    if params.per_page == Some(0) {
        return Err(StoreError::InvalidPerPage);
    }
    if params.page == Some(0) {
        return Err(StoreError::InvalidPage {
            page: 0,
            max_page: 0,
        });
    }
    Ok(())
}

/// Run the whole pipeline over `entries` in a single pass.
pub fn apply_to_entries<'a, K, I>(
    entries: I,
    params: &SearchParams,
    opts: &SearchOptions,
    mut applied: AppliedParams,
) -> StoreResult<SearchOutcome<K>>
where
    I: IntoIterator<Item = (K, &'a Value)>,
{
    validate_params(params)?;
    let (hits, scanned) = collect_hits(entries, params, opts, &mut applied);
    finish(hits, scanned, params, applied)
}

/// Search stage. Returns the surviving entries and how many were inspected.
pub fn collect_hits<'a, K, I>(
    entries: I,
    params: &SearchParams,
    opts: &SearchOptions,
    applied: &mut AppliedParams,
) -> (Vec<Hit<K>>, usize)
where
    I: IntoIterator<Item = (K, &'a Value)>,
{
    let mut scanned = 0;
    let mut hits = Vec::new();

    match params.search_term() {
        Some(term) => {
            applied.search = Some(term.to_string());
            for (key, value) in entries {
                scanned += 1;
                if let Some(marked) = search_value(value, term, opts) {
                    hits.push(Hit {
                        key,
                        original: value.clone(),
                        value: marked,
                    });
                }
            }
        }
        None => {
            for (key, value) in entries {
                scanned += 1;
                hits.push(Hit::unmarked(key, value.clone()));
            }
        }
    }

    (hits, scanned)
}

/// Sort and paginate stages.
///
/// `store_total` is reported as the total when nothing survived the search,
/// so callers can tell "no matches" from "empty store".
pub fn finish<K>(
    mut hits: Vec<Hit<K>>,
    store_total: usize,
    params: &SearchParams,
    mut applied: AppliedParams,
) -> StoreResult<SearchOutcome<K>> {
    if hits.is_empty() {
        return Ok(SearchOutcome {
            result: Vec::new(),
            total: store_total,
            applied_params: applied,
        });
    }

    sort_hits(&mut hits, params, &mut applied);

    let total = hits.len();
    let hits = paginate(hits, params, &mut applied)?;

    Ok(SearchOutcome {
        result: hits.into_iter().map(|h| (h.key, h.value)).collect(),
        total,
        applied_params: applied,
    })
}

/// Scalars sort on `order` alone; objects need both `sort` and `order`.
fn sort_hits<K>(hits: &mut [Hit<K>], params: &SearchParams, applied: &mut AppliedParams) {
    let Some(order) = params.order else {
        return;
    };
    if order == SortOrder::Natural {
        applied.order = Some(order);
        return;
    }

    let itemized = hits.first().is_some_and(|h| h.original.is_object());
    if itemized {
        let Some(field) = params.sort.as_deref() else {
            return;
        };
        hits.sort_by(|a, b| {
            let ord = compare_values(field_value(&a.original, field), field_value(&b.original, field));
            directed(ord, order)
        });
        applied.sort = Some(field.to_string());
    } else {
        hits.sort_by(|a, b| directed(compare_values(&a.original, &b.original), order));
    }
    applied.order = Some(order);
}

fn paginate<K>(
    hits: Vec<Hit<K>>,
    params: &SearchParams,
    applied: &mut AppliedParams,
) -> StoreResult<Vec<Hit<K>>> {
    let Some((page, per_page)) = params.paging() else {
        return Ok(hits);
    };
    let total = hits.len();
    if total <= per_page {
        return Ok(hits);
    }

    applied.page = Some(page);
    applied.per_page = Some(per_page);

    if page > page_count_for(total, per_page) {
        return Ok(Vec::new());
    }
    let calc = PagingCalculator::new(total, per_page, page, false)?;
    let (start, end) = (calc.offset_start(), calc.offset_end());

    Ok(hits.into_iter().skip(start).take(end - start).collect())
}

fn field_value<'a>(value: &'a Value, field: &str) -> &'a Value {
    value.get(field).unwrap_or(&Value::Null)
}

fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Desc => ord.reverse(),
        SortOrder::Asc | SortOrder::Natural => ord,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: null < bool < number < string < array <
/// object. Objects compare equal to each other.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
