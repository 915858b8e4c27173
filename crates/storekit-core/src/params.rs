//! Search, sort, and paging parameters
//!
//! Callers hand a `SearchParams` to `apply_search_params` and get back a
//! `SearchOutcome` whose `applied_params` lists only what was honoured.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
    /// Inspection order of the underlying collection
    Natural,
}

impl SortOrder {
    pub const ALL: [SortOrder; 3] = [SortOrder::Asc, SortOrder::Desc, SortOrder::Natural];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
            SortOrder::Natural => "natural",
        }
    }

    /// Whether this order requires an actual sort.
    pub fn is_directional(&self) -> bool {
        matches!(self, SortOrder::Asc | SortOrder::Desc)
    }
}

impl FromStr for SortOrder {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| StoreError::UnknownVariant {
                kind: "sort order",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested search, sort, and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn sort(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn page(mut self, page: usize, per_page: usize) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// The search term, if it is set and non-empty.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// Both paging parameters, when both are present.
    pub fn paging(&self) -> Option<(usize, usize)> {
        Some((self.page?, self.per_page?))
    }
}

/// Parameters that were actually honoured. Absent fields were not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppliedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
}

impl AppliedParams {
    pub fn is_empty(&self) -> bool {
        *self == AppliedParams::default()
    }
}

/// Result of `apply_search_params`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<K> {
    /// `(key, value)` entries of the requested page
    pub result: Vec<(K, Value)>,
    /// Matches before paging; the full store size when a search matched nothing
    pub total: usize,
    pub applied_params: AppliedParams,
}

impl<K> SearchOutcome<K> {
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.result.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.result.iter().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_params() {
        let params: SearchParams = serde_json::from_value(json!({
            "search": "abc",
            "order": "desc",
            "page": 2,
            "perPage": 20
        }))
        .unwrap();
        assert_eq!(params.search_term(), Some("abc"));
        assert_eq!(params.order, Some(SortOrder::Desc));
        assert_eq!(params.paging(), Some((2, 20)));
        assert_eq!(params.sort, None);
    }

    #[test]
    fn test_unknown_order_is_rejected() {
        let err = serde_json::from_value::<SearchParams>(json!({"order": "random"}));
        assert!(err.is_err());
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_empty_search_is_no_search() {
        assert_eq!(SearchParams::new().search("").search_term(), None);
    }

    #[test]
    fn test_applied_params_serialize_only_present() {
        let applied = AppliedParams {
            order: Some(SortOrder::Natural),
            per_page: Some(10),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&applied).unwrap(),
            json!({"order": "natural", "perPage": 10})
        );
    }
}
