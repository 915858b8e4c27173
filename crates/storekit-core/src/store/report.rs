//! Batch delete reporting

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Per-key outcome of a batch delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteReport<K> {
    pub success_keys: Vec<K>,
    pub errors: Vec<(K, StoreError)>,
    pub not_found_keys: Vec<K>,
}

impl<K> Default for DeleteReport<K> {
    fn default() -> Self {
        Self {
            success_keys: Vec::new(),
            errors: Vec::new(),
            not_found_keys: Vec::new(),
        }
    }
}

impl<K> DeleteReport<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.success_keys.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Record one key's outcome: `Ok(true)` deleted, `Ok(false)` missing.
    pub fn record(&mut self, key: K, outcome: Result<bool, StoreError>) {
        match outcome {
            Ok(true) => self.success_keys.push(key),
            Ok(false) => self.not_found_keys.push(key),
            Err(e) => self.errors.push((key, e)),
        }
    }

    /// Every requested key was deleted.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.not_found_keys.is_empty()
    }
}

impl<K> FromIterator<(K, Result<bool, StoreError>)> for DeleteReport<K> {
    fn from_iter<I: IntoIterator<Item = (K, Result<bool, StoreError>)>>(iter: I) -> Self {
        let mut report = DeleteReport::new();
        for (key, outcome) in iter {
            report.record(key, outcome);
        }
        report
    }
}

/// How a batch delete settles when one key fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeleteMode {
    /// Stop at the first failure; remaining keys are not attempted
    FailFast,
    /// Attempt every key and report each outcome
    #[default]
    Settled,
}

impl DeleteMode {
    pub const ALL: [DeleteMode; 2] = [DeleteMode::FailFast, DeleteMode::Settled];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteMode::FailFast => "fail-fast",
            DeleteMode::Settled => "settled",
        }
    }
}

impl FromStr for DeleteMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeleteMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| StoreError::UnknownVariant {
                kind: "delete mode",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
