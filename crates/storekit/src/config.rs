//! Store configuration shared by the paging, search, and persistence layers.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Configuration values consumed across storekit.
///
/// Every field has a default, so partial JSON documents and partial string
/// maps are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreKitConfig {
    /// Marker inserted before each highlighted match
    pub highlight_open: String,
    /// Marker inserted after each highlighted match
    pub highlight_close: String,
    /// Match search terms case-sensitively
    pub case_sensitive: bool,
    /// Match search terms accent-sensitively
    pub accent_sensitive: bool,
    /// Window size used by pagination controls
    pub visible_page_range: usize,
    /// Clamp out-of-range pages instead of failing
    pub auto_adjust_page: bool,
    /// Schema version requested when opening persistent stores
    pub database_version: u32,
}

impl Default for StoreKitConfig {
    fn default() -> Self {
        Self {
            highlight_open: "<mark>".to_string(),
            highlight_close: "</mark>".to_string(),
            case_sensitive: false,
            accent_sensitive: false,
            visible_page_range: 5,
            auto_adjust_page: true,
            database_version: 1,
        }
    }
}

impl StoreKitConfig {
    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from a flat string map, as received from host configuration.
    ///
    /// Unknown keys are ignored. Malformed values are rejected.
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = values.get("highlight_open") {
            config.highlight_open = v.clone();
        }
        if let Some(v) = values.get("highlight_close") {
            config.highlight_close = v.clone();
        }
        if let Some(v) = values.get("case_sensitive") {
            config.case_sensitive = parse_field("case_sensitive", v)?;
        }
        if let Some(v) = values.get("accent_sensitive") {
            config.accent_sensitive = parse_field("accent_sensitive", v)?;
        }
        if let Some(v) = values.get("visible_page_range") {
            config.visible_page_range = parse_field("visible_page_range", v)?;
        }
        if let Some(v) = values.get("auto_adjust_page") {
            config.auto_adjust_page = parse_field("auto_adjust_page", v)?;
        }
        if let Some(v) = values.get("database_version") {
            config.database_version = parse_field("database_version", v)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.visible_page_range == 0 {
            return Err(Error::Config("visible_page_range must be at least 1".into()));
        }
        if self.database_version == 0 {
            return Err(Error::Config("database_version must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_field<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = StoreKitConfig::default();
        assert_eq!(config.highlight_open, "<mark>");
        assert_eq!(config.highlight_close, "</mark>");
        assert_eq!(config.visible_page_range, 5);
        assert!(config.auto_adjust_page);
        assert!(!config.case_sensitive);
    }

    #[test]
    fn test_from_json_partial() {
        let config = StoreKitConfig::from_json(r#"{"case_sensitive": true}"#).unwrap();
        assert!(config.case_sensitive);
        assert_eq!(config.database_version, 1);
    }

    #[test]
    fn test_from_json_rejects_zero_window() {
        let err = StoreKitConfig::from_json(r#"{"visible_page_range": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_json_malformed() {
        let err = StoreKitConfig::from_json(r#"{"visible_page_range": "seven"}"#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_map() {
        let mut values = HashMap::new();
        values.insert("highlight_open".to_string(), "[".to_string());
        values.insert("highlight_close".to_string(), "]".to_string());
        values.insert("auto_adjust_page".to_string(), "false".to_string());
        values.insert("visible_page_range".to_string(), " 9 ".to_string());
        values.insert("unrelated".to_string(), "ignored".to_string());

        let config = StoreKitConfig::from_map(&values).unwrap();
        assert_eq!(config.highlight_open, "[");
        assert_eq!(config.highlight_close, "]");
        assert!(!config.auto_adjust_page);
        assert_eq!(config.visible_page_range, 9);
    }

    #[test]
    fn test_from_map_rejects_bad_bool() {
        let mut values = HashMap::new();
        values.insert("case_sensitive".to_string(), "yes".to_string());
        let err = StoreKitConfig::from_map(&values).unwrap_err();
        assert!(err.to_string().contains("case_sensitive"));
    }
}
