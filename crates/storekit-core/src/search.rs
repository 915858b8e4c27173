//! Substring search with match highlighting
//!
//! Matching runs on a folded copy of the text (lowercased, and stripped of
//! combining marks unless accent-sensitive). Every folded character remembers
//! which original character it came from, so highlight markers are placed
//! around the original text rather than the folded one.

use serde_json::{Map, Value};
use storekit::StoreKitConfig;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Markers placed around each match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub open: String,
    pub close: String,
}

impl Default for Highlight {
    fn default() -> Self {
        Self {
            open: "<mark>".to_string(),
            close: "</mark>".to_string(),
        }
    }
}

/// Search behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub accent_sensitive: bool,
    pub highlight: Highlight,
    /// Wrap each marked value as `{"original": .., "marked": ..}` so the
    /// unmarked value stays recoverable.
    pub keep_original: bool,
}

impl SearchOptions {
    pub fn from_config(config: &StoreKitConfig) -> Self {
        Self {
            case_sensitive: config.case_sensitive,
            accent_sensitive: config.accent_sensitive,
            highlight: Highlight {
                open: config.highlight_open.clone(),
                close: config.highlight_close.clone(),
            },
            keep_original: false,
        }
    }

    pub fn keep_original(mut self, keep: bool) -> Self {
        self.keep_original = keep;
        self
    }
}

/// Folded characters plus, for each, the index of its source character.
struct Folded {
    chars: Vec<char>,
    origin: Vec<usize>,
}

fn fold(text: &str, opts: &SearchOptions) -> Folded {
    let mut chars = Vec::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());

    for (idx, ch) in text.chars().enumerate() {
        let mut push = |c: char| {
            if opts.case_sensitive {
                chars.push(c);
                origin.push(idx);
            } else {
                for lower in c.to_lowercase() {
                    chars.push(lower);
                    origin.push(idx);
                }
            }
        };

        if opts.accent_sensitive {
            push(ch);
        } else {
            for c in std::iter::once(ch).nfd().filter(|c| !is_combining_mark(*c)) {
                push(c);
            }
        }
    }

    Folded { chars, origin }
}

/// Ranges `[start, end)` of original characters covered by matches.
fn match_ranges(text: &str, term: &str, opts: &SearchOptions) -> Vec<(usize, usize)> {
    let needle = fold(term, opts).chars;
    if needle.is_empty() {
        return Vec::new();
    }
    let hay = fold(text, opts);

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i + needle.len() <= hay.chars.len() {
        if hay.chars[i..i + needle.len()] == needle[..] {
            let start = hay.origin[i];
            let end = hay.origin[i + needle.len() - 1] + 1;
            match ranges.last_mut() {
                // One original char can fold into several; merge touching spans.
                Some(last) if start < last.1 => last.1 = last.1.max(end),
                _ => ranges.push((start, end)),
            }
            i += needle.len();
        } else {
            i += 1;
        }
    }
    ranges
}

/// Wrap every match of `term` in `text` with highlight markers.
///
/// Returns `None` when nothing matched or the term is empty.
pub fn mark_text(text: &str, term: &str, opts: &SearchOptions) -> Option<String> {
    let ranges = match_ranges(text, term, opts);
    if ranges.is_empty() {
        return None;
    }

    let extra = ranges.len() * (opts.highlight.open.len() + opts.highlight.close.len());
    let mut out = String::with_capacity(text.len() + extra);
    let mut next = ranges.iter().peekable();
    let mut open_until: Option<usize> = None;

    for (idx, ch) in text.chars().enumerate() {
        if open_until == Some(idx) {
            out.push_str(&opts.highlight.close);
            open_until = None;
        }
        if let Some(&&(start, end)) = next.peek() {
            if start == idx {
                out.push_str(&opts.highlight.open);
                open_until = Some(end);
                next.next();
            }
        }
        out.push(ch);
    }
    if open_until.is_some() {
        out.push_str(&opts.highlight.close);
    }

    Some(out)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn mark_scalar(value: &Value, term: &str, opts: &SearchOptions) -> Option<Value> {
    let text = scalar_text(value)?;
    let marked_text = mark_text(&text, term, opts)?;
    Some(if opts.keep_original {
        marked::wrap(value.clone(), marked_text)
    } else {
        Value::String(marked_text)
    })
}

/// Search a single element.
///
/// Strings and numbers are matched directly. For objects, each string- or
/// number-valued property is searched; matched properties are replaced by
/// their marked form and the rest are kept verbatim, so the whole object is
/// returned. Returns `None` when nothing matched.
pub fn search_value(value: &Value, term: &str, opts: &SearchOptions) -> Option<Value> {
    search_value_in(value, term, opts, None)
}

/// Like [`search_value`], restricted to `fields` for object elements.
pub fn search_value_in(
    value: &Value,
    term: &str,
    opts: &SearchOptions,
    fields: Option<&[String]>,
) -> Option<Value> {
    match value {
        Value::String(_) | Value::Number(_) => mark_scalar(value, term, opts),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            let mut matched = false;
            for (name, field) in map {
                let searchable = fields.map_or(true, |f| f.iter().any(|n| n == name));
                let marked = if searchable {
                    mark_scalar(field, term, opts)
                } else {
                    None
                };
                match marked {
                    Some(m) => {
                        matched = true;
                        out.insert(name.clone(), m);
                    }
                    None => {
                        out.insert(name.clone(), field.clone());
                    }
                }
            }
            matched.then_some(Value::Object(out))
        }
        _ => None,
    }
}

/// Helpers for the `{"original": .., "marked": ..}` wrapper.
pub mod marked {
    use serde_json::{Map, Value};

    pub const ORIGINAL: &str = "original";
    pub const MARKED: &str = "marked";

    pub fn wrap(original: Value, marked: String) -> Value {
        let mut map = Map::with_capacity(2);
        map.insert(ORIGINAL.to_string(), original);
        map.insert(MARKED.to_string(), Value::String(marked));
        Value::Object(map)
    }

    pub fn is_wrapper(value: &Value) -> bool {
        match value {
            Value::Object(map) => {
                map.len() == 2
                    && map.contains_key(ORIGINAL)
                    && map.get(MARKED).is_some_and(Value::is_string)
            }
            _ => false,
        }
    }

    /// The original value of a wrapper, or the value itself.
    pub fn unwrap_original(value: &Value) -> &Value {
        if is_wrapper(value) {
            if let Some(original) = value.get(ORIGINAL) {
                return original;
            }
        }
        value
    }

    /// Rebuild the unmarked element, unwrapping the element itself or any of
    /// its properties.
    pub fn original_of(value: &Value) -> Value {
        if is_wrapper(value) {
            return unwrap_original(value).clone();
        }
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), unwrap_original(v).clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Replace every wrapper by its marked string.
    pub fn marked_of(value: &Value) -> Value {
        fn pick(v: &Value) -> Value {
            if is_wrapper(v) {
                v.get(MARKED).cloned().unwrap_or(Value::Null)
            } else {
                v.clone()
            }
        }
        match value {
            Value::Object(map) if !is_wrapper(value) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), pick(v))).collect())
            }
            other => pick(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn opts() -> SearchOptions {
        SearchOptions::default()
    }

    #[test]
    fn test_mark_text_case_insensitive() {
        assert_eq!(
            mark_text("Three", "e", &opts()).unwrap(),
            "Thr<mark>e</mark><mark>e</mark>"
        );
        assert_eq!(mark_text("One", "O", &opts()).unwrap(), "<mark>O</mark>ne");
        assert_eq!(mark_text("Two", "e", &opts()), None);
    }

    #[test]
    fn test_mark_text_case_sensitive() {
        let o = SearchOptions {
            case_sensitive: true,
            ..opts()
        };
        assert_eq!(mark_text("One", "o", &o), None);
        assert_eq!(mark_text("one", "o", &o).unwrap(), "<mark>o</mark>ne");
    }

    #[test]
    fn test_mark_text_accent_insensitive() {
        assert_eq!(
            mark_text("Crème brûlée", "creme", &opts()).unwrap(),
            "<mark>Crème</mark> brûlée"
        );
        let o = SearchOptions {
            accent_sensitive: true,
            ..opts()
        };
        assert_eq!(mark_text("Crème", "creme", &o), None);
    }

    #[test]
    fn test_mark_text_non_overlapping() {
        assert_eq!(
            mark_text("aaaa", "aa", &opts()).unwrap(),
            "<mark>aa</mark><mark>aa</mark>"
        );
    }

    #[test]
    fn test_mark_text_empty_term() {
        assert_eq!(mark_text("anything", "", &opts()), None);
    }

    #[test]
    fn test_custom_highlight() {
        let o = SearchOptions {
            highlight: Highlight {
                open: "[".into(),
                close: "]".into(),
            },
            ..opts()
        };
        assert_eq!(mark_text("hello", "ll", &o).unwrap(), "he[ll]o");
    }

    #[test]
    fn test_search_number() {
        assert_eq!(
            search_value(&json!(1234), "23", &opts()).unwrap(),
            json!("1<mark>23</mark>4")
        );
    }

    #[test]
    fn test_search_object_keeps_unmatched_fields() {
        let record = json!({"id": 7, "name": "Alice", "city": "Paris", "admin": true});
        let hit = search_value(&record, "a", &opts()).unwrap();
        assert_eq!(
            hit,
            json!({
                "id": 7,
                "name": "<mark>A</mark>lice",
                "city": "P<mark>a</mark>ris",
                "admin": true
            })
        );
        assert_eq!(search_value(&record, "zzz", &opts()), None);
    }

    #[test]
    fn test_search_restricted_fields() {
        let record = json!({"name": "Alice", "city": "Paris"});
        let fields = vec!["city".to_string()];
        let hit = search_value_in(&record, "a", &opts(), Some(&fields)).unwrap();
        assert_eq!(hit, json!({"name": "Alice", "city": "P<mark>a</mark>ris"}));
    }

    #[test]
    fn test_keep_original_round_trip() {
        let record = json!({"id": "alpha", "n": 3});
        let o = opts().keep_original(true);
        let hit = search_value(&record, "al", &o).unwrap();

        assert_eq!(
            hit["id"],
            json!({"original": "alpha", "marked": "<mark>al</mark>pha"})
        );
        assert_eq!(marked::unwrap_original(&hit["id"]), &json!("alpha"));
        assert_eq!(marked::original_of(&hit), record);
        assert_eq!(
            marked::marked_of(&hit),
            json!({"id": "<mark>al</mark>pha", "n": 3})
        );
    }

    #[test]
    fn test_keep_original_scalar() {
        let o = opts().keep_original(true);
        let hit = search_value(&json!("Five"), "f", &o).unwrap();
        assert_eq!(marked::original_of(&hit), json!("Five"));
        assert_eq!(marked::marked_of(&hit), json!("<mark>F</mark>ive"));
    }

    #[test]
    fn test_from_config() {
        let config = StoreKitConfig {
            highlight_open: "<b>".into(),
            case_sensitive: true,
            ..Default::default()
        };
        let o = SearchOptions::from_config(&config);
        assert!(o.case_sensitive);
        assert_eq!(o.highlight.open, "<b>");
        assert_eq!(o.highlight.close, "</mark>");
    }
}
