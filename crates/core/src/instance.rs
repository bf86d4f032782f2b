//! Tracker instance trees.
//!
//! An instance is a JSON object shaped like the schema but carrying values.
//! With `serde_json`'s `preserve_order` feature the key order of an instance
//! follows the order in which the engine writes fields, i.e. schema
//! declaration order.

use serde_json::{Map, Value};

/// A tracker instance (or any sub-tree of one).
pub type Instance = Map<String, Value>;

/// Reserved key carrying quarantined data inside an instance.
pub const EXTRA_FIELDS_KEY: &str = "_extraFields";

/// Reserved extra-field key for a raw instance that was not an object at all.
pub const ROOT_EXTRA_KEY: &str = "_value";

/// Literal that stands for an empty keyed collection.
pub const NONE_SENTINEL: &str = "none";

/// Is this value the empty-collection sentinel (`"none"`, `""`, or null)?
pub fn is_none_sentinel(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || s.eq_ignore_ascii_case(NONE_SENTINEL)
        }
        _ => false,
    }
}

/// Textual form of a scalar. Lists, maps and null have none.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Recursively remove empty branches. Returns `None` when nothing remains.
pub fn strip_empty(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let kept: Vec<Value> = items.iter().filter_map(strip_empty).collect();
            (!kept.is_empty()).then_some(Value::Array(kept))
        }
        Value::Object(map) => {
            let kept = strip_empty_map(map);
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
        other => Some(other.clone()),
    }
}

/// [`strip_empty`] for a map, always returning a (possibly empty) map.
pub fn strip_empty_map(map: &Instance) -> Instance {
    map.iter()
        .filter_map(|(k, v)| strip_empty(v).map(|v| (k.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentinel_matches_none_in_any_case() {
        assert!(is_none_sentinel(&json!("None")));
        assert!(is_none_sentinel(&json!(" NONE ")));
        assert!(is_none_sentinel(&json!("")));
        assert!(is_none_sentinel(&Value::Null));
        assert!(!is_none_sentinel(&json!("Nonesuch")));
        assert!(!is_none_sentinel(&json!({})));
    }

    #[test]
    fn scalar_text_coerces_numbers_and_bools() {
        assert_eq!(scalar_text(&json!(42)).as_deref(), Some("42"));
        assert_eq!(scalar_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(scalar_text(&json!(["a"])), None);
    }

    #[test]
    fn strip_empty_prunes_nested_branches() {
        let v = json!({
            "a": "",
            "b": { "c": [], "d": { "e": null } },
            "f": ["", "x"],
            "g": 0
        });
        assert_eq!(strip_empty(&v), Some(json!({ "f": ["x"], "g": 0 })));
        assert_eq!(strip_empty(&json!({ "a": { "b": "" } })), None);
    }
}
