//! Reconciliation engine — canonicalize one raw instance against a schema.

use crate::extra::ExtraFields;
use crate::handlers::reconcile_fields;
use scenetrack_core::{EXTRA_FIELDS_KEY, FieldMap, IncludeFilter, Instance, ROOT_EXTRA_KEY};
use serde_json::Value;
use tracing::{debug, warn};

/// A raw instance split into its body and its embedded `_extraFields`.
pub(crate) struct RawParts<'a> {
    pub body: Option<Instance>,
    pub side_channel: Option<&'a Value>,
}

/// Split a raw instance. A non-object root is quarantined whole under the
/// root key, with lower precedence when `fallback` is set.
pub(crate) fn split_raw<'a>(raw: &'a Value, sink: &mut ExtraFields, fallback: bool) -> RawParts<'a> {
    match raw {
        Value::Object(map) => {
            let mut body = map.clone();
            body.remove(EXTRA_FIELDS_KEY);
            RawParts {
                body: Some(body),
                side_channel: map.get(EXTRA_FIELDS_KEY),
            }
        }
        Value::Null => RawParts {
            body: None,
            side_channel: None,
        },
        other => {
            warn!("Tracker instance is not a map; quarantining it whole");
            if fallback {
                sink.insert_fallback(ROOT_EXTRA_KEY, other.clone());
            } else {
                sink.insert(ROOT_EXTRA_KEY, other.clone());
            }
            RawParts {
                body: None,
                side_channel: None,
            }
        }
    }
}

/// Canonicalize `raw` against `schema`.
///
/// The result's keys are exactly the schema field names admitted by
/// `filter`, in declaration order, plus `_extraFields` when `include_extra`
/// is set and anything was quarantined. A `_extraFields` already present in
/// `raw` is merged with the newly quarantined data, the new data taking
/// precedence.
pub fn normalize(schema: &FieldMap, raw: &Value, filter: IncludeFilter, include_extra: bool) -> Instance {
    let mut sink = ExtraFields::new();
    let parts = split_raw(raw, &mut sink, false);
    let mut instance = reconcile_fields(schema, parts.body.as_ref(), &mut sink, filter);

    sink.prune();
    if let Some(side_channel) = parts.side_channel {
        sink.absorb(ExtraFields::from_value(side_channel));
        sink.prune();
    }

    debug!(
        fields = instance.len(),
        quarantined = sink.len(),
        filter = %filter,
        "Normalized tracker instance"
    );

    if include_extra && !sink.is_empty() {
        instance.insert(EXTRA_FIELDS_KEY.to_string(), sink.into_value());
    }
    instance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scene_schema;
    use serde_json::json;

    fn norm(raw: Value) -> Value {
        Value::Object(normalize(&scene_schema(), &raw, IncludeFilter::All, true))
    }

    #[test]
    fn sentinel_collection_is_empty() {
        let out = norm(json!({ "Characters": "None" }));
        assert_eq!(out["Characters"], json!({}));
        assert!(out.get(EXTRA_FIELDS_KEY).is_none());
    }

    #[test]
    fn type_mismatch_is_quarantined() {
        let out = norm(json!({ "Topics": "chat" }));
        assert_eq!(out["Topics"], json!([]));
        assert_eq!(out[EXTRA_FIELDS_KEY]["Topics"], json!("chat"));
    }

    #[test]
    fn unknown_key_is_preserved() {
        let out = norm(json!({ "UnknownField": 42 }));
        assert_eq!(out[EXTRA_FIELDS_KEY]["UnknownField"], json!(42));
    }

    #[test]
    fn top_level_keys_follow_schema_order() {
        let out = normalize(&scene_schema(), &json!({ "Location": "Dock", "Time": "Dusk" }), IncludeFilter::All, true);
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["Time", "Location", "Weather", "Topics", "Characters", "Events", "TimeAnalysis"]
        );
    }

    #[test]
    fn filter_limits_fields() {
        let out = normalize(
            &scene_schema(),
            &json!({ "Time": "Dusk", "Location": "Dock" }),
            IncludeFilter::Static,
            true,
        );
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Location"]);
    }

    #[test]
    fn include_extra_false_hides_quarantine() {
        let out = normalize(&scene_schema(), &json!({ "Mystery": 1 }), IncludeFilter::All, false);
        assert!(out.get(EXTRA_FIELDS_KEY).is_none());
    }

    #[test]
    fn idempotent() {
        let raw = json!({
            "Time": 1200,
            "Topics": "chat",
            "Weather": { "Sky": "Grey", "Wind": "gale" },
            "Characters": {
                "Alice": { "Hair": "Red", "Mood": "wary" },
                "Bob": "asleep"
            },
            "Events": { "Alice": ["arrived", { "odd": true }] },
            "UnknownField": 42,
            "_extraFields": { "Topics": "older chat", "Legacy": { "x": 1 } }
        });
        let once = norm(raw);
        let twice = norm(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn side_channel_merges_with_new_quarantine() {
        let out = norm(json!({
            "Topics": "chat",
            "_extraFields": { "Topics": "older chat", "Legacy": 7 }
        }));
        assert_eq!(
            out[EXTRA_FIELDS_KEY],
            json!({ "Topics": ["chat", "older chat"], "Legacy": 7 })
        );
    }

    #[test]
    fn no_data_loss_for_nested_values() {
        let out = norm(json!({
            "Weather": { "Sky": ["grey", "low"], "Wind": "gale" },
            "Characters": { "Alice": { "Hair": "Red", "Scar": "left cheek" } }
        }));
        assert_eq!(out["Characters"]["Alice"]["Hair"], json!("Red"));
        assert_eq!(out[EXTRA_FIELDS_KEY]["Weather"]["Sky"], json!(["grey", "low"]));
        assert_eq!(out[EXTRA_FIELDS_KEY]["Weather"]["Wind"], json!("gale"));
        assert_eq!(
            out[EXTRA_FIELDS_KEY]["Characters"]["Alice"]["Scar"],
            json!("left cheek")
        );
    }

    #[test]
    fn leaf_quarantine_keeps_embedded_branch() {
        let out = norm(json!({
            "Weather": "rainy",
            "_extraFields": { "Weather": { "Wind": "gale" } }
        }));
        assert_eq!(
            out[EXTRA_FIELDS_KEY]["Weather"],
            json!({ "_value": "rainy", "Wind": "gale" })
        );
        assert_eq!(norm(out.clone()), out);
    }

    #[test]
    fn non_object_root_is_quarantined() {
        let out = norm(json!("the model rambled"));
        assert_eq!(out["Characters"], json!({}));
        assert_eq!(out[EXTRA_FIELDS_KEY][ROOT_EXTRA_KEY], json!("the model rambled"));
    }
}
