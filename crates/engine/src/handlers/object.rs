//! OBJECT and ARRAY_OBJECT fields: sub-trees keyed by nested field names.

use super::{TypeHandler, default_fields, example_fields, merge_fields, reconcile_fields};
use crate::extra::ExtraFields;
use scenetrack_core::{FieldSchema, IncludeFilter, Instance};
use serde_json::Value;
use tracing::debug;

pub(crate) struct ObjectHandler;

impl TypeHandler for ObjectHandler {
    fn default_of(&self, field: &FieldSchema, filter: IncludeFilter) -> Value {
        Value::Object(default_fields(&field.nested_fields, filter))
    }

    fn example_of(&self, field: &FieldSchema, index: usize, filter: IncludeFilter) -> Value {
        Value::Object(example_fields(&field.nested_fields, index, filter))
    }

    fn reconcile(
        &self,
        field: &FieldSchema,
        raw: Option<&Value>,
        sink: &mut ExtraFields,
        filter: IncludeFilter,
    ) -> Value {
        let nested = &field.nested_fields;
        let reconciled = match raw {
            Some(Value::Object(map)) => {
                reconcile_fields(nested, Some(map), sink.child(&field.name), filter)
            }
            None | Some(Value::Null) => reconcile_fields(nested, None, &mut ExtraFields::new(), filter),
            Some(other) => {
                debug!(field = %field.name, "Quarantining non-object value for an object field");
                sink.insert(field.name.as_str(), other.clone());
                reconcile_fields(nested, None, &mut ExtraFields::new(), filter)
            }
        };
        Value::Object(reconciled)
    }

    fn merge(
        &self,
        field: &FieldSchema,
        previous: Option<&Value>,
        incoming: Option<&Value>,
        sink: &mut ExtraFields,
    ) -> Value {
        let incoming = object_side(field, incoming, sink, false);
        let previous = object_side(field, previous, sink, true);
        Value::Object(merge_fields(
            &field.nested_fields,
            previous,
            incoming,
            sink.child(&field.name),
        ))
    }
}

/// One side of a merge as a map; other shapes are quarantined.
fn object_side<'a>(
    field: &FieldSchema,
    value: Option<&'a Value>,
    sink: &mut ExtraFields,
    fallback: bool,
) -> Option<&'a Instance> {
    match value {
        Some(Value::Object(map)) => Some(map),
        None | Some(Value::Null) => None,
        Some(other) => {
            debug!(field = %field.name, "Quarantining non-object value for an object field");
            if fallback {
                sink.insert_fallback(field.name.as_str(), other.clone());
            } else {
                sink.insert(field.name.as_str(), other.clone());
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenetrack_core::FieldKind;
    use serde_json::json;

    fn weather() -> FieldSchema {
        FieldSchema::new("weather", "Weather", FieldKind::Object).with_nested([
            FieldSchema::new("sky", "Sky", FieldKind::String).with_default("Clear"),
            FieldSchema::new("temp", "Temperature", FieldKind::String),
        ])
    }

    #[test]
    fn default_is_map_of_nested_defaults() {
        assert_eq!(
            ObjectHandler.default_of(&weather(), IncludeFilter::All),
            json!({ "Sky": "Clear", "Temperature": "" })
        );
    }

    #[test]
    fn unknown_nested_keys_are_quarantined_under_field() {
        let mut sink = ExtraFields::new();
        let value = ObjectHandler.reconcile(
            &weather(),
            Some(&json!({ "Sky": "Overcast", "Wind": "strong" })),
            &mut sink,
            IncludeFilter::All,
        );
        assert_eq!(value, json!({ "Sky": "Overcast", "Temperature": "" }));
        assert_eq!(sink.into_value(), json!({ "Weather": { "Wind": "strong" } }));
    }

    #[test]
    fn scalar_value_is_quarantined_whole() {
        let mut sink = ExtraFields::new();
        let value = ObjectHandler.reconcile(&weather(), Some(&json!("rainy")), &mut sink, IncludeFilter::All);
        assert_eq!(value, json!({ "Sky": "Clear", "Temperature": "" }));
        assert_eq!(sink.into_value(), json!({ "Weather": "rainy" }));
    }

    #[test]
    fn merge_is_field_precise() {
        let mut sink = ExtraFields::new();
        let value = ObjectHandler.merge(
            &weather(),
            Some(&json!({ "Sky": "Clear", "Temperature": "Warm" })),
            Some(&json!({ "Sky": "Stormy" })),
            &mut sink,
        );
        assert_eq!(value, json!({ "Sky": "Stormy", "Temperature": "Warm" }));
    }
}
