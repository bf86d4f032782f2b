//! STRING fields: free text. Numbers and booleans are accepted as text since
//! generators are free to emit them unquoted.

use super::{Shaped, TypeHandler, default_text, merge_leaf};
use crate::extra::ExtraFields;
use scenetrack_core::instance::scalar_text;
use scenetrack_core::{FieldSchema, IncludeFilter};
use serde_json::Value;

pub(crate) struct StringHandler;

fn shape(raw: &Value) -> Shaped {
    match raw {
        Value::Null => Shaped::Absent,
        other => match scalar_text(other) {
            Some(text) => Shaped::Valid(Value::String(text)),
            None => Shaped::Mismatch,
        },
    }
}

impl TypeHandler for StringHandler {
    fn default_of(&self, field: &FieldSchema, _filter: IncludeFilter) -> Value {
        Value::String(default_text(field))
    }

    fn example_of(&self, field: &FieldSchema, index: usize, filter: IncludeFilter) -> Value {
        match field.example_values.get(index) {
            Some(example) => Value::String(example.clone()),
            None => self.default_of(field, filter),
        }
    }

    fn reconcile(
        &self,
        field: &FieldSchema,
        raw: Option<&Value>,
        sink: &mut ExtraFields,
        filter: IncludeFilter,
    ) -> Value {
        merge_leaf(field, None, raw, sink, shape, || self.default_of(field, filter))
    }

    fn merge(
        &self,
        field: &FieldSchema,
        previous: Option<&Value>,
        incoming: Option<&Value>,
        sink: &mut ExtraFields,
    ) -> Value {
        merge_leaf(field, previous, incoming, sink, shape, || {
            Value::String(default_text(field))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenetrack_core::FieldKind;
    use serde_json::json;

    fn location() -> FieldSchema {
        FieldSchema::new("loc", "Location", FieldKind::String).with_default("Unknown")
    }

    #[test]
    fn reconcile_keeps_text_and_coerces_scalars() {
        let mut sink = ExtraFields::new();
        let h = StringHandler;
        let f = location();
        assert_eq!(h.reconcile(&f, Some(&json!("Tavern")), &mut sink, IncludeFilter::All), json!("Tavern"));
        assert_eq!(h.reconcile(&f, Some(&json!(12.5)), &mut sink, IncludeFilter::All), json!("12.5"));
        assert_eq!(h.reconcile(&f, Some(&json!(false)), &mut sink, IncludeFilter::All), json!("false"));
        assert!(sink.is_empty());
    }

    #[test]
    fn reconcile_missing_gives_default() {
        let mut sink = ExtraFields::new();
        let value = StringHandler.reconcile(&location(), None, &mut sink, IncludeFilter::All);
        assert_eq!(value, json!("Unknown"));
    }

    #[test]
    fn reconcile_list_is_quarantined() {
        let mut sink = ExtraFields::new();
        let value = StringHandler.reconcile(
            &location(),
            Some(&json!(["Tavern", "Street"])),
            &mut sink,
            IncludeFilter::All,
        );
        assert_eq!(value, json!("Unknown"));
        assert_eq!(sink.into_value(), json!({ "Location": ["Tavern", "Street"] }));
    }

    #[test]
    fn merge_prefers_incoming_then_previous() {
        let mut sink = ExtraFields::new();
        let f = location();
        let h = StringHandler;
        assert_eq!(h.merge(&f, Some(&json!("Old")), Some(&json!("New")), &mut sink), json!("New"));
        assert_eq!(h.merge(&f, Some(&json!("Old")), None, &mut sink), json!("Old"));
        assert_eq!(h.merge(&f, Some(&json!("Old")), Some(&Value::Null), &mut sink), json!("Old"));
        assert_eq!(h.merge(&f, None, None, &mut sink), json!("Unknown"));
        assert!(sink.is_empty());
    }

    #[test]
    fn merge_malformed_incoming_keeps_previous() {
        let mut sink = ExtraFields::new();
        let value = StringHandler.merge(
            &location(),
            Some(&json!("Old")),
            Some(&json!({ "room": "attic" })),
            &mut sink,
        );
        assert_eq!(value, json!("Old"));
        assert_eq!(sink.into_value(), json!({ "Location": { "room": "attic" } }));
    }

    #[test]
    fn example_falls_back_to_default() {
        let f = location().with_examples(["Tavern"]);
        assert_eq!(StringHandler.example_of(&f, 0, IncludeFilter::All), json!("Tavern"));
        assert_eq!(StringHandler.example_of(&f, 1, IncludeFilter::All), json!("Unknown"));
    }
}
