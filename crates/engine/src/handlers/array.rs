//! ARRAY fields: ordered lists of text. A non-list value is a shape mismatch,
//! since element order and identity cannot be recovered from a scalar.

use super::{Shaped, TypeHandler, merge_leaf, parse_list};
use crate::extra::ExtraFields;
use scenetrack_core::instance::scalar_text;
use scenetrack_core::{FieldSchema, IncludeFilter};
use serde_json::Value;

pub(crate) struct ArrayHandler;

/// The declared default as a list.
fn default_list(field: &FieldSchema) -> Value {
    let items: Vec<Value> = match &field.default_value {
        Value::Array(items) => items.iter().filter_map(scalar_text).map(Value::String).collect(),
        Value::String(text) => parse_list(text).into_iter().map(Value::String).collect(),
        _ => Vec::new(),
    };
    Value::Array(items)
}

/// Split a list into text elements and rejected (non-scalar) elements.
/// Null elements are dropped.
pub(crate) fn text_elements(items: &[Value]) -> (Vec<Value>, Vec<(usize, Value)>) {
    let mut kept = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if item.is_null() {
            continue;
        }
        match scalar_text(item) {
            Some(text) => kept.push(Value::String(text)),
            None => rejected.push((index, item.clone())),
        }
    }
    (kept, rejected)
}

fn shape(raw: &Value) -> Shaped {
    match raw {
        Value::Null => Shaped::Absent,
        Value::Array(items) => {
            let (kept, rejected) = text_elements(items);
            if rejected.is_empty() {
                Shaped::Valid(Value::Array(kept))
            } else {
                Shaped::Partial {
                    value: Value::Array(kept),
                    rejected,
                }
            }
        }
        _ => Shaped::Mismatch,
    }
}

impl TypeHandler for ArrayHandler {
    fn default_of(&self, field: &FieldSchema, _filter: IncludeFilter) -> Value {
        default_list(field)
    }

    fn example_of(&self, field: &FieldSchema, index: usize, _filter: IncludeFilter) -> Value {
        match field.example_values.get(index) {
            Some(example) => Value::Array(parse_list(example).into_iter().map(Value::String).collect()),
            None => default_list(field),
        }
    }

    fn reconcile(
        &self,
        field: &FieldSchema,
        raw: Option<&Value>,
        sink: &mut ExtraFields,
        _filter: IncludeFilter,
    ) -> Value {
        merge_leaf(field, None, raw, sink, shape, || default_list(field))
    }

    fn merge(
        &self,
        field: &FieldSchema,
        previous: Option<&Value>,
        incoming: Option<&Value>,
        sink: &mut ExtraFields,
    ) -> Value {
        merge_leaf(field, previous, incoming, sink, shape, || default_list(field))
    }
}
