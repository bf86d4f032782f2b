//! FOR_EACH_OBJECT and FOR_EACH_ARRAY fields: collections keyed by an entity
//! (usually a character name).
//!
//! The raw value `"none"` (any case), `""` or null means "no entities".
//! Entity keys are only ever taken from data; the placeholder key used for
//! defaults and examples is scaffolding and never enters reconciliation.

use super::array::text_elements;
use super::{
    DEFAULT_ENTITY_KEY, TypeHandler, default_fields, default_text, example_fields, merge_fields,
    parse_list, reconcile_fields,
};
use crate::extra::ExtraFields;
use scenetrack_core::instance::is_none_sentinel;
use scenetrack_core::{FieldSchema, IncludeFilter, Instance};
use serde_json::Value;
use tracing::debug;

pub(crate) struct ForEachObjectHandler;
pub(crate) struct ForEachArrayHandler;

/// Scaffolding entity key: the first key of the first example, if any.
fn placeholder_key(field: &FieldSchema) -> String {
    field
        .example_values
        .first()
        .and_then(|example| parse_list(example).into_iter().next())
        .unwrap_or_else(|| DEFAULT_ENTITY_KEY.to_string())
}

/// Entity keys for example `index`; the placeholder when there is none.
fn example_keys(field: &FieldSchema, index: usize) -> Vec<String> {
    let keys = field
        .example_values
        .get(index)
        .map(|example| parse_list(example))
        .unwrap_or_default();
    if keys.is_empty() {
        vec![placeholder_key(field)]
    } else {
        keys
    }
}

/// One side of a keyed collection.
enum Side<'a> {
    Absent,
    /// The sentinel: explicitly no entities.
    Empty,
    Entities(&'a Instance),
    /// Wrong shape; already moved into the sink.
    Quarantined,
}

fn collection_side<'a>(
    field: &FieldSchema,
    value: Option<&'a Value>,
    sink: &mut ExtraFields,
    fallback: bool,
) -> Side<'a> {
    match value {
        None | Some(Value::Null) => Side::Absent,
        Some(Value::Object(map)) => Side::Entities(map),
        Some(v) if is_none_sentinel(v) => Side::Empty,
        Some(other) => {
            debug!(field = %field.name, "Quarantining non-map value for a keyed field");
            if fallback {
                sink.insert_fallback(field.name.as_str(), other.clone());
            } else {
                sink.insert(field.name.as_str(), other.clone());
            }
            Side::Quarantined
        }
    }
}

/// Union of entity keys: incoming order first, then previous-only keys.
fn union_keys<'a>(incoming: Option<&'a Instance>, previous: Option<&'a Instance>) -> Vec<&'a String> {
    let mut keys: Vec<&String> = incoming.map(|m| m.keys().collect()).unwrap_or_default();
    if let Some(previous) = previous {
        for key in previous.keys() {
            if !incoming.is_some_and(|m| m.contains_key(key)) {
                keys.push(key);
            }
        }
    }
    keys
}

/// `(previous, incoming)` entity maps of a keyed merge.
type Sides<'a> = (Option<&'a Instance>, Option<&'a Instance>);

/// Resolve both sides of a keyed merge. Returns `None` when the incoming
/// side is the sentinel, meaning the collection is explicitly empty.
fn merge_sides<'a>(
    field: &FieldSchema,
    previous: Option<&'a Value>,
    incoming: Option<&'a Value>,
    sink: &mut ExtraFields,
) -> Option<Sides<'a>> {
    let incoming = match collection_side(field, incoming, sink, false) {
        Side::Empty => return None,
        Side::Entities(map) => Some(map),
        Side::Absent | Side::Quarantined => None,
    };
    let previous = match collection_side(field, previous, sink, true) {
        Side::Entities(map) => Some(map),
        Side::Absent | Side::Empty | Side::Quarantined => None,
    };
    Some((previous, incoming))
}

// ── FOR_EACH_OBJECT ────────────────────────────────────────────────

fn entity_map<'a>(
    field: &FieldSchema,
    key: &str,
    entity: Option<&'a Value>,
    sink: &mut ExtraFields,
    fallback: bool,
) -> Option<&'a Instance> {
    match entity {
        Some(Value::Object(map)) => Some(map),
        None | Some(Value::Null) => None,
        Some(other) => {
            debug!(field = %field.name, entity = %key, "Quarantining non-object entity");
            let branch = sink.child(&field.name);
            if fallback {
                branch.insert_fallback(key, other.clone());
            } else {
                branch.insert(key, other.clone());
            }
            None
        }
    }
}

impl TypeHandler for ForEachObjectHandler {
    fn default_of(&self, field: &FieldSchema, filter: IncludeFilter) -> Value {
        let mut map = Instance::new();
        map.insert(
            placeholder_key(field),
            Value::Object(default_fields(&field.nested_fields, filter)),
        );
        Value::Object(map)
    }

    fn example_of(&self, field: &FieldSchema, index: usize, filter: IncludeFilter) -> Value {
        let entity = example_fields(&field.nested_fields, index, filter);
        Value::Object(
            example_keys(field, index)
                .into_iter()
                .map(|key| (key, Value::Object(entity.clone())))
                .collect(),
        )
    }

    fn reconcile(
        &self,
        field: &FieldSchema,
        raw: Option<&Value>,
        sink: &mut ExtraFields,
        filter: IncludeFilter,
    ) -> Value {
        let mut out = Instance::new();
        if let Side::Entities(entities) = collection_side(field, raw, sink, false) {
            for (key, entity) in entities {
                if let Some(map) = entity_map(field, key, Some(entity), sink, false) {
                    let entity_sink = sink.child(&field.name).child(key);
                    let reconciled = reconcile_fields(&field.nested_fields, Some(map), entity_sink, filter);
                    out.insert(key.clone(), Value::Object(reconciled));
                }
            }
        }
        Value::Object(out)
    }

    fn merge(
        &self,
        field: &FieldSchema,
        previous: Option<&Value>,
        incoming: Option<&Value>,
        sink: &mut ExtraFields,
    ) -> Value {
        let mut out = Instance::new();
        let Some((previous, incoming)) = merge_sides(field, previous, incoming, sink) else {
            return Value::Object(out);
        };
        for key in union_keys(incoming, previous) {
            let inc = entity_map(field, key, incoming.and_then(|m| m.get(key)), sink, false);
            let prev = entity_map(field, key, previous.and_then(|m| m.get(key)), sink, true);
            if inc.is_none() && prev.is_none() {
                continue;
            }
            let entity_sink = sink.child(&field.name).child(key);
            let merged = merge_fields(&field.nested_fields, prev, inc, entity_sink);
            out.insert(key.clone(), Value::Object(merged));
        }
        Value::Object(out)
    }
}

// ── FOR_EACH_ARRAY ─────────────────────────────────────────────────

/// Default list element: plain text for a single STRING nested field, a
/// sub-tree otherwise.
pub(crate) fn element_default(field: &FieldSchema, filter: IncludeFilter) -> Value {
    match field.single_string_element() {
        Some(only) => Value::String(default_text(only)),
        None => Value::Object(default_fields(&field.nested_fields, filter)),
    }
}

fn element_example(field: &FieldSchema, index: usize, filter: IncludeFilter) -> Value {
    match field.single_string_element() {
        Some(only) => match only.example_values.get(index) {
            Some(example) => Value::String(example.clone()),
            None => Value::String(default_text(only)),
        },
        None => Value::Object(example_fields(&field.nested_fields, index, filter)),
    }
}

/// Reconcile one entity's list. `list_sink` is the sink at the entity key;
/// rejected elements are quarantined there by index.
fn reconcile_list(
    field: &FieldSchema,
    items: &[Value],
    list_sink: &mut ExtraFields,
    filter: IncludeFilter,
    fallback: bool,
) -> Vec<Value> {
    if field.single_string_element().is_some() {
        let (kept, rejected) = text_elements(items);
        for (index, value) in rejected {
            if fallback {
                list_sink.insert_fallback(index.to_string(), value);
            } else {
                list_sink.insert(index.to_string(), value);
            }
        }
        return kept;
    }

    let mut kept = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => {
                let element_sink = list_sink.child(&index.to_string());
                let reconciled = reconcile_fields(&field.nested_fields, Some(map), element_sink, filter);
                kept.push(Value::Object(reconciled));
            }
            Value::Null => {}
            other => rejected.push((index, other.clone())),
        }
    }
    for (index, value) in rejected {
        if fallback {
            list_sink.insert_fallback(index.to_string(), value);
        } else {
            list_sink.insert(index.to_string(), value);
        }
    }
    kept
}

/// One entity's list, or `None` when absent or quarantined.
fn entity_list(
    field: &FieldSchema,
    key: &str,
    entity: Option<&Value>,
    sink: &mut ExtraFields,
    filter: IncludeFilter,
    fallback: bool,
) -> Option<Vec<Value>> {
    match entity {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            let list_sink = sink.child(&field.name).child(key);
            Some(reconcile_list(field, items, list_sink, filter, fallback))
        }
        Some(v) if is_none_sentinel(v) => Some(Vec::new()),
        Some(other) => {
            debug!(field = %field.name, entity = %key, "Quarantining non-list entity value");
            let branch = sink.child(&field.name);
            if fallback {
                branch.insert_fallback(key, other.clone());
            } else {
                branch.insert(key, other.clone());
            }
            None
        }
    }
}

impl TypeHandler for ForEachArrayHandler {
    fn default_of(&self, field: &FieldSchema, filter: IncludeFilter) -> Value {
        let mut map = Instance::new();
        map.insert(
            placeholder_key(field),
            Value::Array(vec![element_default(field, filter)]),
        );
        Value::Object(map)
    }

    fn example_of(&self, field: &FieldSchema, index: usize, filter: IncludeFilter) -> Value {
        let element = element_example(field, index, filter);
        Value::Object(
            example_keys(field, index)
                .into_iter()
                .map(|key| (key, Value::Array(vec![element.clone()])))
                .collect(),
        )
    }

    fn reconcile(
        &self,
        field: &FieldSchema,
        raw: Option<&Value>,
        sink: &mut ExtraFields,
        filter: IncludeFilter,
    ) -> Value {
        let mut out = Instance::new();
        if let Side::Entities(entities) = collection_side(field, raw, sink, false) {
            for (key, entity) in entities {
                if let Some(list) = entity_list(field, key, Some(entity), sink, filter, false) {
                    out.insert(key.clone(), Value::Array(list));
                }
            }
        }
        Value::Object(out)
    }

    fn merge(
        &self,
        field: &FieldSchema,
        previous: Option<&Value>,
        incoming: Option<&Value>,
        sink: &mut ExtraFields,
    ) -> Value {
        let mut out = Instance::new();
        let Some((previous, incoming)) = merge_sides(field, previous, incoming, sink) else {
            return Value::Object(out);
        };
        let filter = IncludeFilter::All;
        for key in union_keys(incoming, previous) {
            let inc = entity_list(field, key, incoming.and_then(|m| m.get(key)), sink, filter, false);
            let merged = match inc {
                Some(list) => Some(list),
                None => entity_list(field, key, previous.and_then(|m| m.get(key)), sink, filter, true),
            };
            if let Some(list) = merged {
                out.insert(key.clone(), Value::Array(list));
            }
        }
        Value::Object(out)
    }
}
