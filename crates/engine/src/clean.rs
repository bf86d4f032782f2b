//! Default-equality cleaning and internal-only stripping.

use crate::handlers::{element_default, handler_for};
use scenetrack_core::instance::is_none_sentinel;
use scenetrack_core::{EXTRA_FIELDS_KEY, FieldKind, FieldMap, FieldSchema, IncludeFilter, Instance};
use serde_json::Value;

/// Remove every value equal to its schema default.
///
/// With `preserve_structure` removed values become `""`, `[]` or `{}` so
/// key presence survives; without it, composites left empty are removed
/// too. Keys the schema does not know (including `_extraFields`) are kept.
pub fn clean(schema: &FieldMap, instance: &Value, preserve_structure: bool) -> Instance {
    match instance.as_object() {
        Some(map) => clean_fields(schema, map, preserve_structure),
        None => Instance::new(),
    }
}

fn clean_fields(fields: &FieldMap, map: &Instance, preserve: bool) -> Instance {
    let mut out = Instance::new();
    for (key, value) in map {
        match fields.find_by_name(key) {
            Some(field) => {
                if let Some(cleaned) = clean_value(field, value, preserve) {
                    out.insert(key.clone(), cleaned);
                }
            }
            None => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

fn empty_of(kind: FieldKind) -> Value {
    match kind {
        FieldKind::String => Value::String(String::new()),
        FieldKind::Array => Value::Array(Vec::new()),
        _ => Value::Object(Instance::new()),
    }
}

fn emptied(kind: FieldKind, preserve: bool) -> Option<Value> {
    preserve.then(|| empty_of(kind))
}

fn collapse(map: Instance, preserve: bool) -> Option<Value> {
    if map.is_empty() && !preserve {
        None
    } else {
        Some(Value::Object(map))
    }
}

fn clean_value(field: &FieldSchema, value: &Value, preserve: bool) -> Option<Value> {
    let nested = &field.nested_fields;
    match field.kind {
        FieldKind::String | FieldKind::Array => {
            let default = handler_for(field.kind).default_of(field, IncludeFilter::All);
            if *value == default {
                emptied(field.kind, preserve)
            } else {
                Some(value.clone())
            }
        }
        FieldKind::Object | FieldKind::ArrayObject => match value {
            Value::Object(map) => collapse(clean_fields(nested, map, preserve), preserve),
            other => Some(other.clone()),
        },
        FieldKind::ForEachObject => match value {
            Value::Object(entities) => {
                let mut out = Instance::new();
                for (key, entity) in entities {
                    match entity {
                        Value::Object(map) => {
                            let cleaned = clean_fields(nested, map, preserve);
                            if preserve || !cleaned.is_empty() {
                                out.insert(key.clone(), Value::Object(cleaned));
                            }
                        }
                        other => {
                            out.insert(key.clone(), other.clone());
                        }
                    }
                }
                collapse(out, preserve)
            }
            v if is_none_sentinel(v) => emptied(field.kind, preserve),
            other => Some(other.clone()),
        },
        FieldKind::ForEachArray => match value {
            Value::Object(entities) => {
                let mut out = Instance::new();
                for (key, list) in entities {
                    match list {
                        Value::Array(items) => {
                            let kept = clean_list(field, items, preserve);
                            if preserve || !kept.is_empty() {
                                out.insert(key.clone(), Value::Array(kept));
                            }
                        }
                        other => {
                            out.insert(key.clone(), other.clone());
                        }
                    }
                }
                collapse(out, preserve)
            }
            v if is_none_sentinel(v) => emptied(field.kind, preserve),
            other => Some(other.clone()),
        },
    }
}

fn clean_list(field: &FieldSchema, items: &[Value], preserve: bool) -> Vec<Value> {
    if field.single_string_element().is_some() {
        let default = element_default(field, IncludeFilter::All);
        return items
            .iter()
            .filter_map(|item| {
                if *item == default {
                    preserve.then(|| Value::String(String::new()))
                } else {
                    Some(item.clone())
                }
            })
            .collect();
    }
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => {
                let cleaned = clean_fields(&field.nested_fields, map, preserve);
                (preserve || !cleaned.is_empty()).then_some(Value::Object(cleaned))
            }
            other => Some(other.clone()),
        })
        .collect()
}

/// Remove every internal-only field, at any depth. Used before an instance
/// is shown to the model or the user. Quarantined data sitting at an
/// internal-only path inside `_extraFields` goes too.
pub fn strip_internal_only(schema: &FieldMap, instance: &Value) -> Instance {
    let Some(map) = instance.as_object() else {
        return Instance::new();
    };
    let mut out = strip_fields(schema, map);
    let extra = match out.get(EXTRA_FIELDS_KEY) {
        Some(Value::Object(extra)) => Some(strip_extra(schema, extra)),
        _ => None,
    };
    if let Some(extra) = extra {
        if extra.is_empty() {
            out.remove(EXTRA_FIELDS_KEY);
        } else {
            out.insert(EXTRA_FIELDS_KEY.to_string(), Value::Object(extra));
        }
    }
    out
}

/// Drop quarantine entries at internal-only paths. The quarantine mirrors
/// instance paths: nested field names, entity keys, then list indices.
pub(crate) fn strip_extra(fields: &FieldMap, extra: &Instance) -> Instance {
    extra
        .iter()
        .filter_map(|(key, value)| match fields.find_by_name(key) {
            Some(field) if field.is_internal_only() => None,
            Some(field) => strip_extra_value(field, value).map(|v| (key.clone(), v)),
            None => Some((key.clone(), value.clone())),
        })
        .collect()
}

fn strip_extra_value(field: &FieldSchema, value: &Value) -> Option<Value> {
    let Value::Object(map) = value else {
        return Some(value.clone());
    };
    let nested = &field.nested_fields;
    let branch = |inner: &Value| match inner {
        Value::Object(m) => non_empty(strip_extra(nested, m)),
        other => Some(other.clone()),
    };
    let stripped: Instance = match field.kind {
        FieldKind::String | FieldKind::Array => return Some(value.clone()),
        FieldKind::Object | FieldKind::ArrayObject => strip_extra(nested, map),
        FieldKind::ForEachObject => map
            .iter()
            .filter_map(|(key, entity)| branch(entity).map(|v| (key.clone(), v)))
            .collect(),
        FieldKind::ForEachArray => map
            .iter()
            .filter_map(|(key, list)| {
                let kept = match list {
                    Value::Object(items) => non_empty(
                        items
                            .iter()
                            .filter_map(|(index, item)| branch(item).map(|v| (index.clone(), v)))
                            .collect(),
                    ),
                    other => Some(other.clone()),
                };
                kept.map(|v| (key.clone(), v))
            })
            .collect(),
    };
    non_empty(stripped)
}

fn non_empty(map: Instance) -> Option<Value> {
    (!map.is_empty()).then_some(Value::Object(map))
}

fn strip_fields(fields: &FieldMap, map: &Instance) -> Instance {
    map.iter()
        .filter_map(|(key, value)| match fields.find_by_name(key) {
            Some(field) if field.is_internal_only() => None,
            Some(field) => Some((key.clone(), strip_value(field, value))),
            None => Some((key.clone(), value.clone())),
        })
        .collect()
}

fn strip_value(field: &FieldSchema, value: &Value) -> Value {
    let nested = &field.nested_fields;
    let strip_element = |item: &Value| match item {
        Value::Object(map) => Value::Object(strip_fields(nested, map)),
        other => other.clone(),
    };
    match (field.kind, value) {
        (FieldKind::Object | FieldKind::ArrayObject, Value::Object(map)) => {
            Value::Object(strip_fields(nested, map))
        }
        (FieldKind::ForEachObject, Value::Object(entities)) => Value::Object(
            entities
                .iter()
                .map(|(key, entity)| (key.clone(), strip_element(entity)))
                .collect(),
        ),
        (FieldKind::ForEachArray, Value::Object(entities)) => Value::Object(
            entities
                .iter()
                .map(|(key, list)| {
                    let stripped = match list {
                        Value::Array(items) => Value::Array(items.iter().map(strip_element).collect()),
                        other => other.clone(),
                    };
                    (key.clone(), stripped)
                })
                .collect(),
        ),
        _ => value.clone(),
    }
}
