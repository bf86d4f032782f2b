//! Update engine — merge an incoming instance over the previous one and
//! partition internal-only fields out of the visible result.

use crate::clean::strip_extra;
use crate::extra::ExtraFields;
use crate::handlers::merge_fields;
use crate::normalize::split_raw;
use scenetrack_core::{EXTRA_FIELDS_KEY, FieldKind, FieldMap, Instance};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The result of [`apply_update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// The externally visible merged instance (with `_extraFields` when
    /// anything is quarantined).
    pub merged: Instance,
    /// Values of internal-only fields; `None` when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<Instance>,
}

/// Merge `incoming` over `previous` for every schema field.
///
/// Incoming values win wherever present; previous values fill the gaps.
/// Keyed collections merge per entity. Quarantined data is gathered from
/// both sides (incoming first) and combined with both embedded
/// `_extraFields`, incoming over previous. Internal-only fields are then moved
/// out of the merged instance into [`UpdateOutcome::internal`]; quarantine at
/// internal-only paths is dropped from the visible side.
pub fn apply_update(schema: &FieldMap, previous: &Value, incoming: &Value) -> UpdateOutcome {
    let mut sink = ExtraFields::new();
    let incoming_parts = split_raw(incoming, &mut sink, false);
    let previous_parts = split_raw(previous, &mut sink, true);

    let mut merged = merge_fields(
        schema,
        previous_parts.body.as_ref(),
        incoming_parts.body.as_ref(),
        &mut sink,
    );

    let mut side = incoming_parts
        .side_channel
        .map(ExtraFields::from_value)
        .unwrap_or_default();
    if let Some(previous_side) = previous_parts.side_channel {
        side.absorb(ExtraFields::from_value(previous_side));
    }
    sink.prune();
    sink.absorb(side);
    sink.prune();

    let internal = collect_internal(schema, &mut merged, incoming_parts.body.as_ref());
    let extra = strip_extra(schema, &sink.into_map());

    debug!(
        fields = merged.len(),
        quarantined = extra.len(),
        internal = internal.len(),
        "Applied tracker update"
    );

    if !extra.is_empty() {
        merged.insert(EXTRA_FIELDS_KEY.to_string(), Value::Object(extra));
    }

    UpdateOutcome {
        merged,
        internal: (!internal.is_empty()).then_some(internal),
    }
}

/// Move every internal-only field out of `merged`, preferring the raw
/// incoming value over the merged one. Empty branches are not reported.
fn collect_internal(fields: &FieldMap, merged: &mut Instance, incoming: Option<&Instance>) -> Instance {
    let mut internal = Instance::new();
    for field in fields {
        let inc = incoming
            .and_then(|m| m.get(&field.name))
            .filter(|v| !v.is_null());

        if field.is_internal_only() {
            let merged_value = merged.remove(&field.name);
            if let Some(value) = inc.cloned().or(merged_value) {
                internal.insert(field.internal_key().to_string(), value);
            }
            continue;
        }

        let Some(slot) = merged.get_mut(&field.name) else {
            continue;
        };
        let collected = match field.kind {
            FieldKind::String | FieldKind::Array => None,
            FieldKind::Object | FieldKind::ArrayObject => slot.as_object_mut().and_then(|child| {
                let sub = collect_internal(&field.nested_fields, child, inc.and_then(Value::as_object));
                (!sub.is_empty()).then_some(Value::Object(sub))
            }),
            FieldKind::ForEachObject => slot.as_object_mut().and_then(|entities| {
                let mut per_entity = Instance::new();
                for (key, entity) in entities.iter_mut() {
                    let Some(entity) = entity.as_object_mut() else {
                        continue;
                    };
                    let inc_entity = inc.and_then(|v| v.get(key)).and_then(Value::as_object);
                    let sub = collect_internal(&field.nested_fields, entity, inc_entity);
                    if !sub.is_empty() {
                        per_entity.insert(key.clone(), Value::Object(sub));
                    }
                }
                (!per_entity.is_empty()).then_some(Value::Object(per_entity))
            }),
            FieldKind::ForEachArray => {
                if field.single_string_element().is_some() {
                    None
                } else {
                    slot.as_object_mut().and_then(|entities| {
                        let mut per_entity = Instance::new();
                        for (key, list) in entities.iter_mut() {
                            let Some(items) = list.as_array_mut() else {
                                continue;
                            };
                            let inc_items = inc.and_then(|v| v.get(key)).and_then(Value::as_array);
                            let subs: Vec<Value> = items
                                .iter_mut()
                                .enumerate()
                                .map(|(index, item)| {
                                    let inc_item = inc_items
                                        .and_then(|list| list.get(index))
                                        .and_then(Value::as_object);
                                    match item.as_object_mut() {
                                        Some(element) => Value::Object(collect_internal(
                                            &field.nested_fields,
                                            element,
                                            inc_item,
                                        )),
                                        None => Value::Object(Instance::new()),
                                    }
                                })
                                .collect();
                            if subs.iter().any(|s| s.as_object().is_some_and(|m| !m.is_empty())) {
                                per_entity.insert(key.clone(), Value::Array(subs));
                            }
                        }
                        (!per_entity.is_empty()).then_some(Value::Object(per_entity))
                    })
                }
            }
        };
        if let Some(value) = collected {
            internal.insert(field.internal_key().to_string(), value);
        }
    }
    internal
}
