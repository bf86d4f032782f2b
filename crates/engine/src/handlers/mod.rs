//! Type handlers — one per field kind.
//!
//! Every handler implements [`TypeHandler`]; [`handler_for`] picks one with
//! an exhaustive match over [`FieldKind`], so adding a kind is a compile
//! error until it has a handler. The `*_fields` walkers pair a [`FieldMap`]
//! with instance maps and dispatch per field; handlers for composite kinds
//! call back into them for their nested fields.
//!
//! Sink convention: a handler receives the sink of its *parent* map and
//! writes quarantined data at its own field name (or below it).

mod array;
mod for_each;
mod object;
mod string;

use crate::extra::ExtraFields;
use scenetrack_core::instance::scalar_text;
use scenetrack_core::{FieldKind, FieldMap, FieldSchema, IncludeFilter, Instance};
use serde_json::Value;
use tracing::debug;

pub(crate) use for_each::element_default;

/// Entity key used for scaffolding when a keyed field has no examples.
pub const DEFAULT_ENTITY_KEY: &str = "Name";

/// The common contract of all type handlers. Handlers are pure.
pub(crate) trait TypeHandler: Sync {
    /// The default value, honoring the include filter for nested fields.
    fn default_of(&self, field: &FieldSchema, filter: IncludeFilter) -> Value;

    /// The value for few-shot example number `index`.
    fn example_of(&self, field: &FieldSchema, index: usize, filter: IncludeFilter) -> Value;

    /// Canonicalize a raw value, quarantining whatever does not fit.
    fn reconcile(
        &self,
        field: &FieldSchema,
        raw: Option<&Value>,
        sink: &mut ExtraFields,
        filter: IncludeFilter,
    ) -> Value;

    /// Merge two values; the incoming side wins wherever it is present.
    fn merge(
        &self,
        field: &FieldSchema,
        previous: Option<&Value>,
        incoming: Option<&Value>,
        sink: &mut ExtraFields,
    ) -> Value;
}

pub(crate) fn handler_for(kind: FieldKind) -> &'static dyn TypeHandler {
    match kind {
        FieldKind::String => &string::StringHandler,
        FieldKind::Array => &array::ArrayHandler,
        FieldKind::Object | FieldKind::ArrayObject => &object::ObjectHandler,
        FieldKind::ForEachObject => &for_each::ForEachObjectHandler,
        FieldKind::ForEachArray => &for_each::ForEachArrayHandler,
    }
}

/// Outcome of checking a raw value against a leaf kind.
pub(crate) enum Shaped {
    /// Null or missing.
    Absent,
    Valid(Value),
    /// A list whose listed elements (by index) did not fit.
    Partial {
        value: Value,
        rejected: Vec<(usize, Value)>,
    },
    /// Wrong shape altogether.
    Mismatch,
}

/// Text form of a STRING field's declared default.
pub(crate) fn default_text(field: &FieldSchema) -> String {
    scalar_text(&field.default_value).unwrap_or_default()
}

/// Parse a list literal: a JSON array of scalars, or a single non-empty item.
pub(crate) fn parse_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(trimmed) {
            return items.iter().filter_map(scalar_text).collect();
        }
    }
    vec![trimmed.to_string()]
}

pub(crate) fn quarantine_rejected(
    sink: &mut ExtraFields,
    name: &str,
    rejected: Vec<(usize, Value)>,
    fallback: bool,
) {
    if rejected.is_empty() {
        return;
    }
    debug!(field = %name, count = rejected.len(), "Quarantining list elements of the wrong shape");
    let branch = sink.child(name);
    for (index, value) in rejected {
        if fallback {
            branch.insert_fallback(index.to_string(), value);
        } else {
            branch.insert(index.to_string(), value);
        }
    }
}

/// Merge for atomic kinds: a well-shaped incoming value wins, otherwise the
/// previous value, otherwise the default. Ill-shaped values are quarantined.
pub(crate) fn merge_leaf(
    field: &FieldSchema,
    previous: Option<&Value>,
    incoming: Option<&Value>,
    sink: &mut ExtraFields,
    shape: impl Fn(&Value) -> Shaped,
    default: impl FnOnce() -> Value,
) -> Value {
    if let Some(raw) = incoming {
        match shape(raw) {
            Shaped::Valid(value) => return value,
            Shaped::Partial { value, rejected } => {
                quarantine_rejected(sink, &field.name, rejected, false);
                return value;
            }
            Shaped::Mismatch => {
                debug!(field = %field.name, kind = %field.kind, "Quarantining value of the wrong shape");
                sink.insert(field.name.as_str(), raw.clone());
            }
            Shaped::Absent => {}
        }
    }
    if let Some(raw) = previous {
        match shape(raw) {
            Shaped::Valid(value) => return value,
            Shaped::Partial { value, rejected } => {
                quarantine_rejected(sink, &field.name, rejected, true);
                return value;
            }
            Shaped::Mismatch => sink.insert_fallback(field.name.as_str(), raw.clone()),
            Shaped::Absent => {}
        }
    }
    default()
}

/// Defaults for every field the filter admits (scaffolding included).
pub(crate) fn default_fields(fields: &FieldMap, filter: IncludeFilter) -> Instance {
    fields
        .iter()
        .filter(|f| filter.includes_scaffolding(f.presence))
        .map(|f| (f.name.clone(), handler_for(f.kind).default_of(f, filter)))
        .collect()
}

/// Example `index` for every field the filter admits (scaffolding included).
pub(crate) fn example_fields(fields: &FieldMap, index: usize, filter: IncludeFilter) -> Instance {
    fields
        .iter()
        .filter(|f| filter.includes_scaffolding(f.presence))
        .map(|f| (f.name.clone(), handler_for(f.kind).example_of(f, index, filter)))
        .collect()
}

/// Reconcile a raw map against `fields`. Keys no field claims are moved into
/// `sink` verbatim.
pub(crate) fn reconcile_fields(
    fields: &FieldMap,
    raw: Option<&Instance>,
    sink: &mut ExtraFields,
    filter: IncludeFilter,
) -> Instance {
    let mut out = Instance::new();
    for field in fields {
        if !filter.includes(field.presence) {
            continue;
        }
        let value = raw.and_then(|m| m.get(&field.name));
        let reconciled = handler_for(field.kind).reconcile(field, value, sink, filter);
        out.insert(field.name.clone(), reconciled);
    }
    if let Some(raw) = raw {
        quarantine_unclaimed(fields, raw, sink, false);
    }
    out
}

/// Merge two raw maps against `fields`. Unclaimed incoming keys are
/// quarantined first, unclaimed previous keys only where still free.
pub(crate) fn merge_fields(
    fields: &FieldMap,
    previous: Option<&Instance>,
    incoming: Option<&Instance>,
    sink: &mut ExtraFields,
) -> Instance {
    let mut out = Instance::new();
    for field in fields {
        let prev = previous.and_then(|m| m.get(&field.name));
        let inc = incoming.and_then(|m| m.get(&field.name));
        let merged = handler_for(field.kind).merge(field, prev, inc, sink);
        out.insert(field.name.clone(), merged);
    }
    if let Some(incoming) = incoming {
        quarantine_unclaimed(fields, incoming, sink, false);
    }
    if let Some(previous) = previous {
        quarantine_unclaimed(fields, previous, sink, true);
    }
    out
}

fn quarantine_unclaimed(fields: &FieldMap, raw: &Instance, sink: &mut ExtraFields, fallback: bool) {
    for (key, value) in raw {
        if fields.claims(key) {
            continue;
        }
        debug!(key = %key, "Quarantining key unknown to the schema");
        if fallback {
            sink.insert_fallback(key.as_str(), value.clone());
        } else {
            sink.insert(key.as_str(), value.clone());
        }
    }
}
