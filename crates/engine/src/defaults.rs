//! Default trees, few-shot example trees and the existence check.

use crate::handlers::{default_fields, example_fields};
use scenetrack_core::instance::strip_empty_map;
use scenetrack_core::{EXTRA_FIELDS_KEY, FieldMap, IncludeFilter, Instance};
use serde_json::Value;

/// An all-default tracker. Keyed collections hold one placeholder entity, so
/// the tree doubles as prompt scaffolding.
pub fn default_tree(schema: &FieldMap, filter: IncludeFilter) -> Instance {
    default_fields(schema, filter)
}

/// Few-shot example trackers, one per example slot. Example `i` takes the
/// `i`-th example value of every field, falling back to its default. Empty
/// when no field declares examples.
pub fn example_trees(schema: &FieldMap, filter: IncludeFilter) -> Vec<Instance> {
    (0..example_count(schema, filter))
        .map(|index| example_fields(schema, index, filter))
        .collect()
}

fn example_count(fields: &FieldMap, filter: IncludeFilter) -> usize {
    fields
        .iter()
        .filter(|f| filter.includes_scaffolding(f.presence))
        .map(|f| f.example_values.len().max(example_count(&f.nested_fields, filter)))
        .max()
        .unwrap_or(0)
}

/// Whether `instance` carries anything beyond an untouched tracker.
///
/// Quarantined data is ignored. After stripping empty branches the instance
/// must be non-empty and differ from the equally stripped default tree.
/// Placeholder entities are part of that tree, so emptying a keyed
/// collection counts as a change.
pub fn exists(schema: &FieldMap, instance: &Value) -> bool {
    let Some(map) = instance.as_object() else {
        return false;
    };
    let body: Instance = map
        .iter()
        .filter(|(key, _)| key.as_str() != EXTRA_FIELDS_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let stripped = strip_empty_map(&body);
    if stripped.is_empty() {
        return false;
    }

    stripped != strip_empty_map(&default_tree(schema, IncludeFilter::All))
}
