//! Field schema — the declarative description of every tracker field.
//!
//! A schema is a [`FieldMap`]: an ordered map from a stable field id to a
//! [`FieldSchema`] descriptor. Instances are keyed by the descriptor's display
//! `name`, while identity is always the id, so renaming a field never turns it
//! into a different field.
//!
//! # Serialized form
//!
//! ```json
//! {
//!   "location": {
//!     "name": "Location",
//!     "type": "STRING",
//!     "presence": "DYNAMIC",
//!     "prompt": "Where the scene takes place.",
//!     "defaultValue": "Unknown",
//!     "exampleValues": ["Tavern, main hall"]
//!   }
//! }
//! ```

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// The closed set of field kinds a schema node may declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    /// A single text value.
    #[default]
    String,
    /// An ordered list of text values.
    Array,
    /// A sub-tree keyed by nested field names.
    Object,
    /// A sub-tree keyed by nested field names (list-valued children).
    ArrayObject,
    /// A map from entity key to a sub-tree shaped by the nested fields.
    ForEachObject,
    /// A map from entity key to an ordered list of elements.
    ForEachArray,
}

impl FieldKind {
    pub const ALL: [FieldKind; 6] = [
        FieldKind::String,
        FieldKind::Array,
        FieldKind::Object,
        FieldKind::ArrayObject,
        FieldKind::ForEachObject,
        FieldKind::ForEachArray,
    ];

    /// Parse a declared type name. Matching ignores case, `_`, `-` and
    /// spaces, so legacy spellings such as `forEachObject` are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let squashed: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        match squashed.as_str() {
            "STRING" => Some(FieldKind::String),
            "ARRAY" => Some(FieldKind::Array),
            "OBJECT" => Some(FieldKind::Object),
            "ARRAYOBJECT" => Some(FieldKind::ArrayObject),
            "FOREACHOBJECT" => Some(FieldKind::ForEachObject),
            "FOREACHARRAY" => Some(FieldKind::ForEachArray),
            _ => None,
        }
    }

    /// The canonical serialized name.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "STRING",
            FieldKind::Array => "ARRAY",
            FieldKind::Object => "OBJECT",
            FieldKind::ArrayObject => "ARRAY_OBJECT",
            FieldKind::ForEachObject => "FOR_EACH_OBJECT",
            FieldKind::ForEachArray => "FOR_EACH_ARRAY",
        }
    }

    /// Kinds that carry nested fields.
    pub fn is_composite(self) -> bool {
        !matches!(self, FieldKind::String | FieldKind::Array)
    }

    /// Keyed-collection kinds.
    pub fn is_for_each(self) -> bool {
        matches!(self, FieldKind::ForEachObject | FieldKind::ForEachArray)
    }
}

impl From<String> for FieldKind {
    fn from(s: String) -> Self {
        FieldKind::parse(&s).unwrap_or_else(|| {
            warn!(declared = %s, "Unrecognized field type, falling back to STRING");
            FieldKind::String
        })
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a field is expected to change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Presence {
    /// Regenerated every turn.
    #[default]
    Dynamic,
    /// Generated rarely, carried forward otherwise.
    Static,
    /// Scaffolding generated alongside dynamic fields, never carried.
    Ephemeral,
}

impl Presence {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DYNAMIC" => Some(Presence::Dynamic),
            "STATIC" => Some(Presence::Static),
            "EPHEMERAL" => Some(Presence::Ephemeral),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Dynamic => "DYNAMIC",
            Presence::Static => "STATIC",
            Presence::Ephemeral => "EPHEMERAL",
        }
    }
}

impl From<String> for Presence {
    fn from(s: String) -> Self {
        Presence::parse(&s).unwrap_or_else(|| {
            warn!(declared = %s, "Unrecognized presence, falling back to DYNAMIC");
            Presence::Dynamic
        })
    }
}

impl From<Presence> for String {
    fn from(p: Presence) -> Self {
        p.as_str().to_string()
    }
}

/// Exposure metadata for a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMetadata {
    /// Consumed by backend automation.
    pub internal: bool,
    /// Shown to the model and the user.
    pub external: bool,
    /// Explicit override; derived from `internal && !external` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_only: Option<bool>,
    /// Key under which the value is reported in internal data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_key_id: Option<String>,
}

impl FieldMetadata {
    /// Metadata for a backend-only field.
    pub fn internal_only() -> Self {
        Self {
            internal: true,
            external: false,
            internal_only: None,
            internal_key_id: None,
        }
    }

    /// Effective internal-only flag.
    pub fn is_internal_only(&self) -> bool {
        self.internal_only
            .unwrap_or(self.internal && !self.external)
    }
}

/// A single field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Stable identity. Filled from the enclosing map key on load.
    #[serde(default, skip_serializing)]
    pub id: String,

    /// Display name; the key used in instances.
    #[serde(default)]
    pub name: String,

    /// Declared kind. Missing or unknown kinds fall back to STRING.
    #[serde(default, rename = "type")]
    pub kind: FieldKind,

    #[serde(default)]
    pub presence: Presence,

    /// Instruction text shown to the generator.
    #[serde(default)]
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub default_value: Value,

    /// One entry per few-shot example.
    #[serde(default)]
    pub example_values: Vec<String>,

    /// Children of composite kinds; empty for STRING and ARRAY.
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub nested_fields: FieldMap,

    #[serde(default)]
    pub metadata: FieldMetadata,
}

impl FieldSchema {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            presence: Presence::Dynamic,
            prompt: String::new(),
            default_value: Value::Null,
            example_values: Vec::new(),
            nested_fields: FieldMap::new(),
            metadata: FieldMetadata::default(),
        }
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.example_values = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_nested(mut self, fields: impl IntoIterator<Item = FieldSchema>) -> Self {
        self.nested_fields = fields.into_iter().collect();
        self
    }

    pub fn with_metadata(mut self, metadata: FieldMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_internal_only(&self) -> bool {
        self.metadata.is_internal_only()
    }

    /// Key used for this field in internal data.
    pub fn internal_key(&self) -> &str {
        self.metadata
            .internal_key_id
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.name)
    }

    /// The nested field when the nested schema is exactly one STRING field.
    /// FOR_EACH_ARRAY lists then hold plain strings instead of sub-trees.
    pub fn single_string_element(&self) -> Option<&FieldSchema> {
        match self.nested_fields.fields.as_slice() {
            [only] if only.kind == FieldKind::String => Some(only),
            _ => None,
        }
    }

    /// Build a descriptor from an untrusted schema node. Non-object nodes are
    /// skipped; every malformed member falls back on its own, so one bad
    /// member never costs the whole field.
    fn from_node(id: &str, node: Value) -> Option<Self> {
        let Value::Object(mut node) = node else {
            warn!(field = %id, "Skipping schema node that is not an object");
            return None;
        };

        let name = match node.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            None | Some(Value::Null) | Some(Value::String(_)) => id.to_string(),
            Some(other) => {
                warn!(field = %id, name = %other, "Field name is not text, using the id");
                id.to_string()
            }
        };

        let mut field = FieldSchema::new(id, name, FieldKind::String);
        match node.remove("type") {
            None | Some(Value::Null) => {}
            Some(Value::String(declared)) => field.kind = FieldKind::from(declared),
            Some(other) => warn!(field = %id, declared = %other, "Field type is not text, using STRING"),
        }
        match node.remove("presence") {
            None | Some(Value::Null) => {}
            Some(Value::String(declared)) => field.presence = Presence::from(declared),
            Some(other) => warn!(field = %id, declared = %other, "Presence is not text, using DYNAMIC"),
        }
        match node.remove("prompt") {
            None | Some(Value::Null) => {}
            Some(Value::String(prompt)) => field.prompt = prompt,
            Some(other) => {
                warn!(field = %id, "Prompt is not text, stringifying it");
                field.prompt = text_of(&other);
            }
        }
        field.default_value = node.remove("defaultValue").unwrap_or(Value::Null);
        field.example_values = match node.remove("exampleValues") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(text_of).collect(),
            Some(other) => {
                warn!(field = %id, "exampleValues is not a list, wrapping it in one");
                vec![text_of(&other)]
            }
        };
        match node.remove("nestedFields") {
            None | Some(Value::Null) => {}
            Some(nested @ Value::Object(_)) => match FieldMap::deserialize(&nested) {
                Ok(map) => field.nested_fields = map,
                Err(e) => warn!(field = %id, error = %e, "Dropping unreadable nestedFields"),
            },
            Some(_) => warn!(field = %id, "nestedFields is not a map, dropping it"),
        }
        match node.remove("metadata") {
            None | Some(Value::Null) => {}
            Some(Value::Object(meta)) => field.metadata = FieldMetadata::from_node(id, &meta),
            Some(_) => warn!(field = %id, "metadata is not a map, dropping it"),
        }
        Some(field)
    }
}

impl FieldMetadata {
    fn from_node(id: &str, meta: &serde_json::Map<String, Value>) -> Self {
        let flag = |key: &str| match meta.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(other) => {
                warn!(field = %id, flag = key, value = %other, "Metadata flag is not a boolean, ignoring it");
                None
            }
        };
        let internal_key_id = match meta.get("internalKeyId") {
            None | Some(Value::Null) => None,
            Some(other) => {
                let key = crate::instance::scalar_text(other);
                if key.is_none() {
                    warn!(field = %id, "internalKeyId is not text, ignoring it");
                }
                key
            }
        };
        Self {
            internal: flag("internal").unwrap_or(false),
            external: flag("external").unwrap_or(false),
            internal_only: flag("internalOnly"),
            internal_key_id,
        }
    }
}

/// Text form of a loosely typed member; non-scalars become JSON text.
fn text_of(value: &Value) -> String {
    crate::instance::scalar_text(value).unwrap_or_else(|| value.to_string())
}

/// An ordered map from field id to descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: Vec<FieldSchema>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a schema from a JSON value (`{ id: descriptor, ... }`).
    pub fn from_json(value: &Value) -> Result<Self, crate::SchemaError> {
        if !value.is_object() {
            return Err(crate::SchemaError::NotAMap(describe(value).into()));
        }
        FieldMap::deserialize(value).map_err(|e| crate::SchemaError::Parse(e.to_string()))
    }

    /// Load a schema from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, crate::SchemaError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| crate::SchemaError::Parse(e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldSchema> {
        self.fields.iter()
    }

    /// Look up a field by id.
    pub fn get(&self, id: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Look up a field by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether any field claims this instance key.
    pub fn claims(&self, key: &str) -> bool {
        self.find_by_name(key).is_some()
    }

    /// Insert a field, replacing (in place) any field with the same id.
    pub fn insert(&mut self, field: FieldSchema) -> Option<FieldSchema> {
        match self.fields.iter_mut().find(|f| f.id == field.id) {
            Some(slot) => Some(std::mem::replace(slot, field)),
            None => {
                self.fields.push(field);
                None
            }
        }
    }

    /// Remove a field by id.
    pub fn remove(&mut self, id: &str) -> Option<FieldSchema> {
        let pos = self.fields.iter().position(|f| f.id == id)?;
        Some(self.fields.remove(pos))
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

impl FromIterator<FieldSchema> for FieldMap {
    fn from_iter<T: IntoIterator<Item = FieldSchema>>(iter: T) -> Self {
        let mut map = FieldMap::new();
        for field in iter {
            map.insert(field);
        }
        map
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = &'a FieldSchema;
    type IntoIter = std::slice::Iter<'a, FieldSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.id, field)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field id to field descriptor")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldMap, A::Error> {
                let mut map = FieldMap::new();
                while let Some((id, node)) = access.next_entry::<String, Value>()? {
                    if let Some(field) = FieldSchema::from_node(&id, node) {
                        map.insert(field);
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}
