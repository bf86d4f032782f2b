//! Schema auditor.
//!
//! Schemas written by hand or exported by older tools use legacy type
//! spellings, carry example values of the wrong shape, or nest fields under
//! scalar types. Loading is lenient (bad nodes fall back or are skipped), so
//! such problems go unnoticed. [`audit`] walks the raw schema JSON, reports
//! every problem as a [`Finding`] and produces a normalized schema that
//! loads without any fallback.

use scenetrack_core::instance::scalar_text;
use scenetrack_core::{FieldKind, FieldMap, Presence, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic; the schema loads the same either way.
    Info,
    /// The schema loads, but not the way its author likely meant.
    Warning,
    /// Part of the schema is dropped on load.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One problem found in a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Slash-separated field ids from the root, e.g. `characters/hair`.
    pub path: String,
    pub severity: Severity,
    /// Stable machine-readable code, e.g. `legacy_type`.
    pub code: String,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { &self.path };
        write!(f, "[{}] {} ({}): {}", self.severity, path, self.code, self.message)
    }
}

/// The result of [`audit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub findings: Vec<Finding>,
    /// The schema with every finding corrected.
    pub normalized: Value,
}

impl AuditReport {
    /// True when nothing worse than [`Severity::Info`] was found.
    pub fn is_clean(&self) -> bool {
        self.findings.iter().all(|f| f.severity == Severity::Info)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Load the normalized schema.
    pub fn schema(&self) -> Result<FieldMap, SchemaError> {
        FieldMap::from_json(&self.normalized)
    }
}

struct Auditor {
    findings: Vec<Finding>,
}

impl Auditor {
    fn report(&mut self, path: &str, severity: Severity, code: &str, message: impl Into<String>) {
        let finding = Finding {
            path: path.to_string(),
            severity,
            code: code.to_string(),
            message: message.into(),
        };
        debug!(path = %finding.path, code = %finding.code, "Schema finding");
        self.findings.push(finding);
    }

    /// Audit a map of field id to descriptor.
    fn field_map(&mut self, parent: &str, map: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        let mut names = HashSet::new();
        for (id, node) in map {
            let path = if parent.is_empty() {
                id.clone()
            } else {
                format!("{parent}/{id}")
            };
            let Value::Object(node) = node else {
                self.report(&path, Severity::Error, "not_an_object", "field descriptor is not a map; dropped");
                continue;
            };
            let field = self.field(&path, id, node);
            if let Some(name) = field.get("name").and_then(Value::as_str) {
                if !names.insert(name.to_string()) {
                    self.report(
                        &path,
                        Severity::Warning,
                        "duplicate_name",
                        format!("name '{name}' is shared with an earlier sibling; the later field overwrites it"),
                    );
                }
            }
            out.insert(id.clone(), Value::Object(field));
        }
        out
    }

    fn field(&mut self, path: &str, id: &str, node: &Map<String, Value>) -> Map<String, Value> {
        let mut out = node.clone();

        let name_ok = node
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|n| !n.trim().is_empty());
        if !name_ok {
            self.report(path, Severity::Warning, "missing_name", format!("no name; using id '{id}'"));
            out.insert("name".into(), Value::String(id.to_string()));
        }

        let kind = self.kind(path, node.get("type"));
        out.insert("type".into(), Value::String(kind.as_str().to_string()));

        if let Some(presence) = self.presence(path, node.get("presence")) {
            out.insert("presence".into(), Value::String(presence.as_str().to_string()));
        }

        match node.get("prompt") {
            None | Some(Value::String(_)) => {}
            Some(Value::Null) => {
                out.remove("prompt");
            }
            Some(other) => {
                self.report(path, Severity::Warning, "prompt_not_text", "prompt is not text; stringified");
                out.insert("prompt".into(), Value::String(text_of(other)));
            }
        }

        match self.examples(path, node.get("exampleValues")) {
            Some(examples) => out.insert("exampleValues".into(), examples),
            None => out.remove("exampleValues"),
        };

        match self.nested(path, kind, node.get("nestedFields")) {
            Some(nested) => out.insert("nestedFields".into(), nested),
            None => out.remove("nestedFields"),
        };

        if let Some(metadata) = self.metadata(path, node.get("metadata")) {
            out.insert("metadata".into(), metadata);
        } else {
            out.remove("metadata");
        }

        out
    }

    fn kind(&mut self, path: &str, declared: Option<&Value>) -> FieldKind {
        match declared {
            None | Some(Value::Null) => {
                self.report(path, Severity::Warning, "missing_type", "no type; assuming STRING");
                FieldKind::String
            }
            Some(Value::String(s)) => match FieldKind::parse(s) {
                Some(kind) if kind.as_str() == s => kind,
                Some(kind) => {
                    self.report(
                        path,
                        Severity::Info,
                        "legacy_type",
                        format!("type '{s}' is spelled '{}'", kind.as_str()),
                    );
                    kind
                }
                None => {
                    self.report(
                        path,
                        Severity::Warning,
                        "unknown_type",
                        format!("unknown type '{s}'; treated as STRING"),
                    );
                    FieldKind::String
                }
            },
            Some(other) => {
                self.report(
                    path,
                    Severity::Warning,
                    "unknown_type",
                    format!("type {other} is not text; treated as STRING"),
                );
                FieldKind::String
            }
        }
    }

    /// The canonical presence, or `None` to leave the key absent.
    fn presence(&mut self, path: &str, declared: Option<&Value>) -> Option<Presence> {
        match declared? {
            Value::Null => None,
            Value::String(s) => match Presence::parse(s) {
                Some(presence) => {
                    if presence.as_str() != s {
                        self.report(
                            path,
                            Severity::Info,
                            "legacy_presence",
                            format!("presence '{s}' is spelled '{}'", presence.as_str()),
                        );
                    }
                    Some(presence)
                }
                None => {
                    self.report(
                        path,
                        Severity::Warning,
                        "invalid_presence",
                        format!("unknown presence '{s}'; using DYNAMIC"),
                    );
                    Some(Presence::Dynamic)
                }
            },
            other => {
                self.report(
                    path,
                    Severity::Warning,
                    "invalid_presence",
                    format!("presence {other} is not text; using DYNAMIC"),
                );
                Some(Presence::Dynamic)
            }
        }
    }

    fn examples(&mut self, path: &str, declared: Option<&Value>) -> Option<Value> {
        match declared? {
            Value::Null => None,
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    return Some(Value::Array(items.clone()));
                }
                self.report(
                    path,
                    Severity::Info,
                    "examples_stringified",
                    "non-text example values were converted to text",
                );
                Some(Value::Array(items.iter().map(|v| Value::String(text_of(v))).collect()))
            }
            other => {
                self.report(
                    path,
                    Severity::Warning,
                    "examples_not_list",
                    "exampleValues is not a list; wrapped in one",
                );
                Some(Value::Array(vec![Value::String(text_of(other))]))
            }
        }
    }

    fn nested(&mut self, path: &str, kind: FieldKind, declared: Option<&Value>) -> Option<Value> {
        let nested = match declared {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                self.report(path, Severity::Error, "nested_not_a_map", "nestedFields is not a map; dropped");
                None
            }
        };
        let has_nested = nested.is_some_and(|m| !m.is_empty());

        if !kind.is_composite() {
            if has_nested {
                self.report(
                    path,
                    Severity::Warning,
                    "nested_on_scalar",
                    format!("{kind} fields cannot have nested fields; removed"),
                );
            }
            return None;
        }
        if !has_nested {
            self.report(
                path,
                Severity::Warning,
                "composite_without_nested",
                format!("{kind} field declares no nested fields"),
            );
        }
        nested.map(|map| Value::Object(self.field_map(path, map)))
    }

    fn metadata(&mut self, path: &str, declared: Option<&Value>) -> Option<Value> {
        let map = match declared? {
            Value::Null => return None,
            Value::Object(map) => map,
            _ => {
                self.report(path, Severity::Warning, "metadata_not_a_map", "metadata is not a map; dropped");
                return None;
            }
        };

        let mut out = map.clone();
        for flag in ["internal", "external", "internalOnly"] {
            match map.get(flag) {
                None | Some(Value::Bool(_)) => {}
                Some(other) => {
                    self.report(
                        path,
                        Severity::Warning,
                        "metadata_flag_not_bool",
                        format!("metadata.{flag} is {other}, not a boolean; removed"),
                    );
                    out.remove(flag);
                }
            }
        }

        match map.get("internalKeyId") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => match scalar_text(other) {
                Some(key) => {
                    self.report(
                        path,
                        Severity::Warning,
                        "internal_key_not_text",
                        format!("metadata.internalKeyId is {other}, not text; stringified"),
                    );
                    out.insert("internalKeyId".into(), Value::String(key));
                }
                None => {
                    self.report(
                        path,
                        Severity::Warning,
                        "internal_key_not_text",
                        "metadata.internalKeyId is not text; removed",
                    );
                    out.remove("internalKeyId");
                }
            },
        }

        let flag = |key: &str| out.get(key).and_then(Value::as_bool);
        let derived = flag("internal").unwrap_or(false) && !flag("external").unwrap_or(false);
        if let Some(explicit) = flag("internalOnly") {
            if explicit != derived {
                self.report(
                    path,
                    Severity::Info,
                    "internal_only_override",
                    format!("internalOnly={explicit} overrides internal/external flags (which imply {derived})"),
                );
            }
        }
        Some(Value::Object(out))
    }
}

fn text_of(value: &Value) -> String {
    scalar_text(value).unwrap_or_else(|| value.to_string())
}

/// Audit a raw schema document.
pub fn audit(raw: &Value) -> AuditReport {
    let mut auditor = Auditor { findings: Vec::new() };
    let normalized = match raw {
        Value::Object(map) => Value::Object(auditor.field_map("", map)),
        _ => {
            auditor.report("", Severity::Error, "not_a_map", "schema root is not a map of field id to descriptor");
            Value::Object(Map::new())
        }
    };
    let report = AuditReport {
        findings: auditor.findings,
        normalized,
    };
    info!(
        findings = report.findings.len(),
        errors = report.count(Severity::Error),
        warnings = report.count(Severity::Warning),
        "Schema audit finished"
    );
    report
}
