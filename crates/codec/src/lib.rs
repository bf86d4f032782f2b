//! Text codec for tracker instances and schemas.
//!
//! Model output usually arrives as YAML or JSON, often wrapped in a Markdown
//! code fence with some chatter around it. [`decode`] and [`decode_auto`]
//! unwrap the first fence (if any) before parsing; [`encode`] renders a
//! value back to text.

use regex_lite::Regex;
use scenetrack_core::CodecError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

/// A supported text format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    #[default]
    Yaml,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    /// Guess a format from a fence language tag or file extension.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::from_hint(s).ok_or_else(|| CodecError::UnsupportedFormat(s.trim().to_string()))
    }
}

static FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_-]*)[^\n]*\n(.*?)```").ok());

/// A Markdown code block found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fenced<'a> {
    /// The language tag, empty when the fence has none.
    pub lang: &'a str,
    pub body: &'a str,
}

/// The first fenced code block in `text`, if any.
pub fn extract_fenced(text: &str) -> Option<Fenced<'_>> {
    let caps = FENCE.as_ref()?.captures(text)?;
    Some(Fenced {
        lang: caps.get(1).map_or("", |m| m.as_str()),
        body: caps.get(2).map_or("", |m| m.as_str()),
    })
}

/// Strip a surrounding fence, keeping only its body.
fn unwrap_fence(text: &str) -> &str {
    match extract_fenced(text) {
        Some(fenced) => fenced.body,
        None => text,
    }
}

fn decode_body(body: &str, format: Format) -> Result<Value, CodecError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let decoded = match format {
        Format::Json => serde_json::from_str::<Value>(body).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_str::<Value>(body).map_err(|e| e.to_string()),
    };
    decoded.map_err(|reason| CodecError::Decode {
        format: format.to_string(),
        reason,
    })
}

/// Decode `text` as `format`. Empty text decodes to an empty map.
pub fn decode(text: &str, format: Format) -> Result<Value, CodecError> {
    decode_body(unwrap_fence(text), format)
}

/// Decode `text` without knowing its format.
///
/// A fence language tag decides when present; otherwise JSON is tried first
/// and YAML second. The YAML error is reported when both fail.
pub fn decode_auto(text: &str) -> Result<Value, CodecError> {
    let (body, hinted) = match extract_fenced(text) {
        Some(fenced) => (fenced.body, Format::from_hint(fenced.lang)),
        None => (text, None),
    };
    if let Some(format) = hinted {
        return decode_body(body, format);
    }
    match decode_body(body, Format::Json) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!(error = %err, "Not JSON; trying YAML");
            decode_body(body, Format::Yaml)
        }
    }
}

/// Render `value` as `format`. JSON output is pretty-printed.
pub fn encode(value: &Value, format: Format) -> Result<String, CodecError> {
    let encoded = match format {
        Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    };
    encoded.map_err(|reason| CodecError::Encode {
        format: format.to_string(),
        reason,
    })
}
