//! Presence-based include filters.

use crate::schema::Presence;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which fields an engine walk should visit, by their declared presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeFilter {
    /// Fields expected to change every turn.
    Dynamic,
    /// Fields generated rarely.
    Static,
    /// Every field regardless of presence.
    #[default]
    All,
}

impl IncludeFilter {
    /// Does this filter include a field with the given presence when
    /// reconciling real data?
    pub fn includes(self, presence: Presence) -> bool {
        match (self, presence) {
            (IncludeFilter::All, _) => true,
            (IncludeFilter::Dynamic, Presence::Dynamic) => true,
            (IncludeFilter::Static, Presence::Static) => true,
            _ => false,
        }
    }

    /// Like [`includes`](Self::includes), but also admits ephemeral
    /// scaffolding fields under the dynamic filter. Used when generating
    /// defaults, examples and prompt text.
    pub fn includes_scaffolding(self, presence: Presence) -> bool {
        self.includes(presence)
            || (self == IncludeFilter::Dynamic && presence == Presence::Ephemeral)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IncludeFilter::Dynamic => "dynamic",
            IncludeFilter::Static => "static",
            IncludeFilter::All => "all",
        }
    }
}

impl fmt::Display for IncludeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncludeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamic" => Ok(IncludeFilter::Dynamic),
            "static" => Ok(IncludeFilter::Static),
            "all" => Ok(IncludeFilter::All),
            other => Err(format!(
                "unknown include filter '{other}' (expected dynamic, static or all)"
            )),
        }
    }
}
