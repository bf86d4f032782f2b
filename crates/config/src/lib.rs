//! Configuration loading, validation, and schema resolution for SceneTrack.
//!
//! Loads configuration from `~/.scenetrack/config.toml` with environment
//! variable overrides. The tracker schema is taken from an inline `[schema]`
//! table, a schema file, or the built-in scene preset, in that order.

use scenetrack_codec::Format;
use scenetrack_core::{FieldMap, IncludeFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The built-in scene tracker preset.
const DEFAULT_SCHEMA: &str = include_str!("default_schema.json");

/// The root configuration structure.
///
/// Maps directly to `~/.scenetrack/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Schema file (JSON or YAML). Ignored when `[schema]` is set inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,

    /// Text format for command output
    #[serde(default)]
    pub output_format: Format,

    /// Presence filter applied by default
    #[serde(default)]
    pub include_filter: IncludeFilter,

    /// Embed `_extraFields` in normalized output
    #[serde(default = "default_true")]
    pub include_extra: bool,

    /// Keep emptied keys when cleaning
    #[serde(default)]
    pub preserve_structure: bool,

    /// Inline schema, keyed by field id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<FieldMap>,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from the default path (~/.scenetrack/config.toml).
    ///
    /// Environment overrides:
    /// - `SCENETRACK_SCHEMA`: schema file path
    /// - `SCENETRACK_FORMAT`: output format (`json` or `yaml`)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = lookup("SCENETRACK_SCHEMA").filter(|p| !p.trim().is_empty()) {
            self.schema_path = Some(PathBuf::from(path));
        }
        if let Some(format) = lookup("SCENETRACK_FORMAT") {
            self.output_format = format
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("SCENETRACK_FORMAT: {e}")))?;
        }
        Ok(())
    }

    /// Get the configuration directory path. `SCENETRACK_CONFIG_DIR`
    /// replaces the default `~/.scenetrack`.
    pub fn config_dir() -> PathBuf {
        match std::env::var("SCENETRACK_CONFIG_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs_home().join(".scenetrack"),
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self
            .schema_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "schema_path must not be empty".into(),
            ));
        }

        if self.schema.as_ref().is_some_and(FieldMap::is_empty) {
            return Err(ConfigError::ValidationError(
                "inline [schema] table declares no fields".into(),
            ));
        }

        Ok(())
    }

    /// Resolve the tracker schema: inline table, then schema file, then the
    /// built-in preset.
    pub fn schema(&self) -> Result<FieldMap, ConfigError> {
        if let Some(schema) = &self.schema {
            return Ok(schema.clone());
        }
        match &self.schema_path {
            Some(path) => load_schema(path),
            None => default_schema(),
        }
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            output_format: Format::default(),
            include_filter: IncludeFilter::default(),
            include_extra: true,
            preserve_structure: false,
            schema: None,
        }
    }
}

/// The built-in scene tracker schema.
pub fn default_schema() -> Result<FieldMap, ConfigError> {
    FieldMap::from_json_str(DEFAULT_SCHEMA).map_err(|e| ConfigError::SchemaError {
        source_name: "built-in preset".into(),
        reason: e.to_string(),
    })
}

/// Load a schema file. JSON and YAML are both accepted.
pub fn load_schema(path: &Path) -> Result<FieldMap, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let schema_error = |reason: String| ConfigError::SchemaError {
        source_name: path.display().to_string(),
        reason,
    };
    let raw = scenetrack_codec::decode_auto(&text).map_err(|e| schema_error(e.to_string()))?;
    let schema = FieldMap::from_json(&raw).map_err(|e| schema_error(e.to_string()))?;
    tracing::info!(path = %path.display(), fields = schema.len(), "Loaded tracker schema");
    Ok(schema)
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid tracker schema ({source_name}): {reason}")]
    SchemaError { source_name: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenetrack_core::{FieldKind, Presence};
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.output_format, Format::Yaml);
        assert_eq!(config.include_filter, IncludeFilter::All);
        assert!(config.include_extra);
        assert!(!config.preserve_structure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig {
            schema_path: Some(PathBuf::from("trackers/scene.yaml")),
            output_format: Format::Json,
            include_filter: IncludeFilter::Dynamic,
            ..AppConfig::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(result.unwrap(), AppConfig::default());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("output_format = \"yaml\""));
        assert!(toml_str.contains("include_filter = \"all\""));
        assert!(toml_str.contains("include_extra = true"));
    }

    #[test]
    fn builtin_preset_loads() {
        let schema = AppConfig::default().schema().unwrap();
        let names: Vec<&str> = schema.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Time",
                "Location",
                "Weather",
                "Topics",
                "CharactersPresent",
                "Characters",
                "StoryEvents",
                "TimeAnalysis"
            ]
        );
        assert!(schema.get("time_analysis").unwrap().is_internal_only());
        assert_eq!(schema.get("characters").unwrap().kind, FieldKind::ForEachObject);
    }

    #[test]
    fn inline_schema_table_wins() {
        let config: AppConfig = toml::from_str(
            r#"
            schema_path = "/does/not/matter.json"

            [schema.mood]
            name = "Mood"
            type = "string"
            presence = "static"

            [schema.cast]
            name = "Cast"
            type = "FOR_EACH_OBJECT"

            [schema.cast.nestedFields.role]
            name = "Role"
            "#,
        )
        .unwrap();
        let schema = config.schema().unwrap();
        let mood = schema.get("mood").unwrap();
        assert_eq!(mood.kind, FieldKind::String);
        assert_eq!(mood.presence, Presence::Static);
        assert_eq!(schema.get("cast").unwrap().nested_fields.len(), 1);
    }

    #[test]
    fn schema_file_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("scene.yaml");
        std::fs::write(&yaml_path, "mood:\n  name: Mood\n  type: STRING\n").unwrap();
        let config = AppConfig {
            schema_path: Some(yaml_path),
            ..AppConfig::default()
        };
        assert_eq!(config.schema().unwrap().find_by_name("Mood").unwrap().id, "mood");

        let json_path = dir.path().join("scene.json");
        std::fs::write(&json_path, r#"{"mood": {"name": "Mood", "type": "STRING"}}"#).unwrap();
        assert_eq!(load_schema(&json_path).unwrap().len(), 1);
    }

    #[test]
    fn bad_schema_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(load_schema(&path), Err(ConfigError::SchemaError { .. })));
        assert!(matches!(
            load_schema(&dir.path().join("missing.json")),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_format = \"json\"\npreserve_structure = true").unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.output_format, Format::Json);
        assert!(config.preserve_structure);
        assert!(config.include_extra);
    }

    #[test]
    fn invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "include_filter = \"sometimes\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ParseError { .. })
        ));

        let config = AppConfig {
            schema_path: Some(PathBuf::new()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(|key| match key {
                "SCENETRACK_SCHEMA" => Some("/etc/scene.yaml".into()),
                "SCENETRACK_FORMAT" => Some("JSON".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.schema_path, Some(PathBuf::from("/etc/scene.yaml")));
        assert_eq!(config.output_format, Format::Json);

        let err = AppConfig::default()
            .apply_env(|key| (key == "SCENETRACK_FORMAT").then(|| "xml".into()))
            .unwrap_err();
        assert!(err.to_string().contains("SCENETRACK_FORMAT"));
    }
}
