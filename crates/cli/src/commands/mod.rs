pub mod audit;
pub mod init;
pub mod prompt;
pub mod tracker;

use scenetrack_codec::Format;
use scenetrack_config::AppConfig;
use scenetrack_core::{FieldMap, IncludeFilter};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Options shared by every command.
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub filter: Option<IncludeFilter>,
    pub format: Option<Format>,
}

/// Everything a tracker command needs: configuration, the resolved schema,
/// and the effective filter and output format.
pub struct Context {
    pub config: AppConfig,
    pub schema: FieldMap,
    pub filter: IncludeFilter,
    pub format: Format,
}

impl Context {
    pub fn load(options: &GlobalOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match &options.config {
            Some(path) => {
                let mut config = AppConfig::load_from(path)?;
                config.apply_env(|key| std::env::var(key).ok())?;
                config
            }
            None => AppConfig::load()?,
        };
        if let Some(path) = &options.schema {
            config.schema = None;
            config.schema_path = Some(path.clone());
        }
        let schema = config.schema()?;
        tracing::debug!(fields = schema.len(), "Resolved tracker schema");
        Ok(Self {
            filter: options.filter.unwrap_or(config.include_filter),
            format: options.format.unwrap_or(config.output_format),
            schema,
            config,
        })
    }
}

/// Read and decode an input file; `-` reads stdin.
pub async fn read_input(path: &Path) -> scenetrack_core::Result<Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        text
    } else {
        tokio::fs::read_to_string(path).await?
    };
    tracing::debug!(input = %path.display(), bytes = text.len(), "Read tracker input");
    Ok(scenetrack_codec::decode_auto(&text)?)
}

/// Encode a value and print it to stdout.
pub fn emit(value: &Value, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let text = scenetrack_codec::encode(value, format)?;
    if text.ends_with('\n') {
        print!("{text}");
    } else {
        println!("{text}");
    }
    Ok(())
}
