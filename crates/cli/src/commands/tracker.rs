//! Tracker commands: `default`, `normalize`, `update`, `exists`, `clean`
//! and `strip`.

use super::{Context, emit, read_input};
use serde_json::Value;
use std::path::Path;

pub async fn default(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let tree = scenetrack_engine::default_tree(&ctx.schema, ctx.filter);
    emit(&Value::Object(tree), ctx.format)
}

pub async fn normalize(ctx: &Context, input: &Path, no_extra: bool) -> Result<(), Box<dyn std::error::Error>> {
    let raw = read_input(input).await?;
    let include_extra = ctx.config.include_extra && !no_extra;
    let instance = scenetrack_engine::normalize(&ctx.schema, &raw, ctx.filter, include_extra);
    emit(&Value::Object(instance), ctx.format)
}

/// Merge `incoming` over `previous`. Prints the merged tracker and, when
/// present, the internal-only data beside it.
pub async fn update(ctx: &Context, previous: &Path, incoming: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let previous = read_input(previous).await?;
    let incoming = read_input(incoming).await?;
    let outcome = scenetrack_engine::apply_update(&ctx.schema, &previous, &incoming);
    if let Some(internal) = &outcome.internal {
        tracing::debug!(keys = internal.len(), "Update produced internal-only data");
    }
    emit(&serde_json::to_value(&outcome)?, ctx.format)
}

pub async fn exists(ctx: &Context, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let instance = read_input(input).await?;
    println!("{}", scenetrack_engine::exists(&ctx.schema, &instance));
    Ok(())
}

pub async fn clean(ctx: &Context, input: &Path, preserve: bool) -> Result<(), Box<dyn std::error::Error>> {
    let instance = read_input(input).await?;
    let preserve = preserve || ctx.config.preserve_structure;
    let cleaned = scenetrack_engine::clean(&ctx.schema, &instance, preserve);
    emit(&Value::Object(cleaned), ctx.format)
}

pub async fn strip(ctx: &Context, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let instance = read_input(input).await?;
    let visible = scenetrack_engine::strip_internal_only(&ctx.schema, &instance);
    emit(&Value::Object(visible), ctx.format)
}
