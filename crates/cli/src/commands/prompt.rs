//! `scenetrack prompt` and `scenetrack examples` — generation scaffolding.

use super::{Context, emit};
use serde_json::Value;

pub async fn prompt(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    for line in scenetrack_engine::prompt_text(&ctx.schema, ctx.filter) {
        println!("{line}");
    }
    Ok(())
}

pub async fn examples(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let examples = scenetrack_engine::example_trees(&ctx.schema, ctx.filter);
    if examples.is_empty() {
        println!("The schema declares no example values.");
        return Ok(());
    }
    for (i, example) in examples.into_iter().enumerate() {
        println!("# Example {}", i + 1);
        emit(&Value::Object(example), ctx.format)?;
    }
    Ok(())
}
