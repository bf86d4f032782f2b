//! Shared fixtures for engine tests.

use scenetrack_core::{FieldKind, FieldMap, FieldMetadata, FieldSchema, Presence};

/// A small scene tracker covering every field kind.
pub(crate) fn scene_schema() -> FieldMap {
    [
        FieldSchema::new("time", "Time", FieldKind::String)
            .with_prompt("Current time of day, 24h clock.")
            .with_examples(["09:15", "21:40"]),
        FieldSchema::new("location", "Location", FieldKind::String)
            .with_presence(Presence::Static)
            .with_default("Unknown"),
        FieldSchema::new("weather", "Weather", FieldKind::Object).with_nested([
            FieldSchema::new("sky", "Sky", FieldKind::String).with_default("Clear"),
            FieldSchema::new("temperature", "Temperature", FieldKind::String),
        ]),
        FieldSchema::new("topics", "Topics", FieldKind::Array)
            .with_prompt("Subjects of conversation.")
            .with_examples([r#"["trade", "weather"]"#, "harvest"]),
        FieldSchema::new("characters", "Characters", FieldKind::ForEachObject)
            .with_examples([r#"["Alice", "Bob"]"#, r#"["Eve"]"#])
            .with_nested([
                FieldSchema::new("hair", "Hair", FieldKind::String)
                    .with_examples(["Red braid", "Short, grey"]),
                FieldSchema::new("outfit", "Outfit", FieldKind::String).with_default("Unknown"),
                FieldSchema::new("secret", "Secret", FieldKind::String)
                    .with_metadata(FieldMetadata::internal_only()),
            ]),
        FieldSchema::new("events", "Events", FieldKind::ForEachArray)
            .with_nested([FieldSchema::new("text", "Text", FieldKind::String)]),
        FieldSchema::new("time_analysis", "TimeAnalysis", FieldKind::String)
            .with_prompt("How much time passed and why.")
            .with_metadata(FieldMetadata::internal_only()),
    ]
    .into_iter()
    .collect()
}
