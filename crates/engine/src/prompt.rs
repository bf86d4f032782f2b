//! Prompt text: one instruction line per field, nested fields indented.

use scenetrack_core::{FieldKind, FieldMap, FieldSchema, IncludeFilter};

/// Render field instructions for a generation prompt.
///
/// Each line reads `- <name>: <prompt>`, followed by ` Examples: "a", "b"`
/// when the field declares examples. Nested fields are indented two spaces
/// per level. Internal-only fields are listed: the model has to produce them
/// even though they are stripped before display.
pub fn prompt_text(schema: &FieldMap, filter: IncludeFilter) -> Vec<String> {
    let mut lines = Vec::new();
    push_field_lines(schema, filter, 0, &mut lines);
    lines
}

fn push_field_lines(fields: &FieldMap, filter: IncludeFilter, depth: usize, lines: &mut Vec<String>) {
    for field in fields {
        if !filter.includes_scaffolding(field.presence) {
            continue;
        }
        lines.push(field_line(field, depth));
        if field.kind.is_composite() {
            push_field_lines(&field.nested_fields, filter, depth + 1, lines);
        }
    }
}

fn shape_hint(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String | FieldKind::Object | FieldKind::ArrayObject => "",
        FieldKind::Array => " (list)",
        FieldKind::ForEachObject => " (one entry per name)",
        FieldKind::ForEachArray => " (one list per name)",
    }
}

fn field_line(field: &FieldSchema, depth: usize) -> String {
    let mut line = format!("{}- {}{}", "  ".repeat(depth), field.name, shape_hint(field.kind));
    let prompt = field.prompt.trim();
    if !prompt.is_empty() {
        line.push_str(": ");
        line.push_str(prompt);
    }
    if !field.example_values.is_empty() {
        let examples: Vec<String> = field
            .example_values
            .iter()
            .map(|example| format!("\"{}\"", example.trim()))
            .collect();
        line.push_str(" Examples: ");
        line.push_str(&examples.join(", "));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scene_schema;
    use scenetrack_core::Presence;

    #[test]
    fn lines_follow_declaration_order_with_indent() {
        let lines = prompt_text(&scene_schema(), IncludeFilter::All);
        assert_eq!(lines[0], r#"- Time: Current time of day, 24h clock. Examples: "09:15", "21:40""#);
        assert_eq!(lines[1], "- Location");
        assert_eq!(lines[2], "- Weather");
        assert_eq!(lines[3], "  - Sky");
        assert!(lines.iter().any(|l| l == r#"  - Hair Examples: "Red braid", "Short, grey""#));
        assert!(lines.iter().any(|l| l.starts_with("- Characters (one entry per name)")));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("- TimeAnalysis: How much time passed and why.")
        );
    }

    #[test]
    fn filter_applies_with_scaffolding() {
        let schema: FieldMap = [
            FieldSchema::new("l", "Location", FieldKind::String).with_presence(Presence::Static),
            FieldSchema::new("s", "Scratchpad", FieldKind::String)
                .with_presence(Presence::Ephemeral)
                .with_prompt("Think here."),
        ]
        .into_iter()
        .collect();
        assert_eq!(prompt_text(&schema, IncludeFilter::Dynamic), vec!["- Scratchpad: Think here."]);
        assert_eq!(prompt_text(&schema, IncludeFilter::Static), vec!["- Location"]);
    }
}
