//! End-to-end integration tests for SceneTrack.
//!
//! These tests run a tracker through the whole pipeline: model text is
//! decoded, reconciled against a configured schema, merged turn over turn,
//! and rendered back, both through the library crates and the binary.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use scenetrack_audit::audit;
use scenetrack_codec::{Format, decode_auto, encode};
use scenetrack_config::{AppConfig, default_schema};
use scenetrack_core::{EXTRA_FIELDS_KEY, FieldMap, IncludeFilter};
use scenetrack_engine::{
    apply_update, clean, default_tree, example_trees, exists, normalize, prompt_text,
    strip_internal_only,
};
use serde_json::{Value, json};

fn preset() -> FieldMap {
    default_schema().expect("built-in preset loads")
}

const MODEL_REPLY: &str = r#"Sure! Here is the updated tracker:

```yaml
Time: "14:05:00; 10/16/2024 (Wednesday)"
Location: Harbor market, fish stalls
Weather:
  Sky: Overcast
  Temperature: 11°C
  Wind: strong from the west
Topics: [prices, storm]
CharactersPresent: [Mara, Tobin]
Characters:
  Mara:
    Hair: Salt-stiff braid
    Outfit: Oilskin coat
    Mood: irritated
  Tobin: asleep behind the counter
StoryEvents:
  Mara: [haggled over cod]
TimeAnalysis: About twenty minutes passed while haggling.
Mood: tense
```
"#;

// ── Library pipeline ────────────────────────────────────────────────────

#[test]
fn model_reply_is_reconciled_without_loss() {
    let schema = preset();
    let raw = decode_auto(MODEL_REPLY).unwrap();
    let tracker = Value::Object(normalize(&schema, &raw, IncludeFilter::All, true));

    assert_eq!(tracker["Weather"]["Sky"], json!("Overcast"));
    assert_eq!(tracker["Topics"], json!(["prices", "storm"]));
    assert_eq!(tracker["Characters"]["Mara"]["Hair"], json!("Salt-stiff braid"));
    assert_eq!(tracker["StoryEvents"]["Mara"], json!(["haggled over cod"]));

    let extra = &tracker[EXTRA_FIELDS_KEY];
    assert_eq!(extra["Mood"], json!("tense"));
    assert_eq!(extra["Weather"]["Wind"], json!("strong from the west"));
    assert_eq!(extra["Characters"]["Mara"]["Mood"], json!("irritated"));
    assert_eq!(extra["Characters"]["Tobin"], json!("asleep behind the counter"));

    assert!(exists(&schema, &tracker));
}

#[test]
fn turn_over_turn_update_partitions_internal_data() {
    let schema = preset();
    let previous = Value::Object(normalize(
        &schema,
        &decode_auto(MODEL_REPLY).unwrap(),
        IncludeFilter::All,
        true,
    ));
    let incoming = decode_auto(
        "Time: \"14:30:00; 10/16/2024 (Wednesday)\"\n\
         Characters:\n  Tobin:\n    Hair: Bald\n\
         TimeAnalysis: Half an hour of waiting.\n",
    )
    .unwrap();

    let outcome = apply_update(&schema, &previous, &incoming);
    let merged = Value::Object(outcome.merged.clone());
    assert_eq!(merged["Time"], json!("14:30:00; 10/16/2024 (Wednesday)"));
    assert_eq!(merged["Location"], json!("Harbor market, fish stalls"));
    assert_eq!(merged["Characters"]["Mara"]["Outfit"], json!("Oilskin coat"));
    assert_eq!(merged["Characters"]["Tobin"]["Hair"], json!("Bald"));
    assert!(merged.get("TimeAnalysis").is_none());
    assert_eq!(
        outcome.internal.unwrap()["TimeAnalysis"],
        json!("Half an hour of waiting.")
    );

    // Nothing internal is left to strip.
    assert_eq!(strip_internal_only(&schema, &merged), outcome.merged);
}

#[test]
fn default_tracker_does_not_exist_and_cleans_away() {
    let schema = preset();
    let defaults = Value::Object(default_tree(&schema, IncludeFilter::All));
    assert!(!exists(&schema, &defaults));
    assert!(clean(&schema, &defaults, false).is_empty());

    let kept = Value::Object(clean(&schema, &defaults, true));
    assert_eq!(kept["Time"], json!(""));
    assert_eq!(kept["Topics"], json!([]));
}

#[test]
fn schema_file_from_config_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("tavern.yaml");
    std::fs::write(
        &schema_path,
        "drinks:\n  name: Drinks\n  type: for_each_array\n  nestedFields:\n    drink:\n      name: Drink\n      type: STRING\n",
    )
    .unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!("schema_path = {:?}\noutput_format = \"json\"\n", schema_path),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    assert_eq!(config.output_format, Format::Json);
    let schema = config.schema().unwrap();

    let tracker = normalize(&schema, &json!({ "Drinks": { "Ola": ["ale", "mead"] } }), config.include_filter, true);
    assert_eq!(Value::Object(tracker), json!({ "Drinks": { "Ola": ["ale", "mead"] } }));
}

#[test]
fn audited_legacy_schema_loads_and_prompts() {
    let legacy = decode_auto(
        r#"{
            "mood": { "type": "string", "prompt": "Overall mood.", "exampleValues": "calm" },
            "cast": { "name": "Cast", "type": "forEachObject", "presence": "static",
                      "nestedFields": { "role": { "name": "Role", "type": "STRING" } } }
        }"#,
    )
    .unwrap();
    let report = audit(&legacy);
    assert!(!report.is_clean());
    let schema = report.schema().unwrap();

    assert_eq!(
        prompt_text(&schema, IncludeFilter::Dynamic),
        vec![r#"- mood: Overall mood. Examples: "calm""#.to_string()]
    );
    let examples = example_trees(&schema, IncludeFilter::All);
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0]["mood"], json!("calm"));
}

#[test]
fn encoded_output_decodes_back() {
    let schema = preset();
    let tracker = Value::Object(normalize(&schema, &decode_auto(MODEL_REPLY).unwrap(), IncludeFilter::All, true));
    for format in [Format::Json, Format::Yaml] {
        let text = encode(&tracker, format).unwrap();
        let decoded = decode_auto(&text).unwrap();
        let again = Value::Object(normalize(&schema, &decoded, IncludeFilter::All, true));
        assert_eq!(again, tracker, "{format} round trip changed the tracker");
    }
}

#[tokio::test]
async fn concurrent_sessions_are_isolated() {
    let schema = Arc::new(preset());
    let mut handles = Vec::new();
    for i in 0..8 {
        let schema = Arc::clone(&schema);
        handles.push(tokio::task::spawn_blocking(move || {
            let raw = json!({ "Time": format!("turn {i}"), "Note": i });
            (i, normalize(&schema, &raw, IncludeFilter::All, true))
        }));
    }
    for handle in handles {
        let (i, tracker) = handle.await.unwrap();
        assert_eq!(tracker["Time"], json!(format!("turn {i}")));
        assert_eq!(tracker[EXTRA_FIELDS_KEY]["Note"], json!(i));
    }
}

// ── Binary ──────────────────────────────────────────────────────────────

fn scenetrack(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scenetrack"));
    cmd.env("SCENETRACK_CONFIG_DIR", config_dir)
        .env_remove("SCENETRACK_SCHEMA")
        .env_remove("SCENETRACK_FORMAT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn binary_normalizes_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = scenetrack(dir.path())
        .args(["--format", "json", "normalize", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(MODEL_REPLY.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let tracker: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tracker["Characters"]["Mara"]["Outfit"], json!("Oilskin coat"));
    assert_eq!(tracker[EXTRA_FIELDS_KEY]["Mood"], json!("tense"));
}

#[test]
fn binary_init_prints_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = scenetrack(dir.path()).arg("init").output().unwrap();
    assert!(output.status.success());
    let printed = String::from_utf8(output.stdout).unwrap();
    let parsed: AppConfig = toml::from_str(&printed).unwrap();
    assert_eq!(parsed, AppConfig::default());
}

#[test]
fn binary_strict_audit_fails_on_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("legacy.json");
    std::fs::write(&schema_path, r#"{ "mood": { "type": "emotion" } }"#).unwrap();

    let output = scenetrack(dir.path())
        .args(["audit", "--strict"])
        .arg(&schema_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("unknown_type"));
}

#[test]
fn binary_loads_config_only_for_tracker_commands() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "output_format = [").unwrap();

    let init = scenetrack(dir.path()).arg("init").output().unwrap();
    assert!(init.status.success());

    let default = scenetrack(dir.path()).arg("default").output().unwrap();
    assert!(!default.status.success());
    let stderr = String::from_utf8(default.stderr).unwrap();
    assert!(stderr.contains("config.toml"), "{stderr}");
}
