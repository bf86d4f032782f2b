//! `scenetrack audit` — report problems in a schema file.

use super::{emit, read_input};
use scenetrack_codec::Format;
use std::path::Path;

pub async fn run(
    input: &Path,
    normalized: bool,
    strict: bool,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = read_input(input).await?;
    let report = scenetrack_audit::audit(&raw);

    if normalized {
        emit(&report.normalized, format)?;
    } else if report.findings.is_empty() {
        println!("✅ {} — no findings", input.display());
    } else {
        println!("{} finding(s) in {}:\n", report.findings.len(), input.display());
        for finding in &report.findings {
            println!("  {finding}");
        }
    }

    if strict && !report.is_clean() {
        return Err(format!("schema {} has warnings or errors", input.display()).into());
    }
    Ok(())
}
