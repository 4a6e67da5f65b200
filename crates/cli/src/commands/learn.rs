//! `promptmaster learn`: ingest a PDF into the knowledge base.

use std::path::PathBuf;

use promptmaster_core::state::Document;
use promptmaster_engine::IngestOutcome;

use super::{open_engine, report_persist_failure};

pub async fn run(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, engine) = open_engine().await?;

    let bytes =
        std::fs::read(&file).map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let mime_type = mime_guess::from_path(&file)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    eprint!("  Learning from {file_name}...");
    let result = engine.ingest(Document::new(file_name, bytes, mime_type)).await;
    eprint!("\r                                              \r");
    let report = result?;

    println!("✅ Learned: {}", report.summary);
    println!("   Version: {}", report.version.id);
    if report.outcome == IngestOutcome::ParseFallback {
        println!("   ⚠️  The answer was not structured; its raw text was appended.");
    }
    report_persist_failure(engine.knowledge());
    Ok(())
}
