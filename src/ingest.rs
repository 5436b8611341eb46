//! `mdrag add` and `mdrag delete` command implementations.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::service::KnowledgeService;

/// Ingest a markdown file from disk.
///
/// Reads the file, chunks and embeds it, and writes the records to the
/// configured vector store. With `replace`, existing records for the
/// same filename (and repository, when given) are deleted first.
pub async fn run_add(
    config: &Config,
    file: &Path,
    repo: Option<String>,
    replace: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| file.display().to_string());

    if content.trim().is_empty() {
        bail!("{} is empty, nothing to ingest", file.display());
    }

    let service = KnowledgeService::from_config(config)?;
    service.init().await?;

    println!(
        "Ingesting {} into collection '{}'...",
        file.display(),
        service.collection()
    );

    let outcome = service
        .ingest(&content, &filename, repo.as_deref(), replace)
        .await?;

    if outcome.replaced && outcome.deleted > 0 {
        println!("Replaced {} existing record(s).", outcome.deleted);
    }
    println!("Stored {} chunk(s) from {}.", outcome.chunks, filename);

    Ok(())
}

/// Delete every record for a filename.
pub async fn run_delete(config: &Config, filename: &str, repo: Option<String>) -> Result<()> {
    let service = KnowledgeService::from_config(config)?;
    service.init().await?;

    let deleted = service.delete_file(filename, repo.as_deref()).await?;
    if deleted == 0 {
        println!("No records found for '{}'.", filename);
    } else {
        println!("Deleted {} record(s) for '{}'.", deleted, filename);
    }
    Ok(())
}
