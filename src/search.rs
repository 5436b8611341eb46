//! `mdrag search` command implementation.

use anyhow::Result;

use crate::config::Config;
use crate::service::KnowledgeService;

/// Run a semantic search and print ranked results.
pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    repo: Option<String>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let service = KnowledgeService::from_config(config)?;
    service.init().await?;

    let limit = limit.unwrap_or(config.search.default_limit);
    let results = service.search(query, limit, repo.as_deref()).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("Found {} result(s) for \"{}\":\n", results.len(), query);
    for (idx, result) in results.iter().enumerate() {
        println!("{}. [{:.4}] {}", idx + 1, result.score, result.source());
        if let Some(ref repo) = result.repo_name {
            println!("   repository: {}", repo);
        }
        for line in result.content.lines() {
            println!("   {}", line);
        }
        println!();
    }

    Ok(())
}
