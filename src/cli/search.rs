use anyhow::Result;

use crate::config::MemoriaConfig;
use crate::memory::engine::MemoryEngine;

/// Run an interactive search from the terminal.
pub async fn search(
    config: &MemoriaConfig,
    query: &str,
    owner: Option<&str>,
    limit: Option<usize>,
    threshold: Option<f64>,
) -> Result<()> {
    let engine = MemoryEngine::open(config)?;
    let owner = owner.unwrap_or(&config.storage.default_owner);
    let limit = limit.unwrap_or(config.retrieval.default_limit);

    let results = engine.search_memories(query, owner, limit, threshold).await?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. {} (score: {:.4}, importance: {:.2})",
            i + 1,
            result.record.id,
            result.similarity_score,
            result.record.importance,
        );
        println!("     {}", super::truncate_preview(&result.record.content, 120));
        if !result.record.categories.is_empty() {
            let categories: Vec<&str> =
                result.record.categories.iter().map(|s| s.as_str()).collect();
            println!("     [{}]", categories.join(", "));
        }
        println!();
    }

    Ok(())
}
