use anyhow::Result;

use crate::config::MemoriaConfig;
use crate::memory::engine::MemoryEngine;

/// List an owner's newest memories.
pub async fn recent(config: &MemoriaConfig, owner: Option<&str>, limit: usize) -> Result<()> {
    let engine = MemoryEngine::open(config)?;
    let owner = owner.unwrap_or(&config.storage.default_owner);

    let memories = engine.recent_memories(owner, limit).await?;

    if memories.is_empty() {
        println!("No memories yet.");
        return Ok(());
    }

    for memory in &memories {
        println!("  {}  {}", memory.created_at, memory.id);
        println!("     {}", super::truncate_preview(&memory.content, 120));
        if !memory.photos.is_empty() {
            println!("     ({} photo(s))", memory.photos.len());
        }
        println!();
    }

    Ok(())
}

/// Show an owner's memories grouped by category.
pub async fn clusters(config: &MemoriaConfig, owner: Option<&str>) -> Result<()> {
    let engine = MemoryEngine::open(config)?;
    let owner = owner.unwrap_or(&config.storage.default_owner);

    let clusters = engine.memory_clusters(owner).await?;

    if clusters.is_empty() {
        println!("No memories yet.");
        return Ok(());
    }

    for (category, memories) in &clusters {
        println!("{category} ({})", memories.len());
        for memory in memories {
            println!("  {}", super::truncate_preview(&memory.content, 100));
        }
        println!();
    }

    Ok(())
}
