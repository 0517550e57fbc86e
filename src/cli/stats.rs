use anyhow::Result;

use crate::config::MemoriaConfig;
use crate::memory::engine::MemoryEngine;

/// Display store statistics in the terminal.
pub async fn stats(config: &MemoriaConfig) -> Result<()> {
    let engine = MemoryEngine::open(config)?;
    let response = engine.stats().await?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Index size:          {}", response.index_size);
    println!("  Dimensions:          {}", response.dimensions);
    println!();

    if !response.by_owner.is_empty() {
        println!("By Owner:");
        for (owner, count) in &response.by_owner {
            println!("  {:<20} {}", owner, count);
        }
    }

    Ok(())
}
