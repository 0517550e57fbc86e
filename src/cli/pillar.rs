use anyhow::Result;

use crate::config::MemoriaConfig;
use crate::memory::engine::MemoryEngine;
use crate::memory::types::{NewPillar, PillarCategory};

/// Create a single pillar for an owner.
pub async fn add(
    config: &MemoriaConfig,
    category: &str,
    name: &str,
    avatar_url: Option<&str>,
    owner: Option<&str>,
) -> Result<()> {
    let category: PillarCategory = category.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let engine = MemoryEngine::open(config)?;
    let owner = owner.unwrap_or(&config.storage.default_owner);

    let created = engine
        .create_pillars(
            owner,
            vec![NewPillar {
                category,
                name: name.to_string(),
                avatar_url: avatar_url.map(|s| s.to_string()),
            }],
        )
        .await?;

    println!("Created pillar {} ({category})", created[0].id);
    Ok(())
}

/// List an owner's pillars, grouped by category.
pub async fn list(config: &MemoriaConfig, owner: Option<&str>) -> Result<()> {
    let engine = MemoryEngine::open(config)?;
    let owner = owner.unwrap_or(&config.storage.default_owner);

    let pillars = engine.pillars(owner).await?;

    if pillars.is_empty() {
        println!("No pillars defined.");
        return Ok(());
    }

    for category in [
        PillarCategory::People,
        PillarCategory::Interests,
        PillarCategory::LifeEvents,
    ] {
        let in_category: Vec<_> = pillars.iter().filter(|p| p.category == category).collect();
        if in_category.is_empty() {
            continue;
        }
        println!("{category}:");
        for pillar in in_category {
            println!("  {}  {}", pillar.id, pillar.name);
        }
        println!();
    }

    Ok(())
}
