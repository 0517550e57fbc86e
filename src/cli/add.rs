use anyhow::Result;

use crate::config::MemoriaConfig;
use crate::memory::engine::MemoryEngine;
use crate::memory::types::PhotoUpload;

/// Ingest a memory from the terminal.
pub async fn add(
    config: &MemoriaConfig,
    text: &str,
    owner: Option<&str>,
    photo_urls: &[String],
) -> Result<()> {
    let engine = MemoryEngine::open(config)?;
    let owner = owner.unwrap_or(&config.storage.default_owner);

    let photos: Vec<PhotoUpload> = photo_urls
        .iter()
        .map(|url| PhotoUpload {
            url: url.clone(),
            provenance_id: None,
            metadata: None,
        })
        .collect();

    let id = engine.add_memory(text, owner, photos).await?;
    println!("Stored memory {id}");
    Ok(())
}
