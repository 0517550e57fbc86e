//! CLI `doctor` command — verify that the record store and vector index agree.

use anyhow::{Context, Result};

use crate::config::MemoriaConfig;
use crate::db;
use crate::index::VectorIndex;
use crate::memory::records;

/// Run store diagnostics and print a health report. Opens the raw stores
/// directly so it works even when the embedding service is down.
pub fn doctor(config: &MemoriaConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let index_path = config.resolved_index_path();

    if !db_path.exists() {
        println!("Record store: not found at {}", db_path.display());
        println!("Run `memoria add` to initialize.");
        return Ok(());
    }

    let conn = db::open_database(&db_path).context("failed to open record store (may be corrupt)")?;

    let schema_version = db::migrations::get_schema_version(&conn)?;
    let stored_model = db::migrations::get_embedding_model(&conn)?;
    let stored_dims = db::migrations::get_embedding_dimensions(&conn)?;
    let (record_count, min_position, max_position) = records::position_stats(&conn)?;

    println!("Memoria Health Report");
    println!("=====================");
    println!();
    println!("Record store:      {}", db_path.display());
    println!("Schema version:    {schema_version}");
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", stored_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.embedding.model);
    println!(
        "  Dimensions:      stored {} / configured {}",
        stored_dims.map(|d| d.to_string()).as_deref().unwrap_or("(not set)"),
        config.embedding.dimensions
    );
    if stored_dims.is_some() && stored_dims != Some(config.embedding.dimensions) {
        println!("  FATAL: dimension mismatch — the index must be rebuilt.");
    }
    println!();

    println!("Records:           {record_count}");
    if !index_path.exists() {
        println!("Vector index:      not found at {}", index_path.display());
        if record_count > 0 {
            println!("  FAILED: {record_count} record(s) but no index snapshot.");
        }
        return Ok(());
    }

    match VectorIndex::restore(&index_path, config.embedding.dimensions) {
        Err(e) => {
            println!("Vector index:      UNRESTORABLE ({e:#})");
        }
        Ok(index) => {
            println!("Vector index:      {} entries at {}", index.len(), index_path.display());

            let bijection_ok = record_count == index.len() as u64
                && match (record_count, min_position, max_position) {
                    (0, None, None) => true,
                    (n, Some(min), Some(max)) => min == 0 && max == n as i64 - 1,
                    _ => false,
                };
            if bijection_ok {
                println!("Bijection check:   PASSED (positions 0..{record_count}, no gaps)");
            } else {
                println!(
                    "Bijection check:   FAILED (records {record_count}, index {}, positions {:?}..{:?})",
                    index.len(),
                    min_position,
                    max_position
                );
                println!();
                println!("Recovery steps:");
                println!("  The snapshot lags the record store — likely a snapshot write");
                println!("  failure after a committed ingestion. Re-ingest from the record");
                println!("  store or restore a matching snapshot backup.");
            }
        }
    }

    Ok(())
}
