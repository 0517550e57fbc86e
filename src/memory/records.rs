//! Record store write and read paths.
//!
//! [`insert_memory`] is the single write entry point: it inserts the memory
//! row and its photo attachments in one transaction, binding the ordinal
//! `vector_position` handed down by the engine. Records are immutable once
//! committed — there is no update or delete path.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};

use crate::features::MemoryFeatures;
use crate::memory::types::{Emotions, MemoryRecord, Photo, PhotoUpload};

/// Input for a new memory row. The engine owns ordinal assignment; this
/// module just binds it.
pub struct NewMemory<'a> {
    pub owner: &'a str,
    pub content: &'a str,
    pub features: &'a MemoryFeatures,
    pub vector_position: i64,
    pub photos: &'a [PhotoUpload],
}

/// Insert a memory and its photo rows in one transaction. Returns the fully
/// hydrated record.
pub fn insert_memory(conn: &mut Connection, new: NewMemory<'_>) -> Result<MemoryRecord> {
    let tx = conn.transaction()?;

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let entities_json = serde_json::to_string(&new.features.entities)?;
    let categories_json = serde_json::to_string(&new.features.categories)?;
    let emotions_json = serde_json::to_string(&new.features.emotions)?;

    tx.execute(
        "INSERT INTO memories (id, owner, content, entities, categories, emotions, importance, vector_position, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            new.owner,
            new.content,
            entities_json,
            categories_json,
            emotions_json,
            new.features.importance,
            new.vector_position,
            now,
        ],
    )
    .context("failed to insert memory record")?;

    let mut photos = Vec::with_capacity(new.photos.len());
    for (position, upload) in new.photos.iter().enumerate() {
        let photo_id = uuid::Uuid::now_v7().to_string();
        let metadata_json = upload
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        tx.execute(
            "INSERT INTO memory_photos (id, memory_id, url, provenance_id, metadata, position, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                photo_id,
                id,
                upload.url,
                upload.provenance_id,
                metadata_json,
                position as i64,
                now,
            ],
        )
        .context("failed to insert photo attachment")?;

        photos.push(Photo {
            id: photo_id,
            url: upload.url.clone(),
            provenance_id: upload.provenance_id.clone(),
            metadata: upload.metadata.clone(),
            created_at: now.clone(),
        });
    }

    tx.commit().context("failed to commit memory insert")?;

    Ok(MemoryRecord {
        id,
        owner: new.owner.to_string(),
        content: new.content.to_string(),
        entities: new.features.entities.clone(),
        categories: new.features.categories.clone(),
        emotions: new.features.emotions,
        importance: new.features.importance,
        vector_position: new.vector_position,
        created_at: now,
        photos,
    })
}

/// Point lookup by id, scoped to an owner. Returns the record with photos
/// attached, or `None` when the id does not exist or belongs to someone else.
pub fn get_memory(conn: &Connection, id: &str, owner: &str) -> Result<Option<MemoryRecord>> {
    let row = conn
        .query_row(
            "SELECT id, owner, content, entities, categories, emotions, importance, vector_position, created_at \
             FROM memories WHERE id = ?1 AND owner = ?2",
            params![id, owner],
            row_to_record,
        )
        .optional()
        .context("failed to look up memory")?;

    match row {
        Some(mut record) => {
            record.photos = fetch_photos(conn, &record.id)?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Newest-first listing for an owner, photos attached.
pub fn recent_memories(conn: &Connection, owner: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner, content, entities, categories, emotions, importance, vector_position, created_at \
         FROM memories WHERE owner = ?1 ORDER BY created_at DESC LIMIT ?2",
    )?;

    let mut records = stmt
        .query_map(params![owner, limit as i64], row_to_record)?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to list recent memories")?;

    for record in &mut records {
        record.photos = fetch_photos(conn, &record.id)?;
    }
    Ok(records)
}

/// All of an owner's memories grouped by category, ordered by importance then
/// recency within each cluster. A record appears once per category it carries.
pub fn memory_clusters(
    conn: &Connection,
    owner: &str,
) -> Result<BTreeMap<String, Vec<MemoryRecord>>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner, content, entities, categories, emotions, importance, vector_position, created_at \
         FROM memories WHERE owner = ?1 ORDER BY importance DESC, created_at DESC",
    )?;

    let mut records = stmt
        .query_map(params![owner], row_to_record)?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to list memories for clustering")?;

    for record in &mut records {
        record.photos = fetch_photos(conn, &record.id)?;
    }

    let mut clusters: BTreeMap<String, Vec<MemoryRecord>> = BTreeMap::new();
    for record in records {
        for category in &record.categories {
            clusters
                .entry(category.clone())
                .or_default()
                .push(record.clone());
        }
    }
    Ok(clusters)
}

/// Total record count.
pub fn count_memories(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Record counts per owner, descending.
pub fn count_by_owner(conn: &Connection) -> Result<Vec<(String, u64)>> {
    let mut stmt = conn
        .prepare("SELECT owner, COUNT(*) FROM memories GROUP BY owner ORDER BY COUNT(*) DESC")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// (count, min position, max position) over all records — used by the doctor
/// command to verify the gapless-ordinal invariant against the index.
pub fn position_stats(conn: &Connection) -> Result<(u64, Option<i64>, Option<i64>)> {
    conn.query_row(
        "SELECT COUNT(*), MIN(vector_position), MAX(vector_position) FROM memories",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)? as u64,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        },
    )
    .context("failed to read position stats")
}

fn fetch_photos(conn: &Connection, memory_id: &str) -> Result<Vec<Photo>> {
    let mut stmt = conn.prepare(
        "SELECT id, url, provenance_id, metadata, created_at \
         FROM memory_photos WHERE memory_id = ?1 ORDER BY position",
    )?;
    let photos = stmt
        .query_map(params![memory_id], |row| {
            let metadata_str: Option<String> = row.get(3)?;
            Ok(Photo {
                id: row.get(0)?,
                url: row.get(1)?,
                provenance_id: row.get(2)?,
                metadata: metadata_str.and_then(|s| serde_json::from_str(&s).ok()),
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to fetch photo attachments")?;
    Ok(photos)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let entities_str: String = row.get(3)?;
    let categories_str: String = row.get(4)?;
    let emotions_str: String = row.get(5)?;

    let entities: BTreeSet<String> = serde_json::from_str(&entities_str).unwrap_or_default();
    let categories: BTreeSet<String> = serde_json::from_str(&categories_str).unwrap_or_default();
    let emotions: Emotions = serde_json::from_str(&emotions_str).unwrap_or_default();

    Ok(MemoryRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        content: row.get(2)?,
        entities,
        categories,
        emotions,
        importance: row.get(6)?,
        vector_position: row.get(7)?,
        created_at: row.get(8)?,
        photos: Vec::new(),
    })
}
