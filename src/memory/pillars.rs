//! Pillar storage — the user taxonomy used as a ranking boost signal.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::memory::types::{NewPillar, PillarCategory, PillarTag};

/// Create a batch of pillars for an owner in one transaction.
pub fn create_pillars(
    conn: &mut Connection,
    owner: &str,
    pillars: &[NewPillar],
) -> Result<Vec<PillarTag>> {
    let tx = conn.transaction()?;
    let now = chrono::Utc::now().to_rfc3339();

    let mut created = Vec::with_capacity(pillars.len());
    for pillar in pillars {
        anyhow::ensure!(!pillar.name.trim().is_empty(), "pillar name must not be empty");

        let id = uuid::Uuid::now_v7().to_string();
        tx.execute(
            "INSERT INTO user_pillars (id, owner, category, name, avatar_url, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                owner,
                pillar.category.as_str(),
                pillar.name,
                pillar.avatar_url,
                now,
            ],
        )
        .context("failed to insert pillar")?;

        created.push(PillarTag {
            id,
            owner: owner.to_string(),
            category: pillar.category,
            name: pillar.name.clone(),
            avatar_url: pillar.avatar_url.clone(),
            created_at: now.clone(),
        });
    }

    tx.commit().context("failed to commit pillar insert")?;
    Ok(created)
}

/// All pillars for an owner, oldest first.
pub fn list_pillars(conn: &Connection, owner: &str) -> Result<Vec<PillarTag>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner, category, name, avatar_url, created_at \
         FROM user_pillars WHERE owner = ?1 ORDER BY created_at, id",
    )?;

    let pillars = stmt
        .query_map(params![owner], |row| {
            let category_str: String = row.get(2)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                category_str,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to list pillars")?;

    pillars
        .into_iter()
        .map(|(id, owner, category, name, avatar_url, created_at)| {
            let category: PillarCategory = category
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("corrupt pillar category in store")?;
            Ok(PillarTag {
                id,
                owner,
                category,
                name,
                avatar_url,
                created_at,
            })
        })
        .collect()
}
