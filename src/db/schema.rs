//! SQL DDL for the record store.
//!
//! Defines the `memories`, `memory_photos`, `user_pillars`, and `schema_meta`
//! tables. The record store is the source of truth for every field except raw
//! vectors, which live in the snapshot-persisted index. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for memoria's record store.
const SCHEMA_SQL: &str = r#"
-- Core memory records. Immutable once created: no update/delete path exists.
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    content TEXT NOT NULL,
    entities TEXT NOT NULL,
    categories TEXT NOT NULL,
    emotions TEXT NOT NULL,
    importance REAL NOT NULL CHECK(importance >= 0.1 AND importance <= 1.0),
    vector_position INTEGER NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_owner ON memories(owner);
CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance DESC);
CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories(created_at DESC);

-- Photo attachments, ordered per memory.
CREATE TABLE IF NOT EXISTS memory_photos (
    id TEXT PRIMARY KEY,
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    provenance_id TEXT,
    metadata TEXT,
    position INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memory_photos_memory ON memory_photos(memory_id);

-- User taxonomy entries used as ranking boost signals.
CREATE TABLE IF NOT EXISTS user_pillars (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    category TEXT NOT NULL CHECK(category IN ('people','interests','life_events')),
    name TEXT NOT NULL,
    avatar_url TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_pillars_owner ON user_pillars(owner);
CREATE INDEX IF NOT EXISTS idx_user_pillars_category ON user_pillars(category);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
