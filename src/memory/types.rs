//! Core record type definitions.
//!
//! Defines [`MemoryRecord`] (a full memory row plus attachments), [`Emotions`]
//! (the fixed-key emotion signal), photo attachment types, and the pillar
//! taxonomy ([`PillarCategory`], [`PillarTag`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The closed set of pillar categories a user can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PillarCategory {
    /// People who matter to the user.
    People,
    /// Ongoing interests and hobbies.
    Interests,
    /// Significant life events.
    LifeEvents,
}

impl PillarCategory {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::People => "people",
            Self::Interests => "interests",
            Self::LifeEvents => "life_events",
        }
    }
}

impl std::fmt::Display for PillarCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PillarCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "people" => Ok(Self::People),
            "interests" => Ok(Self::Interests),
            "life_events" => Ok(Self::LifeEvents),
            _ => Err(format!("unknown pillar category: {s}")),
        }
    }
}

/// A user taxonomy entry used as a ranking boost signal, never a hard filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PillarTag {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user identifier.
    pub owner: String,
    pub category: PillarCategory,
    /// Display name, matched against memory text and entities.
    pub name: String,
    pub avatar_url: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Input for creating a pillar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPillar {
    pub category: PillarCategory,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Fixed-key emotional signal derived from sentiment analysis.
///
/// `joy`, `sadness`, `neutral`, and `intensity` are in `[0, 1]`;
/// `polarity` is in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Emotions {
    pub joy: f64,
    pub sadness: f64,
    pub neutral: f64,
    pub intensity: f64,
    pub polarity: f64,
}

/// A stored photo attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    /// UUID v7 primary key.
    pub id: String,
    /// Location of the image in external object storage.
    pub url: String,
    /// Identifier assigned by the object storage service, if known.
    pub provenance_id: Option<String>,
    /// Arbitrary JSON metadata (e.g. original filename, dimensions).
    pub metadata: Option<serde_json::Value>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// A photo to attach during ingestion. The upload itself has already happened
/// in external object storage; only the reference arrives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub url: String,
    pub provenance_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A memory record, matching the `memories` table schema plus its attachments.
///
/// Records are immutable once created. The record store is authoritative for
/// every field; `vector_position` points into the append-only vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user identifier. Queries are always scoped to one owner.
    pub owner: String,
    /// The text content of the memory. For photo-only memories this is a
    /// synthesized description of the image entities.
    pub content: String,
    /// Extracted entity strings, deduplicated.
    pub entities: BTreeSet<String>,
    /// Category tags. Never empty — defaults to `{"personal"}`.
    pub categories: BTreeSet<String>,
    pub emotions: Emotions,
    /// Importance score, clamped to `[0.1, 1.0]`.
    pub importance: f64,
    /// Ordinal position in the vector index, assigned at insertion. Unique,
    /// gapless, never reused.
    pub vector_position: i64,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Ordered photo attachments.
    pub photos: Vec<Photo>,
}
