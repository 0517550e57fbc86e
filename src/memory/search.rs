//! Multi-factor ranking for query results.
//!
//! The final score starts from raw cosine similarity and blends in lexical,
//! pillar, entity, category, and importance boosts, capped at 1.0. Candidates
//! below the minimum-relevance threshold are discarded before truncation.

use serde::Serialize;

use crate::memory::types::{MemoryRecord, PillarTag};

/// Boost for a literal query substring match in the record content.
const CONTENT_MATCH_BOOST: f64 = 0.3;
/// Boost per pillar name found in content.
const PILLAR_CONTENT_BOOST: f64 = 0.2;
/// Boost per pillar name found in an entity string.
const PILLAR_ENTITY_BOOST: f64 = 0.15;
/// Combined pillar boost cap.
const PILLAR_BOOST_CAP: f64 = 0.4;
/// Boost for a query substring match in an entity string.
const ENTITY_MATCH_BOOST: f64 = 0.2;
/// Boost for a query substring match in a category tag.
const CATEGORY_MATCH_BOOST: f64 = 0.1;
/// Weight of the record's importance in the final score.
const IMPORTANCE_WEIGHT: f64 = 0.1;

/// A query result: the hydrated record annotated with its final score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub record: MemoryRecord,
    pub similarity_score: f64,
}

/// Compute the boosted score for one candidate. All substring matching is
/// case-insensitive.
pub fn boosted_score(
    similarity: f64,
    query: &str,
    record: &MemoryRecord,
    pillars: &[PillarTag],
) -> f64 {
    let query_lower = query.to_lowercase();
    let content_lower = record.content.to_lowercase();
    let entities_lower: Vec<String> = record.entities.iter().map(|e| e.to_lowercase()).collect();

    let mut score = similarity;

    if content_lower.contains(&query_lower) {
        score += CONTENT_MATCH_BOOST;
    }

    let mut pillar_boost = 0.0;
    for pillar in pillars {
        let name_lower = pillar.name.to_lowercase();
        if name_lower.trim().is_empty() {
            continue;
        }
        if content_lower.contains(&name_lower) {
            pillar_boost += PILLAR_CONTENT_BOOST;
        }
        if entities_lower.iter().any(|e| e.contains(&name_lower)) {
            pillar_boost += PILLAR_ENTITY_BOOST;
        }
    }
    score += pillar_boost.min(PILLAR_BOOST_CAP);

    if entities_lower.iter().any(|e| e.contains(&query_lower)) {
        score += ENTITY_MATCH_BOOST;
    }

    if record
        .categories
        .iter()
        .any(|c| c.to_lowercase().contains(&query_lower))
    {
        score += CATEGORY_MATCH_BOOST;
    }

    score += record.importance * IMPORTANCE_WEIGHT;

    score.min(1.0)
}

/// Score, threshold, sort, and truncate the hydrated candidates.
pub fn rank(
    candidates: Vec<(MemoryRecord, f64)>,
    query: &str,
    pillars: &[PillarTag],
    min_threshold: f64,
    limit: usize,
) -> Vec<ScoredMemory> {
    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .map(|(record, similarity)| {
            let similarity_score = boosted_score(similarity, query, &record, pillars);
            ScoredMemory {
                record,
                similarity_score,
            }
        })
        .filter(|s| s.similarity_score >= min_threshold)
        .collect();

    scored.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    scored.truncate(limit);
    scored
}
