//! Static category taxonomy.
//!
//! The topic → keyword table and the important-category list are data, not
//! control flow, so they can be tuned and tested independently of the
//! extraction logic.

use std::collections::BTreeSet;

/// Topic categories and the keywords that trigger them. Matched as lowercase
/// substrings against the concatenation of memory text, image labels, and
/// extracted entities.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "work",
        &["work", "job", "office", "meeting", "project", "colleague", "boss", "client", "deadline"],
    ),
    (
        "family",
        &["mom", "dad", "sister", "brother", "family", "parent", "child", "grandmother", "grandfather"],
    ),
    (
        "friends",
        &["friend", "buddy", "hang out", "party", "social", "catch up"],
    ),
    (
        "hobbies",
        &["hobby", "learn", "practice", "play", "game", "sport", "music", "art", "craft"],
    ),
    (
        "health",
        &["doctor", "exercise", "gym", "sick", "medicine", "therapy", "workout", "diet"],
    ),
    (
        "travel",
        &["trip", "vacation", "travel", "visit", "flight", "hotel", "airport", "destination"],
    ),
    (
        "food",
        &["restaurant", "cook", "eat", "recipe", "dinner", "lunch", "breakfast", "meal"],
    ),
    (
        "relationships",
        &["date", "relationship", "love", "partner", "boyfriend", "girlfriend", "spouse"],
    ),
    (
        "learning",
        &["study", "book", "course", "school", "university", "lesson", "tutorial"],
    ),
    (
        "nature",
        &["hike", "mountain", "beach", "park", "garden", "forest", "lake", "outdoors"],
    ),
    (
        "personal",
        &["feel", "think", "remember", "dream", "goal", "plan", "decision"],
    ),
];

/// Categories that carry extra weight in the importance score.
pub const IMPORTANT_CATEGORIES: &[&str] = &["work", "family", "relationships", "health"];

/// The category every memory falls back to when nothing else matched.
pub const DEFAULT_CATEGORY: &str = "personal";

/// Match the keyword table against a lowercased haystack.
pub fn match_categories(haystack_lower: &str) -> BTreeSet<String> {
    CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| haystack_lower.contains(kw)))
        .map(|(category, _)| category.to_string())
        .collect()
}
