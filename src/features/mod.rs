//! Deterministic feature extraction.
//!
//! Turns (text, image-derived entities/labels, user pillars) into the
//! feature bundle stored on every record: entities, emotions, categories, and
//! an importance score. External signal is best-effort — an absent or failing
//! tagger/sentiment collaborator degrades to empty entities and a neutral
//! emotional profile, never an error.

pub mod categories;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::memory::types::{Emotions, PillarTag};
use crate::nlp::{EntityTagger, Sentiment, SentimentAnalyzer, TokenClass};
use serde::{Deserialize, Serialize};

/// The extracted feature bundle for one memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFeatures {
    pub entities: BTreeSet<String>,
    /// Never empty — defaults to `{"personal"}`.
    pub categories: BTreeSet<String>,
    pub emotions: Emotions,
    /// Clamped to `[0.1, 1.0]`.
    pub importance: f64,
}

/// Deterministic extractor over the optional NLP collaborators.
pub struct FeatureExtractor {
    tagger: Option<Arc<dyn EntityTagger>>,
    sentiment: Option<Arc<dyn SentimentAnalyzer>>,
}

impl FeatureExtractor {
    pub fn new(
        tagger: Option<Arc<dyn EntityTagger>>,
        sentiment: Option<Arc<dyn SentimentAnalyzer>>,
    ) -> Self {
        Self { tagger, sentiment }
    }

    /// Run the full extraction pipeline. `photo_count` feeds the importance
    /// score only; image entities/labels also feed entity and category
    /// extraction.
    pub fn extract(
        &self,
        text: &str,
        image_entities: &[String],
        image_labels: &[String],
        pillars: &[PillarTag],
        photo_count: usize,
    ) -> MemoryFeatures {
        let entities = self.extract_entities(text, image_entities);
        let emotions = self.analyze_emotions(text);
        let categories = categorize(text, image_labels, &entities, pillars);
        let pillar_tag_count = categories
            .iter()
            .filter(|c| c.starts_with("pillar_"))
            .count();
        let importance = importance_score(
            text,
            &emotions,
            entities.len(),
            &categories,
            pillar_tag_count,
            photo_count,
        );

        MemoryFeatures {
            entities,
            categories,
            emotions,
            importance,
        }
    }

    /// Named entities plus salient nouns from the tagger, unioned with
    /// image-derived entities. Deduplicated; order irrelevant.
    fn extract_entities(&self, text: &str, image_entities: &[String]) -> BTreeSet<String> {
        let mut entities: BTreeSet<String> = BTreeSet::new();

        if let Some(tagger) = &self.tagger {
            match tagger.tag(text) {
                Ok(tokens) => {
                    for token in tokens {
                        let keep = token.class.is_named_entity()
                            || (matches!(token.class, TokenClass::Noun | TokenClass::ProperNoun)
                                && !token.is_stop
                                && token.text.chars().count() > 2);
                        if keep {
                            entities.insert(token.text);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "entity tagger failed; continuing without text entities");
                }
            }
        }

        for entity in image_entities {
            if !entity.is_empty() {
                entities.insert(entity.clone());
            }
        }

        entities
    }

    /// Map the sentiment signal onto the fixed emotion keys. Absent or failing
    /// sentiment degrades to a fully neutral profile.
    fn analyze_emotions(&self, text: &str) -> Emotions {
        let sentiment = match &self.sentiment {
            Some(analyzer) if !text.is_empty() => match analyzer.analyze(text) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "sentiment analyzer failed; defaulting to neutral");
                    Sentiment::neutral()
                }
            },
            _ => Sentiment::neutral(),
        };

        emotions_from_sentiment(sentiment)
    }
}

/// Derive the fixed-key emotion struct from a sentiment signal. Inputs are
/// clamped to their contractual ranges first.
pub fn emotions_from_sentiment(sentiment: Sentiment) -> Emotions {
    let polarity = sentiment.polarity.clamp(-1.0, 1.0);
    let subjectivity = sentiment.subjectivity.clamp(0.0, 1.0);

    Emotions {
        joy: if polarity > 0.1 { polarity.max(0.0) } else { 0.0 },
        sadness: if polarity < -0.1 { (-polarity).max(0.0) } else { 0.0 },
        neutral: if polarity.abs() < 0.1 {
            1.0 - subjectivity
        } else {
            0.0
        },
        intensity: subjectivity,
        polarity,
    }
}

/// Keyword categories over text + image labels + entities, plus pillar tags.
/// Defaults to `{"personal"}` when nothing matched.
fn categorize(
    text: &str,
    image_labels: &[String],
    entities: &BTreeSet<String>,
    pillars: &[PillarTag],
) -> BTreeSet<String> {
    let text_lower = text.to_lowercase();
    let labels_lower: Vec<String> = image_labels.iter().map(|l| l.to_lowercase()).collect();
    let entities_lower: Vec<String> = entities.iter().map(|e| e.to_lowercase()).collect();

    let mut haystack = text_lower.clone();
    for label in &labels_lower {
        haystack.push(' ');
        haystack.push_str(label);
    }
    for entity in &entities_lower {
        haystack.push(' ');
        haystack.push_str(entity);
    }

    let mut categories = categories::match_categories(&haystack);

    for pillar in pillars {
        if pillar_matches(&pillar.name, &text_lower, &entities_lower, &labels_lower) {
            categories.insert(format!("pillar_{}", pillar.category.as_str()));
            categories.insert(pillar.category.as_str().to_string());
        }
    }

    if categories.is_empty() {
        categories.insert(categories::DEFAULT_CATEGORY.to_string());
    }

    categories
}

/// A pillar matches when its full name — or, for multi-word names, any
/// constituent word longer than 2 characters — appears in the text, an entity
/// string, or an image label.
fn pillar_matches(
    name: &str,
    text_lower: &str,
    entities_lower: &[String],
    labels_lower: &[String],
) -> bool {
    let name_lower = name.to_lowercase();
    if name_lower.trim().is_empty() {
        return false;
    }

    let mut needles: Vec<&str> = vec![name_lower.as_str()];
    if name_lower.contains(char::is_whitespace) {
        needles.extend(
            name_lower
                .split_whitespace()
                .filter(|w| w.chars().count() > 2),
        );
    }

    needles.iter().any(|needle| {
        text_lower.contains(needle)
            || entities_lower.iter().any(|e| e.contains(needle))
            || labels_lower.iter().any(|l| l.contains(needle))
    })
}

/// Multi-signal importance score, clamped to `[0.1, 1.0]`.
fn importance_score(
    text: &str,
    emotions: &Emotions,
    entity_count: usize,
    categories: &BTreeSet<String>,
    pillar_tag_count: usize,
    photo_count: usize,
) -> f64 {
    let base = 0.3;
    let emotional_boost = emotions.intensity * 0.25;
    let emotion_strength = emotions.joy.max(emotions.sadness) * 0.2;
    let entity_boost = (entity_count as f64 * 0.03).min(0.15);
    let category_boost = if categories
        .iter()
        .any(|c| categories::IMPORTANT_CATEGORIES.contains(&c.as_str()))
    {
        0.1
    } else {
        0.0
    };
    let pillar_boost = (pillar_tag_count as f64 * 0.1).min(0.2);
    let photo_boost = (photo_count as f64 * 0.05).min(0.15);

    let word_count = text.split_whitespace().count();
    let length_factor = if word_count > 10 {
        (word_count as f64 / 100.0).min(0.1)
    } else {
        0.0
    };

    (base + emotional_boost
        + emotion_strength
        + entity_boost
        + category_boost
        + pillar_boost
        + photo_boost
        + length_factor)
        .clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::PillarCategory;
    use crate::nlp::TaggedToken;
    use anyhow::Result;

    struct FixedTagger(Vec<TaggedToken>);

    impl EntityTagger for FixedTagger {
        fn tag(&self, _text: &str) -> Result<Vec<TaggedToken>> {
            Ok(self.0.clone())
        }
    }

    struct FailingTagger;

    impl EntityTagger for FailingTagger {
        fn tag(&self, _text: &str) -> Result<Vec<TaggedToken>> {
            anyhow::bail!("tagger offline")
        }
    }

    struct FixedSentiment(Sentiment);

    impl SentimentAnalyzer for FixedSentiment {
        fn analyze(&self, _text: &str) -> Result<Sentiment> {
            Ok(self.0)
        }
    }

    fn token(text: &str, class: TokenClass, is_stop: bool) -> TaggedToken {
        TaggedToken {
            text: text.to_string(),
            class,
            is_stop,
        }
    }

    fn pillar(name: &str, category: PillarCategory) -> PillarTag {
        PillarTag {
            id: "p1".into(),
            owner: "u1".into(),
            category,
            name: name.to_string(),
            avatar_url: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn bare_extractor() -> FeatureExtractor {
        FeatureExtractor::new(None, None)
    }

    #[test]
    fn no_signal_defaults_to_personal() {
        let features = bare_extractor().extract("zzz qqq", &[], &[], &[], 0);
        assert_eq!(
            features.categories,
            ["personal".to_string()].into_iter().collect()
        );
        assert!(features.entities.is_empty());
    }

    #[test]
    fn entities_from_tagger_filter_stop_words_and_short_tokens() {
        let tagger = FixedTagger(vec![
            token("Mom", TokenClass::Person, false),
            token("restaurant", TokenClass::Noun, false),
            token("the", TokenClass::Other, true),
            token("it", TokenClass::Noun, true),
            token("at", TokenClass::Noun, false), // too short
        ]);
        let extractor = FeatureExtractor::new(Some(Arc::new(tagger)), None);
        let features = extractor.extract("Had dinner with Mom at the restaurant", &[], &[], &[], 0);

        assert!(features.entities.contains("Mom"));
        assert!(features.entities.contains("restaurant"));
        assert!(!features.entities.contains("the"));
        assert!(!features.entities.contains("it"));
        assert!(!features.entities.contains("at"));
    }

    #[test]
    fn failing_tagger_degrades_to_image_entities_only() {
        let extractor = FeatureExtractor::new(Some(Arc::new(FailingTagger)), None);
        let features = extractor.extract(
            "some text",
            &["dog".to_string(), "park".to_string()],
            &[],
            &[],
            1,
        );
        assert_eq!(
            features.entities,
            ["dog".to_string(), "park".to_string()].into_iter().collect()
        );
    }

    #[test]
    fn positive_sentiment_maps_to_joy() {
        let e = emotions_from_sentiment(Sentiment {
            polarity: 0.6,
            subjectivity: 0.8,
        });
        assert!((e.joy - 0.6).abs() < 1e-9);
        assert_eq!(e.sadness, 0.0);
        assert_eq!(e.neutral, 0.0);
        assert!((e.intensity - 0.8).abs() < 1e-9);
        assert!((e.polarity - 0.6).abs() < 1e-9);
    }

    #[test]
    fn negative_sentiment_maps_to_sadness() {
        let e = emotions_from_sentiment(Sentiment {
            polarity: -0.4,
            subjectivity: 0.5,
        });
        assert_eq!(e.joy, 0.0);
        assert!((e.sadness - 0.4).abs() < 1e-9);
        assert_eq!(e.neutral, 0.0);
    }

    #[test]
    fn weak_polarity_is_neutral() {
        let e = emotions_from_sentiment(Sentiment {
            polarity: 0.05,
            subjectivity: 0.3,
        });
        assert_eq!(e.joy, 0.0);
        assert_eq!(e.sadness, 0.0);
        assert!((e.neutral - 0.7).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_sentiment_is_clamped() {
        let e = emotions_from_sentiment(Sentiment {
            polarity: 3.0,
            subjectivity: -1.0,
        });
        assert!(e.joy <= 1.0);
        assert_eq!(e.intensity, 0.0);
        assert!((e.polarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dinner_with_mom_scenario() {
        let features = bare_extractor().extract(
            "Had dinner with Mom at the new Italian restaurant",
            &[],
            &[],
            &[],
            0,
        );
        assert!(features.categories.contains("family"));
        assert!(features.categories.contains("food"));
        assert!(features.importance > 0.3);
    }

    #[test]
    fn pillar_name_in_text_emits_both_tags() {
        let pillars = vec![pillar("Hiking", PillarCategory::Interests)];
        let features =
            bare_extractor().extract("Went hiking on the ridge trail", &[], &[], &pillars, 0);
        assert!(features.categories.contains("pillar_interests"));
        assert!(features.categories.contains("interests"));
    }

    #[test]
    fn multi_word_pillar_matches_on_constituent_word() {
        let pillars = vec![pillar("Aunt Beatrice", PillarCategory::People)];
        let features =
            bare_extractor().extract("Beatrice called about the weekend", &[], &[], &pillars, 0);
        assert!(features.categories.contains("pillar_people"));
        assert!(features.categories.contains("people"));
    }

    #[test]
    fn multi_word_pillar_short_words_do_not_match() {
        let pillars = vec![pillar("My Dog", PillarCategory::People)];
        // "my" is 2 chars — must not match on its own
        let features = bare_extractor().extract("my day was fine", &[], &[], &pillars, 0);
        assert!(!features.categories.contains("pillar_people"));
    }

    #[test]
    fn pillar_matches_against_image_labels() {
        let pillars = vec![pillar("surfing", PillarCategory::Interests)];
        let features = bare_extractor().extract(
            "Great day out",
            &[],
            &["surfing".to_string(), "beach".to_string()],
            &pillars,
            1,
        );
        assert!(features.categories.contains("pillar_interests"));
    }

    #[test]
    fn importance_always_within_bounds() {
        let extractor = FeatureExtractor::new(
            None,
            Some(Arc::new(FixedSentiment(Sentiment {
                polarity: 1.0,
                subjectivity: 1.0,
            }))),
        );
        let long_text = "word ".repeat(200);
        let many_entities: Vec<String> = (0..50).map(|i| format!("entity{i}")).collect();
        let pillars = vec![
            pillar("alpha", PillarCategory::People),
            pillar("beta", PillarCategory::Interests),
            pillar("gamma", PillarCategory::LifeEvents),
        ];
        let text = format!("{long_text} work family alpha beta gamma");
        let features = extractor.extract(&text, &many_entities, &[], &pillars, 10);
        assert!(features.importance <= 1.0);
        assert!(features.importance >= 0.1);

        let minimal = bare_extractor().extract("", &[], &[], &[], 0);
        assert!(minimal.importance >= 0.1);
        assert!(minimal.importance <= 1.0);
    }

    #[test]
    fn photo_and_entity_boosts_cap() {
        // 10 entities caps at 0.15; 10 photos caps at 0.15
        let many: Vec<String> = (0..10).map(|i| format!("thing{i}")).collect();
        let features = bare_extractor().extract("zzz", &many, &[], &[], 10);
        // base 0.3 + entity cap 0.15 + photo cap 0.15 = 0.6
        assert!((features.importance - 0.6).abs() < 1e-9);
    }

    #[test]
    fn length_factor_requires_more_than_ten_words() {
        let ten = "a b c d e f g h i j";
        let eleven = "a b c d e f g h i j k";
        let f10 = bare_extractor().extract(ten, &[], &[], &[], 0);
        let f11 = bare_extractor().extract(eleven, &[], &[], &[], 0);
        assert!((f10.importance - 0.3).abs() < 1e-9);
        assert!(f11.importance > f10.importance);
    }
}
