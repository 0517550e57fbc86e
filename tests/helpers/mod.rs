#![allow(dead_code)]

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::Result;
use memoria::config::RetrievalConfig;
use memoria::db;
use memoria::embedding::EmbeddingProvider;
use memoria::features::FeatureExtractor;
use memoria::index::VectorIndex;
use memoria::memory::engine::MemoryEngine;
use memoria::nlp::{
    EntityTagger, PhotoDescription, Sentiment, SentimentAnalyzer, TaggedToken, TokenClass,
    VisionProvider,
};

/// Dimension used by the deterministic test embedder.
pub const TEST_DIM: usize = 64;

/// Deterministic bag-of-words embedder: each token is hashed into one of
/// [`TEST_DIM`] buckets. Texts sharing words overlap; unrelated texts are
/// (near-)orthogonal. The engine normalizes, so raw counts are fine here.
pub struct BagOfWordsEmbedder;

impl EmbeddingProvider for BagOfWordsEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; TEST_DIM];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.hash(&mut hasher);
            v[(hasher.finish() as usize) % TEST_DIM] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }
}

/// Embedder that always fails, for collaborator-unavailable cases.
pub struct DownEmbedder;

impl EmbeddingProvider for DownEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("embedding service down")
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "at", "had", "has", "have", "in", "is", "it", "my", "of", "on", "out",
    "the", "to", "was", "went", "with",
];

/// Simple deterministic tagger: capitalized tokens become proper nouns, the
/// rest common nouns, with a small stop-word lexicon.
pub struct StubTagger;

impl EntityTagger for StubTagger {
    fn tag(&self, text: &str) -> Result<Vec<TaggedToken>> {
        Ok(text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|token| {
                let class = if token.chars().next().is_some_and(|c| c.is_uppercase()) {
                    TokenClass::ProperNoun
                } else {
                    TokenClass::Noun
                };
                TaggedToken {
                    text: token.to_string(),
                    class,
                    is_stop: STOP_WORDS.contains(&token.to_lowercase().as_str()),
                }
            })
            .collect())
    }
}

/// Sentiment analyzer returning a fixed signal.
pub struct FixedSentiment(pub Sentiment);

impl SentimentAnalyzer for FixedSentiment {
    fn analyze(&self, _text: &str) -> Result<Sentiment> {
        Ok(self.0)
    }
}

/// Vision provider with canned descriptions per URL; unknown URLs fail.
pub struct StubVision {
    descriptions: HashMap<String, PhotoDescription>,
}

impl StubVision {
    pub fn new() -> Self {
        Self {
            descriptions: HashMap::new(),
        }
    }

    pub fn with(mut self, url: &str, objects: &[&str], labels: &[&str]) -> Self {
        self.descriptions.insert(
            url.to_string(),
            PhotoDescription {
                objects: objects.iter().map(|s| s.to_string()).collect(),
                labels: labels.iter().map(|s| s.to_string()).collect(),
                ocr_text: String::new(),
            },
        );
        self
    }
}

impl VisionProvider for StubVision {
    fn describe(&self, photo_url: &str) -> Result<PhotoDescription> {
        self.descriptions
            .get(photo_url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unreadable image: {photo_url}"))
    }
}

pub fn retrieval_config() -> RetrievalConfig {
    RetrievalConfig {
        default_limit: 10,
        min_score: 0.25,
        overfetch_factor: 5,
    }
}

/// Build an engine over an in-memory record store, an empty index snapshotted
/// into the temp dir, the bag-of-words embedder, and the stub tagger. Returns
/// the temp dir so it outlives the engine.
pub fn test_engine() -> (MemoryEngine, tempfile::TempDir) {
    test_engine_with(Arc::new(BagOfWordsEmbedder), None)
}

/// Like [`test_engine`] but with a custom embedder and optional vision stub.
pub fn test_engine_with(
    embedder: Arc<dyn EmbeddingProvider>,
    vision: Option<Arc<dyn VisionProvider>>,
) -> (MemoryEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let conn = db::open_memory_database().unwrap();
    let index = VectorIndex::new(TEST_DIM);
    let extractor = Arc::new(FeatureExtractor::new(Some(Arc::new(StubTagger)), None));

    let engine = MemoryEngine::with_parts(
        conn,
        index,
        dir.path().join("index.bin"),
        embedder,
        extractor,
        vision,
        retrieval_config(),
    );
    (engine, dir)
}
