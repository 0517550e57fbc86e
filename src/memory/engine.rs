//! The memory engine — single orchestrator over both stores.
//!
//! Owns the record store connection and the vector index behind one mutex, so
//! ordinal assignment can never interleave between ingestions and a search
//! never observes a torn index. Ingestion is record-first: the record (with
//! its pre-assigned `vector_position`) is committed before the index append,
//! and the append cannot fail after the upfront dimension check — so a failed
//! insert leaves no orphan index entry, and every position reachable by
//! `search` has a backing record.
//!
//! Public entry points are async; each runs its blocking pipeline (collaborator
//! HTTP calls, SQLite, snapshot I/O) on the blocking pool, holding the state
//! lock for the full extract → embed → insert → append → snapshot scope.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use crate::config::{MemoriaConfig, RetrievalConfig};
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::features::FeatureExtractor;
use crate::index::{VectorIndex, VectorMeta};
use crate::memory::records::{self, NewMemory};
use crate::memory::search::{self, ScoredMemory};
use crate::memory::types::{MemoryRecord, NewPillar, PhotoUpload, PillarTag};
use crate::memory::pillars;
use crate::nlp::VisionProvider;

/// Why an engine operation failed. Callers can distinguish a down embedding
/// service from a storage problem from bad input.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("embedding collaborator unavailable")]
    Embedding(#[source] anyhow::Error),
    #[error("storage failure")]
    Storage(#[source] anyhow::Error),
    #[error("vector index failure")]
    Index(#[source] anyhow::Error),
    #[error("malformed input: {0}")]
    InvalidInput(String),
    #[error("internal task failure")]
    Task(#[source] anyhow::Error),
}

/// Store-wide statistics.
#[derive(Debug, Serialize)]
pub struct EngineStats {
    pub total_memories: u64,
    pub index_size: usize,
    pub dimensions: usize,
    pub by_owner: Vec<(String, u64)>,
}

struct EngineState {
    conn: rusqlite::Connection,
    index: VectorIndex,
}

/// The memory indexing-and-retrieval engine.
pub struct MemoryEngine {
    state: Arc<Mutex<EngineState>>,
    embedding: Arc<dyn EmbeddingProvider>,
    extractor: Arc<FeatureExtractor>,
    vision: Option<Arc<dyn VisionProvider>>,
    retrieval: RetrievalConfig,
    index_path: PathBuf,
}

impl MemoryEngine {
    /// Open the engine from configuration: record store, persisted index, and
    /// all collaborators. Fails fast on embedding-dimension skew between the
    /// persisted state and the configured model.
    pub fn open(config: &MemoriaConfig) -> Result<Self, EngineError> {
        let conn = db::open_database(config.resolved_db_path()).map_err(EngineError::Storage)?;

        // Model bookkeeping: dimension skew is fatal, a model rename is a warning.
        let configured_dims = config.embedding.dimensions;
        match db::migrations::get_embedding_dimensions(&conn)
            .map_err(|e| EngineError::Storage(e.into()))?
        {
            Some(stored) if stored != configured_dims => {
                return Err(EngineError::Index(anyhow::anyhow!(
                    "stored index is {stored}-dimensional but the configured model produces \
                     {configured_dims}; rebuild the index before continuing"
                )));
            }
            Some(_) => {}
            None => {
                db::migrations::set_embedding_dimensions(&conn, configured_dims)
                    .map_err(|e| EngineError::Storage(e.into()))?;
            }
        }
        match db::migrations::get_embedding_model(&conn)
            .map_err(|e| EngineError::Storage(e.into()))?
        {
            Some(stored_model) if stored_model != config.embedding.model => {
                tracing::warn!(
                    stored = %stored_model,
                    configured = %config.embedding.model,
                    "embedding model changed — existing vectors were produced by a different model"
                );
            }
            Some(_) => {}
            None => {
                db::migrations::set_embedding_model(&conn, &config.embedding.model)
                    .map_err(|e| EngineError::Storage(e.into()))?;
            }
        }

        let index_path = config.resolved_index_path();
        let index = VectorIndex::load_or_create(&index_path, configured_dims)
            .map_err(EngineError::Index)?;

        let record_count = records::count_memories(&conn).map_err(EngineError::Storage)?;
        if record_count != index.len() as u64 {
            tracing::warn!(
                records = record_count,
                index_size = index.len(),
                "record store and vector index disagree — run `memoria doctor`"
            );
        }

        let provider =
            embedding::create_provider(&config.embedding).map_err(EngineError::Embedding)?;
        let (tagger, sentiment, vision) =
            crate::nlp::create_collaborators(&config.nlp).map_err(EngineError::Task)?;

        Ok(Self::with_parts(
            conn,
            index,
            index_path,
            Arc::from(provider),
            Arc::new(FeatureExtractor::new(
                tagger.map(Arc::from),
                sentiment.map(Arc::from),
            )),
            vision.map(Arc::from),
            config.retrieval.clone(),
        ))
    }

    /// Assemble an engine from already-built parts — the seam tests use to
    /// inject deterministic collaborators in place of the HTTP-backed ones.
    pub fn with_parts(
        conn: rusqlite::Connection,
        index: VectorIndex,
        index_path: PathBuf,
        embedding: Arc<dyn EmbeddingProvider>,
        extractor: Arc<FeatureExtractor>,
        vision: Option<Arc<dyn VisionProvider>>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState { conn, index })),
            embedding,
            extractor,
            vision,
            retrieval,
            index_path,
        }
    }

    /// Ingest a new memory. Returns the new record's id.
    pub async fn add_memory(
        &self,
        text: &str,
        owner: &str,
        photos: Vec<PhotoUpload>,
    ) -> Result<String, EngineError> {
        if text.trim().is_empty() && photos.is_empty() {
            return Err(EngineError::InvalidInput(
                "memory needs text or at least one photo".into(),
            ));
        }
        if owner.trim().is_empty() {
            return Err(EngineError::InvalidInput("owner must not be empty".into()));
        }

        let state = Arc::clone(&self.state);
        let embedding = Arc::clone(&self.embedding);
        let extractor = Arc::clone(&self.extractor);
        let vision = self.vision.clone();
        let index_path = self.index_path.clone();
        let text = text.trim().to_string();
        let owner = owner.to_string();

        let record_id = tokio::task::spawn_blocking(move || -> Result<String, EngineError> {
            let mut state = state
                .lock()
                .map_err(|e| EngineError::Storage(anyhow::anyhow!("state lock poisoned: {e}")))?;

            let user_pillars =
                pillars::list_pillars(&state.conn, &owner).map_err(EngineError::Storage)?;

            let image = describe_photos(vision.as_deref(), &photos);

            // Photo-only memories get a synthesized description as content.
            let content = if text.is_empty() {
                synthesize_photo_description(&image.entities)
            } else {
                text.clone()
            };

            // Image context feeds the vector, not the stored content.
            let searchable_text = if image.context.is_empty() {
                content.clone()
            } else {
                format!("{content} {}", image.context).trim().to_string()
            };

            let features = extractor.extract(
                &content,
                &image.entities,
                &image.labels,
                &user_pillars,
                photos.len(),
            );

            let raw = embedding
                .embed(&searchable_text)
                .map_err(EngineError::Embedding)?;
            let vector = embedding::l2_normalize(&raw);
            if vector.len() != state.index.dimensions() {
                return Err(EngineError::Index(anyhow::anyhow!(
                    "embedding dimension mismatch: got {}, index is {}-dimensional",
                    vector.len(),
                    state.index.dimensions()
                )));
            }

            // Record first: ordinal pre-assigned, insert committed, then the
            // append — which cannot fail after the dimension check above.
            let position = state.index.len() as i64;
            let record = records::insert_memory(
                &mut state.conn,
                NewMemory {
                    owner: &owner,
                    content: &content,
                    features: &features,
                    vector_position: position,
                    photos: &photos,
                },
            )
            .map_err(EngineError::Storage)?;

            let meta = VectorMeta {
                record_id: record.id.clone(),
                owner: owner.clone(),
                content: content.clone(),
                entities: features.entities.clone(),
                categories: features.categories.clone(),
                importance: features.importance,
            };
            let assigned = state
                .index
                .append(vector, meta)
                .map_err(|e| EngineError::Index(e.into()))?;
            debug_assert_eq!(assigned as i64, position);

            state
                .index
                .snapshot(&index_path)
                .map_err(EngineError::Storage)?;

            tracing::info!(
                id = %record.id,
                owner = %owner,
                position,
                categories = ?features.categories,
                importance = features.importance,
                "memory stored"
            );

            Ok(record.id)
        })
        .await
        .map_err(|e| EngineError::Task(e.into()))??;

        Ok(record_id)
    }

    /// Ranked semantic search scoped to one owner. `min_threshold` defaults to
    /// the configured minimum relevance.
    pub async fn search_memories(
        &self,
        query: &str,
        owner: &str,
        limit: usize,
        min_threshold: Option<f64>,
    ) -> Result<Vec<ScoredMemory>, EngineError> {
        if query.trim().is_empty() {
            return Err(EngineError::InvalidInput("query must not be empty".into()));
        }
        let threshold = min_threshold.unwrap_or(self.retrieval.min_score);
        let overfetch = self.retrieval.overfetch_factor.max(1);

        let state = Arc::clone(&self.state);
        let embedding = Arc::clone(&self.embedding);
        let query = query.trim().to_string();
        let owner = owner.to_string();

        let results = tokio::task::spawn_blocking(move || -> Result<Vec<ScoredMemory>, EngineError> {
            let state = state
                .lock()
                .map_err(|e| EngineError::Storage(anyhow::anyhow!("state lock poisoned: {e}")))?;

            if state.index.is_empty() {
                return Ok(Vec::new());
            }

            let user_pillars =
                pillars::list_pillars(&state.conn, &owner).map_err(EngineError::Storage)?;

            let raw = embedding.embed(&query).map_err(EngineError::Embedding)?;
            let query_vector = embedding::l2_normalize(&raw);

            // Over-fetch to survive owner filtering and threshold rejection.
            let k = (limit * overfetch).min(state.index.len());
            let candidates = state
                .index
                .search(&query_vector, k)
                .map_err(|e| EngineError::Index(e.into()))?;

            let mut seen: HashSet<String> = HashSet::new();
            let mut hydrated: Vec<(MemoryRecord, f64)> = Vec::new();
            for (position, similarity) in candidates {
                let Some(meta) = state.index.meta(position) else {
                    continue;
                };
                // Cheap pre-filter on the cache; the record store stays
                // authoritative for what is actually served.
                if meta.owner != owner {
                    continue;
                }
                if !seen.insert(meta.record_id.clone()) {
                    continue;
                }
                match records::get_memory(&state.conn, &meta.record_id, &owner)
                    .map_err(EngineError::Storage)?
                {
                    Some(record) => hydrated.push((record, similarity)),
                    None => {
                        tracing::warn!(
                            record_id = %meta.record_id,
                            position,
                            "index entry without backing record — skipping"
                        );
                    }
                }
            }

            let ranked = search::rank(hydrated, &query, &user_pillars, threshold, limit);
            tracing::debug!(owner = %owner, returned = ranked.len(), "search complete");
            Ok(ranked)
        })
        .await
        .map_err(|e| EngineError::Task(e.into()))??;

        Ok(results)
    }

    /// Newest-first listing for an owner.
    pub async fn recent_memories(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, EngineError> {
        let state = Arc::clone(&self.state);
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || {
            let state = state
                .lock()
                .map_err(|e| EngineError::Storage(anyhow::anyhow!("state lock poisoned: {e}")))?;
            records::recent_memories(&state.conn, &owner, limit).map_err(EngineError::Storage)
        })
        .await
        .map_err(|e| EngineError::Task(e.into()))?
    }

    /// All of an owner's memories grouped by category.
    pub async fn memory_clusters(
        &self,
        owner: &str,
    ) -> Result<BTreeMap<String, Vec<MemoryRecord>>, EngineError> {
        let state = Arc::clone(&self.state);
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || {
            let state = state
                .lock()
                .map_err(|e| EngineError::Storage(anyhow::anyhow!("state lock poisoned: {e}")))?;
            records::memory_clusters(&state.conn, &owner).map_err(EngineError::Storage)
        })
        .await
        .map_err(|e| EngineError::Task(e.into()))?
    }

    /// Create pillars for an owner.
    pub async fn create_pillars(
        &self,
        owner: &str,
        new_pillars: Vec<NewPillar>,
    ) -> Result<Vec<PillarTag>, EngineError> {
        let state = Arc::clone(&self.state);
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || {
            let mut state = state
                .lock()
                .map_err(|e| EngineError::Storage(anyhow::anyhow!("state lock poisoned: {e}")))?;
            pillars::create_pillars(&mut state.conn, &owner, &new_pillars)
                .map_err(EngineError::Storage)
        })
        .await
        .map_err(|e| EngineError::Task(e.into()))?
    }

    /// List an owner's pillars.
    pub async fn pillars(&self, owner: &str) -> Result<Vec<PillarTag>, EngineError> {
        let state = Arc::clone(&self.state);
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || {
            let state = state
                .lock()
                .map_err(|e| EngineError::Storage(anyhow::anyhow!("state lock poisoned: {e}")))?;
            pillars::list_pillars(&state.conn, &owner).map_err(EngineError::Storage)
        })
        .await
        .map_err(|e| EngineError::Task(e.into()))?
    }

    /// Store-wide statistics.
    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || {
            let state = state
                .lock()
                .map_err(|e| EngineError::Storage(anyhow::anyhow!("state lock poisoned: {e}")))?;
            Ok(EngineStats {
                total_memories: records::count_memories(&state.conn)
                    .map_err(EngineError::Storage)?,
                index_size: state.index.len(),
                dimensions: state.index.dimensions(),
                by_owner: records::count_by_owner(&state.conn).map_err(EngineError::Storage)?,
            })
        })
        .await
        .map_err(|e| EngineError::Task(e.into()))?
    }
}

/// Aggregated image signal across all photos of one ingestion.
struct ImageSignal {
    entities: Vec<String>,
    labels: Vec<String>,
    context: String,
}

/// Best-effort photo description: a fold over the photos that accumulates
/// successes and logs failures. One bad photo never aborts the ingestion, and
/// a provided-but-undescribable photo set still yields a minimal context so
/// the embedding input is never empty.
fn describe_photos(vision: Option<&dyn VisionProvider>, photos: &[PhotoUpload]) -> ImageSignal {
    let mut entities: Vec<String> = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    let mut context_parts: Vec<String> = Vec::new();

    if photos.is_empty() {
        return ImageSignal {
            entities,
            labels,
            context: String::new(),
        };
    }

    match vision {
        Some(provider) => {
            for photo in photos {
                match provider.describe(&photo.url) {
                    Ok(description) => {
                        for object in &description.objects {
                            if !object.is_empty() && !entities.contains(object) {
                                entities.push(object.clone());
                            }
                        }
                        for label in &description.labels {
                            if !label.is_empty() && !labels.contains(label) {
                                labels.push(label.clone());
                            }
                        }
                        let mut parts = description.objects.clone();
                        parts.extend(description.labels.clone());
                        if !description.ocr_text.is_empty() {
                            parts.push(description.ocr_text.clone());
                        }
                        if !parts.is_empty() {
                            context_parts.push(parts.join(" "));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(url = %photo.url, error = %e, "photo description failed; skipping");
                    }
                }
            }
        }
        None => {
            tracing::debug!(count = photos.len(), "no vision collaborator configured");
        }
    }

    let context = if context_parts.is_empty() {
        // Minimal fallback so embedding never sees an empty string.
        "A photo".to_string()
    } else {
        context_parts.join(" ")
    };

    ImageSignal {
        entities,
        labels,
        context,
    }
}

/// Oxford-style description for a photo-only memory.
fn synthesize_photo_description(image_entities: &[String]) -> String {
    match image_entities {
        [] => "A photo".to_string(),
        [one] => format!("A photo of {one}"),
        [first, second] => format!("A photo of {first} and {second}"),
        [init @ .., last] => format!("A photo of {}, and {last}", init.join(", ")),
    }
}
