//! Append-only vector index with snapshot persistence.
//!
//! A flat inner-product index over L2-normalized vectors: every append is
//! assigned the next ordinal position (0-based, gapless, never reused), and
//! search is an exact scan returning cosine similarity via the dot product.
//! Each position carries a cached metadata snapshot of the record it belongs
//! to, so query-time owner filtering needs no record-store round trip — the
//! record store stays authoritative for everything served to callers.
//!
//! Persistence is a single bincode blob (dimension + vectors + metadata)
//! written atomically via tmp file + rename; a snapshot that cannot be
//! restored in full is rejected whole, never partially applied.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The vector's dimension does not match the index. Signals skew between
    /// a persisted index and the configured embedding model; the index must be
    /// rebuilt, never truncated or padded.
    #[error("vector dimension mismatch: index is {expected}-dimensional, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Cached metadata for one index position, mirroring the record at insertion
/// time. A cache only — the record store is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMeta {
    pub record_id: String,
    pub owner: String,
    pub content: String,
    pub entities: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub importance: f64,
}

/// Append-only exact nearest-neighbor index over unit-norm vectors.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
    meta: Vec<VectorMeta>,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
            meta: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Append a normalized vector with its metadata. Returns the assigned
    /// ordinal position (== index size before the append).
    pub fn append(&mut self, vector: Vec<f32>, meta: VectorMeta) -> Result<usize, IndexError> {
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        let position = self.vectors.len();
        self.vectors.push(vector);
        self.meta.push(meta);
        Ok(position)
    }

    /// Exact nearest-neighbor search: dot product against every stored vector
    /// (cosine similarity, both sides unit-norm), descending. Returns at most
    /// `k` results; fewer if the index is smaller; empty on an empty index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f64)>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| {
                let dot: f32 = v.iter().zip(query.iter()).map(|(a, b)| a * b).sum();
                (pos, dot as f64)
            })
            .collect();

        // Descending by similarity, position as a deterministic tie-break
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Cached metadata for a position, if it exists.
    pub fn meta(&self, position: usize) -> Option<&VectorMeta> {
        self.meta.get(position)
    }

    /// Persist the full index (vectors + metadata cache + dimension) as one
    /// blob. Atomic: written to a tmp file, then renamed over the target, so a
    /// partial snapshot is never observable as restorable.
    pub fn snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let blob = bincode::serialize(self).context("failed to serialize index snapshot")?;

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, &blob)
            .with_context(|| format!("failed to write snapshot to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename snapshot into {}", path.display()))?;

        Ok(())
    }

    /// Reload an index from a snapshot. Fails whole — a snapshot that does not
    /// reconstruct every position, or whose dimension does not match the
    /// configured embedding model, is rejected without partial state.
    pub fn restore(path: &Path, expected_dimensions: usize) -> Result<Self> {
        let blob = std::fs::read(path)
            .with_context(|| format!("failed to read snapshot at {}", path.display()))?;

        let index: VectorIndex =
            bincode::deserialize(&blob).context("failed to deserialize index snapshot")?;

        anyhow::ensure!(
            index.vectors.len() == index.meta.len(),
            "corrupt snapshot: {} vectors but {} metadata entries",
            index.vectors.len(),
            index.meta.len()
        );
        if index.dimensions != expected_dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: expected_dimensions,
                actual: index.dimensions,
            })
            .context("persisted index does not match the configured embedding model; rebuild the index");
        }
        if let Some(bad) = index.vectors.iter().position(|v| v.len() != index.dimensions) {
            anyhow::bail!(
                "corrupt snapshot: vector at position {bad} has {} dimensions, expected {}",
                index.vectors[bad].len(),
                index.dimensions
            );
        }

        Ok(index)
    }

    /// Restore from `path` if a snapshot exists there, otherwise create a
    /// fresh empty index.
    pub fn load_or_create(path: &Path, dimensions: usize) -> Result<Self> {
        if path.exists() {
            let index = Self::restore(path, dimensions)?;
            tracing::info!(
                path = %path.display(),
                size = index.len(),
                dimensions = index.dimensions(),
                "vector index restored"
            );
            Ok(index)
        } else {
            tracing::info!(path = %path.display(), dimensions, "starting with empty vector index");
            Ok(Self::new(dimensions))
        }
    }
}
