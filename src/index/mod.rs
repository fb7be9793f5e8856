//! Exact inner-product vector index with single-file persistence.
//!
//! Corpora in this domain run to a few thousand chunks, so exact O(n·d)
//! search is cheap and sidesteps approximate-index tuning entirely. Row `i`
//! of the index corresponds by position to record `i` of the chunk store;
//! that alignment is checked at load time by [`crate::retriever::Retriever`].

mod builder;

pub use builder::{BuildSummary, IndexBuilder};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::ClaimscopeError;

/// Sentinel row position for a padded, matchless search slot. Callers must
/// filter these out and never dereference them into the chunk store.
pub const NO_MATCH: i64 = -1;

/// One ranked search result: a score and a row position (or [`NO_MATCH`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub score: f32,
    pub position: i64,
}

impl SearchHit {
    fn no_match() -> Self {
        Self {
            score: f32::NEG_INFINITY,
            position: NO_MATCH,
        }
    }
}

/// Flat store of unit-norm embedding vectors searched by exact inner product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Builds a fresh index over `vectors`, replacing nothing on disk.
    ///
    /// All vectors must share one dimension. An empty collection is a valid
    /// zero-row index.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self, ClaimscopeError> {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(ClaimscopeError::Storage(format!(
                "vector {row} has dimension {} but the index expects {dimension}",
                vectors[row].len()
            )));
        }
        Ok(Self { dimension, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns `k` hits ranked by descending inner product with `query`.
    ///
    /// When fewer than `k` rows exist, the tail is padded with [`NO_MATCH`]
    /// sentinels so the result always has length `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, ClaimscopeError> {
        if !self.is_empty() && query.len() != self.dimension {
            return Err(ClaimscopeError::Storage(format!(
                "query has dimension {} but the index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| SearchHit {
                score: dot(query, vector),
                position: row as i64,
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits.resize(k, SearchHit::no_match());
        Ok(hits)
    }

    /// Serializes the index to a single binary file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ClaimscopeError> {
        let encoded = bincode::serialize(self)
            .map_err(|err| ClaimscopeError::Storage(format!("failed to encode index: {err}")))?;
        std::fs::write(path.as_ref(), encoded)?;
        Ok(())
    }

    /// Loads an index previously written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClaimscopeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClaimscopeError::IndexNotFound(path.display().to_string()));
        }
        let encoded = std::fs::read(path)?;
        bincode::deserialize(&encoded)
            .map_err(|err| ClaimscopeError::Storage(format!("failed to decode index: {err}")))
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
