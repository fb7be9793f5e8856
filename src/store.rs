//! Persisted chunk store, positionally aligned with the vector index.

use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::chunking::Chunk;
use crate::types::ClaimscopeError;

/// Ordered sequence of chunk records. Record `i` corresponds to row `i` of
/// the vector index; the two are only ever written together by a rebuild.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    records: Vec<Chunk>,
}

impl ChunkStore {
    pub fn new(records: Vec<Chunk>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `position`, the row number returned by an index search.
    pub fn get(&self, position: usize) -> Option<&Chunk> {
        self.records.get(position)
    }

    /// Writes all records, preserving position, as a JSON array.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ClaimscopeError> {
        let serialized = serde_json::to_string_pretty(&self.records)
            .map_err(|err| ClaimscopeError::Storage(format!("failed to encode chunks: {err}")))?;
        fs::write(path.as_ref(), serialized).await?;
        debug!(count = self.records.len(), "persisted chunk store");
        Ok(())
    }

    /// Loads a store previously written by [`save`](Self::save).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ClaimscopeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClaimscopeError::IndexNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path).await?;
        let records: Vec<Chunk> = serde_json::from_str(&content)
            .map_err(|err| ClaimscopeError::Storage(format!("failed to decode chunks: {err}")))?;
        Ok(Self { records })
    }
}
