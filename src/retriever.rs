//! Claim-time retrieval: embed the claim, search the index, and project row
//! positions back into chunk-store records.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::index::FlatIndex;
use crate::store::ChunkStore;
use crate::types::{ClaimscopeError, RetrievalResult};

/// A consistent, loaded (index, chunk store) pair plus the embedder used for
/// query vectors. Immutable once opened; a rebuild swaps in a new instance.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: FlatIndex,
    store: ChunkStore,
}

impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("rows", &self.index.len())
            .field("dimension", &self.index.dimension())
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Opens both artifacts and cross-checks their positional alignment.
    ///
    /// Fails closed with [`ClaimscopeError::Storage`] when the row count and
    /// record count disagree; a mismatched pair would silently corrupt every
    /// retrieval.
    pub async fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        index_path: impl AsRef<Path>,
        chunks_path: impl AsRef<Path>,
    ) -> Result<Self, ClaimscopeError> {
        let index = FlatIndex::load(index_path)?;
        let store = ChunkStore::load(chunks_path).await?;
        if index.len() != store.len() {
            return Err(ClaimscopeError::Storage(format!(
                "vector index has {} rows but chunk store has {} records; \
                 artifacts are out of sync, run a rebuild",
                index.len(),
                store.len()
            )));
        }
        Ok(Self {
            embedder,
            index,
            store,
        })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns up to `top_k` chunks nearest to `claim`, ordered by descending
    /// inner-product score. Sentinel search slots are filtered out, never
    /// dereferenced.
    pub async fn retrieve(
        &self,
        claim: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, ClaimscopeError> {
        let query = self.embedder.embed_one(claim).await?;
        let hits = self.index.search(&query, top_k)?;

        let mut results = Vec::new();
        for hit in hits {
            if hit.position < 0 {
                continue;
            }
            let chunk = self.store.get(hit.position as usize).ok_or_else(|| {
                ClaimscopeError::Storage(format!(
                    "index returned row {} outside the chunk store; artifacts are out of sync",
                    hit.position
                ))
            })?;
            results.push(RetrievalResult {
                score: hit.score,
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
            });
        }
        debug!(claim_len = claim.len(), results = results.len(), "retrieved chunks");
        Ok(results)
    }
}
