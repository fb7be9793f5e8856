//! Full-corpus index rebuild orchestration.

use tokio::fs;
use tracing::info;

use crate::chunking::WindowChunker;
use crate::config::EngineConfig;
use crate::embeddings::EmbeddingProvider;
use crate::index::FlatIndex;
use crate::ingestion::DocumentSource;
use crate::store::ChunkStore;
use crate::types::ClaimscopeError;

/// Counts reported by a successful rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Rebuilds the vector index and chunk store from the document corpus.
///
/// The build is not streaming: every chunk is embedded and indexed in memory
/// before anything touches disk. New artifacts are written to `.tmp` siblings
/// and renamed over the live files only after every stage has succeeded, so a
/// failed rebuild leaves the previous artifacts untouched and the index and
/// chunk store are never replaced independently of each other.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    config: EngineConfig,
}

impl IndexBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub async fn build(
        &self,
        source: &dyn DocumentSource,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<BuildSummary, ClaimscopeError> {
        fs::create_dir_all(&self.config.data_dir).await?;

        info!(dir = %self.config.literature_dir.display(), "loading documents");
        let documents = source.load().await?;

        info!(documents = documents.len(), "chunking documents");
        let chunker = WindowChunker::new(self.config.chunk_size, self.config.chunk_overlap)?;
        let chunks = chunker.chunk_documents(&documents);

        info!(chunks = chunks.len(), "generating embeddings");
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ClaimscopeError::EmbeddingService(format!(
                "embedded {} of {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let index = FlatIndex::build(embeddings)?;
        let store = ChunkStore::new(chunks);

        // Stage both artifacts, then swap them in together.
        let index_path = self.config.index_path();
        let chunks_path = self.config.chunks_path();
        let index_tmp = index_path.with_extension("index.tmp");
        let chunks_tmp = chunks_path.with_extension("json.tmp");

        index.save(&index_tmp)?;
        store.save(&chunks_tmp).await?;
        fs::rename(&index_tmp, &index_path).await?;
        fs::rename(&chunks_tmp, &chunks_path).await?;

        let summary = BuildSummary {
            documents: documents.len(),
            chunks: store.len(),
            dimension: index.dimension(),
        };
        info!(
            documents = summary.documents,
            chunks = summary.chunks,
            dimension = summary.dimension,
            "index rebuild complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::ingestion::{DocMetadata, Document};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct StaticSource(Vec<Document>);

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn load(&self) -> Result<Vec<Document>, ClaimscopeError> {
            Ok(self.0.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ClaimscopeError> {
            Err(ClaimscopeError::EmbeddingService("service down".to_string()))
        }
    }

    fn document(text: &str) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocMetadata {
                title: "T".to_string(),
                author: "A".to_string(),
                year: "2020".to_string(),
                doi: "d".to_string(),
                source_id: "s".to_string(),
            },
        }
    }

    fn config(data_dir: &std::path::Path) -> EngineConfig {
        EngineConfig {
            api_key: "sk-test".to_string(),
            chunk_size: 100,
            chunk_overlap: 20,
            data_dir: data_dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn build_persists_aligned_artifacts() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let builder = IndexBuilder::new(config.clone());
        let source = StaticSource(vec![
            document(&"a".repeat(250)),
            document(&"b".repeat(90)),
        ]);
        let embedder = MockEmbeddingProvider::with_dimension(8);

        let summary = builder.build(&source, &embedder).await.unwrap();
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.dimension, 8);

        let index = FlatIndex::load(config.index_path()).unwrap();
        let store = ChunkStore::load(config.chunks_path()).await.unwrap();
        assert_eq!(index.len(), store.len());
        assert_eq!(index.len(), summary.chunks);
    }

    #[tokio::test]
    async fn empty_corpus_builds_zero_row_index() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let builder = IndexBuilder::new(config.clone());
        let embedder = MockEmbeddingProvider::new();

        let summary = builder.build(&StaticSource(Vec::new()), &embedder).await.unwrap();
        assert_eq!(summary.chunks, 0);

        let index = FlatIndex::load(config.index_path()).unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn failed_rebuild_leaves_prior_artifacts_untouched() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let builder = IndexBuilder::new(config.clone());
        let source = StaticSource(vec![document(&"a".repeat(250))]);

        builder
            .build(&source, &MockEmbeddingProvider::with_dimension(8))
            .await
            .unwrap();
        let index_before = std::fs::read(config.index_path()).unwrap();
        let chunks_before = std::fs::read(config.chunks_path()).unwrap();

        let err = builder.build(&source, &FailingEmbedder).await.unwrap_err();
        assert!(matches!(err, ClaimscopeError::EmbeddingService(_)));

        assert_eq!(std::fs::read(config.index_path()).unwrap(), index_before);
        assert_eq!(std::fs::read(config.chunks_path()).unwrap(), chunks_before);
    }
}
