//! The analysis orchestrator: retrieval, stance fan-out, partition, and
//! per-stance aggregation, plus the rebuild entry point.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::aggregate::ArgumentAggregator;
use crate::config::EngineConfig;
use crate::embeddings::{EmbeddingProvider, OpenAiEmbedder};
use crate::generation::{GenerationProvider, OpenAiGenerator};
use crate::index::{BuildSummary, IndexBuilder};
use crate::ingestion::{DocumentSource, JsonDirectorySource};
use crate::retriever::Retriever;
use crate::stance::StanceClassifier;
use crate::types::{AnalysisResult, ClaimscopeError, Stance};

/// Fixed response for an empty or whitespace-only claim.
pub const EMPTY_CLAIM_MESSAGE: &str = "Claim is empty.";

/// Entry point tying the whole pipeline together.
///
/// `analyze` and `reindex` are both safe to call from separate tasks: the
/// loaded retriever sits behind a `RwLock`, `reindex` holds the write half
/// for the entire rebuild-then-swap sequence, and `analyze` drops its read
/// guard as soon as retrieval completes, so an in-flight analysis is served
/// by the previous consistent index and never observes a half-built one.
pub struct ClaimEngine {
    config: EngineConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    classifier: StanceClassifier,
    aggregator: ArgumentAggregator,
    source: Arc<dyn DocumentSource>,
    retriever: RwLock<Option<Retriever>>,
}

impl ClaimEngine {
    /// Wires the engine from configuration with HTTP-backed providers and a
    /// JSON literature directory, then attempts to load existing artifacts.
    ///
    /// Missing artifacts are not an error at startup; `analyze` before the
    /// first successful `reindex` fails with
    /// [`ClaimscopeError::IndexNotLoaded`].
    pub async fn new(config: EngineConfig) -> Result<Self, ClaimscopeError> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbedder::new(
            &config.api_key,
            &config.api_base_url,
            config.embedding_model.clone(),
        )?);
        let generator: Arc<dyn GenerationProvider> = Arc::new(OpenAiGenerator::new(
            &config.api_key,
            &config.api_base_url,
            config.generation_model.clone(),
        )?);
        let source: Arc<dyn DocumentSource> =
            Arc::new(JsonDirectorySource::new(config.literature_dir.clone()));

        let engine = Self::with_providers(config, embedder, generator, source)?;
        match engine.reload().await {
            Ok(()) => {}
            Err(ClaimscopeError::IndexNotFound(path)) => {
                warn!(%path, "no persisted index yet; analyze requires a rebuild first");
            }
            Err(err) => return Err(err),
        }
        Ok(engine)
    }

    /// Wires the engine with explicit providers. The retriever starts
    /// unloaded; call [`reload`](Self::reload) or [`reindex`](Self::reindex).
    pub fn with_providers(
        config: EngineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        source: Arc<dyn DocumentSource>,
    ) -> Result<Self, ClaimscopeError> {
        config.validate()?;
        Ok(Self {
            classifier: StanceClassifier::new(generator.clone()),
            aggregator: ArgumentAggregator::new(generator),
            config,
            embedder,
            source,
            retriever: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loads the persisted artifacts and swaps them in.
    pub async fn reload(&self) -> Result<(), ClaimscopeError> {
        let retriever = Retriever::open(
            self.embedder.clone(),
            self.config.index_path(),
            self.config.chunks_path(),
        )
        .await?;
        info!(chunks = retriever.len(), "retriever loaded");
        *self.retriever.write().await = Some(retriever);
        Ok(())
    }

    /// Rebuilds the index from the corpus and reloads the retriever.
    ///
    /// The write lock is held from before the rebuild until the new
    /// retriever is swapped in, so no `analyze` call can run against a
    /// half-rebuilt index.
    pub async fn reindex(&self) -> Result<BuildSummary, ClaimscopeError> {
        let mut guard = self.retriever.write().await;
        let summary = IndexBuilder::new(self.config.clone())
            .build(self.source.as_ref(), self.embedder.as_ref())
            .await?;
        let retriever = Retriever::open(
            self.embedder.clone(),
            self.config.index_path(),
            self.config.chunks_path(),
        )
        .await?;
        *guard = Some(retriever);
        Ok(summary)
    }

    /// Analyzes a claim into a two-sided, cited argument summary.
    pub async fn analyze(&self, claim: &str) -> Result<AnalysisResult, ClaimscopeError> {
        if claim.trim().is_empty() {
            return Ok(AnalysisResult {
                support: EMPTY_CLAIM_MESSAGE.to_string(),
                oppose: EMPTY_CLAIM_MESSAGE.to_string(),
            });
        }

        let retrieved = {
            let guard = self.retriever.read().await;
            let retriever = guard.as_ref().ok_or(ClaimscopeError::IndexNotLoaded)?;
            retriever.retrieve(claim, self.config.top_k).await?
        };
        info!(results = retrieved.len(), "retrieved evidence for claim");

        // Classifications share no mutable state; fan out concurrently.
        let classifications = join_all(
            retrieved
                .iter()
                .map(|chunk| self.classifier.classify(claim, chunk)),
        )
        .await;

        let mut supporting = Vec::new();
        let mut opposing = Vec::new();
        for (chunk, classification) in retrieved.into_iter().zip(classifications) {
            match classification?.stance {
                Stance::Support => supporting.push(chunk),
                Stance::Oppose => opposing.push(chunk),
                Stance::Neutral => {}
            }
        }
        info!(
            supporting = supporting.len(),
            opposing = opposing.len(),
            "partitioned evidence by stance"
        );

        let (support, oppose) = tokio::join!(
            self.aggregator.aggregate(claim, &supporting, Stance::Support),
            self.aggregator.aggregate(claim, &opposing, Stance::Oppose),
        );
        Ok(AnalysisResult {
            support: support?,
            oppose: oppose?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::NO_ARGUMENTS_MESSAGE;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::generation::MockGenerationProvider;
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

    fn document(text: &str, author: &str, year: &str) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocMetadata {
                title: format!("{author} study"),
                author: author.to_string(),
                year: year.to_string(),
                doi: "10.1/x".to_string(),
                source_id: format!("{author}.json"),
            },
        }
    }

    fn engine_with(
        data_dir: &std::path::Path,
        generator: Arc<MockGenerationProvider>,
        documents: Vec<Document>,
    ) -> (ClaimEngine, Arc<MockEmbeddingProvider>) {
        let config = EngineConfig {
            api_key: "sk-test".to_string(),
            chunk_size: 400,
            chunk_overlap: 50,
            top_k: 10,
            data_dir: data_dir.to_path_buf(),
            ..Default::default()
        };
        let embedder = Arc::new(MockEmbeddingProvider::with_dimension(16));
        let engine = ClaimEngine::with_providers(
            config,
            embedder.clone(),
            generator,
            Arc::new(StaticSource(documents)),
        )
        .unwrap();
        (engine, embedder)
    }

    #[tokio::test]
    async fn empty_claim_short_circuits_without_touching_pipeline() {
        let dir = tempdir().unwrap();
        let generator = Arc::new(MockGenerationProvider::echoing());
        let (engine, embedder) = engine_with(dir.path(), generator.clone(), Vec::new());

        for claim in ["", "   ", "\n\t"] {
            let result = engine.analyze(claim).await.unwrap();
            assert_eq!(result.support, EMPTY_CLAIM_MESSAGE);
            assert_eq!(result.oppose, EMPTY_CLAIM_MESSAGE);
        }
        assert_eq!(generator.call_count(), 0);
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn analyze_before_any_index_is_index_not_loaded() {
        let dir = tempdir().unwrap();
        let generator = Arc::new(MockGenerationProvider::new());
        let (engine, _) = engine_with(dir.path(), generator, Vec::new());

        let err = engine.analyze("some claim").await.unwrap_err();
        assert!(matches!(err, ClaimscopeError::IndexNotLoaded));
    }

    #[tokio::test]
    async fn analyze_partitions_by_stance_and_keeps_citations_apart() {
        let dir = tempdir().unwrap();
        // Chunk A classifies as support, chunk B as oppose; aggregation
        // prompts are echoed back so citation tags are observable. The rule
        // needles key on the quoted passage form, which only the stance
        // prompt uses, so they never capture the aggregation prompts.
        let generator = Arc::new(
            MockGenerationProvider::echoing()
                .with_rule(
                    "Passage:\n\"glaciers are retreating worldwide\"",
                    r#"{"stance": "support", "confidence": 0.9}"#,
                )
                .with_rule(
                    "Passage:\n\"satellite record shows no trend\"",
                    r#"{"stance": "oppose", "confidence": 0.85}"#,
                ),
        );
        let documents = vec![
            document("glaciers are retreating worldwide", "Doe", "2019"),
            document("satellite record shows no trend", "Roe", "2021"),
        ];
        let (engine, _) = engine_with(dir.path(), generator, documents);

        let summary = engine.reindex().await.unwrap();
        assert_eq!(summary.chunks, 2);

        let result = engine.analyze("the planet is warming").await.unwrap();
        // Both sides carry echoed aggregation prompts, not stance JSON.
        assert!(result.support.contains("passages that SUPPORT the claim"));
        assert!(result.oppose.contains("passages that OPPOSE the claim"));
        assert!(result.support.contains("(Doe, 2019)"));
        assert!(!result.support.contains("(Roe, 2021)"));
        assert!(result.oppose.contains("(Roe, 2021)"));
        assert!(!result.oppose.contains("(Doe, 2019)"));
    }

    #[tokio::test]
    async fn all_neutral_evidence_yields_no_arguments_on_both_sides() {
        let dir = tempdir().unwrap();
        // Stance prompts match no rule and the provider is non-echoing, so
        // every classification response is unparseable and degrades to
        // neutral; both partitions end up empty.
        let generator = Arc::new(MockGenerationProvider::new());
        let documents = vec![document("tangential commentary", "Poe", "2020")];
        let (engine, _) = engine_with(dir.path(), generator.clone(), documents);

        engine.reindex().await.unwrap();
        let result = engine.analyze("some claim").await.unwrap();
        assert_eq!(result.support, NO_ARGUMENTS_MESSAGE);
        assert_eq!(result.oppose, NO_ARGUMENTS_MESSAGE);
        // One classification call, zero aggregation calls.
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn reindex_over_empty_corpus_then_analyze_returns_gracefully() {
        let dir = tempdir().unwrap();
        let generator = Arc::new(MockGenerationProvider::new());
        let (engine, _) = engine_with(dir.path(), generator, Vec::new());

        let summary = engine.reindex().await.unwrap();
        assert_eq!(summary.chunks, 0);

        let result = engine.analyze("claim with no corpus").await.unwrap();
        assert_eq!(result.support, NO_ARGUMENTS_MESSAGE);
        assert_eq!(result.oppose, NO_ARGUMENTS_MESSAGE);
    }

    #[tokio::test]
    async fn reload_after_external_rebuild_picks_up_new_artifacts() {
        let dir = tempdir().unwrap();
        let generator = Arc::new(MockGenerationProvider::new());
        let documents = vec![document("evidence text", "Doe", "2019")];
        let (engine, embedder) = engine_with(dir.path(), generator, documents.clone());

        // Build artifacts through a standalone builder, as an operator would.
        IndexBuilder::new(engine.config().clone())
            .build(&StaticSource(documents), embedder.as_ref())
            .await
            .unwrap();

        engine.reload().await.unwrap();
        assert!(engine.analyze("claim").await.is_ok());
    }
}
