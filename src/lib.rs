//! ```text
//! DocumentSource ──► chunking::WindowChunker ──► embeddings ──┐
//!                                                             │
//!                        index::IndexBuilder persists ◄───────┘
//!                        (FlatIndex + ChunkStore, aligned)
//!
//! claim ──► embeddings ──► FlatIndex.search ──► ChunkStore lookup
//!        └─► retriever::Retriever results
//!                     │
//!                     ├─► stance::StanceClassifier (per chunk, fan-out)
//!                     └─► aggregate::ArgumentAggregator (per stance)
//!                                   │
//!                     engine::ClaimEngine ──► AnalysisResult
//! ```
//!
//! Claimscope answers a scientific claim by retrieving semantically relevant
//! passages from an indexed literature corpus, classifying each passage's
//! stance toward the claim, and synthesizing cited argument summaries for
//! both the supporting and the opposing side.

pub mod aggregate;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod retriever;
pub mod stance;
pub mod store;
pub mod types;

pub use aggregate::{ArgumentAggregator, NO_ARGUMENTS_MESSAGE};
pub use chunking::{Chunk, WindowChunker};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbedder};
pub use engine::{ClaimEngine, EMPTY_CLAIM_MESSAGE};
pub use generation::{GenerationProvider, MockGenerationProvider, OpenAiGenerator};
pub use index::{BuildSummary, FlatIndex, IndexBuilder, SearchHit, NO_MATCH};
pub use ingestion::{DocMetadata, Document, DocumentSource, JsonDirectorySource};
pub use retriever::Retriever;
pub use stance::StanceClassifier;
pub use store::ChunkStore;
pub use types::{
    with_deadline, AnalysisResult, ClaimscopeError, RetrievalResult, Stance, StanceClassification,
};
