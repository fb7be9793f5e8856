//! Core data types shared across the pipeline, plus the crate error enum.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ingestion::DocMetadata;

/// Three-way classification of a passage's relationship to a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Support,
    Oppose,
    Neutral,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Support => "support",
            Stance::Oppose => "oppose",
            Stance::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a single (claim, passage) pair.
///
/// Request-scoped; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanceClassification {
    pub stance: Stance,
    pub confidence: f32,
}

impl StanceClassification {
    /// The fail-safe classification substituted when a service response
    /// cannot be parsed: neutral with zero confidence.
    pub fn neutral_fallback() -> Self {
        Self {
            stance: Stance::Neutral,
            confidence: 0.0,
        }
    }
}

/// A vector index hit joined back to its chunk-store record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Inner-product similarity with the query embedding.
    pub score: f32,
    pub text: String,
    pub metadata: DocMetadata,
}

/// The final two-sided summary produced for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub support: String,
    pub oppose: String,
}

/// Errors surfaced by the claim-analysis pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ClaimscopeError {
    /// Missing or invalid settings; fatal at startup.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Source documents could not be read; fatal to a rebuild.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    /// The embedding service call failed or returned a malformed response.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The generation service call failed or returned a malformed response.
    #[error("generation service error: {0}")]
    GenerationService(String),

    /// No persisted index artifacts exist at the expected path.
    #[error("index artifact not found at {0}; run a rebuild first")]
    IndexNotFound(String),

    /// A query was attempted before any index was loaded.
    #[error("vector index not loaded; run a rebuild first")]
    IndexNotLoaded,

    /// Reading or writing persisted artifacts failed, or artifacts disagree.
    #[error("storage error: {0}")]
    Storage(String),

    /// A caller-imposed deadline on an external service call expired.
    #[error("external service call exceeded caller deadline")]
    Timeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Runs `fut` under a deadline, mapping expiry to [`ClaimscopeError::Timeout`].
///
/// External service calls carry no timeout of their own; callers that want
/// cancellation wrap them with this helper.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, ClaimscopeError>
where
    F: Future<Output = Result<T, ClaimscopeError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClaimscopeError::Timeout),
    }
}
