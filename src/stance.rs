//! Per-chunk stance classification against a claim.

use std::sync::Arc;

use tracing::warn;

use crate::generation::GenerationProvider;
use crate::types::{ClaimscopeError, RetrievalResult, StanceClassification};

const MAX_OUTPUT_TOKENS: usize = 200;

/// Classifies a single (claim, passage) pair as support, oppose, or neutral.
///
/// The service is instructed to answer with a strict JSON object. A response
/// that cannot be parsed into that shape does not abort the analysis: it
/// degrades to a neutral, zero-confidence classification, trading some
/// under-counted evidence for pipeline robustness. Transport failures still
/// propagate.
pub struct StanceClassifier {
    provider: Arc<dyn GenerationProvider>,
}

impl StanceClassifier {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub async fn classify(
        &self,
        claim: &str,
        chunk: &RetrievalResult,
    ) -> Result<StanceClassification, ClaimscopeError> {
        let prompt = build_prompt(claim, chunk);
        let response = self.provider.generate(&prompt, MAX_OUTPUT_TOKENS).await?;
        Ok(parse_classification(&response))
    }
}

fn build_prompt(claim: &str, chunk: &RetrievalResult) -> String {
    format!(
        r#"You are an expert scientific stance classifier.

Claim:
"{claim}"

Passage:
"{text}"

Metadata:
Title: {title}
Author: {author}
Year: {year}

Determine whether the passage SUPPORTS, OPPOSES, or is NEUTRAL toward the claim.

Respond strictly in valid JSON format:
{{
  "stance": "support" | "oppose" | "neutral",
  "confidence": float between 0 and 1
}}"#,
        text = chunk.text,
        title = chunk.metadata.title,
        author = chunk.metadata.author,
        year = chunk.metadata.year,
    )
}

fn parse_classification(response: &str) -> StanceClassification {
    match serde_json::from_str::<StanceClassification>(response.trim()) {
        Ok(mut classification) => {
            classification.confidence = classification.confidence.clamp(0.0, 1.0);
            classification
        }
        Err(err) => {
            warn!(%err, "stance response unparseable, falling back to neutral");
            StanceClassification::neutral_fallback()
        }
    }
}
