//! Synthesis of cited argument bullets from same-stance chunk sets.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::generation::GenerationProvider;
use crate::types::{ClaimscopeError, RetrievalResult, Stance};

const MAX_OUTPUT_TOKENS: usize = 800;

/// Fixed result returned for an empty evidence set, without any service call.
pub const NO_ARGUMENTS_MESSAGE: &str = "No relevant arguments found.";

/// Compiles same-stance passages into one prompt and asks the generation
/// service for bullet-point arguments, each ending in an `(Author, Year)`
/// citation drawn only from the supplied passages.
pub struct ArgumentAggregator {
    provider: Arc<dyn GenerationProvider>,
}

impl ArgumentAggregator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// `stance` selects the side being summarized and must be
    /// [`Stance::Support`] or [`Stance::Oppose`].
    pub async fn aggregate(
        &self,
        claim: &str,
        chunks: &[RetrievalResult],
        stance: Stance,
    ) -> Result<String, ClaimscopeError> {
        debug_assert_ne!(stance, Stance::Neutral, "neutral chunks are never aggregated");
        if chunks.is_empty() {
            return Ok(NO_ARGUMENTS_MESSAGE.to_string());
        }

        let prompt = build_prompt(claim, chunks, stance);
        let generated = self.provider.generate(&prompt, MAX_OUTPUT_TOKENS).await?;
        Ok(generated.trim().to_string())
    }
}

fn build_prompt(claim: &str, chunks: &[RetrievalResult], stance: Stance) -> String {
    let mut passages = String::new();
    for (number, chunk) in chunks.iter().enumerate() {
        let _ = write!(
            passages,
            "\nPassage {} {}:\n{}\n",
            number + 1,
            chunk.metadata.citation(),
            chunk.text
        );
    }

    let stance_upper = stance.as_str().to_uppercase();
    format!(
        r#"You are an expert scientific argument synthesizer.

Claim:
"{claim}"

Below are passages that {stance_upper} the claim.

{passages}

Task:
- Summarize the key {stance_upper}ING arguments.
- Produce concise bullet points.
- Each bullet must end with citation in format (Author, Year).
- Do not fabricate sources.
- Only use provided passages."#
    )
}
