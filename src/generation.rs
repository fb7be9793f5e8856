//! Text-generation providers backing stance classification and argument
//! aggregation.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::types::ClaimscopeError;

/// Produces free-form text from a prompt under an output length cap.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: usize,
    ) -> Result<String, ClaimscopeError>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self, ClaimscopeError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| ClaimscopeError::GenerationService("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| ClaimscopeError::GenerationService(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: usize,
    ) -> Result<String, ClaimscopeError> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: max_output_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| ClaimscopeError::GenerationService(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ClaimscopeError::GenerationService(format!(
                "generation request failed ({status}): {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|err| {
            ClaimscopeError::GenerationService(format!("malformed response: {err}"))
        })?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ClaimscopeError::GenerationService("response carried no choices".to_string())
            })?;
        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

/// Rule-driven offline provider for tests.
///
/// The first rule whose needle occurs in the prompt wins. With no matching
/// rule the provider echoes the prompt back (useful for asserting on prompt
/// contents) or returns an empty string when echoing is disabled.
#[derive(Debug, Default)]
pub struct MockGenerationProvider {
    rules: Mutex<Vec<(String, String)>>,
    echo_prompt: bool,
    calls: AtomicUsize,
}

impl MockGenerationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables echoing the prompt when no rule matches.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo_prompt: true,
            ..Self::default()
        }
    }

    /// Adds a needle/response rule.
    #[must_use]
    pub fn with_rule(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.lock().push((needle.into(), response.into()));
        self
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn generate(
        &self,
        prompt: &str,
        _max_output_tokens: usize,
    ) -> Result<String, ClaimscopeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rules = self.rules.lock();
        for (needle, response) in rules.iter() {
            if prompt.contains(needle) {
                return Ok(response.clone());
            }
        }
        if self.echo_prompt {
            Ok(prompt.to_string())
        } else {
            Ok(String::new())
        }
    }
}
