//! Language-model completion backends used to translate questions into queries.

#[cfg(test)]
pub mod fake;
pub mod gemini;
pub mod openai;
pub mod types;

use std::future::Future;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Completions are deterministic and short: one JSON body per question.
pub(crate) const TEMPERATURE: f32 = 0.0;
pub(crate) const MAX_OUTPUT_TOKENS: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{0} not set")]
    ApiKeyNotSet(&'static str),

    #[error("API rate limit exceeded")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// A service that turns a system + user prompt into free text.
/// Futures are `Send` so implementations can back axum handlers.
pub trait CompletionClient {
    fn complete(&self, prompt: &Prompt) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Backend selected at startup.
#[derive(Clone, Debug)]
pub enum LlmBackend {
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
}

impl CompletionClient for LlmBackend {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        match self {
            LlmBackend::OpenAi(client) => client.complete(prompt).await,
            LlmBackend::Gemini(client) => client.complete(prompt).await,
        }
    }
}

#[derive(Clone)]
pub(crate) struct ApiKey(String);

impl ApiKey {
    pub(crate) fn new(key: &str, var: &'static str) -> Result<Self, LlmError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LlmError::ApiKeyNotSet(var));
        }
        Ok(Self(key.to_string()))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

pub(crate) fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
