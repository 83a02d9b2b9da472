use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ChatMessage, ChatRequest, ChatResponse, OpenAiErrorBody};
use super::{ApiKey, CompletionClient, LlmError, MAX_OUTPUT_TOKENS, Prompt, TEMPERATURE, snippet};

pub const API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(
        http: Client,
        api_key: &str,
        model: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http,
            api_key: ApiKey::new(api_key, API_KEY_VAR)?,
            model: model
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MODEL)
                .to_string(),
            base_url: base_url
                .unwrap_or(API_BASE)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let text = response.text().await.unwrap_or_default();
            if let Some(err) = classify_error_body(&text, status.as_u16()) {
                warn!(error = %err, "OpenAI API error");
                return Err(err);
            }
            warn!("OpenAI API rate limited");
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_error_body(&text, status.as_u16()).unwrap_or_else(|| {
                LlmError::Api {
                    code: status.as_u16(),
                    message: format!("HTTP {status}: {}", snippet(&text)),
                }
            });
            warn!(error = %err, "OpenAI API error");
            return Err(err);
        }

        let body: ChatResponse = response.json().await?;
        debug!(model = %self.model, "completion received");

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

/// Map an OpenAI error body onto [`LlmError`]. `None` when the body is not
/// a structured error.
fn classify_error_body(text: &str, status: u16) -> Option<LlmError> {
    let err = serde_json::from_str::<OpenAiErrorBody>(text).ok()?.error?;
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());
    let code = err.code.as_ref().and_then(|c| c.as_str());
    let quota =
        err.kind.as_deref() == Some("insufficient_quota") || code == Some("insufficient_quota");
    Some(match status {
        _ if quota => LlmError::QuotaExhausted(message),
        429 => LlmError::RateLimited,
        _ => LlmError::Api {
            code: status,
            message,
        },
    })
}
