//! Scripted [`CompletionClient`] for translator and server tests.

use std::sync::Mutex;
use std::time::Duration;

use super::{CompletionClient, LlmError, Prompt};

pub struct ScriptedLlm {
    reply: Result<String, (u16, String)>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `LlmError::Api`.
    pub fn failing(code: u16, message: &str) -> Self {
        Self {
            reply: Err((code, message.to_string())),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionClient for ScriptedLlm {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((code, message)) => Err(LlmError::Api {
                code: *code,
                message: message.clone(),
            }),
        }
    }
}
