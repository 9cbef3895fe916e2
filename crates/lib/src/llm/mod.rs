//! Completion backends used for structured extraction.
//!
//! Two HTTP backends: any OpenAI-compatible `/chat/completions` endpoint (the default) and a local
//! Ollama instance. Both ask the model for a JSON-only reply and return its text content.

mod ollama;
mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {0}")]
    Api(String),
    #[error("completion reply had no content")]
    EmptyReply,
}

/// One chat turn (system / user / assistant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single non-streaming completion call. Implementations must not retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend id for logs (e.g. "openai").
    fn name(&self) -> &str;

    /// Send `messages` to `model` asking for a JSON object reply; returns the reply text.
    async fn complete_json(&self, model: &str, messages: Vec<ChatMessage>) -> Result<String, LlmError>;
}

/// Error for a non-2xx response, with whatever body the service sent.
async fn api_error(res: reqwest::Response) -> LlmError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    LlmError::Api(format!("{} {}", status, body))
}
