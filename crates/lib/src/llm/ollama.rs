//! Ollama API client (http://127.0.0.1:11434 by default).
//! Non-streaming chat with `format: "json"`.

use super::{api_error, ChatMessage, CompletionBackend, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Client for Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// POST /api/chat — non-streaming, JSON-constrained reply.
    pub async fn chat_json(&self, model: &str, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
            format: "json".to_string(),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            return Err(api_error(res).await);
        }
        let data: ChatResponse = res.json().await?;
        data.message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete_json(&self, model: &str, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        self.chat_json(model, messages).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}
