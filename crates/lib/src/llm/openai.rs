//! OpenAI-compatible chat completions client (`POST {base}/chat/completions`).
//!
//! Works against api.openai.com and any server exposing the same API (LM Studio, vLLM, ...).

use super::{api_error, ChatMessage, CompletionBackend, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /chat/completions with `response_format: json_object`. Returns the first choice's content.
    pub async fn chat_json(&self, model: &str, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = OpenAiChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
            temperature: 0.0,
            response_format: ResponseFormat {
                typ: "json_object".to_string(),
            },
        };
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(api_error(res).await);
        }
        let data: OpenAiChatResponse = res.json().await?;
        first_choice_content(data)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_json(&self, model: &str, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        self.chat_json(model, messages).await
    }
}

// --- wire types ---

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    typ: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Option<Vec<OpenAiChoice>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_choice_content(data: OpenAiChatResponse) -> Result<String, LlmError> {
    data.choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(LlmError::EmptyReply)
}
