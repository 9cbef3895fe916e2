//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.dispatch/config.json`) and environment.

use crate::extract::LlmExtractor;
use crate::llm::{CompletionBackend, OllamaClient, OpenAiClient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_MODEL_OPENAI: &str = "gpt-4o-mini";
const DEFAULT_MODEL_OLLAMA: &str = "llama3.2:latest";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Extraction service settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Inbound channel settings (e.g. Telegram webhook).
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Directory served at `/static`. Not mounted when unset or missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            static_dir: None,
        }
    }
}

/// Which completion API the extractor talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionBackend {
    /// OpenAI or any OpenAI-compatible `/chat/completions` server.
    #[default]
    Openai,
    /// Local Ollama `/api/chat`.
    Ollama,
}

/// Extraction service: backend, model, endpoint and credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    #[serde(default)]
    pub backend: ExtractionBackend,
    /// Model id passed as-is to the backend. Default depends on backend.
    pub model: Option<String>,
    /// Override the backend's base URL (e.g. "http://127.0.0.1:1234/v1" for LM Studio).
    pub base_url: Option<String>,
    /// API key for the openai backend. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram webhook config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Expected X-Telegram-Bot-Api-Secret-Token. Overridden by DISPATCH_TELEGRAM_WEBHOOK_SECRET env.
    pub webhook_secret: Option<String>,
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the extraction API key: env OPENAI_API_KEY overrides config.
pub fn resolve_extraction_api_key(config: &Config) -> Option<String> {
    non_empty_env("OPENAI_API_KEY").or_else(|| non_empty(config.extraction.api_key.as_ref()))
}

/// Resolve the Telegram webhook secret: env DISPATCH_TELEGRAM_WEBHOOK_SECRET overrides config.
pub fn resolve_telegram_webhook_secret(config: &Config) -> Option<String> {
    non_empty_env("DISPATCH_TELEGRAM_WEBHOOK_SECRET")
        .or_else(|| non_empty(config.channels.telegram.webhook_secret.as_ref()))
}

/// Model id from config, or the backend's default when unset or blank.
pub fn resolve_extraction_model(extraction: &ExtractionConfig) -> String {
    match non_empty(extraction.model.as_ref()) {
        Some(m) => m,
        None => match extraction.backend {
            ExtractionBackend::Openai => DEFAULT_MODEL_OPENAI.to_string(),
            ExtractionBackend::Ollama => DEFAULT_MODEL_OLLAMA.to_string(),
        },
    }
}

/// Build the extractor described by the config.
pub fn build_extractor(config: &Config) -> LlmExtractor {
    let base_url = non_empty(config.extraction.base_url.as_ref());
    let backend: Arc<dyn CompletionBackend> = match config.extraction.backend {
        ExtractionBackend::Openai => {
            let api_key = resolve_extraction_api_key(config);
            if api_key.is_none() && base_url.is_none() {
                log::warn!("no OPENAI_API_KEY or extraction.apiKey set; extraction calls will fail and yield Unknown");
            }
            Arc::new(OpenAiClient::new(base_url, api_key))
        }
        ExtractionBackend::Ollama => Arc::new(OllamaClient::new(base_url)),
    };
    LlmExtractor::new(backend, resolve_extraction_model(&config.extraction))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("DISPATCH_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".dispatch").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or the default path). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
