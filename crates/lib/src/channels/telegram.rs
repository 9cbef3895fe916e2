//! Telegram channel: webhook updates (Bot API `Update` JSON) mapped to raw responder messages.

use crate::extract::UNKNOWN;
use crate::ingest::RawMessage;
use serde::Deserialize;

/// Telegram update payload (webhook POST body). Only the fields we map are decoded.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    /// Unix seconds, sender clock.
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl TelegramUser {
    /// "First Last", falling back to the username.
    pub fn display_name(&self) -> Option<String> {
        let full = match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name.trim(), last),
            _ => self.first_name.trim().to_string(),
        };
        let full = full.trim().to_string();
        if !full.is_empty() {
            return Some(full);
        }
        self.username
            .as_ref()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
    }
}

impl TelegramUpdate {
    /// Raw message for a text update; None for updates without (non-blank) text.
    pub fn into_raw_message(self) -> Option<RawMessage> {
        let msg = self.message?;
        let text = msg.text.filter(|t| !t.trim().is_empty())?;
        let name = msg
            .from
            .as_ref()
            .and_then(TelegramUser::display_name)
            .unwrap_or_else(|| UNKNOWN.to_string());
        Some(RawMessage {
            name,
            text,
            created_at: msg.date as f64,
        })
    }
}
