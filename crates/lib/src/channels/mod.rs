//! Inbound channel adapters.
//!
//! Each adapter maps a provider's webhook payload into a `RawMessage` for ingestion.
//! The generic `/webhook` route takes `RawMessage` JSON directly.

mod telegram;

pub use telegram::{TelegramMessage, TelegramUpdate, TelegramUser};
