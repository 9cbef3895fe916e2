//! Ingestion: raw responder message -> extraction -> enriched record -> store.

use crate::extract::Extractor;
use crate::store::{EnrichedMessage, MessageStore};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Display format for receipt timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A message as delivered by the inbound webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub name: String,
    pub text: String,
    /// Sender-side clock (unix seconds, may be fractional). Logged, not stored.
    pub created_at: f64,
}

type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Builds enriched records and appends them to the shared store.
#[derive(Clone)]
pub struct Ingestor {
    extractor: Arc<dyn Extractor>,
    store: Arc<MessageStore>,
    clock: Clock,
}

impl Ingestor {
    pub fn new(extractor: Arc<dyn Extractor>, store: Arc<MessageStore>) -> Self {
        Self::with_clock(extractor, store, Local::now)
    }

    /// Same as `new` but with a custom receipt clock.
    pub fn with_clock(
        extractor: Arc<dyn Extractor>,
        store: Arc<MessageStore>,
        clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static,
    ) -> Self {
        Self {
            extractor,
            store,
            clock: Arc::new(clock),
        }
    }

    /// Extract, stamp with receipt time and append. Returns the stored record.
    /// The store lock is only taken after extraction has finished.
    pub async fn ingest(&self, raw: RawMessage) -> EnrichedMessage {
        log::debug!(
            "ingest: message from {:?} (created_at {})",
            raw.name,
            raw.created_at
        );
        let extracted = self.extractor.extract(&raw.text).await;
        let message = EnrichedMessage {
            name: raw.name,
            text: raw.text,
            timestamp: (self.clock)().format(TIMESTAMP_FORMAT).to_string(),
            vehicle: extracted.vehicle,
            eta: extracted.eta,
        };
        log::info!(
            "ingested message from {}: vehicle={} eta={}",
            message.name,
            message.vehicle,
            message.eta
        );
        self.store.append(message.clone()).await;
        message
    }
}
