//! In-memory message store: the enriched messages received since the process started.
//!
//! Append-only and order-preserving. Readers always get a full copy, never a view into the lock.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A responder message plus the fields extracted from it. Built once at ingestion, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedMessage {
    pub name: String,
    pub text: String,
    /// Receipt time on the gateway clock (not the sender's `created_at`).
    pub timestamp: String,
    pub vehicle: String,
    pub eta: String,
}

/// Shared store; cheap to clone via `Arc<MessageStore>`.
pub struct MessageStore {
    inner: Arc<RwLock<Vec<EnrichedMessage>>>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a record to the end of the sequence.
    pub async fn append(&self, message: EnrichedMessage) {
        self.inner.write().await.push(message);
    }

    /// Copy of every record, in insertion order.
    pub async fn all(&self) -> Vec<EnrichedMessage> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
