//! Gateway HTTP wire types (health, webhook ack, error body).

use serde::{Deserialize, Serialize};

/// `GET /` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub runtime: String,
    pub port: u16,
    /// Messages held in the store.
    pub messages: usize,
}

/// Acknowledgement for an accepted webhook: `{"status": "ok"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Error body for rejected requests: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
