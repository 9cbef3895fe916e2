//! Gateway: HTTP surface around the ingestion pipeline.
//!
//! Single port. Webhook routes feed the ingestor; `/api/responders` and `/dashboard` read the store.

mod protocol;
mod server;

pub use protocol::{ErrorBody, Health, WebhookAck};
pub use server::{router, run_gateway, serve, GatewayState};
