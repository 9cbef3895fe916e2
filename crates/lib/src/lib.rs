//! Dispatch core library: responder message ingestion, vehicle/ETA extraction, the in-memory
//! message store, and the HTTP gateway that exposes them. Used by the `dispatch` CLI.

pub mod channels;
pub mod config;
pub mod dashboard;
pub mod extract;
pub mod gateway;
pub mod ingest;
pub mod init;
pub mod llm;
pub mod store;
