//! # Recall Gateway
//!
//! HTTP surface over the retrieval, answering, ingestion, and graph
//! subsystems. Domain errors are data — handlers reply 200 with an
//! `{"error": ...}` payload — except the chat-completions shim, which
//! emulates a strict external API and returns 5xx on failure.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
