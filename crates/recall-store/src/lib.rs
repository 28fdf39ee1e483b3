//! # Recall Store
//!
//! Typed facade over the Qdrant client: idempotent collection bootstrap,
//! point upsert, and the five query modes the retrieval orchestrator picks
//! from (plain, fused/RRF, grouped, discovery, recommend).
//!
//! Ranking is the engine's job — results come back in engine order and are
//! never re-sorted here.

mod client;
mod point;

pub use client::{Exemplar, RecommendMode, VectorStore};
pub use point::{group_id_str, payload_bool, payload_str, payload_str_list, point_id_str};

pub use qdrant_client::qdrant::{Condition, Filter, ScoredPoint};
