//! # Recall Retrieval
//!
//! The decision core: turns a free-text query plus mode selectors into
//! exactly one vector-store call, applies equality filters, measures the
//! embedding/search/total latencies independently, and shapes raw points
//! into flat JSON-safe hit records.

mod orchestrator;
mod plan;

pub use orchestrator::{GroupedRetrieval, Retrieval, Retriever, SearchHit, Timings};
pub use plan::GuidedPlan;
