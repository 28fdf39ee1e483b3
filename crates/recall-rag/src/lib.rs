//! # Recall RAG
//!
//! The question-answering pipeline: fused retrieval, bounded context
//! assembly, a completion call, and perspective post-processing. This
//! crate's boundary never throws — every failure mode degrades into an
//! answer-shaped response, because `/ask` always returns a best-effort
//! answer.

mod perspective;
mod pipeline;

pub use perspective::rewrite_second_person;
pub use pipeline::{AnswerOutcome, AnswerPipeline};
