//! Capability traits for the embedding and completion backends.
//!
//! Backends are resolved once at startup from `[llm]`/`[embed]` mode config
//! and held immutably for process lifetime; switching requires a restart.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into a fixed-dimension embedding vector.
///
/// Vectors from different modes (local vs remote) are not comparable; a
/// collection must be populated and queried with a single mode.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Whether a backend is configured/loaded, from current config only.
    fn is_available(&self) -> bool;

    /// Human-readable model identity for health reporting.
    fn model_identity(&self) -> String;

    /// Output dimensionality of this backend.
    fn dimension(&self) -> usize;
}

/// Generates a chat completion from a system + user prompt pair.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String>;

    fn is_available(&self) -> bool;

    fn model_identity(&self) -> String;
}
