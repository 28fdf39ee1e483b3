//! # Recall Providers
//!
//! Embedding and completion backends. Each capability has two
//! interchangeable implementations — an in-process/localhost one and a
//! remote OpenAI-compatible one — selected ONCE at startup from the
//! `[embed]`/`[llm]` mode config and held immutably in a
//! [`ProviderRegistry`] for the life of the process.

pub mod local_llm;
pub mod onnx_embed;
pub mod remote;

use std::sync::Arc;

use recall_core::config::RecallConfig;
use recall_core::traits::{Completer, Embedder};

/// Task prefix applied to every embedding input; nomic-style models are
/// trained with it, and both backends must agree so vectors stay comparable.
pub const EMBED_TASK_PREFIX: &str = "search_query: ";

/// Both capabilities, resolved once at process start and passed by
/// reference into every component that needs them.
#[derive(Clone)]
pub struct ProviderRegistry {
    pub embedder: Arc<dyn Embedder>,
    pub completer: Arc<dyn Completer>,
}

impl ProviderRegistry {
    pub fn from_config(config: &RecallConfig) -> Self {
        Self {
            embedder: create_embedder(config),
            completer: create_completer(config),
        }
    }
}

/// Create the embedding backend for the configured mode.
///
/// A local backend whose model fails to load is still constructed — it
/// reports unavailable and every `embed` call fails, so /health stays
/// truthful without killing startup.
pub fn create_embedder(config: &RecallConfig) -> Arc<dyn Embedder> {
    match config.embed.mode.as_str() {
        "remote" => {
            tracing::info!(
                "Embedding mode: remote ({})",
                if config.embed.endpoint.is_empty() {
                    "not set"
                } else {
                    config.embed.endpoint.as_str()
                }
            );
            Arc::new(remote::RemoteEmbedder::new(
                &config.embed.endpoint,
                &config.embed.api_key,
                &config.embed.model,
                config.store.vector_dim as usize,
            ))
        }
        _ => Arc::new(onnx_embed::OnnxEmbedder::new(
            &config.embed.model_dir,
            &config.embed.model,
        )),
    }
}

/// Create the completion backend for the configured mode.
pub fn create_completer(config: &RecallConfig) -> Arc<dyn Completer> {
    match config.llm.mode.as_str() {
        "remote" => {
            tracing::info!(
                "LLM mode: remote ({})",
                if config.llm.endpoint.is_empty() {
                    "not set"
                } else {
                    config.llm.endpoint.as_str()
                }
            );
            Arc::new(remote::RemoteCompleter::new(
                &config.llm.endpoint,
                &config.llm.api_key,
                &config.llm.model,
            ))
        }
        _ => Arc::new(local_llm::LocalCompleter::new(
            &config.llm.local_url,
            &config.llm.model,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_resolution() {
        let mut config = RecallConfig::default();
        config.llm.mode = "remote".into();
        config.llm.endpoint = "https://api.example.com/v1".into();
        config.embed.mode = "remote".into();
        config.embed.endpoint = "https://api.example.com/v1".into();

        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.completer.is_available());
        assert!(registry.embedder.is_available());
        assert_eq!(registry.embedder.dimension(), 768);
    }

    #[test]
    fn test_remote_without_endpoint_is_unavailable() {
        let mut config = RecallConfig::default();
        config.llm.mode = "remote".into();
        config.embed.mode = "remote".into();

        let registry = ProviderRegistry::from_config(&config);
        assert!(!registry.completer.is_available());
        assert!(!registry.embedder.is_available());
    }

    #[test]
    fn test_local_embedder_without_model_is_unavailable() {
        let mut config = RecallConfig::default();
        config.embed.model_dir = "/nonexistent/model/dir".into();

        let embedder = create_embedder(&config);
        assert!(!embedder.is_available());
        assert_eq!(embedder.model_identity(), "none");
    }
}
