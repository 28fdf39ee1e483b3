//! Recall configuration system.
//!
//! TOML sections with serde defaults, loaded from `~/.recall/config.toml`
//! (or `RECALL_CONFIG`), then overridden by the environment variables the
//! deployment docs name (`LLM_MODE`, `EMBED_MODE`, `QDRANT_URL`, ...).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecallConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embed: EmbedConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl RecallConfig {
    /// Load config from `RECALL_CONFIG` or the default path, then apply
    /// environment overrides. Missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("RECALL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from a specific path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::RecallError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::RecallError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Environment wins over file for the documented variables.
    pub fn apply_env_overrides(&mut self) {
        let set = |target: &mut String, key: &str| {
            if let Ok(v) = std::env::var(key) {
                if !v.is_empty() {
                    *target = v;
                }
            }
        };
        set(&mut self.llm.mode, "LLM_MODE");
        set(&mut self.llm.endpoint, "LLM_API_URL");
        set(&mut self.llm.api_key, "LLM_API_KEY");
        set(&mut self.llm.model, "LLM_MODEL_NAME");
        set(&mut self.llm.local_url, "LLAMACPP_HOST");
        set(&mut self.embed.mode, "EMBED_MODE");
        set(&mut self.embed.endpoint, "EMBED_API_URL");
        set(&mut self.embed.api_key, "EMBED_API_KEY");
        set(&mut self.embed.model, "EMBED_MODEL_NAME");
        set(&mut self.embed.model_dir, "EMBED_MODEL_DIR");
        set(&mut self.store.url, "QDRANT_URL");
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Recall home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".recall")
    }
}

/// Completion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "local" (llama.cpp-style server on localhost) or "remote".
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Remote OpenAI-compatible base URL, e.g. "https://api.openai.com/v1".
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Local-mode server base URL.
    #[serde(default = "default_local_llm_url")]
    pub local_url: String,
}

fn default_mode() -> String {
    "local".into()
}
fn default_llm_model() -> String {
    "recall-slm".into()
}
fn default_local_llm_url() -> String {
    "http://localhost:8080/v1".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            endpoint: String::new(),
            api_key: String::new(),
            model: default_llm_model(),
            local_url: default_local_llm_url(),
        }
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// "local" (in-process ONNX) or "remote".
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Directory holding `model.onnx` + `tokenizer.json` for local mode.
    #[serde(default = "default_embed_model_dir")]
    pub model_dir: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embed_model")]
    pub model: String,
}

fn default_embed_model_dir() -> String {
    RecallConfig::home_dir()
        .join("models")
        .join("embed")
        .to_string_lossy()
        .into_owned()
}
fn default_embed_model() -> String {
    "nomic-embed-text".into()
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            model_dir: default_embed_model_dir(),
            endpoint: String::new(),
            api_key: String::new(),
            model: default_embed_model(),
        }
    }
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Qdrant gRPC URL.
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Must match the embedding backend's output dimension.
    #[serde(default = "default_vector_dim")]
    pub vector_dim: u64,
}

fn default_store_url() -> String {
    "http://localhost:6334".into()
}
fn default_collection() -> String {
    "recall_items".into()
}
fn default_vector_dim() -> u64 {
    768
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            collection: default_collection(),
            vector_dim: default_vector_dim(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8420
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Knowledge-graph worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Worker program; empty (the default) disables the graph endpoints.
    #[serde(default)]
    pub worker: String,
    #[serde(default)]
    pub worker_args: Vec<String>,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_add_timeout")]
    pub add_timeout_secs: u64,
    /// Longest budget: cognify performs multiple LLM calls internally.
    #[serde(default = "default_cognify_timeout")]
    pub cognify_timeout_secs: u64,
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

fn default_dataset() -> String {
    "main_dataset".into()
}
fn default_add_timeout() -> u64 {
    60
}
fn default_cognify_timeout() -> u64 {
    180
}
fn default_search_timeout() -> u64 {
    30
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            worker: String::new(),
            worker_args: Vec::new(),
            dataset: default_dataset(),
            add_timeout_secs: default_add_timeout(),
            cognify_timeout_secs: default_cognify_timeout(),
            search_timeout_secs: default_search_timeout(),
        }
    }
}

/// Retrieval tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub default_limit: u64,
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
    /// Candidate-pool sizes for the fused /search prefetches.
    #[serde(default = "default_fused_prefetch")]
    pub fused_prefetch: Vec<u64>,
    /// Smaller pools for /ask context retrieval.
    #[serde(default = "default_ask_prefetch")]
    pub ask_prefetch: Vec<u64>,
    #[serde(default = "default_group_size")]
    pub group_size: u64,
    #[serde(default = "default_rag_context_limit")]
    pub rag_context_limit: u64,
    #[serde(default = "default_rag_max_tokens")]
    pub rag_max_tokens: u32,
}

fn default_search_limit() -> u64 {
    20
}
fn default_max_limit() -> u64 {
    100
}
fn default_fused_prefetch() -> Vec<u64> {
    vec![100, 50]
}
fn default_ask_prefetch() -> Vec<u64> {
    vec![50, 20]
}
fn default_group_size() -> u64 {
    5
}
fn default_rag_context_limit() -> u64 {
    5
}
fn default_rag_max_tokens() -> u32 {
    80
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            max_limit: default_max_limit(),
            fused_prefetch: default_fused_prefetch(),
            ask_prefetch: default_ask_prefetch(),
            group_size: default_group_size(),
            rag_context_limit: default_rag_context_limit(),
            rag_max_tokens: default_rag_max_tokens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RecallConfig::default();
        assert_eq!(config.llm.mode, "local");
        assert_eq!(config.embed.mode, "local");
        assert_eq!(config.store.collection, "recall_items");
        assert_eq!(config.store.vector_dim, 768);
        assert_eq!(config.gateway.port, 8420);
        assert_eq!(config.graph.cognify_timeout_secs, 180);
        assert_eq!(config.search.fused_prefetch, vec![100, 50]);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [llm]
            mode = "remote"
            endpoint = "https://api.example.com/v1"
            model = "gpt-4o-mini"

            [store]
            url = "http://qdrant.internal:6334"
            vector_dim = 384
        "#;

        let config: RecallConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.mode, "remote");
        assert_eq!(config.llm.endpoint, "https://api.example.com/v1");
        assert_eq!(config.store.vector_dim, 384);
        // Untouched sections fall back to defaults
        assert_eq!(config.embed.mode, "local");
        assert_eq!(config.search.max_limit, 100);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: RecallConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.mode, "local");
        assert_eq!(config.gateway.port, 8420);
        assert_eq!(config.graph.add_timeout_secs, 60);
    }

    #[test]
    fn test_home_dir() {
        let home = RecallConfig::home_dir();
        assert!(home.to_string_lossy().contains("recall"));
    }
}
