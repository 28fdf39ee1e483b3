//! Remote OpenAI-compatible backends.
//!
//! Both clients carry fixed deadlines (30 s embeddings, 60 s completions)
//! baked into their reqwest clients at construction. The completer surfaces
//! call failures as the returned text rather than an error: RAG answers
//! must always populate their `answer` field, so downstream code treats
//! completion output as best-effort data.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use recall_core::error::{RecallError, Result};
use recall_core::traits::{Completer, Embedder};

use crate::EMBED_TASK_PREFIX;

const EMBED_DEADLINE: Duration = Duration::from_secs(30);
const COMPLETE_DEADLINE: Duration = Duration::from_secs(60);

fn bearer(req: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
    if api_key.is_empty() {
        req
    } else {
        req.header("Authorization", format!("Bearer {api_key}"))
    }
}

/// Embeddings over `POST {endpoint}/embeddings`.
pub struct RemoteEmbedder {
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl RemoteEmbedder {
    pub fn new(endpoint: &str, api_key: &str, model: &str, dimension: usize) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
            client: reqwest::Client::builder()
                .timeout(EMBED_DEADLINE)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.endpoint.is_empty() {
            return Err(RecallError::ProviderUnavailable("EMBED_API_URL not set".into()));
        }

        let url = format!("{}/embeddings", self.endpoint);
        let body = json!({
            "model": self.model,
            "input": format!("{EMBED_TASK_PREFIX}{text}"),
        });
        let req = bearer(self.client.post(&url).json(&body), &self.api_key);

        let resp = req
            .send()
            .await
            .map_err(|e| RecallError::Provider(format!("embedding request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RecallError::Provider(format!(
                "embedding API error {status}: {text}"
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RecallError::Provider(format!("embedding response parse: {e}")))?;
        let vector = body["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| RecallError::Provider("no embedding in response".into()))?
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect::<Vec<f32>>();

        if vector.is_empty() {
            return Err(RecallError::Provider("empty embedding in response".into()));
        }
        Ok(vector)
    }

    fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    fn model_identity(&self) -> String {
        if self.endpoint.is_empty() {
            "none".into()
        } else {
            self.model.clone()
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Chat completions over `POST {endpoint}/chat/completions`.
pub struct RemoteCompleter {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl RemoteCompleter {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::builder()
                .timeout(COMPLETE_DEADLINE)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Completer for RemoteCompleter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        if self.endpoint.is_empty() {
            return Err(RecallError::ProviderUnavailable("LLM_API_URL not set".into()));
        }

        let url = format!("{}/chat/completions", self.endpoint);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "max_tokens": max_tokens,
            "temperature": 0.3,
        });
        let req = bearer(self.client.post(&url).json(&body), &self.api_key);

        // Failures become the answer text, not errors.
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => return Ok(format!("Remote LLM error: {e}")),
        };
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Ok(format!("Remote LLM error: {status}: {text}"));
        }
        let body: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => return Ok(format!("Remote LLM error: {e}")),
        };
        match body["choices"][0]["message"]["content"].as_str() {
            Some(content) => Ok(content.to_string()),
            None => Ok("Remote LLM error: no choices in response".into()),
        }
    }

    fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    fn model_identity(&self) -> String {
        if self.endpoint.is_empty() {
            "none".into()
        } else {
            self.model.clone()
        }
    }
}
