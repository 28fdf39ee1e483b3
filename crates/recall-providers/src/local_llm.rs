//! Local completion backend: llama.cpp-style server on localhost.
//!
//! No auth, OpenAI-compatible surface. Small instruction-tuned models loop
//! easily, so the request carries repetition-guard stop sequences and the
//! reply is additionally truncated at the first known repetition marker.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use recall_core::error::{RecallError, Result};
use recall_core::traits::Completer;

/// Stop sequences sent with every local request.
const STOP_SEQUENCES: &[&str] = &["[/INST]", "[INST]", "</s>", "<|im_end|>", "<|endoftext|>"];

/// Markers that signal the model started repeating its prompt template.
const REPETITION_MARKERS: &[&str] = &["[/INST]", "\n\n\n"];

pub struct LocalCompleter {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LocalCompleter {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }
}

/// Cut the text at the earliest repetition marker, if any.
fn truncate_at_repetition(text: &str) -> &str {
    let mut cut = text.len();
    for marker in REPETITION_MARKERS {
        if let Some(idx) = text.find(marker) {
            cut = cut.min(idx);
        }
    }
    text[..cut].trim_end()
}

#[async_trait]
impl Completer for LocalCompleter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        if self.base_url.is_empty() {
            return Err(RecallError::ProviderUnavailable(
                "no local LLM server configured; set llm.local_url or LLM_MODE=remote".into(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "max_tokens": max_tokens,
            "temperature": 0.3,
            "stop": STOP_SEQUENCES,
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RecallError::Provider(format!("local LLM unreachable ({}): {e}", self.base_url))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RecallError::Provider(format!(
                "local LLM error {status}: {text}"
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RecallError::Provider(format!("local LLM response parse: {e}")))?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| RecallError::Provider("no choices in local LLM response".into()))?
            .trim();

        Ok(truncate_at_repetition(content).to_string())
    }

    fn is_available(&self) -> bool {
        !self.base_url.is_empty()
    }

    fn model_identity(&self) -> String {
        format!("{}-local", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_at_marker() {
        assert_eq!(
            truncate_at_repetition("The answer is 42. [/INST] The answer is 42."),
            "The answer is 42."
        );
        assert_eq!(
            truncate_at_repetition("line one\n\n\nline one again"),
            "line one"
        );
    }

    #[test]
    fn test_truncate_picks_earliest_marker() {
        assert_eq!(truncate_at_repetition("a\n\n\nb [/INST] c"), "a");
    }

    #[test]
    fn test_truncate_clean_text_untouched() {
        assert_eq!(truncate_at_repetition("clean answer"), "clean answer");
    }
}
