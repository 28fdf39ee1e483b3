//! The answering pipeline.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use recall_core::config::SearchConfig;
use recall_core::traits::Completer;
use recall_core::types::elapsed_ms as ms;
use recall_retrieval::{Retriever, SearchHit};

use crate::perspective::rewrite_second_person;

/// Each source snippet is capped before concatenation regardless of the
/// original content length.
const SNIPPET_MAX_CHARS: usize = 500;

const SNIPPET_SEPARATOR: &str = "\n---\n";

const SYSTEM_PROMPT: &str = "You are a personal recall assistant. Rules:\n\
- Answer ONLY using the context provided below.\n\
- Reply with JUST the answer in one short sentence. No commentary, no corrections, no extra explanation.\n\
- Refer to the user as 'you/your' (second person). Never use 'I/my'.\n\
- If asked for a specific value (name, number, URL), return ONLY that value.\n\
- Do NOT mention yourself or your role.";

/// Final answer shape. Always produced — failures ride in `answer`.
#[derive(Debug, Serialize)]
pub struct AnswerOutcome {
    pub question: String,
    pub answer: String,
    pub sources: usize,
    pub retrieval_ms: f64,
    pub llm_ms: f64,
    pub time_ms: f64,
    pub model: String,
}

pub struct AnswerPipeline {
    completer: Arc<dyn Completer>,
    retriever: Arc<Retriever>,
    context_pools: Vec<u64>,
    max_tokens: u32,
}

impl AnswerPipeline {
    pub fn new(
        completer: Arc<dyn Completer>,
        retriever: Arc<Retriever>,
        search: &SearchConfig,
    ) -> Self {
        Self {
            completer,
            retriever,
            context_pools: search.ask_prefetch.clone(),
            max_tokens: search.rag_max_tokens,
        }
    }

    /// Answer `question` from stored context. Never errors: embedding and
    /// store failures degrade into an answer explaining the failure, and a
    /// completion failure is rendered inline.
    pub async fn ask(&self, question: &str, limit: u64) -> AnswerOutcome {
        let total = Instant::now();

        let retrieval = match self
            .retriever
            .fused(question, &self.context_pools, limit)
            .await
        {
            Ok(retrieval) => retrieval,
            Err(e) => {
                tracing::warn!("ask: retrieval failed: {e}");
                return AnswerOutcome {
                    question: question.to_string(),
                    answer: format!("Retrieval error: {e}"),
                    sources: 0,
                    retrieval_ms: ms(total),
                    llm_ms: 0.0,
                    time_ms: ms(total),
                    model: self.completer.model_identity(),
                };
            }
        };
        let snippets: Vec<String> = retrieval.hits.iter().map(snippet).collect();
        let context = snippets.join(SNIPPET_SEPARATOR);
        let retrieval_ms = retrieval.timings.total_ms;

        let llm_started = Instant::now();
        let user_prompt = format!("Context:\n{context}\n\nQuestion: {question}");
        let answer = match self
            .completer
            .complete(SYSTEM_PROMPT, &user_prompt, self.max_tokens)
            .await
        {
            Ok(text) => rewrite_second_person(&text),
            Err(e) => format!("LLM error: {e}"),
        };
        let llm_ms = ms(llm_started);

        AnswerOutcome {
            question: question.to_string(),
            answer,
            sources: snippets.len(),
            retrieval_ms,
            llm_ms,
            time_ms: ms(total),
            model: self.completer.model_identity(),
        }
    }
}

/// Display snippet for one retrieved source: `[appName] title: ` prefix
/// with empty parts omitted, content capped at [`SNIPPET_MAX_CHARS`].
fn snippet(hit: &SearchHit) -> String {
    let content: String = hit.content.chars().take(SNIPPET_MAX_CHARS).collect();
    let prefix = match (hit.app_name.is_empty(), hit.title.is_empty()) {
        (false, false) => format!("[{}] {}: ", hit.app_name, hit.title),
        (false, true) => format!("[{}] ", hit.app_name),
        (true, false) => format!("{}: ", hit.title),
        (true, true) => String::new(),
    };
    format!("{prefix}{content}")
}
