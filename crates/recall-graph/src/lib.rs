//! # Recall Graph
//!
//! Bridge to the out-of-process knowledge-graph worker. The graph library
//! underneath performs blocking network calls without timeouts and can call
//! back into this service's own completion endpoint — in-process that would
//! deadlock a single-worker scheduler, so it runs as a real OS process and
//! the timeout is enforced from outside.
//!
//! Protocol: one JSON command object on the worker's stdin, one JSON reply
//! object (`{"ok": bool, "result": ..., "error": ...}`) on its stdout.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use recall_core::config::GraphConfig;
use recall_core::error::{RecallError, Result};

/// Search replies are capped regardless of what the worker returns.
const MAX_SEARCH_RESULTS: usize = 20;

/// How much of the worker's error stream survives into the failure detail.
const ERROR_TAIL_CHARS: usize = 300;

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum WorkerCommand<'a> {
    Add {
        text: &'a str,
        dataset_name: &'a str,
    },
    Cognify,
    Search {
        query: &'a str,
        search_type: &'a str,
    },
    Prune,
}

#[derive(Debug, Deserialize)]
struct WorkerReply {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

pub struct GraphBridge {
    program: String,
    args: Vec<String>,
    dataset: String,
    add_timeout_secs: u64,
    cognify_timeout_secs: u64,
    search_timeout_secs: u64,
}

impl GraphBridge {
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            program: config.worker.clone(),
            args: config.worker_args.clone(),
            dataset: config.dataset.clone(),
            add_timeout_secs: config.add_timeout_secs,
            cognify_timeout_secs: config.cognify_timeout_secs,
            search_timeout_secs: config.search_timeout_secs,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.program.is_empty()
    }

    /// Hand text to the worker for later graph extraction.
    pub async fn add(&self, text: &str) -> Result<Value> {
        self.invoke(
            WorkerCommand::Add {
                text,
                dataset_name: &self.dataset,
            },
            self.add_timeout_secs,
        )
        .await
    }

    /// LLM-driven graph extraction over everything added so far. Longest
    /// budget of the four commands: it makes multiple LLM calls internally.
    pub async fn cognify(&self) -> Result<Value> {
        self.invoke(WorkerCommand::Cognify, self.cognify_timeout_secs)
            .await
    }

    /// Graph search; at most [`MAX_SEARCH_RESULTS`] stringified matches.
    pub async fn search(&self, query: &str, search_type: &str) -> Result<Vec<String>> {
        let result = self
            .invoke(
                WorkerCommand::Search { query, search_type },
                self.search_timeout_secs,
            )
            .await?;
        let items = match result {
            Value::Array(items) => items
                .into_iter()
                .take(MAX_SEARCH_RESULTS)
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Value::Null => Vec::new(),
            other => vec![other.to_string()],
        };
        Ok(items)
    }

    /// Full reset of the worker's graph state.
    pub async fn prune(&self) -> Result<Value> {
        self.invoke(WorkerCommand::Prune, self.cognify_timeout_secs)
            .await
    }

    async fn invoke(&self, command: WorkerCommand<'_>, timeout_secs: u64) -> Result<Value> {
        if !self.is_configured() {
            return Err(RecallError::WorkerFailed("no graph worker configured".into()));
        }

        let payload = serde_json::to_string(&command)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RecallError::WorkerFailed(format!("failed to spawn '{}': {e}", self.program))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecallError::WorkerFailed("worker stdin not captured".into()))?;
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| RecallError::WorkerFailed(format!("worker stdin write: {e}")))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| RecallError::WorkerFailed(format!("worker stdin write: {e}")))?;
        drop(stdin);

        // kill_on_drop reaps the child when the timeout drops this future.
        let output = match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(RecallError::WorkerFailed(format!("worker I/O: {e}")));
            }
            Err(_) => {
                tracing::warn!("graph worker timed out after {timeout_secs}s");
                return Err(RecallError::WorkerTimeout(timeout_secs));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(RecallError::WorkerFailed(format!(
                "rc={}: {}",
                output.status.code().unwrap_or(-1),
                tail(detail.trim(), ERROR_TAIL_CHARS)
            )));
        }

        // The reply is the last non-empty stdout line; library noise above
        // it is ignored.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("");
        let reply: WorkerReply = serde_json::from_str(line)
            .map_err(|e| RecallError::WorkerFailed(format!("unparseable worker reply: {e}")))?;

        if !reply.ok {
            return Err(RecallError::WorkerFailed(
                reply.error.unwrap_or_else(|| "unknown".into()),
            ));
        }
        Ok(reply.result)
    }
}

/// Last `max_chars` characters, on char boundaries.
fn tail(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        s.to_string()
    } else {
        s.chars().skip(count - max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::config::GraphConfig;
    use std::time::Instant;

    fn shell_bridge(script: &str, search_timeout_secs: u64) -> GraphBridge {
        GraphBridge::from_config(&GraphConfig {
            worker: "sh".into(),
            worker_args: vec!["-c".into(), script.into()],
            dataset: "main_dataset".into(),
            add_timeout_secs: 5,
            cognify_timeout_secs: 5,
            search_timeout_secs,
        })
    }

    #[test]
    fn test_command_wire_format() {
        let add = serde_json::to_value(WorkerCommand::Add {
            text: "hello",
            dataset_name: "main_dataset",
        })
        .unwrap();
        assert_eq!(add["action"], "add");
        assert_eq!(add["text"], "hello");
        assert_eq!(add["dataset_name"], "main_dataset");

        let cognify = serde_json::to_value(WorkerCommand::Cognify).unwrap();
        assert_eq!(cognify, serde_json::json!({"action": "cognify"}));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("short", 300), "short");
        let long = "a".repeat(400);
        assert_eq!(tail(&long, 300).len(), 300);
    }

    #[tokio::test]
    async fn test_successful_roundtrip() {
        let bridge = shell_bridge(r#"read line; echo '{"ok": true, "result": {"status": "ok"}}'"#, 5);
        let result = bridge.add("some text").await.unwrap();
        assert_eq!(result["status"], "ok");
    }

    #[tokio::test]
    async fn test_ok_false_surfaces_worker_error() {
        let bridge = shell_bridge(r#"read line; echo '{"ok": false, "error": "boom"}'"#, 5);
        let err = bridge.cognify().await.unwrap_err();
        match err {
            RecallError::WorkerFailed(detail) => assert_eq!(detail, "boom"),
            other => panic!("expected WorkerFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_crash_carries_stderr_tail() {
        let bridge = shell_bridge(r#"read line; echo "graph blew up" >&2; exit 3"#, 5);
        let err = bridge.add("text").await.unwrap_err();
        match err {
            RecallError::WorkerFailed(detail) => {
                assert!(detail.contains("rc=3"));
                assert!(detail.contains("graph blew up"));
            }
            other => panic!("expected WorkerFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_and_bounded() {
        let bridge = shell_bridge("sleep 30", 1);
        let started = Instant::now();
        let err = bridge.search("q", "CHUNKS").await.unwrap_err();
        assert!(matches!(err, RecallError::WorkerTimeout(1)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let many: Vec<String> = (0..30).map(|i| format!("m{i}")).collect();
        let reply = serde_json::json!({"ok": true, "result": many}).to_string();
        let bridge = shell_bridge(&format!("read line; echo '{reply}'"), 5);
        let results = bridge.search("q", "CHUNKS").await.unwrap();
        assert_eq!(results.len(), 20);
        assert_eq!(results[0], "m0");
    }

    #[tokio::test]
    async fn test_garbage_output_is_worker_failed() {
        let bridge = shell_bridge("read line; echo 'not json'", 5);
        let err = bridge.add("text").await.unwrap_err();
        assert!(matches!(err, RecallError::WorkerFailed(_)));
    }
}
