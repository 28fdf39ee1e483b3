//! Error taxonomy shared across the workspace.
//!
//! Retrieval-path failures (`Provider*`, `Store*`, `NotFound`) propagate to
//! the gateway, which renders them as error payloads. Generation-path
//! failures are degraded inside the RAG pipeline and never reach here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecallError>;

#[derive(Error, Debug)]
pub enum RecallError {
    /// No backend configured or loaded for the requested capability.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Backend reachable but the call failed (network, non-2xx, bad body).
    #[error("provider error: {0}")]
    Provider(String),

    /// Vector store unreachable or the query transport failed.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// Unknown collection or point id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Graph worker did not reply within its budget. Distinct from
    /// `WorkerFailed`: no partial result is assumed recoverable.
    #[error("graph worker timed out after {0}s")]
    WorkerTimeout(u64),

    /// Graph worker crashed, exited non-zero, or reported `ok: false`.
    #[error("graph worker failed: {0}")]
    WorkerFailed(String),

    /// Malformed request parameters, caught at the gateway boundary.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
