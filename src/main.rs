//! # Recall — local-first RAG gateway
//!
//! Embeds and indexes captured content in a vector store and answers
//! queries by fusing vector-search strategies with a language-model
//! completion call.
//!
//! Usage:
//!   recall                         # Start the gateway (default port 8420)
//!   recall --port 9000             # Custom port
//!   recall --config ./recall.toml  # Explicit config file

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use recall_core::RecallConfig;

#[derive(Parser)]
#[command(name = "recall", version, about = "Recall — local-first RAG gateway")]
struct Cli {
    /// Path to config file (default: ~/.recall/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

// One cooperative worker thread. Anything that can call back into this
// gateway's own endpoints (the graph worker) must live in a separate OS
// process, or it would deadlock waiting on itself.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = RecallConfig::load_from(std::path::Path::new(path))?;
            config.apply_env_overrides();
            config
        }
        None => RecallConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.gateway.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    recall_gateway::start(config).await
}
