//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use recall_core::config::RecallConfig;
use recall_graph::GraphBridge;
use recall_providers::ProviderRegistry;
use recall_rag::AnswerPipeline;
use recall_retrieval::Retriever;
use recall_store::VectorStore;

/// Shared state for the gateway. Built once at startup; provider mode and
/// the store connection are fixed for process lifetime.
pub struct AppState {
    pub config: RecallConfig,
    pub registry: ProviderRegistry,
    pub store: Arc<VectorStore>,
    pub retriever: Arc<Retriever>,
    pub pipeline: AnswerPipeline,
    pub graph: GraphBridge,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire every subsystem from config. Does not touch the network.
    pub fn from_config(config: RecallConfig) -> anyhow::Result<Self> {
        let registry = ProviderRegistry::from_config(&config);
        let store = Arc::new(VectorStore::connect(
            &config.store.url,
            &config.store.collection,
            config.store.vector_dim,
        )?);
        let retriever = Arc::new(Retriever::new(
            registry.embedder.clone(),
            store.clone(),
            config.search.clone(),
        ));
        let pipeline = AnswerPipeline::new(
            registry.completer.clone(),
            retriever.clone(),
            &config.search,
        );
        let graph = GraphBridge::from_config(&config.graph);
        Ok(Self {
            config,
            registry,
            store,
            retriever,
            pipeline,
            graph,
            start_time: std::time::Instant::now(),
        })
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(super::routes::health))
        .route("/search", get(super::routes::search))
        .route("/search/grouped", get(super::routes::search_grouped))
        .route("/discover", get(super::routes::discover))
        .route("/recommend", get(super::routes::recommend))
        .route("/filter", get(super::routes::filtered_search))
        .route("/ask", get(super::routes::ask))
        .route("/add-item", post(super::routes::add_item))
        .route("/extract-entities", post(super::routes::extract_entities))
        .route("/collections", get(super::routes::list_collections))
        .route("/add-knowledge", post(super::routes::add_knowledge))
        .route("/cognee-search", get(super::routes::graph_search))
        .route("/prune-knowledge", post(super::routes::prune_knowledge))
        .route("/v1/chat/completions", post(super::routes::chat_completions))
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start(config: RecallConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Recall gateway...");

    let state = AppState::from_config(config)?;

    // Collection bootstrap is best-effort: the gateway comes up with the
    // store down and /health reports it truthfully.
    match state.store.ensure_collection().await {
        Ok(()) => {
            let points = state.store.point_count().await.unwrap_or(0);
            tracing::info!(
                "✅ Collection '{}' ready ({points} points)",
                state.store.collection()
            );
        }
        Err(e) => {
            tracing::warn!("⚠️ Vector store not reachable at startup: {e}");
        }
    }

    if !state.graph.is_configured() {
        tracing::info!("Graph worker not configured; /add-knowledge and /cognee-search disabled");
    }

    let addr = format!("{}:{}", state.config.gateway.host, state.config.gateway.port);
    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Recall gateway listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
