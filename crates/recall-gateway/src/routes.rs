//! API route handlers for the gateway.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;

use recall_core::error::RecallError;
use recall_core::types::{ItemPayload, elapsed_ms as ms, epoch_secs};
use recall_store::RecommendMode;

use super::server::AppState;

/// Domain errors ride in the body; status stays 200.
fn error_payload(err: RecallError) -> Json<Value> {
    Json(json!({"error": err.to_string()}))
}

/// Split a comma-separated id list, dropping empties.
fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---- Health ----

/// Per-subsystem health status.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (qdrant_ok, points) = match state.store.point_count().await {
        Ok(points) => (true, points),
        Err(_) => (false, 0),
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "services": {
            "embeddings": state.registry.embedder.is_available(),
            "llm": state.registry.completer.is_available(),
            "qdrant": qdrant_ok,
            "graph": state.graph.is_configured(),
        },
        "models": {
            "embed": state.registry.embedder.model_identity(),
            "llm": state.registry.completer.model_identity(),
        },
        "collection": {
            "name": state.store.collection(),
            "points": points,
        },
    }))
}

// ---- Search ----

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<u64>,
    pub use_fusion: Option<bool>,
}

/// Fused (prefetch + RRF) or plain semantic search.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(state.retriever.default_limit());
    let use_fusion = params.use_fusion.unwrap_or(true);
    match state.retriever.search(&params.q, limit, use_fusion).await {
        Ok(retrieval) => {
            let total = retrieval.hits.len();
            Json(json!({
                "query": params.q,
                "results": retrieval.hits,
                "total": total,
                "time_ms": retrieval.timings.total_ms,
                "embed_ms": retrieval.timings.embed_ms,
                "search_ms": retrieval.timings.search_ms,
                "method": retrieval.method,
            }))
        }
        Err(e) => error_payload(e),
    }
}

#[derive(Deserialize)]
pub struct GroupedParams {
    pub q: String,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    pub limit: Option<u64>,
}

fn default_group_by() -> String {
    "contentType".into()
}

/// Search with results clustered by a payload field.
pub async fn search_grouped(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GroupedParams>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(state.retriever.default_limit());
    match state
        .retriever
        .search_grouped(&params.q, &params.group_by, limit)
        .await
    {
        Ok(grouped) => {
            let groups: serde_json::Map<String, Value> = grouped
                .groups
                .iter()
                .map(|(key, hits)| (key.clone(), json!(hits)))
                .collect();
            Json(json!({
                "query": params.q,
                "groups": groups,
                "total": grouped.total,
                "time_ms": grouped.timings.total_ms,
                "embed_ms": grouped.timings.embed_ms,
                "search_ms": grouped.timings.search_ms,
            }))
        }
        Err(e) => error_payload(e),
    }
}

#[derive(Deserialize)]
pub struct DiscoverParams {
    pub q: String,
    pub positive_id: Option<String>,
    pub negative_id: Option<String>,
    pub limit: Option<u64>,
}

/// Guided search: discovery, recommend, or plain per exemplar presence.
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverParams>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(state.retriever.default_limit());
    match state
        .retriever
        .discover(
            &params.q,
            params.positive_id.as_deref(),
            params.negative_id.as_deref(),
            limit,
        )
        .await
    {
        Ok(retrieval) => Json(json!({
            "query": params.q,
            "positive_id": params.positive_id,
            "negative_id": params.negative_id,
            "results": retrieval.hits,
            "time_ms": retrieval.timings.total_ms,
            "embed_ms": retrieval.timings.embed_ms,
            "search_ms": retrieval.timings.search_ms,
            "method": retrieval.method,
        })),
        Err(e) => error_payload(e),
    }
}

#[derive(Deserialize)]
pub struct RecommendParams {
    pub positive_ids: String,
    #[serde(default)]
    pub negative_ids: String,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    pub limit: Option<u64>,
}

fn default_strategy() -> String {
    "average_vector".into()
}

/// Recommend by exemplar point ids.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendParams>,
) -> Json<Value> {
    let positive = split_ids(&params.positive_ids);
    let negative = split_ids(&params.negative_ids);
    let mode = if params.strategy == "best_score" {
        RecommendMode::BestScore
    } else {
        RecommendMode::AverageVector
    };
    let limit = params.limit.unwrap_or(10);
    match state.retriever.recommend(&positive, &negative, mode, limit).await {
        Ok(retrieval) => Json(json!({
            "results": retrieval.hits,
            "time_ms": retrieval.timings.total_ms,
            "method": retrieval.method,
        })),
        Err(e) => error_payload(e),
    }
}

#[derive(Deserialize)]
pub struct FilterParams {
    pub q: String,
    pub type_filter: Option<String>,
    pub app_filter: Option<String>,
    pub limit: Option<u64>,
}

/// Semantic search with equality filters on indexed payload fields.
pub async fn filtered_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(state.retriever.default_limit());
    match state
        .retriever
        .filtered(
            &params.q,
            params.type_filter.as_deref(),
            params.app_filter.as_deref(),
            limit,
        )
        .await
    {
        Ok(retrieval) => Json(json!({
            "results": retrieval.hits,
            "time_ms": retrieval.timings.total_ms,
            "method": retrieval.method,
        })),
        Err(e) => error_payload(e),
    }
}

// ---- RAG ----

#[derive(Deserialize)]
pub struct AskParams {
    pub q: String,
    pub limit: Option<u64>,
}

/// RAG Q&A over the stored items. Always answers.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AskParams>,
) -> Json<Value> {
    let limit = params.limit.unwrap_or(state.retriever.rag_context_limit());
    let outcome = state.pipeline.ask(&params.q, limit).await;
    Json(json!(outcome))
}

// ---- Items ----

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub content: String,
    pub app_name: Option<String>,
    #[serde(default = "default_item_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

fn default_item_content_type() -> String {
    "text".into()
}

/// Extract entities, embed, and upsert one item. Duplicate adds create
/// duplicate points; ids are generated here, never supplied.
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddItemRequest>,
) -> Json<Value> {
    let started = Instant::now();

    let vector = match state.registry.embedder.embed(&request.content).await {
        Ok(vector) => vector,
        Err(e) => return Json(json!({"error": format!("Embedding failed: {e}")})),
    };

    let entities = recall_extract::extract(&request.content)
        .into_iter()
        .map(|entity| entity.value)
        .collect();

    let point_id = uuid::Uuid::new_v4().to_string();
    let payload = ItemPayload {
        content: request.content,
        content_type: request.content_type,
        app_name: request.app_name.unwrap_or_else(|| "Unknown".into()),
        title: request.title.unwrap_or_default(),
        tags: request.tags,
        is_favorite: request.is_favorite,
        timestamp: epoch_secs(),
        entities,
    };

    match state.store.upsert_item(&point_id, vector, &payload).await {
        Ok(()) => Json(json!({
            "status": "ok",
            "point_id": point_id,
            "time_ms": ms(started),
        })),
        Err(e) => error_payload(e),
    }
}

#[derive(Deserialize)]
pub struct ExtractEntitiesRequest {
    pub content: String,
}

/// Entity extraction: URLs, emails, dates, money, code identifiers, etc.
pub async fn extract_entities(Json(request): Json<ExtractEntitiesRequest>) -> Json<Value> {
    let entities = recall_extract::extract(&request.content);
    let total = entities.len();
    Json(json!({"entities": entities, "total": total}))
}

/// List collections and point counts.
pub async fn list_collections(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.store.list_collections().await {
        Ok(collections) => {
            let map: serde_json::Map<String, Value> = collections
                .into_iter()
                .map(|(name, points)| (name, json!({"points": points})))
                .collect();
            Json(json!(map))
        }
        Err(e) => error_payload(e),
    }
}

// ---- Knowledge graph ----

#[derive(Deserialize)]
pub struct AddKnowledgeRequest {
    pub text: String,
}

/// Add text to the knowledge graph, then run graph extraction. A cognify
/// timeout degrades the response instead of failing it — the text is
/// already added.
pub async fn add_knowledge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddKnowledgeRequest>,
) -> Json<Value> {
    if !state.graph.is_configured() {
        return Json(json!({"error": "Graph worker not configured"}));
    }
    let started = Instant::now();

    if let Err(e) = state.graph.add(&request.text).await {
        return Json(json!({
            "error": format!("Graph add failed: {e}"),
            "time_ms": ms(started),
        }));
    }
    let add_ms = ms(started);

    let cognify_status = match state.graph.cognify().await {
        Ok(_) => "ok".to_string(),
        Err(RecallError::WorkerTimeout(secs)) => format!("timeout ({secs}s)"),
        Err(e) => format!("failed: {e}"),
    };

    Json(json!({
        "status": "ok",
        "add_ms": add_ms,
        "cognify_status": cognify_status,
        "time_ms": ms(started),
    }))
}

#[derive(Deserialize)]
pub struct GraphSearchParams {
    pub q: String,
    #[serde(default = "default_search_type")]
    pub search_type: String,
}

fn default_search_type() -> String {
    "CHUNKS".into()
}

/// Graph-aware search via the worker.
pub async fn graph_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GraphSearchParams>,
) -> Json<Value> {
    if !state.graph.is_configured() {
        return Json(json!({"error": "Graph worker not configured"}));
    }
    let started = Instant::now();
    match state.graph.search(&params.q, &params.search_type).await {
        Ok(results) => {
            let total = results.len();
            Json(json!({
                "query": params.q,
                "search_type": params.search_type,
                "results": results,
                "total": total,
                "time_ms": ms(started),
                "method": "graph_search",
            }))
        }
        Err(e) => Json(json!({
            "error": e.to_string(),
            "time_ms": ms(started),
        })),
    }
}

/// Full reset of the knowledge graph.
pub async fn prune_knowledge(State(state): State<Arc<AppState>>) -> Json<Value> {
    if !state.graph.is_configured() {
        return Json(json!({"error": "Graph worker not configured"}));
    }
    let started = Instant::now();
    match state.graph.prune().await {
        Ok(result) => Json(json!({
            "status": "ok",
            "result": result,
            "time_ms": ms(started),
        })),
        Err(e) => Json(json!({
            "error": e.to_string(),
            "time_ms": ms(started),
        })),
    }
}

// ---- OpenAI-compatible shim ----

#[derive(Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default = "default_chat_model")]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub response_format: Option<Value>,
}

fn default_chat_model() -> String {
    "recall-slm".into()
}
fn default_chat_max_tokens() -> u32 {
    2048
}

/// OpenAI-compatible chat completions backed by the configured Completer.
/// Exists so the graph worker can use this service as its LLM backend.
/// Unlike the rest of the surface this emulates a strict external API:
/// completion failure is a 500, not an error payload.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let mut system_prompt = String::new();
    let mut user_prompt = String::new();
    for message in &request.messages {
        match message.role.as_str() {
            "system" => {
                system_prompt.push_str(&message.content);
                system_prompt.push('\n');
            }
            // Prior assistant turns fold into the user prompt for the
            // single-turn completer.
            "user" | "assistant" => {
                user_prompt.push_str(&message.content);
                user_prompt.push('\n');
            }
            _ => {}
        }
    }
    let mut system_prompt = system_prompt.trim().to_string();
    let user_prompt = user_prompt.trim().to_string();

    let wants_json = request
        .response_format
        .as_ref()
        .and_then(|f| f.get("type"))
        .and_then(Value::as_str)
        == Some("json_object");
    if wants_json {
        system_prompt
            .push_str("\n\nIMPORTANT: You MUST respond with valid JSON only. No markdown, no explanation.");
    }

    let answer = match state
        .registry
        .completer
        .complete(&system_prompt, &user_prompt, request.max_tokens)
        .await
    {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!("chat completions failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };

    let id = uuid::Uuid::new_v4().simple().to_string();
    Json(json!({
        "id": format!("chatcmpl-{}", &id[..12]),
        "object": "chat.completion",
        "created": epoch_secs() as u64,
        "model": request.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": answer},
            "finish_reason": "stop",
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0},
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::config::RecallConfig;

    /// Unreachable store, unloadable local models, no graph worker: every
    /// handler must degrade, never crash.
    fn test_state() -> State<Arc<AppState>> {
        let mut config = RecallConfig::default();
        config.store.url = "http://127.0.0.1:1".into();
        config.store.collection = "recall-test-items".into();
        config.embed.model_dir = "/nonexistent/embed-model".into();
        config.llm.local_url = String::new();
        config.graph.worker = String::new();
        State(Arc::new(AppState::from_config(config).unwrap()))
    }

    // ---- Health ----

    #[tokio::test]
    async fn test_health_reports_degraded_services() {
        let result = health(test_state()).await;
        let json = result.0;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["services"]["embeddings"], false);
        assert_eq!(json["services"]["llm"], false);
        assert_eq!(json["services"]["qdrant"], false);
        assert_eq!(json["services"]["graph"], false);
        assert_eq!(json["collection"]["name"], "recall-test-items");
        assert_eq!(json["collection"]["points"], 0);
    }

    // ---- Search ----

    #[tokio::test]
    async fn test_search_failure_is_error_payload() {
        let params = SearchParams {
            q: "anything".into(),
            limit: None,
            use_fusion: None,
        };
        let result = search(test_state(), Query(params)).await;
        let json = result.0;
        assert!(json.get("error").is_some());
        assert!(json.get("results").is_none());
    }

    #[tokio::test]
    async fn test_recommend_requires_positive_ids() {
        let params = RecommendParams {
            positive_ids: " , ".into(),
            negative_ids: String::new(),
            strategy: "average_vector".into(),
            limit: None,
        };
        let result = recommend(test_state(), Query(params)).await;
        let json = result.0;
        let error = json["error"].as_str().unwrap();
        assert!(error.contains("positive"));
    }

    // ---- RAG ----

    #[tokio::test]
    async fn test_ask_always_answers() {
        let params = AskParams {
            q: "where did I park?".into(),
            limit: None,
        };
        let result = ask(test_state(), Query(params)).await;
        let json = result.0;
        assert_eq!(json["question"], "where did I park?");
        assert_eq!(json["sources"], 0);
        assert!(!json["answer"].as_str().unwrap().is_empty());
    }

    // ---- Items ----

    #[tokio::test]
    async fn test_extract_entities_endpoint() {
        let request = ExtractEntitiesRequest {
            content: "Contact me at alice@example.com or https://example.com, paid $42.50 on 2024-01-05".into(),
        };
        let result = extract_entities(Json(request)).await;
        let json = result.0;
        assert_eq!(json["total"], 4);
        assert_eq!(json["entities"][0]["type"], "url");
        assert_eq!(json["entities"][1]["value"], "alice@example.com");
    }

    #[tokio::test]
    async fn test_add_item_reports_embedding_failure() {
        let request = AddItemRequest {
            content: "note to self".into(),
            app_name: None,
            content_type: "text".into(),
            tags: vec![],
            title: None,
            is_favorite: false,
        };
        let result = add_item(test_state(), Json(request)).await;
        let json = result.0;
        assert!(json["error"].as_str().unwrap().contains("Embedding failed"));
    }

    // ---- Knowledge graph ----

    #[tokio::test]
    async fn test_add_knowledge_without_worker() {
        let request = AddKnowledgeRequest {
            text: "some knowledge".into(),
        };
        let result = add_knowledge(test_state(), Json(request)).await;
        assert_eq!(result.0["error"], "Graph worker not configured");
    }

    #[tokio::test]
    async fn test_graph_search_without_worker() {
        let params = GraphSearchParams {
            q: "query".into(),
            search_type: "CHUNKS".into(),
        };
        let result = graph_search(test_state(), Query(params)).await;
        assert_eq!(result.0["error"], "Graph worker not configured");
    }

    // ---- Chat shim ----

    #[tokio::test]
    async fn test_chat_completions_500_on_completer_failure() {
        let request = ChatCompletionRequest {
            model: "recall-slm".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hello".into(),
            }],
            max_tokens: 16,
            response_format: None,
        };
        let response = chat_completions(test_state(), Json(request)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
