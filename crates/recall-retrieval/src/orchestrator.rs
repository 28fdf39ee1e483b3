//! The retrieval orchestrator.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use recall_core::config::SearchConfig;
use recall_core::error::Result;
use recall_core::traits::Embedder;
use recall_core::types::elapsed_ms as ms;
use recall_store::{
    Condition, Exemplar, Filter, RecommendMode, ScoredPoint, VectorStore, payload_str,
    payload_str_list, point_id_str,
};

use crate::plan::GuidedPlan;

/// Latency breakdown, each leg measured independently.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Timings {
    pub embed_ms: f64,
    pub search_ms: f64,
    pub total_ms: f64,
}

/// Flat, JSON-safe projection of a scored point. Only the whitelisted
/// payload fields survive; anything else in the payload is dropped here.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub content: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "appName")]
    pub app_name: String,
    pub title: String,
    pub tags: Vec<String>,
}

impl SearchHit {
    fn from_point(point: &ScoredPoint) -> Self {
        Self {
            id: point_id_str(point),
            score: point.score,
            content: payload_str(point, "content"),
            content_type: payload_str(point, "contentType"),
            app_name: payload_str(point, "appName"),
            title: payload_str(point, "title"),
            tags: payload_str_list(point, "tags"),
        }
    }
}

/// One retrieval call's results, in engine order.
#[derive(Debug, Serialize)]
pub struct Retrieval {
    pub hits: Vec<SearchHit>,
    pub method: &'static str,
    #[serde(flatten)]
    pub timings: Timings,
}

/// Grouped retrieval: hits clustered by a payload field value.
#[derive(Debug, Serialize)]
pub struct GroupedRetrieval {
    pub groups: Vec<(String, Vec<SearchHit>)>,
    pub total: usize,
    #[serde(flatten)]
    pub timings: Timings,
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    search: SearchConfig,
}

fn shape(points: &[ScoredPoint]) -> Vec<SearchHit> {
    points.iter().map(SearchHit::from_point).collect()
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<VectorStore>, search: SearchConfig) -> Self {
        Self {
            embedder,
            store,
            search,
        }
    }

    /// Bound a caller-supplied limit to the configured window.
    pub fn clamp_limit(&self, limit: u64) -> u64 {
        limit.clamp(1, self.search.max_limit)
    }

    pub fn default_limit(&self) -> u64 {
        self.search.default_limit
    }

    pub fn rag_context_limit(&self) -> u64 {
        self.search.rag_context_limit
    }

    /// Fused (RRF over the configured prefetch pools) or plain search.
    pub async fn search(&self, query: &str, limit: u64, use_fusion: bool) -> Result<Retrieval> {
        if use_fusion {
            let pools = self.search.fused_prefetch.clone();
            self.fused(query, &pools, limit).await
        } else {
            let limit = self.clamp_limit(limit);
            let total = Instant::now();
            let vector = self.embedder.embed(query).await?;
            let embed_ms = ms(total);

            let search_started = Instant::now();
            let points = self.store.query_plain(vector, None, limit).await?;
            let search_ms = ms(search_started);

            Ok(Retrieval {
                hits: shape(&points),
                method: "basic_query",
                timings: Timings {
                    embed_ms,
                    search_ms,
                    total_ms: ms(total),
                },
            })
        }
    }

    /// Fused search with explicit candidate pools; /ask uses smaller ones
    /// than /search.
    pub async fn fused(&self, query: &str, pools: &[u64], limit: u64) -> Result<Retrieval> {
        let limit = self.clamp_limit(limit);
        let total = Instant::now();
        let vector = self.embedder.embed(query).await?;
        let embed_ms = ms(total);

        let search_started = Instant::now();
        let points = self.store.query_fused(vector, pools, limit).await?;
        let search_ms = ms(search_started);

        Ok(Retrieval {
            hits: shape(&points),
            method: "prefetch_rrf_fusion",
            timings: Timings {
                embed_ms,
                search_ms,
                total_ms: ms(total),
            },
        })
    }

    /// Nearest-neighbor clustered by a payload field.
    pub async fn search_grouped(
        &self,
        query: &str,
        group_by: &str,
        limit: u64,
    ) -> Result<GroupedRetrieval> {
        let limit = self.clamp_limit(limit);
        let total = Instant::now();
        let vector = self.embedder.embed(query).await?;
        let embed_ms = ms(total);

        let search_started = Instant::now();
        let raw = self
            .store
            .query_grouped(vector, group_by, limit, self.search.group_size)
            .await?;
        let search_ms = ms(search_started);

        let groups: Vec<(String, Vec<SearchHit>)> = raw
            .iter()
            .map(|(key, points)| (key.clone(), shape(points)))
            .collect();
        let total_hits = groups.iter().map(|(_, hits)| hits.len()).sum();

        Ok(GroupedRetrieval {
            groups,
            total: total_hits,
            timings: Timings {
                embed_ms,
                search_ms,
                total_ms: ms(total),
            },
        })
    }

    /// Guided discovery: branch per [`GuidedPlan`] precedence. The query is
    /// embedded in every branch — even recommend-by-id reports a real
    /// embedding latency, and the negative-only branch needs the vector as
    /// its positive exemplar.
    pub async fn discover(
        &self,
        query: &str,
        positive_id: Option<&str>,
        negative_id: Option<&str>,
        limit: u64,
    ) -> Result<Retrieval> {
        let limit = self.clamp_limit(limit);
        let plan = GuidedPlan::choose(positive_id, negative_id);
        tracing::debug!("guided search resolved to {}", plan.method());
        let total = Instant::now();
        let vector = self.embedder.embed(query).await?;
        let embed_ms = ms(total);

        let search_started = Instant::now();
        let points = match &plan {
            GuidedPlan::Discover { positive, negative } => {
                self.store
                    .query_discover(vector, positive, negative, limit)
                    .await?
            }
            GuidedPlan::RecommendPositive { positive } => {
                self.store
                    .query_recommend(
                        vec![Exemplar::Id(positive.clone())],
                        vec![],
                        RecommendMode::AverageVector,
                        limit,
                    )
                    .await?
            }
            GuidedPlan::RecommendNegative { negative } => {
                self.store
                    .query_recommend(
                        vec![Exemplar::Vector(vector)],
                        vec![Exemplar::Id(negative.clone())],
                        RecommendMode::BestScore,
                        limit,
                    )
                    .await?
            }
            GuidedPlan::Plain => self.store.query_plain(vector, None, limit).await?,
        };
        let search_ms = ms(search_started);

        Ok(Retrieval {
            hits: shape(&points),
            method: plan.method(),
            timings: Timings {
                embed_ms,
                search_ms,
                total_ms: ms(total),
            },
        })
    }

    /// Recommend by exemplar ids. No query text, so no embedding leg.
    pub async fn recommend(
        &self,
        positive_ids: &[String],
        negative_ids: &[String],
        mode: RecommendMode,
        limit: u64,
    ) -> Result<Retrieval> {
        let limit = self.clamp_limit(limit);
        let total = Instant::now();
        let positive = positive_ids
            .iter()
            .map(|id| Exemplar::Id(id.clone()))
            .collect();
        let negative = negative_ids
            .iter()
            .map(|id| Exemplar::Id(id.clone()))
            .collect();
        let points = self
            .store
            .query_recommend(positive, negative, mode, limit)
            .await?;
        let search_ms = ms(total);

        Ok(Retrieval {
            hits: shape(&points),
            method: match mode {
                RecommendMode::AverageVector => "recommend_average_vector",
                RecommendMode::BestScore => "recommend_best_score",
            },
            timings: Timings {
                embed_ms: 0.0,
                search_ms,
                total_ms: ms(total),
            },
        })
    }

    /// Plain search with equality filters on indexed payload fields. Only
    /// equality — no range or full-text predicates at this layer.
    pub async fn filtered(
        &self,
        query: &str,
        type_filter: Option<&str>,
        app_filter: Option<&str>,
        limit: u64,
    ) -> Result<Retrieval> {
        let limit = self.clamp_limit(limit);
        let total = Instant::now();
        let vector = self.embedder.embed(query).await?;
        let embed_ms = ms(total);

        let search_started = Instant::now();
        let filter = equality_filter(type_filter, app_filter);
        let points = self.store.query_plain(vector, filter, limit).await?;
        let search_ms = ms(search_started);

        Ok(Retrieval {
            hits: shape(&points),
            method: "filtered_query",
            timings: Timings {
                embed_ms,
                search_ms,
                total_ms: ms(total),
            },
        })
    }
}

fn equality_filter(type_filter: Option<&str>, app_filter: Option<&str>) -> Option<Filter> {
    let mut conditions = Vec::new();
    if let Some(value) = type_filter.filter(|s| !s.is_empty()) {
        conditions.push(Condition::matches("contentType", value.to_string()));
    }
    if let Some(value) = app_filter.filter(|s| !s.is_empty()) {
        conditions.push(Condition::matches("appName", value.to_string()));
    }
    if conditions.is_empty() {
        None
    } else {
        Some(Filter::must(conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_filter_construction() {
        assert!(equality_filter(None, None).is_none());
        assert!(equality_filter(Some(""), Some("")).is_none());

        let filter = equality_filter(Some("text"), None).unwrap();
        assert_eq!(filter.must.len(), 1);

        let filter = equality_filter(Some("text"), Some("Safari")).unwrap();
        assert_eq!(filter.must.len(), 2);
        assert!(filter.should.is_empty());
    }

    #[test]
    fn test_hit_serialization_uses_wire_keys() {
        let hit = SearchHit {
            id: "abc".into(),
            score: 0.5,
            content: "body".into(),
            content_type: "text".into(),
            app_name: "Mail".into(),
            title: String::new(),
            tags: vec!["x".into()],
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["contentType"], "text");
        assert_eq!(json["appName"], "Mail");
        assert!(json.get("content_type").is_none());
    }

    #[test]
    fn test_shape_drops_unlisted_payload_fields() {
        use qdrant_client::qdrant::value::Kind;
        use qdrant_client::qdrant::{PointId, Value};
        use std::collections::HashMap;

        let mut payload = HashMap::new();
        payload.insert(
            "content".to_string(),
            Value {
                kind: Some(Kind::StringValue("hello".into())),
            },
        );
        payload.insert(
            "entities".to_string(),
            Value {
                kind: Some(Kind::StringValue("leak".into())),
            },
        );
        let point = ScoredPoint {
            id: Some(PointId::from("id-1".to_string())),
            score: 1.0,
            payload,
            ..Default::default()
        };

        let hits = shape(&[point]);
        let json = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(json["content"], "hello");
        assert!(json.get("entities").is_none());
    }
}
