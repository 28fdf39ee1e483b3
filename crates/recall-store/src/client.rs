//! Qdrant client wrapper.

use qdrant_client::qdrant::{
    ContextInput, ContextInputPair, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DiscoverInput, Distance, FieldType, Filter, Fusion, PointStruct, PrefetchQueryBuilder, Query,
    QueryPointGroupsBuilder, QueryPointsBuilder, RecommendInput, RecommendStrategy, ScoredPoint,
    UpsertPointsBuilder, VectorInput, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};

use recall_core::error::{RecallError, Result};
use recall_core::types::ItemPayload;

use crate::point::group_id_str;

/// Payload fields indexed for equality/boolean filtering.
const INDEXED_FIELDS: &[(&str, FieldType)] = &[
    ("contentType", FieldType::Keyword),
    ("appName", FieldType::Keyword),
    ("tags", FieldType::Keyword),
    ("isFavorite", FieldType::Bool),
];

/// An exemplar for guided queries: an existing point or a raw vector.
#[derive(Debug, Clone)]
pub enum Exemplar {
    Id(String),
    Vector(Vec<f32>),
}

impl From<Exemplar> for VectorInput {
    fn from(exemplar: Exemplar) -> Self {
        match exemplar {
            Exemplar::Id(id) => VectorInput::new_id(id),
            Exemplar::Vector(vector) => VectorInput::new_dense(vector),
        }
    }
}

/// Reference-vector strategy for recommend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendMode {
    AverageVector,
    BestScore,
}

impl From<RecommendMode> for RecommendStrategy {
    fn from(mode: RecommendMode) -> Self {
        match mode {
            RecommendMode::AverageVector => RecommendStrategy::AverageVector,
            RecommendMode::BestScore => RecommendStrategy::BestScore,
        }
    }
}

pub struct VectorStore {
    client: Qdrant,
    collection: String,
    vector_dim: u64,
}

/// The gRPC status does not portably separate "collection missing" from
/// transport failure; classify on the engine's message wording.
fn classify(err: QdrantError) -> RecallError {
    classify_message(err.to_string())
}

fn classify_message(msg: String) -> RecallError {
    if msg.contains("doesn't exist") || msg.to_lowercase().contains("not found") {
        RecallError::NotFound(msg)
    } else {
        RecallError::StoreUnavailable(msg)
    }
}

impl VectorStore {
    /// Create a client for `url`. The channel is lazy: this does not touch
    /// the network, so startup works with the store down.
    pub fn connect(url: &str, collection: &str, vector_dim: u64) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RecallError::StoreUnavailable(format!("qdrant client: {e}")))?;
        Ok(Self {
            client,
            collection: collection.to_string(),
            vector_dim,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn is_alive(&self) -> bool {
        self.client.health_check().await.is_ok()
    }

    /// Create the collection and payload indexes if missing. Index creation
    /// on an already-indexed field is tolerated.
    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(classify)?;
        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(self.vector_dim, Distance::Cosine)),
                )
                .await
                .map_err(classify)?;
            tracing::info!(
                "Created collection '{}' ({}-dim, cosine)",
                self.collection,
                self.vector_dim
            );
        }

        for (field, field_type) in INDEXED_FIELDS {
            if let Err(e) = self
                .client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    *field,
                    *field_type,
                ))
                .await
            {
                tracing::debug!("payload index '{field}': {e}");
            }
        }
        Ok(())
    }

    /// Upsert one item. Same id overwrites; a new id is a new point.
    pub async fn upsert_item(&self, id: &str, vector: Vec<f32>, item: &ItemPayload) -> Result<()> {
        let json = serde_json::to_value(item)?;
        let payload = Payload::try_from(json)
            .map_err(|e| RecallError::Validation(format!("payload must be an object: {e}")))?;
        let point = PointStruct::new(id.to_string(), vector, payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(classify)?;
        Ok(())
    }

    /// Nearest-neighbor by cosine similarity, optionally filtered.
    pub async fn query_plain(
        &self,
        vector: Vec<f32>,
        filter: Option<Filter>,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>> {
        let mut builder = QueryPointsBuilder::new(&self.collection)
            .query(Query::new_nearest(vector))
            .limit(limit)
            .with_payload(true);
        if let Some(filter) = filter {
            builder = builder.filter(filter);
        }
        let response = self.client.query(builder).await.map_err(classify)?;
        Ok(response.result)
    }

    /// One prefetch per candidate-pool size against the same vector, merged
    /// with Reciprocal Rank Fusion.
    pub async fn query_fused(
        &self,
        vector: Vec<f32>,
        prefetch_limits: &[u64],
        limit: u64,
    ) -> Result<Vec<ScoredPoint>> {
        let mut builder = QueryPointsBuilder::new(&self.collection);
        for pool in prefetch_limits {
            builder = builder.add_prefetch(
                PrefetchQueryBuilder::default()
                    .query(Query::new_nearest(vector.clone()))
                    .limit(*pool),
            );
        }
        let builder = builder
            .query(Fusion::Rrf)
            .limit(limit)
            .with_payload(true);
        let response = self.client.query(builder).await.map_err(classify)?;
        Ok(response.result)
    }

    /// Nearest-neighbor clustered by a payload field, capped group size.
    pub async fn query_grouped(
        &self,
        vector: Vec<f32>,
        group_by: &str,
        limit: u64,
        group_size: u64,
    ) -> Result<Vec<(String, Vec<ScoredPoint>)>> {
        let builder = QueryPointGroupsBuilder::new(&self.collection, group_by)
            .query(Query::new_nearest(vector))
            .limit(limit)
            .group_size(group_size)
            .with_payload(true);
        let response = self.client.query_groups(builder).await.map_err(classify)?;
        let groups = response
            .result
            .map(|r| r.groups)
            .unwrap_or_default()
            .into_iter()
            .map(|g| (g.id.map(group_id_str).unwrap_or_default(), g.hits))
            .collect();
        Ok(groups)
    }

    /// Discovery: rank toward the positive exemplar and away from the
    /// negative one, around a target vector. A distinct ranking function,
    /// not a post-filter.
    pub async fn query_discover(
        &self,
        target: Vec<f32>,
        positive_id: &str,
        negative_id: &str,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>> {
        let discover = DiscoverInput {
            target: Some(VectorInput::new_dense(target)),
            context: Some(ContextInput {
                pairs: vec![ContextInputPair {
                    positive: Some(VectorInput::new_id(positive_id.to_string())),
                    negative: Some(VectorInput::new_id(negative_id.to_string())),
                }],
            }),
        };
        let builder = QueryPointsBuilder::new(&self.collection)
            .query(Query::new_discover(discover))
            .limit(limit)
            .with_payload(true);
        let response = self.client.query(builder).await.map_err(classify)?;
        Ok(response.result)
    }

    /// Recommend: rank by similarity to a reference vector computed from
    /// positive/negative exemplars.
    pub async fn query_recommend(
        &self,
        positive: Vec<Exemplar>,
        negative: Vec<Exemplar>,
        mode: RecommendMode,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>> {
        if positive.is_empty() {
            return Err(RecallError::Validation(
                "recommend requires at least one positive exemplar".into(),
            ));
        }
        let recommend = RecommendInput {
            positive: positive.into_iter().map(VectorInput::from).collect(),
            negative: negative.into_iter().map(VectorInput::from).collect(),
            strategy: Some(RecommendStrategy::from(mode).into()),
        };
        let builder = QueryPointsBuilder::new(&self.collection)
            .query(Query::new_recommend(recommend))
            .limit(limit)
            .with_payload(true);
        let response = self.client.query(builder).await.map_err(classify)?;
        Ok(response.result)
    }

    /// Point count of the main collection, for /health.
    pub async fn point_count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(classify)?;
        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    /// All collections with their point counts.
    pub async fn list_collections(&self) -> Result<Vec<(String, u64)>> {
        let listed = self.client.list_collections().await.map_err(classify)?;
        let mut out = Vec::with_capacity(listed.collections.len());
        for description in listed.collections {
            let count = self
                .client
                .collection_info(&description.name)
                .await
                .map_err(classify)?
                .result
                .and_then(|r| r.points_count)
                .unwrap_or(0);
            out.push((description.name, count));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::vector_input::Variant;

    #[test]
    fn test_exemplar_conversion() {
        let id_input = VectorInput::from(Exemplar::Id("abc".into()));
        assert!(matches!(id_input.variant, Some(Variant::Id(_))));

        let vec_input = VectorInput::from(Exemplar::Vector(vec![0.1, 0.2]));
        assert!(matches!(vec_input.variant, Some(Variant::Dense(_))));
    }

    #[test]
    fn test_recommend_mode_mapping() {
        assert_eq!(
            RecommendStrategy::from(RecommendMode::AverageVector),
            RecommendStrategy::AverageVector
        );
        assert_eq!(
            RecommendStrategy::from(RecommendMode::BestScore),
            RecommendStrategy::BestScore
        );
    }

    #[test]
    fn test_classify_errors() {
        assert!(matches!(
            classify_message("Collection `x` doesn't exist".into()),
            RecallError::NotFound(_)
        ));
        assert!(matches!(
            classify_message("transport error: connection refused".into()),
            RecallError::StoreUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_recommend_requires_positive() {
        let store = VectorStore::connect("http://localhost:6334", "test", 4).unwrap();
        let result = store
            .query_recommend(vec![], vec![], RecommendMode::AverageVector, 5)
            .await;
        assert!(matches!(result, Err(RecallError::Validation(_))));
    }
}
