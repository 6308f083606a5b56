//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use std::collections::HashMap;
use tracing::debug;

use super::{CollectionInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{
    EmbeddedSegment, RetrievedSegment, Segment, SegmentMetadata, UNKNOWN_SOURCE, VectorDriver,
    VectorStoreConfig,
};

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self { client })
    }
}

fn segment_payload(segment: Segment) -> HashMap<String, Value> {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert("segment_id".to_string(), segment.id.into());
    payload.insert("content".to_string(), segment.content.into());
    payload.insert("source".to_string(), segment.metadata.source.into());
    payload.insert(
        "page".to_string(),
        i64::from(segment.metadata.page).into(),
    );
    payload.insert(
        "ingested_at".to_string(),
        chrono::Utc::now().to_rfc3339().into(),
    );
    payload
}

fn payload_str<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::StringValue(s)) => Some(s.as_str()),
        _ => None,
    })
}

fn payload_int(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(n)) => Some(*n),
        Some(Kind::DoubleValue(d)) => Some(*d as i64),
        _ => None,
    })
}

fn segment_from_payload(payload: &HashMap<String, Value>) -> Segment {
    Segment {
        id: payload_str(payload, "segment_id").unwrap_or_default().to_string(),
        content: payload_str(payload, "content").unwrap_or_default().to_string(),
        metadata: SegmentMetadata {
            source: payload_str(payload, "source")
                .unwrap_or(UNKNOWN_SOURCE)
                .to_string(),
            page: payload_int(payload, "page")
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(0),
        },
    }
}

fn is_missing_collection(msg: &str) -> bool {
    msg.contains("not found") || msg.contains("doesn't exist") || msg.contains("NotFound")
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn collection_info(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError> {
        match self.client.collection_info(collection).await {
            Ok(info) => Ok(Some(CollectionInfo {
                points_count: info.result.map_or(0, |r| r.points_count.unwrap_or(0)),
            })),
            Err(e) => {
                let msg = e.to_string();
                if is_missing_collection(&msg) {
                    Ok(None)
                } else {
                    Err(VectorStoreError::CollectionError(msg))
                }
            }
        }
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        if self.collection_info(collection).await?.is_some() {
            return Ok(());
        }

        debug!(collection, dimension, "creating qdrant collection");
        let create_collection = CreateCollectionBuilder::new(collection).vectors_config(
            VectorParamsBuilder::new(dimension as u64, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<EmbeddedSegment>,
    ) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                PointStruct::new(
                    uuid::Uuid::new_v4().to_string(),
                    point.vector,
                    segment_payload(point.segment),
                )
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<RetrievedSegment>, VectorStoreError> {
        let mut search_builder =
            SearchPointsBuilder::new(collection, query_vector, limit as u64).with_payload(true);

        if let Some(score) = min_score {
            search_builder = search_builder.score_threshold(score);
        }

        let results = match self.client.search_points(search_builder).await {
            Ok(results) => results,
            Err(e) => {
                let msg = e.to_string();
                if is_missing_collection(&msg) {
                    return Ok(Vec::new());
                }
                return Err(VectorStoreError::SearchError(msg));
            }
        };

        Ok(results
            .result
            .into_iter()
            .map(|point| RetrievedSegment {
                segment: segment_from_payload(&point.payload),
                score: point.score,
            })
            .collect())
    }

    async fn clear_collection(&self, collection: &str) -> Result<(), VectorStoreError> {
        if self.collection_info(collection).await?.is_none() {
            return Ok(());
        }

        self.client
            .delete_collection(collection)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    fn driver(&self) -> VectorDriver {
        VectorDriver::Qdrant
    }
}
