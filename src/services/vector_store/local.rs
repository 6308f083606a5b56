//! File-backed vector store using cosine similarity.
//!
//! Each collection is one JSON file under the store directory. Collections are
//! cached in memory after first use. Creating and clearing a collection is written
//! through, while upserts stay in memory until `flush` rewrites the file. Without a
//! directory the store is purely in-memory, which is what the tests use.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::{CollectionInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{EmbeddedSegment, RetrievedSegment, Segment, VectorDriver};

static COLLECTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCollection {
    dimension: usize,
    points: Vec<StoredPoint>,
    /// Upserted since the last write to disk.
    #[serde(skip)]
    dirty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    point_id: String,
    segment: Segment,
    vector: Vec<f32>,
    ingested_at: String,
}

#[derive(Debug, Default)]
pub struct LocalBackend {
    root: Option<PathBuf>,
    collections: RwLock<HashMap<String, StoredCollection>>,
}

impl LocalBackend {
    /// Store collections as JSON files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            collections: RwLock::default(),
        }
    }

    /// Store that lives only as long as the value.
    pub fn in_memory() -> Self {
        Self::default()
    }

    fn collection_path(&self, collection: &str) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(format!("{collection}.json")))
    }

    /// Pull a collection from disk into the cache if it is not there yet.
    async fn load(&self, collection: &str) -> Result<(), VectorStoreError> {
        if !COLLECTION_NAME.is_match(collection) {
            return Err(VectorStoreError::CollectionError(format!(
                "invalid collection name '{collection}'"
            )));
        }

        if self.collections.read().await.contains_key(collection) {
            return Ok(());
        }
        let Some(path) = self.collection_path(collection) else {
            return Ok(());
        };
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| VectorStoreError::StorageError(format!("{}: {e}", path.display())))?;
        let stored: StoredCollection = serde_json::from_slice(&bytes)
            .map_err(|e| VectorStoreError::StorageError(format!("{}: {e}", path.display())))?;

        debug!(collection, points = stored.points.len(), "loaded local collection");
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_insert(stored);
        Ok(())
    }

    async fn persist(
        &self,
        collection: &str,
        stored: &StoredCollection,
    ) -> Result<(), VectorStoreError> {
        let Some(path) = self.collection_path(collection) else {
            return Ok(());
        };
        let storage_err =
            |e: std::io::Error| VectorStoreError::StorageError(format!("{}: {e}", path.display()));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage_err)?;
        }
        let bytes = serde_json::to_vec(stored)
            .map_err(|e| VectorStoreError::StorageError(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(storage_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(storage_err)?;
        Ok(())
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for LocalBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        if let Some(root) = &self.root {
            tokio::fs::create_dir_all(root)
                .await
                .map_err(|e| VectorStoreError::ConnectionError(format!("{}: {e}", root.display())))?;
        }
        Ok(true)
    }

    async fn collection_info(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError> {
        self.load(collection).await?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map(|stored| CollectionInfo {
            points_count: stored.points.len() as u64,
        }))
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        self.load(collection).await?;
        let mut collections = self.collections.write().await;

        if let Some(existing) = collections.get(collection) {
            if existing.dimension != dimension {
                return Err(VectorStoreError::CollectionError(format!(
                    "collection '{collection}' has dimension {}, embedder produces {dimension}",
                    existing.dimension
                )));
            }
            return Ok(());
        }

        let stored = StoredCollection {
            dimension,
            points: Vec::new(),
            dirty: false,
        };
        self.persist(collection, &stored).await?;
        collections.insert(collection.to_string(), stored);
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<EmbeddedSegment>,
    ) -> Result<(), VectorStoreError> {
        self.load(collection).await?;
        let mut collections = self.collections.write().await;
        let stored = collections.get_mut(collection).ok_or_else(|| {
            VectorStoreError::UpsertError(format!("collection '{collection}' does not exist"))
        })?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != stored.dimension) {
            return Err(VectorStoreError::UpsertError(format!(
                "segment {} has dimension {}, collection expects {}",
                bad.segment.id,
                bad.vector.len(),
                stored.dimension
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();
        stored
            .points
            .extend(points.into_iter().map(|point| StoredPoint {
                point_id: uuid::Uuid::new_v4().to_string(),
                segment: point.segment,
                vector: point.vector,
                ingested_at: now.clone(),
            }));
        stored.dirty = true;
        Ok(())
    }

    async fn flush(&self, collection: &str) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().await;
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(());
        };
        if stored.dirty {
            self.persist(collection, stored).await?;
            stored.dirty = false;
            debug!(collection, points = stored.points.len(), "flushed local collection");
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<RetrievedSegment>, VectorStoreError> {
        self.load(collection).await?;
        let collections = self.collections.read().await;
        let Some(stored) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        if !stored.points.is_empty() && query_vector.len() != stored.dimension {
            return Err(VectorStoreError::SearchError(format!(
                "query has dimension {}, collection expects {}",
                query_vector.len(),
                stored.dimension
            )));
        }

        let mut scored: Vec<RetrievedSegment> = stored
            .points
            .iter()
            .map(|point| RetrievedSegment {
                segment: point.segment.clone(),
                score: cosine_similarity(&point.vector, &query_vector),
            })
            .filter(|hit| min_score.is_none_or(|min| hit.score >= min))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn clear_collection(&self, collection: &str) -> Result<(), VectorStoreError> {
        if !COLLECTION_NAME.is_match(collection) {
            return Err(VectorStoreError::CollectionError(format!(
                "invalid collection name '{collection}'"
            )));
        }

        self.collections.write().await.remove(collection);
        if let Some(path) = self.collection_path(collection)
            && tokio::fs::try_exists(&path).await.unwrap_or(false)
        {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| VectorStoreError::DeleteError(format!("{}: {e}", path.display())))?;
        }
        Ok(())
    }

    fn driver(&self) -> VectorDriver {
        VectorDriver::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SegmentMetadata;

    fn point(id: &str, vector: Vec<f32>) -> EmbeddedSegment {
        EmbeddedSegment {
            segment: Segment {
                id: id.to_string(),
                content: format!("content {id}"),
                metadata: SegmentMetadata {
                    source: "t.pdf".to_string(),
                    page: 1,
                },
            },
            vector,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = LocalBackend::in_memory();
        store.ensure_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                vec![
                    point("doc_0", vec![0.0, 1.0]),
                    point("doc_1", vec![1.0, 0.1]),
                    point("doc_2", vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .similarity_search("docs", vec![1.0, 0.0], 2, None)
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.segment.id.as_str()).collect();
        assert_eq!(ids, vec!["doc_1", "doc_2"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_min_score_filters() {
        let store = LocalBackend::in_memory();
        store.ensure_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                vec![point("doc_0", vec![0.0, 1.0]), point("doc_1", vec![1.0, 0.0])],
            )
            .await
            .unwrap();
        let hits = store
            .similarity_search("docs", vec![1.0, 0.0], 4, Some(0.5))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].segment.id, "doc_1");
    }

    #[tokio::test]
    async fn test_missing_collection_searches_empty() {
        let store = LocalBackend::in_memory();
        assert!(store.collection_info("nothing").await.unwrap().is_none());
        let hits = store
            .similarity_search("nothing", vec![1.0], 4, None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_reupsert_appends_duplicates() {
        let store = LocalBackend::in_memory();
        store.ensure_collection("docs", 2).await.unwrap();
        let batch = vec![point("doc_0", vec![1.0, 0.0])];
        store.upsert("docs", batch.clone()).await.unwrap();
        store.upsert("docs", batch).await.unwrap();
        let info = store.collection_info("docs").await.unwrap().unwrap();
        assert_eq!(info.points_count, 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = LocalBackend::in_memory();
        store.ensure_collection("docs", 3).await.unwrap();
        assert!(store.ensure_collection("docs", 4).await.is_err());
        let err = store
            .upsert("docs", vec![point("doc_0", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::UpsertError(_)));
    }

    #[tokio::test]
    async fn test_upsert_requires_collection() {
        let store = LocalBackend::in_memory();
        assert!(
            store
                .upsert("docs", vec![point("doc_0", vec![1.0])])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_invalid_collection_name() {
        let store = LocalBackend::in_memory();
        assert!(store.ensure_collection("../escape", 2).await.is_err());
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalBackend::new(dir.path());
            store.ensure_collection("pdf_collection", 2).await.unwrap();
            store
                .upsert("pdf_collection", vec![point("doc_0", vec![0.6, 0.8])])
                .await
                .unwrap();
            store.flush("pdf_collection").await.unwrap();
        }
        assert!(dir.path().join("pdf_collection.json").exists());

        let reopened = LocalBackend::new(dir.path());
        let info = reopened.collection_info("pdf_collection").await.unwrap();
        assert_eq!(info, Some(CollectionInfo { points_count: 1 }));
        let hits = reopened
            .similarity_search("pdf_collection", vec![0.6, 0.8], 1, None)
            .await
            .unwrap();
        assert_eq!(hits[0].segment.id, "doc_0");
    }

    #[tokio::test]
    async fn test_upserts_reach_disk_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBackend::new(dir.path());
        store.ensure_collection("docs", 2).await.unwrap();
        for i in 0..3 {
            store
                .upsert("docs", vec![point(&format!("doc_{i}"), vec![1.0, 0.0])])
                .await
                .unwrap();
        }
        assert_eq!(
            store.collection_info("docs").await.unwrap(),
            Some(CollectionInfo { points_count: 3 })
        );

        let before_flush = LocalBackend::new(dir.path());
        assert_eq!(
            before_flush.collection_info("docs").await.unwrap(),
            Some(CollectionInfo { points_count: 0 })
        );

        store.flush("docs").await.unwrap();
        let after_flush = LocalBackend::new(dir.path());
        assert_eq!(
            after_flush.collection_info("docs").await.unwrap(),
            Some(CollectionInfo { points_count: 3 })
        );
    }

    #[tokio::test]
    async fn test_flush_missing_collection_is_noop() {
        let store = LocalBackend::in_memory();
        assert!(store.flush("nothing").await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBackend::new(dir.path());
        store.ensure_collection("docs", 2).await.unwrap();
        store.clear_collection("docs").await.unwrap();
        assert!(!dir.path().join("docs.json").exists());
        assert!(store.collection_info("docs").await.unwrap().is_none());
    }
}
