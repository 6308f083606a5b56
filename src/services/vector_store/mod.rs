//! Vector store abstraction layer.
//!
//! Backends persist embedded segments under a named collection and answer
//! nearest-neighbour queries.

mod local;
mod qdrant;

pub use local::LocalBackend;
pub use qdrant::QdrantBackend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{EmbeddedSegment, RetrievedSegment, VectorDriver, VectorStoreConfig};

/// Collection information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub points_count: u64,
}

/// Abstract trait for vector store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Returns None if the collection doesn't exist.
    async fn collection_info(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Create the collection if it doesn't exist.
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError>;

    /// Append embedded segments to the collection.
    ///
    /// Points get fresh store ids, so upserting the same segments twice stores them twice.
    async fn upsert(
        &self,
        collection: &str,
        points: Vec<EmbeddedSegment>,
    ) -> Result<(), VectorStoreError>;

    /// Make earlier upserts durable. Backends that write through keep the default.
    async fn flush(&self, _collection: &str) -> Result<(), VectorStoreError> {
        Ok(())
    }

    /// Up to `limit` segments ordered from most to least similar.
    ///
    /// A missing collection yields an empty result.
    async fn similarity_search(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<RetrievedSegment>, VectorStoreError>;

    /// Remove the collection and everything in it.
    async fn clear_collection(&self, collection: &str) -> Result<(), VectorStoreError>;

    fn driver(&self) -> VectorDriver;
}

/// Create a vector store backend based on configuration.
pub fn create_backend(
    config: &VectorStoreConfig,
) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => Ok(Arc::new(QdrantBackend::new(config)?)),
        VectorDriver::Local => {
            let path = config.local_path().ok_or_else(|| {
                VectorStoreError::StorageError(
                    "could not determine local store directory".to_string(),
                )
            })?;
            Ok(Arc::new(LocalBackend::new(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = VectorStoreConfig {
            driver: VectorDriver::Local,
            path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let store = create_backend(&config).unwrap();
        assert_eq!(store.driver(), VectorDriver::Local);
    }

    #[tokio::test]
    async fn test_create_qdrant_backend() {
        let store = create_backend(&VectorStoreConfig::default()).unwrap();
        assert_eq!(store.driver(), VectorDriver::Qdrant);
    }
}
