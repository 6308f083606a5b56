//! Top-k similarity retrieval for a query string.

use std::sync::Arc;

use tracing::debug;

use crate::error::{EmbeddingError, QueryError};
use crate::models::{DEFAULT_TOP_K, RetrievedSegment};
use crate::services::{Embedder, VectorStore, validate_embeddings};
use crate::utils::retry::{RetryConfig, retry_when};

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    top_k: usize,
    min_score: Option<f32>,
}

impl Retriever {
    /// `embedder` must be the one the collection was indexed with.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            top_k: DEFAULT_TOP_K,
            min_score: None,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// At most `top_k` segments, most similar first.
    ///
    /// The query embedding is attempted twice before giving up, and a vector of the
    /// wrong dimension counts as a failed attempt. An empty or missing collection is
    /// reported as [`QueryError::EmptyCollection`].
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedSegment>, QueryError> {
        let dimension = self.embedder.dimension();
        let query_vector = retry_when(&RetryConfig::once(), |_| true, || async {
            let vector = self.embedder.embed_query(query).await?;
            validate_embeddings(std::slice::from_ref(&vector), 1, dimension)?;
            Ok::<_, EmbeddingError>(vector)
        })
        .await?;

        let hits = self
            .store
            .similarity_search(&self.collection, query_vector, self.top_k, self.min_score)
            .await?;

        debug!(
            collection = %self.collection,
            k = self.top_k,
            hits = hits.len(),
            "retrieved segments"
        );

        if hits.is_empty() {
            return Err(QueryError::EmptyCollection(self.collection.clone()));
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorStoreError;
    use crate::models::{EmbeddedSegment, Segment, SegmentMetadata, VectorDriver};
    use crate::services::{CollectionInfo, LocalBackend};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One-hot vectors keyed on which keyword the text contains.
    struct KeywordEmbedder {
        keywords: Vec<&'static str>,
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn new(keywords: Vec<&'static str>, failures: usize) -> Self {
            Self {
                keywords,
                failures_left: AtomicUsize::new(failures),
                calls: AtomicUsize::new(0),
            }
        }

        fn vector(&self, text: &str) -> Vec<f32> {
            self.keywords
                .iter()
                .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
                .collect()
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_documents(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(EmbeddingError::InvalidResponse("garbled".to_string()));
            }
            Ok(texts.iter().map(|t| self.vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            self.keywords.len()
        }

        fn model(&self) -> &str {
            "keywords"
        }
    }

    /// Reports one dimension more than it returns.
    struct NarrowEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for NarrowEmbedder {
        async fn embed_documents(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "narrow"
        }
    }

    struct DownStore;

    #[async_trait]
    impl VectorStore for DownStore {
        async fn health_check(&self) -> Result<bool, VectorStoreError> {
            Err(VectorStoreError::ConnectionError("down".to_string()))
        }

        async fn collection_info(
            &self,
            _collection: &str,
        ) -> Result<Option<CollectionInfo>, VectorStoreError> {
            Err(VectorStoreError::ConnectionError("down".to_string()))
        }

        async fn ensure_collection(
            &self,
            _collection: &str,
            _dimension: usize,
        ) -> Result<(), VectorStoreError> {
            Err(VectorStoreError::ConnectionError("down".to_string()))
        }

        async fn upsert(
            &self,
            _collection: &str,
            _points: Vec<EmbeddedSegment>,
        ) -> Result<(), VectorStoreError> {
            Err(VectorStoreError::ConnectionError("down".to_string()))
        }

        async fn similarity_search(
            &self,
            _collection: &str,
            _query_vector: Vec<f32>,
            _limit: usize,
            _min_score: Option<f32>,
        ) -> Result<Vec<RetrievedSegment>, VectorStoreError> {
            Err(VectorStoreError::SearchError("connection refused".to_string()))
        }

        async fn clear_collection(&self, _collection: &str) -> Result<(), VectorStoreError> {
            Err(VectorStoreError::ConnectionError("down".to_string()))
        }

        fn driver(&self) -> VectorDriver {
            VectorDriver::Qdrant
        }
    }

    async fn seeded_store(embedder: &KeywordEmbedder, texts: &[&str]) -> Arc<LocalBackend> {
        let store = Arc::new(LocalBackend::in_memory());
        store
            .ensure_collection("docs", embedder.dimension())
            .await
            .unwrap();
        let points = texts
            .iter()
            .enumerate()
            .map(|(i, text)| EmbeddedSegment {
                segment: Segment {
                    id: Segment::sequential_id(i),
                    content: text.to_string(),
                    metadata: SegmentMetadata::default(),
                },
                vector: embedder.vector(text),
            })
            .collect();
        store.upsert("docs", points).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_nearest_segment_first() {
        let embedder = KeywordEmbedder::new(vec!["apple", "river", "engine"], 0);
        let store = seeded_store(
            &embedder,
            &["apple orchards", "river deltas", "engine timing", "apple river"],
        )
        .await;
        let retriever = Retriever::new(Arc::new(embedder), store, "docs").with_top_k(2);

        let hits = retriever.retrieve("how does an engine work").await.unwrap();
        assert_eq!(hits[0].segment.id, "doc_2");
        assert!(hits.len() <= 2);
    }

    #[tokio::test]
    async fn test_default_top_k_is_four() {
        let embedder = KeywordEmbedder::new(vec!["a"], 0);
        let store = seeded_store(&embedder, &["a"; 6]).await;
        let retriever = Retriever::new(Arc::new(embedder), store, "docs");
        assert_eq!(retriever.top_k(), 4);
        assert_eq!(retriever.retrieve("a").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let embedder = KeywordEmbedder::new(vec!["a"], 0);
        let retriever =
            Retriever::new(Arc::new(embedder), Arc::new(LocalBackend::in_memory()), "docs");
        assert!(matches!(
            retriever.retrieve("a").await,
            Err(QueryError::EmptyCollection(name)) if name == "docs"
        ));
    }

    #[tokio::test]
    async fn test_embedding_retried_once() {
        let embedder = KeywordEmbedder::new(vec!["a"], 1);
        let store = seeded_store(&KeywordEmbedder::new(vec!["a"], 0), &["a"]).await;
        let embedder = Arc::new(embedder);
        let retriever = Retriever::new(embedder.clone(), store, "docs");
        assert!(retriever.retrieve("a").await.is_ok());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_after_retry() {
        let embedder = Arc::new(KeywordEmbedder::new(vec!["a"], 5));
        let store = seeded_store(&KeywordEmbedder::new(vec!["a"], 0), &["a"]).await;
        let retriever = Retriever::new(embedder.clone(), store, "docs");
        assert!(matches!(
            retriever.retrieve("a").await,
            Err(QueryError::Embedding(_))
        ));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wrong_query_dimension_is_embedding_error() {
        let store = seeded_store(&KeywordEmbedder::new(vec!["a", "b"], 0), &["a"]).await;
        let embedder = Arc::new(NarrowEmbedder {
            calls: AtomicUsize::new(0),
        });
        let retriever = Retriever::new(embedder.clone(), store, "docs");
        assert!(matches!(
            retriever.retrieve("a").await,
            Err(QueryError::Embedding(EmbeddingError::InvalidResponse(_)))
        ));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_failure() {
        let embedder = KeywordEmbedder::new(vec!["a"], 0);
        let retriever = Retriever::new(Arc::new(embedder), Arc::new(DownStore), "docs");
        assert!(matches!(
            retriever.retrieve("a").await,
            Err(QueryError::VectorStore(_))
        ));
    }
}
