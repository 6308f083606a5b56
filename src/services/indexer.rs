use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::IndexError;
use crate::models::{EmbeddedSegment, Segment};
use crate::services::{Embedder, VectorStore, validate_embeddings};
use crate::utils::retry::{RetryConfig, with_retry};

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub collection: String,
    /// Distinct source pages among the indexed segments.
    pub pages: u64,
    pub segments_indexed: u64,
    pub points_in_collection: u64,
    pub duration_ms: u64,
}

/// Embeds segments and upserts them into a named collection.
pub struct EmbeddingIndexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    retry: RetryConfig,
    progress: Option<ProgressBar>,
}

impl EmbeddingIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            batch_size: 16,
            retry: RetryConfig::default(),
            progress: None,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Advance `progress` by one per indexed segment.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Create the collection if needed, then embed and store every segment.
    pub async fn index(
        &self,
        segments: &[Segment],
        collection: &str,
    ) -> Result<IndexReport, IndexError> {
        if segments.is_empty() {
            return Err(IndexError::NoSegments);
        }

        let start_time = Instant::now();
        let dimension = self.embedder.dimension();

        with_retry(&self.retry, || {
            self.store.ensure_collection(collection, dimension)
        })
        .await?;

        for batch in segments.chunks(self.batch_size) {
            self.process_batch(batch, collection).await?;
            if let Some(pb) = &self.progress {
                pb.inc(batch.len() as u64);
            }
        }

        with_retry(&self.retry, || self.store.flush(collection)).await?;

        let points_in_collection = self
            .store
            .collection_info(collection)
            .await?
            .map_or(0, |info| info.points_count);

        let report = IndexReport {
            collection: collection.to_string(),
            pages: distinct_pages(segments),
            segments_indexed: segments.len() as u64,
            points_in_collection,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            collection,
            segments = report.segments_indexed,
            points = report.points_in_collection,
            elapsed_ms = report.duration_ms,
            "indexed document"
        );

        Ok(report)
    }

    async fn process_batch(&self, batch: &[Segment], collection: &str) -> Result<(), IndexError> {
        let texts: Vec<String> = batch.iter().map(|s| s.content.clone()).collect();

        let embeddings = with_retry(&self.retry, || {
            self.embedder.embed_documents(texts.clone())
        })
        .await?;

        validate_embeddings(&embeddings, batch.len(), self.embedder.dimension())?;

        let points: Vec<EmbeddedSegment> = batch
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(segment, vector)| EmbeddedSegment { segment, vector })
            .collect();

        debug!(
            collection,
            first = %batch[0].id,
            count = points.len(),
            "upserting batch"
        );

        with_retry(&self.retry, || self.store.upsert(collection, points.clone()))
            .await?;

        Ok(())
    }
}

fn distinct_pages(segments: &[Segment]) -> u64 {
    segments
        .iter()
        .map(|s| (s.metadata.source.as_str(), s.metadata.page))
        .collect::<HashSet<_>>()
        .len() as u64
}
