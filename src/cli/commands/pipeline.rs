//! Wiring shared by the ingest, run, chat and ask commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::models::{BoundaryPolicy, Config, OutputFormat};
use crate::services::{
    AnswerComposer, EmbeddingIndexer, IndexReport, OllamaEmbedder, OllamaGenerator, QueryLoop,
    Retriever, SegmentSplitter, VectorStore, create_backend, load_document, normalize,
};

/// Options for a single ingestion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Drop the collection before indexing.
    pub reset: bool,
    /// Overrides `chunking.boundary` when set.
    pub boundary: Option<BoundaryPolicy>,
    pub progress: bool,
}

pub fn open_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    create_backend(&config.vector_store).context("failed to open vector store")
}

/// Parse, split, normalise, embed and store one document.
pub async fn ingest(path: &Path, config: &Config, options: IngestOptions) -> Result<IndexReport> {
    let documents = load_document(path, config.chunking.max_document_size)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let mut chunking = config.chunking.clone();
    if let Some(boundary) = options.boundary {
        chunking.boundary = boundary;
    }
    let splitter = SegmentSplitter::from_config(&chunking)?;
    let segments = normalize(&splitter.split_documents(&documents));
    info!(
        pages = documents.len(),
        segments = segments.len(),
        chunk_size = splitter.chunk_size(),
        chunk_overlap = splitter.chunk_overlap(),
        "split document"
    );

    let collection = config.vector_store.collection.as_str();
    let store = open_store(config)?;
    if options.reset {
        store
            .clear_collection(collection)
            .await
            .context("failed to reset collection")?;
        info!(collection, "collection reset");
    }

    let embedder = Arc::new(OllamaEmbedder::new(&config.embedding)?);
    let mut indexer = EmbeddingIndexer::new(embedder, store)
        .with_batch_size(config.embedding.batch_size as usize);

    let progress = if options.progress {
        let pb = ProgressBar::new(segments.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})",
                )?
                .progress_chars("#>-"),
        );
        indexer = indexer.with_progress(pb.clone());
        Some(pb)
    } else {
        None
    };

    let result = indexer.index(&segments, collection).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    result.context("failed to index document")
}

/// Retriever, composer and loop over the configured collection.
pub fn build_query_loop(config: &Config, show_sources: bool) -> Result<QueryLoop> {
    let embedder = Arc::new(OllamaEmbedder::new(&config.embedding)?);
    let store = open_store(config)?;
    let generator = Arc::new(OllamaGenerator::new(&config.generation)?);

    let retriever = Retriever::new(embedder, store, config.vector_store.collection.clone())
        .with_top_k(config.retrieval.top_k)
        .with_min_score(config.retrieval.min_score);
    let composer = AnswerComposer::new(generator);

    Ok(QueryLoop::new(retriever, composer).with_sources(show_sources))
}

/// Progress bars only make sense for a human watching a terminal.
pub fn wants_progress(format: OutputFormat) -> bool {
    format == OutputFormat::Text && console::Term::stderr().is_term()
}

/// Run the interactive loop on stdin/stdout.
pub async fn chat(query_loop: &QueryLoop) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let summary = query_loop
        .run(stdin, std::io::stdout())
        .await
        .context("console I/O failed")?;
    info!(
        questions = summary.questions,
        answered = summary.answered,
        failed = summary.failed,
        "session ended"
    );
    Ok(())
}
