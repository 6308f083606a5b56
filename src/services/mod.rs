mod composer;
mod embedding;
mod generation;
mod indexer;
mod normalizer;
mod parser;
mod query_loop;
mod retriever;
mod splitter;
mod vector_store;

pub use composer::{AnswerComposer, FALLBACK_ANSWER};
pub use embedding::{Embedder, ModelTag, OllamaEmbedder, TagsResponse, validate_embeddings};
pub use generation::{LanguageModel, OllamaGenerator};
pub use indexer::{EmbeddingIndexer, IndexReport};
pub use normalizer::{normalize, normalize_metadata};
pub use parser::load_document;
pub use query_loop::{
    DEFAULT_ANSWER_MARKER, DEFAULT_PROMPT, QueryLoop, SessionSummary, format_source_pages,
};
pub use retriever::Retriever;
pub use splitter::{SegmentSplitter, Segments};
pub use vector_store::{CollectionInfo, LocalBackend, QdrantBackend, VectorStore, create_backend};
