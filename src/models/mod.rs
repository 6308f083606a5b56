mod config;
mod document;
mod search;

pub use config::{
    BoundaryPolicy, ChunkingConfig, Config, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL,
    DEFAULT_OLLAMA_URL, DEFAULT_QDRANT_URL, DEFAULT_TOP_K, EmbeddingConfig, GenerationConfig,
    OutputConfig, RetrievalConfig, VectorDriver, VectorStoreConfig,
};
pub use document::{
    Document, EmbeddedSegment, RawMetadata, RawSegment, Segment, SegmentMetadata, UNKNOWN_SOURCE,
};
pub use search::{OutputFormat, QuerySession, RetrievedSegment};
