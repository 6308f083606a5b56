//! Error types for pdfqa.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to configuration and chunking parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Errors raised while turning a file into documents.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document exceeds maximum size: {size} > {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("failed to parse PDF: {0}")]
    Pdf(String),

    #[error("PDF is encrypted: {0}")]
    Encrypted(String),

    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("document contains no extractable text: {0}")]
    NoText(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError(msg) => is_transient_status(msg),
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::SearchError(msg)
            | VectorStoreError::DeleteError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
            // Local disk failures do not heal on their own
            VectorStoreError::StorageError(_) => false,
        }
    }
}

/// Errors raised by the language model.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to connect to language model: {0}")]
    ConnectionError(String),

    #[error("language model error: {0}")]
    ServerError(String),

    #[error("generation request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("generation timeout")]
    Timeout,
}

/// Errors related to ingestion.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("no segments to index")]
    NoSegments,
}

/// Errors raised while answering a single question.
///
/// All of these are recoverable: the query loop reports them and prompts again.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("collection '{0}' has no indexed segments")]
    EmptyCollection(String),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
}

fn is_transient_status(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    msg.contains("503")
        || msg.contains("502")
        || msg.contains("504")
        || msg.contains("429")
        || lower.contains("unavailable")
        || lower.contains("too many requests")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_retryable() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(EmbeddingError::ConnectionError("refused".to_string()).is_retryable());
        assert!(EmbeddingError::ServerError("status 503: busy".to_string()).is_retryable());
        assert!(!EmbeddingError::ServerError("status 400: bad input".to_string()).is_retryable());
        assert!(!EmbeddingError::InvalidResponse("dimension".to_string()).is_retryable());
    }

    #[test]
    fn test_vector_store_error_retryable() {
        assert!(VectorStoreError::ConnectionError("down".to_string()).is_retryable());
        assert!(VectorStoreError::UpsertError("Connection reset".to_string()).is_retryable());
        assert!(!VectorStoreError::UpsertError("bad vector".to_string()).is_retryable());
        assert!(!VectorStoreError::StorageError("disk full".to_string()).is_retryable());
    }

    #[test]
    fn test_empty_collection_message() {
        let err = QueryError::EmptyCollection("pdf_collection".to_string());
        assert_eq!(
            err.to_string(),
            "collection 'pdf_collection' has no indexed segments"
        );
    }
}
