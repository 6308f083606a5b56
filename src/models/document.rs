use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Raw metadata as produced by the document parser.
///
/// Kept untyped so that missing, null or malformed fields survive until
/// normalization decides how to read them.
pub type RawMetadata = Map<String, Value>;

/// One parsed unit of a source file (a PDF page, or a whole text file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: RawMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: RawMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Document with `{source, loc: {pageNumber}}` metadata, the shape the PDF parser emits.
    pub fn page(content: impl Into<String>, source: impl Into<String>, page_number: u32) -> Self {
        let mut metadata = RawMetadata::new();
        metadata.insert("source".to_string(), Value::String(source.into()));
        metadata.insert("loc".to_string(), json!({ "pageNumber": page_number }));
        Self::new(content, metadata)
    }

    /// Number of characters (not bytes) in the content.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Splitter output: a window of a document before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub content: String,
    /// Character offset of the first character within the document.
    pub start_offset: usize,
    /// Character offset one past the last character.
    pub end_offset: usize,
    pub metadata: RawMetadata,
}

impl RawSegment {
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub source: String,
    pub page: u32,
}

impl Default for SegmentMetadata {
    fn default() -> Self {
        Self {
            source: UNKNOWN_SOURCE.to_string(),
            page: 0,
        }
    }
}

pub const UNKNOWN_SOURCE: &str = "unknown";

/// A normalized segment, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub content: String,
    pub metadata: SegmentMetadata,
}

impl Segment {
    pub fn sequential_id(index: usize) -> String {
        format!("doc_{index}")
    }
}

/// A segment paired with its embedding, ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedSegment {
    pub segment: Segment,
    pub vector: Vec<f32>,
}
