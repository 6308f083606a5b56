//! Retrieval and answer models.

use serde::{Deserialize, Serialize};

use super::document::Segment;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A segment returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSegment {
    pub segment: Segment,

    /// Similarity score, higher is closer.
    pub score: f32,
}

/// State of a single question: what was asked, what was found, what was answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySession {
    pub question: String,
    pub retrieved: Vec<RetrievedSegment>,
    pub answer: String,
    pub duration_ms: u64,
}

impl QuerySession {
    /// Distinct page numbers of the retrieved segments, in retrieval order.
    pub fn source_pages(&self) -> Vec<u32> {
        let mut pages = Vec::new();
        for hit in &self.retrieved {
            let page = hit.segment.metadata.page;
            if !pages.contains(&page) {
                pages.push(page);
            }
        }
        pages
    }
}
