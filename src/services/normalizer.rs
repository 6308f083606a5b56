//! Segment identity and provenance normalization.

use serde_json::Value;

use crate::models::{RawMetadata, RawSegment, Segment, SegmentMetadata, UNKNOWN_SOURCE};

/// Assign `doc_<index>` ids and coerce raw parser metadata into `{source, page}`.
///
/// Ids are positional and therefore only unique within one ingestion run.
pub fn normalize(raw_segments: &[RawSegment]) -> Vec<Segment> {
    raw_segments
        .iter()
        .enumerate()
        .map(|(index, raw)| Segment {
            id: Segment::sequential_id(index),
            content: raw.content.clone(),
            metadata: normalize_metadata(&raw.metadata),
        })
        .collect()
}

pub fn normalize_metadata(metadata: &RawMetadata) -> SegmentMetadata {
    SegmentMetadata {
        source: coerce_source(metadata.get("source")),
        page: coerce_page(page_value(metadata)),
    }
}

/// `loc.pageNumber` as emitted by the parser, else a flat `page` key.
fn page_value(metadata: &RawMetadata) -> Option<&Value> {
    metadata
        .get("loc")
        .and_then(|loc| loc.get("pageNumber"))
        .filter(|v| !v.is_null())
        .or_else(|| metadata.get("page"))
}

fn coerce_source(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => UNKNOWN_SOURCE.to_string(),
    }
}

fn coerce_page(value: Option<&Value>) -> u32 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n >= 0.0 => n.trunc().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}
