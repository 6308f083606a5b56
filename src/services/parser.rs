//! Document loading: PDF pages via `lopdf`, plain text as a single document.

use std::path::Path;

use lopdf::Document as PdfDocument;
use tracing::{debug, info, warn};

use crate::error::ParseError;
use crate::models::Document;
use crate::utils::file::{DocumentKind, check_file_size, detect_kind, source_name};
use crate::utils::text::normalize_whitespace;

/// Load `path` into one [`Document`] per PDF page, or a single document for text files.
///
/// PDF pages carry `{source, loc: {pageNumber}}` metadata with 1-based page numbers.
/// Pages without extractable text are skipped. Text files carry only `source`.
pub fn load_document(path: &Path, max_size: u64) -> Result<Vec<Document>, ParseError> {
    if !path.exists() {
        return Err(ParseError::NotFound(path.display().to_string()));
    }

    let size = check_file_size(path, max_size).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => ParseError::TooLarge {
            size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            max: max_size,
        },
        _ => ParseError::Io(e),
    })?;

    let source = source_name(path);
    debug!(path = %path.display(), size, "loading document");

    let documents = match detect_kind(path) {
        Some(DocumentKind::Pdf) => load_pdf(path, &source)?,
        Some(DocumentKind::Text) => load_text(path, &source)?,
        None => return Err(ParseError::Unsupported(path.display().to_string())),
    };

    info!(source = %source, pages = documents.len(), "loaded document");
    Ok(documents)
}

fn load_pdf(path: &Path, source: &str) -> Result<Vec<Document>, ParseError> {
    let pdf = PdfDocument::load(path).map_err(|e| ParseError::Pdf(e.to_string()))?;

    if pdf.is_encrypted() {
        return Err(ParseError::Encrypted(source.to_string()));
    }

    let mut documents = Vec::new();
    for page_number in pdf.get_pages().into_keys() {
        let text = match pdf.extract_text(&[page_number]) {
            Ok(text) => normalize_whitespace(&text),
            Err(e) => {
                warn!(page = page_number, error = %e, "skipping unreadable page");
                continue;
            }
        };

        if text.is_empty() {
            debug!(page = page_number, "skipping page without text");
            continue;
        }

        documents.push(Document::page(text, source, page_number));
    }

    if documents.is_empty() {
        return Err(ParseError::NoText(source.to_string()));
    }

    Ok(documents)
}

fn load_text(path: &Path, source: &str) -> Result<Vec<Document>, ParseError> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    if content.trim().is_empty() {
        return Err(ParseError::NoText(source.to_string()));
    }

    let mut metadata = serde_json::Map::new();
    metadata.insert("source".to_string(), source.into());
    Ok(vec![Document::new(content.into_owned(), metadata)])
}
