//! File utilities for document loading.

use std::fs;
use std::io::Read;
use std::path::Path;

/// How a document on disk should be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

/// Classify a file by extension, falling back to sniffing its first bytes.
///
/// Returns `None` for files that are neither PDF nor text.
pub fn detect_kind(path: &Path) -> Option<DocumentKind> {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if ext == "pdf" {
            return Some(DocumentKind::Pdf);
        }
        if is_binary_extension(&ext) {
            return None;
        }
        if is_text_extension(&ext) {
            return Some(DocumentKind::Text);
        }
    }

    let mut buffer = [0u8; 512];
    let n = fs::File::open(path)
        .and_then(|mut file| file.read(&mut buffer))
        .ok()?;
    let head = &buffer[..n];

    if head.starts_with(b"%PDF-") {
        Some(DocumentKind::Pdf)
    } else if head.contains(&0) {
        None
    } else {
        Some(DocumentKind::Text)
    }
}

/// Size of the file in bytes, failing if it exceeds `max_size`.
pub fn check_file_size(path: &Path, max_size: u64) -> std::io::Result<u64> {
    let size = fs::metadata(path)?.len();
    if size > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("file exceeds maximum size: {} > {}", size, max_size),
        ));
    }
    Ok(size)
}

/// Human-readable name of the document used as its `source` metadata.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "exe"
            | "dll"
            | "so"
            | "dylib"
            | "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "bmp"
            | "webp"
            | "mp3"
            | "mp4"
            | "wav"
            | "zip"
            | "tar"
            | "gz"
            | "7z"
            | "doc"
            | "docx"
            | "xls"
            | "xlsx"
            | "ppt"
            | "pptx"
            | "db"
            | "sqlite"
            | "bin"
    )
}

fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        "txt" | "md" | "markdown" | "rst" | "adoc" | "org" | "csv" | "tsv" | "json" | "yaml"
            | "yml" | "toml" | "xml" | "html" | "htm" | "log"
    )
}
