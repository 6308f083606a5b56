//! Text processing utilities.

use regex::Regex;
use std::sync::LazyLock;

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));

static TRAILING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m) +$").expect("valid regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Tidy text extracted from a PDF page.
///
/// Collapses runs of spaces and tabs, strips trailing spaces, keeps at most one
/// blank line between paragraphs and trims the ends. Line breaks are preserved.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = TRAILING_SPACE.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace("   \n\n   "), "");
        assert_eq!(normalize_whitespace("a  \t b"), "a b");
        assert_eq!(
            normalize_whitespace("line one   \r\nline two\n\n\n\n\nnext"),
            "line one\nline two\n\nnext"
        );
    }
}
