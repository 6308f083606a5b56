//! Overlapping fixed-size text segmentation.

use crate::error::ConfigError;
use crate::models::{BoundaryPolicy, ChunkingConfig, Document, RawSegment};

/// Splits document text into overlapping segments of at most `chunk_size` characters.
///
/// Consecutive segment starts are exactly `chunk_size - chunk_overlap` characters apart,
/// so the segments cover the whole text without gaps.
#[derive(Debug, Clone)]
pub struct SegmentSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    boundary: BoundaryPolicy,
}

impl SegmentSplitter {
    /// Create a splitter, rejecting parameters that cannot make forward progress.
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        boundary: BoundaryPolicy,
    ) -> Result<Self, ConfigError> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
            boundary,
            ..Default::default()
        }
        .validate()?;

        Ok(Self {
            chunk_size,
            chunk_overlap,
            boundary,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size, config.chunk_overlap, config.boundary)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Distance between the starts of two consecutive segments.
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Lazily split one document. Cloning the iterator, or calling `split` again,
    /// restarts from the first segment.
    pub fn split<'a>(&'a self, document: &'a Document) -> Segments<'a> {
        let chars: Vec<char> = document.content.chars().collect();
        let next_start = if chars.is_empty() { None } else { Some(0) };
        Segments {
            splitter: self,
            document,
            chars,
            next_start,
        }
    }

    /// Split every document in order, concatenating the results.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<RawSegment> {
        documents.iter().flat_map(|doc| self.split(doc)).collect()
    }

    /// Find a natural break point near the target end position.
    ///
    /// Never returns a position before `floor`, so the next segment (which starts at
    /// `floor`) still touches this one.
    fn find_break_point(&self, chars: &[char], floor: usize, target_end: usize) -> usize {
        if target_end >= chars.len() {
            return chars.len();
        }

        // Look in the last 20% of the window
        let search_start = target_end
            .saturating_sub(self.chunk_size / 5)
            .max(floor);
        if search_start >= target_end {
            return target_end;
        }
        let search_range = &chars[search_start..target_end];

        // Priority: double newline > single newline > sentence end > space
        let mut best_break = None;
        let mut last_newline = None;
        let mut last_sentence = None;
        let mut last_space = None;

        for (i, c) in search_range.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && search_range[i - 1] == '\n' {
                        best_break = Some(pos + 1);
                    }
                    last_newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    // Sentence end followed by whitespace; the follower may sit just past the window
                    if chars.get(pos + 1).is_some_and(|c| c.is_whitespace()) {
                        last_sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => {
                    last_space = Some(pos + 1);
                }
                _ => {}
            }
        }

        best_break
            .or(last_newline)
            .or(last_sentence)
            .or(last_space)
            .unwrap_or(target_end)
    }
}

/// Iterator over the segments of one document.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    splitter: &'a SegmentSplitter,
    document: &'a Document,
    chars: Vec<char>,
    next_start: Option<usize>,
}

impl Iterator for Segments<'_> {
    type Item = RawSegment;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let total = self.chars.len();
        let step = self.splitter.step();
        let target_end = (start + self.splitter.chunk_size).min(total);

        let end = match self.splitter.boundary {
            BoundaryPolicy::Fixed => target_end,
            BoundaryPolicy::Natural => {
                self.splitter
                    .find_break_point(&self.chars, start + step, target_end)
            }
        };

        self.next_start = if end >= total {
            None
        } else {
            Some(start + step)
        };

        Some(RawSegment {
            content: self.chars[start..end].iter().collect(),
            start_offset: start,
            end_offset: end,
            metadata: self.document.metadata.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMetadata;
    use proptest::prelude::*;

    fn doc(content: &str) -> Document {
        Document::new(content, RawMetadata::new())
    }

    fn fixed(size: usize, overlap: usize) -> SegmentSplitter {
        SegmentSplitter::new(size, overlap, BoundaryPolicy::Fixed).unwrap()
    }

    fn alphabet_text(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(matches!(
            SegmentSplitter::new(100, 100, BoundaryPolicy::Fixed),
            Err(ConfigError::Validation(_))
        ));
        assert!(SegmentSplitter::new(100, 150, BoundaryPolicy::Fixed).is_err());
        assert!(SegmentSplitter::new(0, 0, BoundaryPolicy::Fixed).is_err());
        assert!(SegmentSplitter::new(1, 0, BoundaryPolicy::Fixed).is_ok());
    }

    #[test]
    fn test_empty_document() {
        let splitter = fixed(500, 200);
        let document = doc("");
        assert_eq!(splitter.split(&document).count(), 0);
    }

    #[test]
    fn test_small_document_single_segment() {
        let splitter = fixed(500, 200);
        let document = doc("Hello, world!");
        let segments: Vec<_> = splitter.split(&document).collect();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, "Hello, world!");
        assert_eq!(segments[0].start_offset, 0);
        assert_eq!(segments[0].end_offset, 13);
    }

    #[test]
    fn test_default_sizes_offsets_and_lengths() {
        let splitter = fixed(500, 200);

        let document = doc(&alphabet_text(900));
        let segments: Vec<_> = splitter.split(&document).collect();
        let starts: Vec<_> = segments.iter().map(|s| s.start_offset).collect();
        let lengths: Vec<_> = segments.iter().map(RawSegment::char_len).collect();
        assert_eq!(starts, vec![0, 300, 600]);
        assert_eq!(lengths, vec![500, 500, 300]);

        let document = doc(&alphabet_text(1200));
        let segments: Vec<_> = splitter.split(&document).collect();
        let starts: Vec<_> = segments.iter().map(|s| s.start_offset).collect();
        let lengths: Vec<_> = segments.iter().map(RawSegment::char_len).collect();
        assert_eq!(starts, vec![0, 300, 600, 900]);
        assert_eq!(lengths, vec![500, 500, 500, 300]);
    }

    #[test]
    fn test_exact_fit_does_not_emit_trailing_overlap_segment() {
        let splitter = fixed(500, 200);
        let document = doc(&alphabet_text(1100));
        let segments: Vec<_> = splitter.split(&document).collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments.last().unwrap().end_offset, 1100);
    }

    #[test]
    fn test_offsets_are_characters_not_bytes() {
        let splitter = fixed(4, 1);
        let document = doc("ééééééé");
        let segments: Vec<_> = splitter.split(&document).collect();
        assert_eq!(segments[0].content, "éééé");
        assert_eq!(segments[1].start_offset, 3);
        assert_eq!(segments[1].content, "éééé");
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_split_is_restartable() {
        let splitter = fixed(10, 3);
        let document = doc(&alphabet_text(45));
        let mut iter = splitter.split(&document);
        let first = iter.next().unwrap();
        let rest_again = iter.clone();
        assert_eq!(iter.count(), rest_again.count());

        let again: Vec<_> = splitter.split(&document).collect();
        assert_eq!(again[0], first);
    }

    #[test]
    fn test_metadata_copied_from_document() {
        let splitter = fixed(5, 1);
        let document = Document::page("abcdefghij", "guide.pdf", 7);
        for segment in splitter.split(&document) {
            assert_eq!(segment.metadata, document.metadata);
        }
    }

    #[test]
    fn test_split_documents_keeps_page_order() {
        let splitter = fixed(5, 0);
        let pages = vec![
            Document::page("aaaaabbbbb", "x.pdf", 1),
            Document::page("ccccc", "x.pdf", 2),
        ];
        let segments = splitter.split_documents(&pages);
        let contents: Vec<_> = segments.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["aaaaa", "bbbbb", "ccccc"]);
        assert_eq!(segments[2].metadata["loc"]["pageNumber"], 2);
    }

    #[test]
    fn test_natural_breaks_prefer_paragraphs() {
        let splitter = SegmentSplitter::new(50, 10, BoundaryPolicy::Natural).unwrap();
        let text = format!("{}\n\n{}", "a".repeat(44), "b".repeat(60));
        let document = doc(&text);
        let segments: Vec<_> = splitter.split(&document).collect();
        assert_eq!(segments[0].content, format!("{}\n\n", "a".repeat(44)));
    }

    #[test]
    fn test_natural_breaks_fall_back_to_words() {
        let splitter = SegmentSplitter::new(20, 5, BoundaryPolicy::Natural).unwrap();
        let document = doc("the quick brown fox jumps over the lazy dog");
        let first = splitter.split(&document).next().unwrap();
        assert_eq!(first.content, "the quick brown fox ");
    }

    #[test]
    fn test_natural_breaks_need_overlap() {
        let text = "one two three four five six seven eight nine ten";
        let natural = SegmentSplitter::new(20, 0, BoundaryPolicy::Natural).unwrap();
        let fixed = SegmentSplitter::new(20, 0, BoundaryPolicy::Fixed).unwrap();

        let natural: Vec<_> = natural.split(&doc(text)).map(|s| s.end_offset).collect();
        let fixed: Vec<_> = fixed.split(&doc(text)).map(|s| s.end_offset).collect();
        assert_eq!(natural, fixed);

        let overlapping = SegmentSplitter::new(20, 8, BoundaryPolicy::Natural).unwrap();
        let first = overlapping.split(&doc(text)).next().unwrap();
        assert_eq!(first.content, "one two three four ");
    }

    #[test]
    fn test_natural_breaks_hard_cut_without_whitespace() {
        let splitter = SegmentSplitter::new(20, 5, BoundaryPolicy::Natural).unwrap();
        let document = doc(&alphabet_text(50));
        let first = splitter.split(&document).next().unwrap();
        assert_eq!(first.char_len(), 20);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn fixed_segments_cover_text_without_gaps(
            len in 0usize..2000,
            size in 1usize..300,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let overlap = ((size as f64) * overlap_ratio) as usize;
            prop_assume!(overlap < size);
            let splitter = fixed(size, overlap);
            let document = doc(&alphabet_text(len));
            let segments: Vec<_> = splitter.split(&document).collect();

            if len == 0 {
                prop_assert!(segments.is_empty());
            } else {
                prop_assert_eq!(segments[0].start_offset, 0);
                prop_assert_eq!(segments.last().unwrap().end_offset, len);
                for pair in segments.windows(2) {
                    prop_assert!(pair[1].start_offset <= pair[0].end_offset);
                    prop_assert_eq!(pair[1].start_offset - pair[0].start_offset, size - overlap);
                }
                for segment in &segments[..segments.len() - 1] {
                    prop_assert_eq!(segment.char_len(), size);
                }
                prop_assert!(segments.last().unwrap().char_len() <= size);
            }
        }

        #[test]
        fn fixed_adjacent_segments_share_overlap(
            len in 1usize..1500,
            size in 2usize..200,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let overlap = ((size as f64) * overlap_ratio) as usize;
            prop_assume!(overlap > 0 && overlap < size);
            let splitter = fixed(size, overlap);
            let document = doc(&alphabet_text(len));
            let segments: Vec<_> = splitter.split(&document).collect();

            for pair in segments.windows(2) {
                if pair[0].char_len() == size && pair[1].char_len() == size {
                    let tail: String = pair[0].content.chars().skip(size - overlap).collect();
                    let head: String = pair[1].content.chars().take(overlap).collect();
                    prop_assert_eq!(tail, head);
                }
            }
        }

        #[test]
        fn natural_segments_never_exceed_size_or_leave_gaps(
            words in proptest::collection::vec("[a-z]{1,12}[.!?]?", 0..300),
            size in 5usize..200,
            overlap_ratio in 0.0f64..0.9,
        ) {
            let overlap = ((size as f64) * overlap_ratio) as usize;
            prop_assume!(overlap < size);
            let text = words.join(" ");
            let len = text.chars().count();
            let splitter = SegmentSplitter::new(size, overlap, BoundaryPolicy::Natural).unwrap();
            let document = doc(&text);
            let segments: Vec<_> = splitter.split(&document).collect();

            if len > 0 {
                prop_assert_eq!(segments[0].start_offset, 0);
                prop_assert_eq!(segments.last().unwrap().end_offset, len);
            }
            for segment in &segments {
                prop_assert!(segment.char_len() <= size);
                prop_assert!(segment.char_len() > 0);
            }
            for pair in segments.windows(2) {
                prop_assert!(pair[1].start_offset <= pair[0].end_offset);
            }
        }
    }
}
