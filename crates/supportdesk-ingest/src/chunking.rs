//! Recursive text chunking.
//!
//! Splits on paragraph breaks first, then lines, sentences, words, and finally
//! hard character boundaries, so chunks follow document structure when they can.

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap carried from the end of the previous chunk.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A text chunk with its byte range in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
    pub start_char: usize,
    pub end_char: usize,
}

/// Recursive chunker that respects document structure.
pub struct RecursiveChunker {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size / 2),
            separators: vec!["\n\n", "\n", ". ", " ", ""],
        }
    }

    /// Split `text` into chunks. Every chunk's `text` equals
    /// `text[start_char..end_char]`; consecutive chunks overlap by up to
    /// `chunk_overlap` bytes.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let raw_chunks = self.split_text(text, &self.separators);
        let mut result: Vec<TextChunk> = Vec::new();
        let mut cursor = 0usize;

        for raw in &raw_chunks {
            if raw.trim().is_empty() {
                continue;
            }
            let start = text[cursor..]
                .find(raw.as_str())
                .map(|i| cursor + i)
                .unwrap_or(cursor);
            let end = start + raw.len();
            cursor = end;

            let start = match result.last() {
                Some(prev) => {
                    let wanted = start.saturating_sub(self.chunk_overlap).max(prev.start_char + 1);
                    floor_char_boundary(text, wanted.min(start))
                }
                None => start,
            };

            result.push(TextChunk {
                text: text[start..end].to_string(),
                chunk_index: result.len(),
                start_char: start,
                end_char: end,
            });
        }
        result
    }

    fn split_text(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some((&separator, remaining)) = separators.split_first() else {
            return vec![text.to_string()];
        };

        if separator.is_empty() {
            return self.hard_split(text);
        }

        let mut chunks = Vec::new();
        let mut current_parts: Vec<&str> = Vec::new();
        let mut current_size = 0usize;

        for split in text.split(separator) {
            let split_size = split.len();

            if split_size > self.chunk_size {
                if !current_parts.is_empty() {
                    chunks.push(current_parts.join(separator));
                    current_parts.clear();
                    current_size = 0;
                }
                chunks.extend(self.split_text(split, remaining));
            } else if current_size + split_size + separator.len() > self.chunk_size
                && !current_parts.is_empty()
            {
                chunks.push(current_parts.join(separator));
                current_parts = vec![split];
                current_size = split_size;
            } else {
                current_parts.push(split);
                current_size += split_size + separator.len();
            }
        }

        if !current_parts.is_empty() {
            chunks.push(current_parts.join(separator));
        }

        chunks
    }

    /// Last resort: cut at `chunk_size` bytes, backing off to a char boundary.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let mut end = floor_char_boundary(text, (start + self.chunk_size).min(text.len()));
            if end <= start {
                // Single char wider than chunk_size
                end = text[start..]
                    .char_indices()
                    .nth(1)
                    .map(|(i, _)| start + i)
                    .unwrap_or(text.len());
            }
            pieces.push(text[start..end].to_string());
            start = end;
        }
        pieces
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = RecursiveChunker::default();
        let chunks = chunker.chunk("Hello, world!");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!((chunks[0].start_char, chunks[0].end_char), (0, 13));
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(RecursiveChunker::default().chunk("  \n\n ").is_empty());
    }

    #[test]
    fn test_long_text_splits_on_paragraphs() {
        let para = "Our support team answers tickets within one business day. ".repeat(5);
        let text = vec![para.trim(); 6].join("\n\n");
        let chunker = RecursiveChunker::new(400, 50);
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(chunk.text, &text[chunk.start_char..chunk.end_char]);
            assert!(chunk.text.len() <= 400 + 50);
        }
        assert_eq!(chunks.last().map(|c| c.end_char), Some(text.len()));
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = "word ".repeat(200);
        let chunks = RecursiveChunker::new(100, 20).chunk(&text);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            assert!(pair[1].start_char < pair[0].end_char);
            assert!(pair[1].start_char > pair[0].start_char);
        }
    }

    #[test]
    fn test_hard_split_respects_char_boundaries() {
        let text = "ü".repeat(300);
        let chunks = RecursiveChunker::new(101, 10).chunk(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().all(|c| c == 'ü'));
        }
    }
}
