/// Default window size, in characters, for one completion prompt
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Fixed-width text chunker
///
/// Splits text into consecutive, non-overlapping windows of `width`
/// characters. The last window may be shorter. There is no sentence or
/// word awareness, so a chunk may end mid-word; windows always end on a
/// character boundary.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthChunker {
    width: usize,
}

impl FixedWidthChunker {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn chunk<'a>(&self, text: &'a str) -> Vec<&'a str> {
        chunk_text(text, self.width)
    }
}

impl Default for FixedWidthChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

/// Slice `text` into windows of `width` characters.
///
/// Empty text yields no chunks. A width of zero disables splitting.
pub fn chunk_text(text: &str, width: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if width == 0 {
        return vec![text];
    }

    let mut chunks = Vec::with_capacity(text.len() / width + 1);
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == width {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);

    log::debug!("Split {} chars into {} chunks of width {}", text.chars().count(), chunks.len(), width);

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 10).is_empty());
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = chunk_text("abcdef", 3);
        assert_eq!(chunks, vec!["abc", "def"]);
    }

    #[test]
    fn test_last_chunk_shorter() {
        let chunks = chunk_text("abcdefg", 3);
        assert_eq!(chunks, vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_splits_mid_word() {
        let chunks = chunk_text("hello world", 4);
        assert_eq!(chunks, vec!["hell", "o wo", "rld"]);
    }

    #[test]
    fn test_lossless_partition() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n".repeat(97);
        for width in [1, 7, 64, 4096, 100_000] {
            let chunks = chunk_text(&text, width);
            assert_eq!(chunks.concat(), text);

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.chars().count() == width));
            assert!(last.chars().count() <= width);
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "héllo wörld ñ";
        let chunks = chunk_text(text, 5);
        assert_eq!(chunks, vec!["héllo", " wörl", "d ñ"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_zero_width_keeps_text_whole() {
        assert_eq!(chunk_text("abc", 0), vec!["abc"]);
    }

    #[test]
    fn test_default_width_on_10000_chars() {
        let text = "x".repeat(10_000);
        let chunker = FixedWidthChunker::default();
        let lengths: Vec<usize> = chunker.chunk(&text).iter().map(|c| c.len()).collect();
        assert_eq!(lengths, vec![4096, 4096, 1808]);
    }
}
