//! Splitting outbound text into channel-sized fragments.

/// Split `text` into ordered fragments of at most `max_chars` characters
/// each, respecting UTF-8 character boundaries. `max_chars == 0` disables
/// chunking (returns `text` whole).
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(chunk_text("hello", 100), vec!["hello".to_string()]);
    }

    #[test]
    fn long_text_is_split_in_order() {
        let chunks = chunk_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn zero_max_chars_disables_chunking() {
        assert_eq!(chunk_text("abcdefghij", 0), vec!["abcdefghij".to_string()]);
    }

    #[test]
    fn chunking_respects_utf8_boundaries() {
        let text = "h\u{e9}llo world this is longer";
        let chunks = chunk_text(text, 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.concat(), text);
    }
}
