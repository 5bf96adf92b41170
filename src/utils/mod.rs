//! Utility functions and helpers.

pub mod http;

use unicode_segmentation::UnicodeSegmentation;

/// Number of user-perceived characters in `text`.
pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Trim `text`, returning `None` when nothing is left.
pub fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grapheme_len_counts_clusters() {
        assert_eq!(grapheme_len("abc"), 3);
        assert_eq!(grapheme_len("é"), 1);
        assert_eq!(grapheme_len("e\u{301}"), 1);
        assert_eq!(grapheme_len(""), 0);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  dune "), Some("dune"));
        assert_eq!(non_blank(" \t"), None);
    }
}
