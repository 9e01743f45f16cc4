//! Approximate token counting for extracted text.

/// Whitespace-delimited word count. Deterministic, so re-extracting the same
/// file always reports the same count.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}
