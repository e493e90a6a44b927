//! Text helpers shared by the pipeline stages

/// Maximum length of a claim or restated statement, in characters
pub const MAX_STATEMENT_CHARS: usize = 500;

/// Return the first `max_chars` characters of `text`
///
/// Cuts on a char boundary, so multi-byte input never splits a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
