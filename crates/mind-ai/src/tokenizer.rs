//! Tokenization of note text into normalized terms.
//!
//! Processing steps:
//! 1. Split on Unicode word boundaries
//! 2. Strip punctuation (keep alphanumerics and hyphens)
//! 3. Case-fold
//! 4. Filter by minimum length
//! 5. Remove stop words
//!
//! The implementation is intentionally simple, using only basic string
//! operations rather than stemming or language detection.

use unicode_segmentation::UnicodeSegmentation;

/// Common English stop words filtered from association analysis.
///
/// Kept sorted so membership is a binary search.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Minimum token length in characters (shorter tokens are filtered).
pub const MIN_TOKEN_LENGTH: usize = 2;

/// Tokenizes text into a list of normalized terms, in text order.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(normalize_token)
        .filter(|token| is_term(token))
        .collect()
}

/// Returns true if the token survives length and stop word filtering.
fn is_term(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_LENGTH && !is_stop_word(token)
}

/// Returns true for words too common to carry association signal.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Normalizes a single token by lowercasing and removing non-alphanumeric characters.
fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_lowercase()
}
