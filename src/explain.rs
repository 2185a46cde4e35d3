use std::collections::BTreeSet;

use serde::Serialize;

/// Maximum number of overlap keywords reported per explanation.
pub const MAX_OVERLAP_KEYWORDS: usize = 10;

/// How many keywords the `why_matched` sentence names.
const WHY_MATCHED_KEYWORDS: usize = 5;

/// Small closed set of English function words excluded from overlap
/// computation.
const STOPWORDS: &[&str] = &[
    "the", "is", "in", "and", "of", "a", "an", "to", "for", "on", "with",
    "that", "this", "it", "as", "are", "be", "by", "or", "from", "at", "was",
    "which", "we", "you",
];

/// A human-readable relevance rationale for one (query, document) pair.
///
/// Computed purely from the two texts; independent of the vector score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub why_matched: String,
    /// Alphabetical, at most [`MAX_OVERLAP_KEYWORDS`] entries.
    pub overlap_keywords: Vec<String>,
    pub overlap_ratio: f32,
    pub doc_length_norm: f32,
}

/// Lowercase the text and extract maximal runs of word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Tokenize and drop stopwords.
pub fn keywords(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Length normalization in (0, 1]: shorter documents score closer to 1.
///
/// Uses the unfiltered token count (stopwords included), clamped to a
/// minimum of 1.
pub fn doc_length_norm(doc_text: &str) -> f32 {
    let n = tokenize(doc_text).len().max(1);
    (1.0 / (1.0 + (1.0 + n as f64).ln())) as f32
}

/// Explain why a document matched a query via keyword overlap.
pub fn explain(query: &str, doc_text: &str) -> Explanation {
    let (overlap_keywords, overlap_ratio) = keyword_overlap(query, doc_text);
    let length_norm = doc_length_norm(doc_text);

    let why_matched = if overlap_keywords.is_empty() {
        "Matched by semantic similarity (no exact keyword overlap)."
            .to_string()
    } else {
        let named: Vec<&str> = overlap_keywords
            .iter()
            .take(WHY_MATCHED_KEYWORDS)
            .map(String::as_str)
            .collect();
        format!(
            "Matched because query keywords {} appear in the document.",
            named.join(", ")
        )
    };

    Explanation {
        why_matched,
        overlap_keywords,
        overlap_ratio: round4(overlap_ratio),
        doc_length_norm: round4(length_norm),
    }
}

/// Intersection of the filtered keyword sets, alphabetical and truncated,
/// plus the ratio of the intersection to the query keyword set.
///
/// An empty filtered query yields `([], 0.0)`, never a division by zero.
fn keyword_overlap(query: &str, doc_text: &str) -> (Vec<String>, f32) {
    let query_set: BTreeSet<String> = keywords(query).into_iter().collect();
    if query_set.is_empty() {
        return (Vec::new(), 0.0);
    }
    let doc_set: BTreeSet<String> = keywords(doc_text).into_iter().collect();

    let overlap: Vec<String> =
        query_set.intersection(&doc_set).cloned().collect();
    let ratio = overlap.len() as f32 / query_set.len() as f32;

    let truncated =
        overlap.into_iter().take(MAX_OVERLAP_KEYWORDS).collect();
    (truncated, ratio)
}

/// Round to 4 decimal digits for presentation stability.
pub fn round4(value: f32) -> f32 {
    ((f64::from(value) * 10_000.0).round() / 10_000.0) as f32
}
