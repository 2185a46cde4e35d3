use crate::search::SearchCandidate;

/// Deterministically order candidates by score descending and truncate to
/// `top_k`.
///
/// The index already returns similarity-ordered results for exact search;
/// this stage guards against any future candidate source handing results
/// out of order and enforces the single truncation point. Equal scores are
/// tie-broken by doc_id ascending, so repeated queries over an unchanged
/// index are reproducible regardless of input order.
pub fn rerank(
    mut candidates: Vec<SearchCandidate>,
    top_k: usize,
) -> Vec<SearchCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    candidates.truncate(top_k);
    candidates
}
