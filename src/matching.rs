//! Word-level comparison of profile trait lists.
//!
//! Similarity is deliberately coarse: exact equality or substring
//! containment, nothing else. Inputs are expected to be normalized
//! (lowercased, trimmed) already.

/// Similarity of two identical terms.
pub const EXACT_MATCH: f64 = 1.0;

/// Similarity when one term contains the other.
pub const CONTAINMENT_MATCH: f64 = 0.8;

/// Two terms "closely match" when their similarity exceeds this.
/// Only equality and containment clear it.
pub const CLOSE_MATCH_THRESHOLD: f64 = 0.7;

/// Word-level similarity: 1.0 for identical terms, 0.8 when either
/// contains the other, 0.0 otherwise.
///
/// Short terms match liberally ("art" is contained in "party").
pub fn word_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return EXACT_MATCH;
    }

    if a.contains(b) || b.contains(a) {
        return CONTAINMENT_MATCH;
    }

    0.0
}

/// Whether two terms match at the containment threshold or better.
pub fn closely_matches(a: &str, b: &str) -> bool {
    word_similarity(a, b) > CLOSE_MATCH_THRESHOLD
}

/// Best similarity of `term` against any entry of `candidates`.
fn best_similarity(term: &str, candidates: &[String]) -> f64 {
    candidates
        .iter()
        .map(|c| word_similarity(term, c))
        .fold(0.0, f64::max)
}

/// Score, 0 to 100, how well `list_b` covers `list_a`.
///
/// Each term of `list_a` takes its best match in `list_b`; the result is the
/// mean of those best matches scaled to 100 and rounded. Not symmetric: the
/// mean is over `list_a`. Returns 0 when either list is empty.
pub fn fuzzy_match(list_a: &[String], list_b: &[String]) -> u8 {
    if list_a.is_empty() || list_b.is_empty() {
        return 0;
    }

    let total: f64 = list_a.iter().map(|a| best_similarity(a, list_b)).sum();
    let score = (total / list_a.len() as f64 * 100.0).round();

    score.clamp(0.0, 100.0) as u8
}

/// Terms of `terms` that closely match at least one entry of `against`,
/// in their original order.
pub fn matched_terms(terms: &[String], against: &[String]) -> Vec<String> {
    terms
        .iter()
        .filter(|t| against.iter().any(|a| closely_matches(a, t)))
        .cloned()
        .collect()
}
