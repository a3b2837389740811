//! Embedding similarity. Vectors come from an external model and are not
//! assumed to be normalized.

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector is empty, the lengths differ, either norm
/// is zero, or the result is not finite.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    let sim = dot / denom;
    if sim.is_finite() {
        sim
    } else {
        0.0
    }
}

/// Cosine similarity scaled to 0..=100. Negative similarity counts as no
/// affinity, not a penalty.
pub fn embedding_score(a: &[f64], b: &[f64]) -> u8 {
    let sim = cosine_similarity(a, b).max(0.0);
    (sim * 100.0).round().clamp(0.0, 100.0) as u8
}
