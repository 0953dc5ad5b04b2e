//! Vector similarity.

/// Cosine similarity in `[-1.0, 1.0]`. Zero-magnitude vectors score 0.0.
///
/// Callers are expected to compare vectors of equal dimension; extra
/// components of the longer vector are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn parallel_vectors_score_one() {
        assert!(close(cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0));
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!(close(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        assert!(close(cosine_similarity(&[1.0, -1.0], &[-1.0, 1.0]), -1.0));
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
