//! Similarity scoring and top-K ranking over stored entries.
//!
//! Scores are the **unnormalized** dot product of the query and entry
//! vectors, so the meaning of a similarity threshold depends on the vector
//! magnitudes. Providers such as OpenAI return unit-length vectors, where the
//! dot product equals cosine similarity; for anything else call
//! [`normalize`] on both sides first if cosine semantics are wanted.

use std::cmp::Ordering;

use tracing::warn;

use crate::document::{QueryResult, StoredEntry};

/// Dot product over the first `min(a.len(), b.len())` components.
///
/// Vectors of different lengths are compared on their common prefix rather
/// than rejected.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale `vector` to unit L2 length in place. Zero vectors are left as is.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Score every entry in `corpus` against `query` and return the best matches.
///
/// Results are ordered by descending similarity, exclude any entry whose
/// similarity is not strictly greater than `threshold`, and hold at most
/// `top_k` items. Entries with equal scores keep their corpus order.
pub fn rank(
    query: &[f32],
    corpus: &[StoredEntry],
    threshold: f32,
    top_k: usize,
) -> Vec<QueryResult> {
    let mut scored: Vec<QueryResult> = corpus
        .iter()
        .filter_map(|entry| {
            if entry.vector.len() != query.len() {
                warn!(
                    entry.title = %entry.title,
                    entry_dims = entry.vector.len(),
                    query_dims = query.len(),
                    "vector length mismatch, scoring common prefix"
                );
            }
            let similarity = dot_product(query, &entry.vector);
            (similarity > threshold).then(|| QueryResult {
                title: entry.title.clone(),
                content: entry.content.clone(),
                similarity,
            })
        })
        .collect();

    // `sort_by` is stable, so ties (including -0.0 vs 0.0) keep corpus order.
    // NaN never passes the threshold filter.
    scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, vector: Vec<f32>) -> StoredEntry {
        StoredEntry { title: title.to_string(), content: format!("{title} text"), vector }
    }

    #[test]
    fn returns_top_k_above_threshold_in_descending_order() {
        let query = [1.0, 0.0];
        let corpus = [
            entry("one", vec![0.5, 3.0]),
            entry("two", vec![0.9, -1.0]),
            entry("three", vec![0.2, 0.0]),
        ];

        let results = rank(&query, &corpus, 0.3, 2);

        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["two", "one"]);
        assert!((results[0].similarity - 0.9).abs() < 1e-6);
        assert!((results[1].similarity - 0.5).abs() < 1e-6);
        assert_eq!(results[0].content, "two text");
    }

    #[test]
    fn threshold_is_exclusive() {
        let corpus = [entry("at", vec![0.5]), entry("above", vec![0.6])];
        let results = rank(&[1.0], &corpus, 0.5, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "above");
    }

    #[test]
    fn empty_corpus_yields_nothing() {
        assert!(rank(&[1.0, 2.0], &[], 0.0, 5).is_empty());
    }

    #[test]
    fn ties_keep_corpus_order() {
        let corpus =
            [entry("first", vec![1.0]), entry("second", vec![1.0]), entry("third", vec![1.0])];
        let titles: Vec<_> =
            rank(&[1.0], &corpus, 0.0, 3).into_iter().map(|r| r.title).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn signed_zero_scores_tie_in_corpus_order() {
        let corpus = [entry("negative", vec![-0.0]), entry("positive", vec![0.0])];
        let titles: Vec<_> =
            rank(&[1.0], &corpus, -1.0, 2).into_iter().map(|r| r.title).collect();
        assert_eq!(titles, ["negative", "positive"]);
    }

    #[test]
    fn mismatched_lengths_use_common_prefix() {
        assert_eq!(dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0]), 14.0);
        let results = rank(&[1.0, 1.0, 1.0], &[entry("short", vec![2.0])], 0.0, 1);
        assert_eq!(results[0].similarity, 2.0);
    }

    #[test]
    fn normalize_makes_dot_product_cosine() {
        let mut a = vec![3.0, 4.0];
        let mut zero = vec![0.0, 0.0];
        normalize(&mut a);
        normalize(&mut zero);
        assert!((dot_product(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(zero, [0.0, 0.0]);
    }
}
