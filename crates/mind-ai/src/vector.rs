//! Weighted term vectors and cosine similarity.

use std::collections::BTreeMap;

/// A sparse vector of term weights with a precomputed L2 norm.
///
/// Terms are kept ordered so that sums over the vector are evaluated in the
/// same order for equal content, making equal documents score bit-identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: BTreeMap<String, f64>,
    norm: f64,
}

impl TermVector {
    /// Builds a vector, dropping non-positive weights.
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let weights: BTreeMap<String, f64> = weights
            .into_iter()
            .filter(|(_, weight)| *weight > 0.0)
            .collect();
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();

        Self { weights, norm }
    }

    /// Weight of a term, 0.0 if absent.
    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    /// The L2 norm (magnitude) of the vector.
    pub fn magnitude(&self) -> f64 {
        self.norm
    }

    /// Number of terms with positive weight.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Checks if the vector is empty (no terms with positive weight).
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Computes the dot product with another vector.
    ///
    /// Iterates the smaller vector and probes the larger one.
    pub fn dot(&self, other: &TermVector) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        small
            .weights
            .iter()
            .filter_map(|(term, weight)| large.weights.get(term).map(|w| weight * w))
            .sum()
    }

    /// Computes cosine similarity with another vector.
    ///
    /// Returns 0.0 if either vector has zero magnitude.
    pub fn cosine_similarity(&self, other: &TermVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }

        self.dot(other) / (self.norm * other.norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> TermVector {
        TermVector::from_weights(pairs.iter().map(|(t, w)| (t.to_string(), *w)))
    }

    #[test]
    fn magnitude_and_weight() {
        let v = vector(&[("cat", 3.0), ("dog", 4.0)]);
        assert!((v.magnitude() - 5.0).abs() < 1e-12);
        assert_eq!(v.weight("cat"), 3.0);
        assert_eq!(v.weight("bird"), 0.0);
    }

    #[test]
    fn non_positive_weights_dropped() {
        let v = vector(&[("cat", 1.0), ("dog", 0.0), ("bird", -1.0)]);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn cosine_similarity_identical() {
        let v1 = vector(&[("cat", 1.0), ("dog", 2.0)]);
        let v2 = vector(&[("cat", 1.0), ("dog", 2.0)]);
        assert!((v1.cosine_similarity(&v2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let v1 = vector(&[("cat", 1.0)]);
        let v2 = vector(&[("dog", 1.0)]);
        assert_eq!(v1.cosine_similarity(&v2), 0.0);
    }

    #[test]
    fn cosine_similarity_symmetric() {
        let v1 = vector(&[("cat", 1.0), ("dog", 2.0), ("fish", 0.5)]);
        let v2 = vector(&[("cat", 3.0), ("fish", 1.0)]);
        assert_eq!(v1.cosine_similarity(&v2), v2.cosine_similarity(&v1));
    }

    #[test]
    fn cosine_similarity_empty() {
        let empty = TermVector::default();
        let v = vector(&[("cat", 1.0)]);
        assert_eq!(empty.cosine_similarity(&v), 0.0);
        assert_eq!(empty.cosine_similarity(&empty), 0.0);
    }
}
