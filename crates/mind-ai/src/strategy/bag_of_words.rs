//! Bag-of-words associations assessment.
//!
//! Every document is a vector of raw term counts (name and body together);
//! relatedness is the cosine of the angle between two such vectors. Identical
//! documents score 1.0, documents with disjoint vocabularies score 0.0.

use mind_core::AaAlgorithm;

use super::RankingStrategy;
use crate::cache::TokenCache;
use crate::index::{CorpusStats, WordFrequencyIndex};
use crate::vector::TermVector;

/// Cosine similarity over term-count vectors.
#[derive(Debug, Default)]
pub struct BagOfWordsRanking {
    cache: TokenCache,
}

impl BagOfWordsRanking {
    /// Creates the strategy with an empty token cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RankingStrategy for BagOfWordsRanking {
    fn algorithm(&self) -> AaAlgorithm {
        AaAlgorithm::BagOfWords
    }

    fn cache(&self) -> &TokenCache {
        &self.cache
    }

    fn weigh(
        &self,
        index: &WordFrequencyIndex,
        _title: &WordFrequencyIndex,
        _stats: &CorpusStats,
    ) -> TermVector {
        TermVector::from_weights(
            index
                .iter()
                .map(|(term, count)| (term.to_string(), f64::from(count))),
        )
    }
}
