//! Weighted full-text associations assessment.
//!
//! Term counts are scaled by corpus rarity (smoothed idf) and terms from the
//! document name get an extra boost. Terms found in every document weigh
//! little, so associations are driven by shared distinctive vocabulary.

use mind_core::AaAlgorithm;

use super::RankingStrategy;
use crate::cache::TokenCache;
use crate::index::{CorpusStats, WordFrequencyIndex};
use crate::vector::TermVector;

/// Extra weight of a term occurrence in the document name.
pub const NAME_BOOST: f64 = 2.0;

/// Cosine similarity over rarity-weighted, name-boosted vectors.
///
/// `weight(t) = (count(t) + NAME_BOOST * title_count(t)) * idf(t)`
#[derive(Debug, Default)]
pub struct WeightedFullTextRanking {
    cache: TokenCache,
}

impl WeightedFullTextRanking {
    /// Creates the strategy with an empty token cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RankingStrategy for WeightedFullTextRanking {
    fn algorithm(&self) -> AaAlgorithm {
        AaAlgorithm::WeightedFullText
    }

    fn cache(&self) -> &TokenCache {
        &self.cache
    }

    fn weigh(
        &self,
        index: &WordFrequencyIndex,
        title: &WordFrequencyIndex,
        stats: &CorpusStats,
    ) -> TermVector {
        TermVector::from_weights(index.iter().map(|(term, count)| {
            let boosted = f64::from(count) + NAME_BOOST * f64::from(title.count(term));
            (term.to_string(), boosted * stats.idf(term))
        }))
    }
}
