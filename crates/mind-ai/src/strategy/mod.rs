//! Ranking strategies for associations assessment.
//!
//! Both strategies share the learning pass (tokenize through the
//! [`TokenCache`], gather corpus statistics, weigh every document) and the
//! scoring pass (cosine similarity of weighted vectors, ranked into a
//! [`Leaderboard`]). They differ only in how a document's term counts become
//! weights, which is what [`RankingStrategy::weigh`] captures.

mod bag_of_words;
mod weighted_fts;

pub use bag_of_words::BagOfWordsRanking;
pub use weighted_fts::{NAME_BOOST, WeightedFullTextRanking};

use mind_core::{AaAlgorithm, Candidate, DocumentId, DocumentRef, DocumentSource, Leaderboard};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::cache::TokenCache;
use crate::error::AiError;
use crate::index::{
    CorpusModel, CorpusStats, SourceDocument, WordFrequencyIndex, document_indexes,
};
use crate::vector::TermVector;

/// A normalized association query.
#[derive(Debug, Clone, Default)]
pub struct QueryTerms {
    /// Name and body term counts of the query.
    pub index: Arc<WordFrequencyIndex>,
    /// Name term counts of the query (empty for free text).
    pub title: Arc<WordFrequencyIndex>,
    /// Document excluded from its own leaderboard.
    pub exclude: Option<DocumentId>,
}

impl QueryTerms {
    /// Query for free text, optionally excluding a document.
    pub fn from_text(text: &str, exclude: Option<DocumentId>) -> Self {
        Self {
            index: Arc::new(WordFrequencyIndex::from_text(text)),
            title: Arc::new(WordFrequencyIndex::new()),
            exclude,
        }
    }

    /// Query for a document, excluding the document itself.
    ///
    /// Reuses the learned indexes when the document is part of the model,
    /// otherwise resolves its body through the source.
    pub fn for_document(
        document: &DocumentRef,
        model: &CorpusModel,
        source: &dyn DocumentSource,
    ) -> Self {
        if let Some(entry) = model.get(&document.id) {
            return Self {
                index: entry.index.clone(),
                title: entry.title.clone(),
                exclude: Some(document.id),
            };
        }

        let body = source.text(&document.id).unwrap_or_default();
        let (index, title) = document_indexes(&document.name, &body);
        Self {
            index: Arc::new(index),
            title: Arc::new(title),
            exclude: Some(document.id),
        }
    }

    /// Returns true if the query has no recognized terms.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.title.is_empty()
    }
}

/// A ranking strategy: learns a corpus model and scores queries against it.
///
/// Implementations must be deterministic: the same query against the same
/// model yields the same leaderboard.
pub trait RankingStrategy: Send + Sync {
    /// The algorithm this strategy implements.
    fn algorithm(&self) -> AaAlgorithm;

    /// Token cache kept across learning cycles.
    fn cache(&self) -> &TokenCache;

    /// Turns term counts into a weighted vector.
    fn weigh(
        &self,
        index: &WordFrequencyIndex,
        title: &WordFrequencyIndex,
        stats: &CorpusStats,
    ) -> TermVector;

    /// Builds the corpus model from the full document set, in corpus order.
    fn build_model(&self, documents: &[SourceDocument]) -> Result<CorpusModel, AiError> {
        let mut indexed = Vec::with_capacity(documents.len());
        for source in documents {
            let (index, title) = self.cache().indexes_for(&source.document, &source.text)?;
            indexed.push((source.document.clone(), index, title));
        }

        let live: HashSet<DocumentId> = documents.iter().map(|d| d.document.id).collect();
        self.cache().retain_documents(&live);

        Ok(CorpusModel::build(indexed, |index, title, stats| {
            self.weigh(index, title, stats)
        }))
    }

    /// Ranks the model's documents against a query.
    fn score(&self, query: &QueryTerms, model: &CorpusModel, limit: usize) -> Leaderboard {
        if query.is_empty() || model.is_empty() {
            return Leaderboard::empty();
        }

        let query_vector = self.weigh(&query.index, &query.title, model.stats());
        if query_vector.is_empty() {
            return Leaderboard::empty();
        }

        let candidates = model
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| Some(entry.document.id) != query.exclude)
            .map(|(ordinal, entry)| {
                Candidate::new(
                    ordinal,
                    entry.document.clone(),
                    query_vector.cosine_similarity(&entry.vector),
                )
            });

        let leaderboard = Leaderboard::rank(candidates, limit);
        debug!(
            "{} scored {} documents, {} associations",
            self.algorithm(),
            model.len(),
            leaderboard.len()
        );
        leaderboard
    }

    /// Releases cached per-strategy structures.
    fn forget(&self) {
        self.cache().clear();
    }
}

/// Instantiates the strategy for an algorithm.
pub fn strategy_for(algorithm: AaAlgorithm) -> Arc<dyn RankingStrategy> {
    match algorithm {
        AaAlgorithm::BagOfWords => Arc::new(BagOfWordsRanking::new()),
        AaAlgorithm::WeightedFullText => Arc::new(WeightedFullTextRanking::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mind_core::DocumentRef;
    use std::collections::HashMap;

    struct MapSource(HashMap<DocumentId, String>);

    impl DocumentSource for MapSource {
        fn all_documents(&self) -> Vec<DocumentRef> {
            Vec::new()
        }

        fn text(&self, id: &DocumentId) -> Option<String> {
            self.0.get(id).cloned()
        }
    }

    fn learn(strategy: &dyn RankingStrategy, docs: &[(&DocumentRef, &str)]) -> CorpusModel {
        let documents: Vec<SourceDocument> = docs
            .iter()
            .map(|(document, text)| SourceDocument {
                document: (*document).clone(),
                text: text.to_string(),
            })
            .collect();
        strategy.build_model(&documents).unwrap()
    }

    #[test]
    fn strategy_for_selects_algorithm() {
        assert_eq!(
            strategy_for(AaAlgorithm::BagOfWords).algorithm(),
            AaAlgorithm::BagOfWords
        );
        assert_eq!(
            strategy_for(AaAlgorithm::WeightedFullText).algorithm(),
            AaAlgorithm::WeightedFullText
        );
    }

    #[test]
    fn query_for_learned_document_reuses_indexes() {
        let strategy = BagOfWordsRanking::new();
        let a = DocumentRef::note("A");
        let model = learn(&strategy, &[(&a, "apple banana")]);
        let source = MapSource(HashMap::new());

        let query = QueryTerms::for_document(&a, &model, &source);

        assert!(Arc::ptr_eq(&query.index, &model.get(&a.id).unwrap().index));
        assert_eq!(query.exclude, Some(a.id));
    }

    #[test]
    fn query_for_unknown_document_reads_source() {
        let strategy = BagOfWordsRanking::new();
        let a = DocumentRef::note("A");
        let model = learn(&strategy, &[(&a, "apple banana")]);

        let fresh = DocumentRef::note("Fresh");
        let source = MapSource([(fresh.id, "apple pie".to_string())].into_iter().collect());
        let query = QueryTerms::for_document(&fresh, &model, &source);

        assert_eq!(query.index.count("apple"), 1);
        assert_eq!(query.title.count("fresh"), 1);

        let board = strategy.score(&query, &model, 10);
        assert_eq!(board.len(), 1);
        assert_eq!(board.top().unwrap().document.id, a.id);
    }

    #[test]
    fn query_without_terms_is_empty() {
        assert!(QueryTerms::from_text("the of and", None).is_empty());
        assert!(!QueryTerms::from_text("apple", None).is_empty());
    }

    #[test]
    fn build_model_evicts_removed_documents_from_cache() {
        let strategy = WeightedFullTextRanking::new();
        let a = DocumentRef::note("A");
        let b = DocumentRef::note("B");

        learn(&strategy, &[(&a, "apple"), (&b, "banana")]);
        assert_eq!(strategy.cache().len(), 2);

        learn(&strategy, &[(&a, "apple")]);
        assert_eq!(strategy.cache().len(), 1);
        assert_eq!(strategy.cache().stats().hits, 1);
    }

    #[test]
    fn forget_clears_cache() {
        let strategy = BagOfWordsRanking::new();
        let a = DocumentRef::note("A");
        learn(&strategy, &[(&a, "apple")]);

        strategy.forget();

        assert!(strategy.cache().is_empty());
    }
}
