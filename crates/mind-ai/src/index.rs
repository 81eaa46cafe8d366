//! Word frequency indexes and the corpus model.
//!
//! The corpus model is the bag of words learned in one dreaming cycle:
//!
//! ```text
//! | Document | word1 | ... | wordN |
//! |----------|-------|-----|-------|
//! | N1       |     1 | ... |     1 |
//! | O2       |     3 | ... |     0 |
//! | N3       |     0 | ... |     1 |
//! ```
//!
//! It is built in a single pass over the corpus, never patched afterwards,
//! and shared read-only between concurrent queries.

use mind_core::{AaAlgorithm, DocumentId, DocumentKind, DocumentRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::tokenizer::tokenize;
use crate::vector::TermVector;

/// Multiset of normalized terms of one document.
///
/// Counts are always at least 1; a term whose count drops to zero is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequencyIndex {
    counts: BTreeMap<String, u32>,
}

impl WordFrequencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes text and counts its terms.
    pub fn from_text(text: &str) -> Self {
        Self::from_tokens(tokenize(text))
    }

    /// Counts already normalized tokens.
    pub fn from_tokens<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut index = Self::new();
        for token in tokens {
            index.add(token);
        }
        index
    }

    /// Records one occurrence of a term.
    pub fn add(&mut self, term: impl Into<String>) {
        *self.counts.entry(term.into()).or_insert(0) += 1;
    }

    /// Removes one occurrence of a term, dropping it at zero.
    ///
    /// Returns false if the term was not present.
    pub fn remove(&mut self, term: &str) -> bool {
        match self.counts.get_mut(term) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.counts.remove(term);
                true
            }
            None => false,
        }
    }

    /// Occurrences of a term, 0 if absent.
    pub fn count(&self, term: &str) -> u32 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if the document contributed no terms.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all occurrences.
    pub fn total_occurrences(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Iterates `(term, count)` in term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(term, &count)| (term.as_str(), count))
    }

    /// Iterates distinct terms in term order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }
}

/// Builds the `(index, title)` pair of a document.
///
/// The index counts name and body terms; the title counts name terms only.
pub fn document_indexes(name: &str, body: &str) -> (WordFrequencyIndex, WordFrequencyIndex) {
    let title = WordFrequencyIndex::from_text(name);
    let mut index = title.clone();
    for token in tokenize(body) {
        index.add(token);
    }
    (index, title)
}

/// Statistics about a corpus of documents for rarity weighting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Number of documents in the corpus
    pub document_count: usize,
    /// Number of documents containing each term
    pub document_frequencies: HashMap<String, usize>,
}

impl CorpusStats {
    /// Creates a new empty corpus stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document's index to the corpus statistics.
    pub fn add_document(&mut self, index: &WordFrequencyIndex) {
        self.document_count += 1;
        for term in index.terms() {
            *self.document_frequencies.entry(term.to_string()).or_insert(0) += 1;
        }
    }

    /// Number of documents containing the term.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.document_frequencies.get(term).copied().unwrap_or(0)
    }

    /// Smoothed inverse document frequency: `ln(1 + N / df)`.
    ///
    /// Unknown terms count as appearing once, and an empty corpus behaves like
    /// a single document, so the weight is always positive and a one-document
    /// corpus weighs every term `ln 2`.
    pub fn idf(&self, term: &str) -> f64 {
        let documents = self.document_count.max(1) as f64;
        let df = self.document_frequency(term).max(1) as f64;
        (1.0 + documents / df).ln()
    }

    /// Number of distinct terms in the corpus.
    pub fn vocabulary_size(&self) -> usize {
        self.document_frequencies.len()
    }
}

/// A document with its body, as read from the source at learn time.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// The document reference.
    pub document: DocumentRef,
    /// The body text (empty if the source could not resolve it).
    pub text: String,
}

/// A learned document inside the corpus model.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    /// The document this entry describes.
    pub document: DocumentRef,
    /// Name and body term counts.
    pub index: Arc<WordFrequencyIndex>,
    /// Name term counts.
    pub title: Arc<WordFrequencyIndex>,
    /// Strategy-specific weighted vector.
    pub vector: TermVector,
}

/// Learned statistical model of a corpus.
#[derive(Debug, Clone, Default)]
pub struct CorpusModel {
    entries: Vec<ModelEntry>,
    ordinals: HashMap<DocumentId, usize>,
    stats: CorpusStats,
}

impl CorpusModel {
    /// Builds a model from indexed documents in corpus order.
    ///
    /// Corpus statistics are gathered first so that `weigh` can use them.
    /// A document id seen twice keeps its first occurrence.
    pub fn build<F>(
        documents: Vec<(DocumentRef, Arc<WordFrequencyIndex>, Arc<WordFrequencyIndex>)>,
        weigh: F,
    ) -> Self
    where
        F: Fn(&WordFrequencyIndex, &WordFrequencyIndex, &CorpusStats) -> TermVector,
    {
        let mut ordinals = HashMap::with_capacity(documents.len());
        let mut stats = CorpusStats::new();
        let mut indexed = Vec::with_capacity(documents.len());

        for (document, index, title) in documents {
            if ordinals.contains_key(&document.id) {
                warn!("Skipping duplicate document {} in corpus", document.id);
                continue;
            }
            ordinals.insert(document.id, indexed.len());
            stats.add_document(&index);
            indexed.push((document, index, title));
        }

        let entries = indexed
            .into_iter()
            .map(|(document, index, title)| {
                let vector = weigh(&index, &title, &stats);
                ModelEntry {
                    document,
                    index,
                    title,
                    vector,
                }
            })
            .collect();

        Self {
            entries,
            ordinals,
            stats,
        }
    }

    /// Number of learned documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the corpus was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Learned entries in corpus order.
    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// Looks up the entry of a document.
    pub fn get(&self, id: &DocumentId) -> Option<&ModelEntry> {
        self.ordinals.get(id).map(|&ordinal| &self.entries[ordinal])
    }

    /// Corpus position of a document.
    pub fn ordinal(&self, id: &DocumentId) -> Option<usize> {
        self.ordinals.get(id).copied()
    }

    /// Corpus-wide term statistics.
    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }

    /// Summarizes the model for status displays.
    pub fn statistics(&self, algorithm: AaAlgorithm) -> CorpusStatistics {
        let notebooks = self
            .entries
            .iter()
            .filter(|e| e.document.kind == DocumentKind::Notebook)
            .count();

        CorpusStatistics {
            documents: self.entries.len(),
            notes: self.entries.len() - notebooks,
            notebooks,
            vocabulary: self.stats.vocabulary_size(),
            term_occurrences: self.entries.iter().map(|e| e.index.total_occurrences()).sum(),
            algorithm,
        }
    }
}

/// Summary of the learned corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStatistics {
    /// Learned documents.
    pub documents: usize,
    /// Learned notes.
    pub notes: usize,
    /// Learned notebooks.
    pub notebooks: usize,
    /// Distinct terms across the corpus.
    pub vocabulary: usize,
    /// Total term occurrences across the corpus.
    pub term_occurrences: u64,
    /// Ranking algorithm that learned the corpus.
    pub algorithm: AaAlgorithm,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts_as_vector(
        index: &WordFrequencyIndex,
        _title: &WordFrequencyIndex,
        _stats: &CorpusStats,
    ) -> TermVector {
        TermVector::from_weights(index.iter().map(|(t, c)| (t.to_string(), f64::from(c))))
    }

    fn indexed(
        document: DocumentRef,
        body: &str,
    ) -> (DocumentRef, Arc<WordFrequencyIndex>, Arc<WordFrequencyIndex>) {
        let (index, title) = document_indexes(&document.name, body);
        (document, Arc::new(index), Arc::new(title))
    }

    #[test]
    fn index_counts_terms() {
        let index = WordFrequencyIndex::from_text("apple cherry cherry");
        assert_eq!(index.count("apple"), 1);
        assert_eq!(index.count("cherry"), 2);
        assert_eq!(index.count("banana"), 0);
        assert_eq!(index.len(), 2);
        assert_eq!(index.total_occurrences(), 3);
    }

    #[test]
    fn index_remove_drops_zero_counts() {
        let mut index = WordFrequencyIndex::from_text("cherry cherry apple");

        assert!(index.remove("cherry"));
        assert_eq!(index.count("cherry"), 1);

        assert!(index.remove("apple"));
        assert_eq!(index.count("apple"), 0);
        assert!(!index.terms().any(|t| t == "apple"));

        assert!(!index.remove("apple"));
        assert!(index.iter().all(|(_, count)| count >= 1));
    }

    #[test]
    fn index_from_empty_body() {
        let index = WordFrequencyIndex::from_text("");
        assert!(index.is_empty());
        assert_eq!(index.total_occurrences(), 0);
    }

    #[test]
    fn document_indexes_include_name() {
        let (index, title) = document_indexes("Borrow checker", "lifetimes and borrow rules");
        assert_eq!(title.count("borrow"), 1);
        assert_eq!(title.count("lifetimes"), 0);
        assert_eq!(index.count("borrow"), 2);
        assert_eq!(index.count("lifetimes"), 1);
    }

    #[test]
    fn corpus_stats_document_frequency() {
        let mut stats = CorpusStats::new();
        stats.add_document(&WordFrequencyIndex::from_text("cat dog cat"));
        stats.add_document(&WordFrequencyIndex::from_text("cat bird"));

        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.document_frequency("cat"), 2);
        assert_eq!(stats.document_frequency("dog"), 1);
        assert_eq!(stats.document_frequency("fish"), 0);
        assert_eq!(stats.vocabulary_size(), 3);
    }

    #[test]
    fn idf_rarer_terms_weigh_more() {
        let mut stats = CorpusStats::new();
        stats.add_document(&WordFrequencyIndex::from_text("cat dog"));
        stats.add_document(&WordFrequencyIndex::from_text("cat bird"));
        stats.add_document(&WordFrequencyIndex::from_text("fish bird"));

        // ln(1 + 3/2) ~ 0.916, ln(1 + 3/1) ~ 1.386
        assert!((stats.idf("cat") - 0.916).abs() < 0.01);
        assert!((stats.idf("dog") - 1.386).abs() < 0.01);
        assert!(stats.idf("dog") > stats.idf("cat"));
    }

    #[test]
    fn idf_single_document_is_uniform() {
        let mut stats = CorpusStats::new();
        stats.add_document(&WordFrequencyIndex::from_text("cat dog bird"));

        let ln2 = 2f64.ln();
        assert!((stats.idf("cat") - ln2).abs() < 1e-12);
        assert!((stats.idf("bird") - ln2).abs() < 1e-12);
    }

    #[test]
    fn idf_empty_corpus_is_finite() {
        let stats = CorpusStats::new();
        assert!(stats.idf("anything").is_finite());
        assert!(stats.idf("anything") > 0.0);
    }

    #[test]
    fn model_keeps_corpus_order() {
        let a = DocumentRef::note("A");
        let b = DocumentRef::note("B");
        let model = CorpusModel::build(
            vec![indexed(a.clone(), "apple"), indexed(b.clone(), "banana")],
            counts_as_vector,
        );

        assert_eq!(model.len(), 2);
        assert_eq!(model.ordinal(&a.id), Some(0));
        assert_eq!(model.ordinal(&b.id), Some(1));
        assert_eq!(model.get(&b.id).unwrap().index.count("banana"), 1);
    }

    #[test]
    fn model_skips_duplicate_ids() {
        let a = DocumentRef::note("A");
        let model = CorpusModel::build(
            vec![indexed(a.clone(), "apple"), indexed(a.clone(), "banana")],
            counts_as_vector,
        );

        assert_eq!(model.len(), 1);
        assert_eq!(model.stats().document_count, 1);
        assert_eq!(model.get(&a.id).unwrap().index.count("apple"), 1);
    }

    #[test]
    fn model_statistics() {
        let model = CorpusModel::build(
            vec![
                indexed(DocumentRef::notebook("Fruit"), "apple banana"),
                indexed(DocumentRef::note("A"), "apple cherry cherry"),
                indexed(DocumentRef::note("B"), ""),
            ],
            counts_as_vector,
        );

        let stats = model.statistics(AaAlgorithm::BagOfWords);
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.notebooks, 1);
        assert_eq!(stats.notes, 2);
        // fruit, apple, banana, cherry
        assert_eq!(stats.vocabulary, 4);
        assert_eq!(stats.term_occurrences, 6);
        assert_eq!(stats.algorithm, AaAlgorithm::BagOfWords);
    }

    #[test]
    fn empty_model() {
        let model = CorpusModel::build(Vec::new(), counts_as_vector);
        assert!(model.is_empty());
        assert_eq!(model.statistics(AaAlgorithm::WeightedFullText).documents, 0);
    }
}
