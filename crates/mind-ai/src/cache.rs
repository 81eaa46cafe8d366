//! Per-document token cache shared across learning cycles.
//!
//! Tokenizing every note on every dream dominates relearn time on large
//! repositories. The cache keeps each document's word frequency indexes
//! keyed by document id and a blake3 fingerprint of its name and body, so a
//! relearn only re-tokenizes documents whose content changed.
//!
//! ## Lifecycle
//!
//! - `sleep()` drops the corpus model but keeps this cache
//! - `amnesia()` clears it
//!
//! Thread-safe access via `Arc<RwLock<>>`; clones share state.

use mind_core::{DocumentId, DocumentRef};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::error::AiError;
use crate::index::{WordFrequencyIndex, document_indexes};

/// Cached indexes of one document.
#[derive(Debug, Clone)]
struct CachedIndexes {
    fingerprint: blake3::Hash,
    index: Arc<WordFrequencyIndex>,
    title: Arc<WordFrequencyIndex>,
}

/// Thread-safe cache of tokenized documents.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    entries: Arc<RwLock<HashMap<DocumentId, CachedIndexes>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl TokenCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `(index, title)` pair for a document, tokenizing on miss.
    pub fn indexes_for(
        &self,
        document: &DocumentRef,
        body: &str,
    ) -> Result<(Arc<WordFrequencyIndex>, Arc<WordFrequencyIndex>), AiError> {
        let fingerprint = fingerprint(&document.name, body);

        {
            let entries = self
                .entries
                .read()
                .map_err(|_| AiError::LockPoisoned("token cache"))?;
            if let Some(cached) = entries.get(&document.id) {
                if cached.fingerprint == fingerprint {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok((cached.index.clone(), cached.title.clone()));
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let (index, title) = document_indexes(&document.name, body);
        let cached = CachedIndexes {
            fingerprint,
            index: Arc::new(index),
            title: Arc::new(title),
        };
        let result = (cached.index.clone(), cached.title.clone());

        self.entries
            .write()
            .map_err(|_| AiError::LockPoisoned("token cache"))?
            .insert(document.id, cached);

        Ok(result)
    }

    /// Drops entries of documents no longer in the corpus.
    ///
    /// Returns the number of entries removed.
    pub fn retain_documents(&self, live: &HashSet<DocumentId>) -> usize {
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|id, _| live.contains(id));
                let removed = before - entries.len();
                if removed > 0 {
                    debug!("Evicted {} stale token cache entries", removed);
                }
                removed
            }
            Err(_) => 0,
        }
    }

    /// Clears all cached entries and counters.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Returns the number of cached documents.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns statistics about the cache.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about cache state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached documents.
    pub entries: usize,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to tokenize.
    pub misses: u64,
}

fn fingerprint(name: &str, body: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    // Keeps ("ab", "c") and ("a", "bc") apart
    hasher.update(&[0]);
    hasher.update(body.as_bytes());
    hasher.finalize()
}
