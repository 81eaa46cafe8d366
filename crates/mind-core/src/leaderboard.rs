//! Associations and the size-bounded leaderboard.
//!
//! A leaderboard is ordered descending by score. Equal scores keep the
//! corpus order of their documents, so two runs over the same corpus always
//! produce the same board.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

use crate::types::DocumentRef;

/// A scored relation between a query and a candidate document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    /// The related document.
    pub document: DocumentRef,
    /// Relatedness, higher is more related. Always finite.
    pub score: f64,
}

/// A candidate considered for a leaderboard.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position of the document in the corpus (tie-break key).
    pub ordinal: usize,
    /// The candidate document.
    pub document: DocumentRef,
    /// Raw score from the ranking strategy.
    pub score: f64,
}

impl Candidate {
    /// Creates a candidate.
    pub fn new(ordinal: usize, document: DocumentRef, score: f64) -> Self {
        Self {
            ordinal,
            document,
            score,
        }
    }
}

/// Ranked, size-bounded result of an association query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    associations: Vec<Association>,
    success: bool,
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::empty()
    }
}

impl Leaderboard {
    /// An empty leaderboard from a successful computation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            associations: Vec::new(),
            success: true,
        }
    }

    /// An empty leaderboard standing for a failed or rejected computation.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            associations: Vec::new(),
            success: false,
        }
    }

    /// Ranks candidates into a leaderboard of at most `limit` associations.
    ///
    /// Non-positive scores are not associations and are dropped. Non-finite
    /// scores are a strategy bug; they are dropped and logged.
    pub fn rank<I>(candidates: I, limit: usize) -> Self
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut kept: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| {
                if !candidate.score.is_finite() {
                    warn!(
                        "Dropping non-finite score {} for document {}",
                        candidate.score, candidate.document.id
                    );
                    return false;
                }
                candidate.score > 0.0
            })
            .collect();

        kept.sort_by(compare_candidates);
        kept.truncate(limit);

        Self {
            associations: kept
                .into_iter()
                .map(|c| Association {
                    document: c.document,
                    score: c.score,
                })
                .collect(),
            success: true,
        }
    }

    /// Returns true if the computation that produced this board succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Number of associations.
    pub fn len(&self) -> usize {
        self.associations.len()
    }

    /// Returns true if there are no associations.
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// The best association, if any.
    pub fn top(&self) -> Option<&Association> {
        self.associations.first()
    }

    /// Iterates associations best first.
    pub fn iter(&self) -> std::slice::Iter<'_, Association> {
        self.associations.iter()
    }

    /// Borrows the associations best first.
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Consumes the board, returning its associations best first.
    pub fn into_associations(self) -> Vec<Association> {
        self.associations
    }
}

impl<'a> IntoIterator for &'a Leaderboard {
    type Item = &'a Association;
    type IntoIter = std::slice::Iter<'a, Association>;

    fn into_iter(self) -> Self::IntoIter {
        self.associations.iter()
    }
}

/// Descending by score, ascending by corpus ordinal on ties.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}
