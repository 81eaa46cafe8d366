//! Core data types for the thinking notebook.
//!
//! The association engine never owns documents. It sees them through:
//!
//! - [`DocumentId`]: a stable identity that survives relearning
//! - [`DocumentRef`]: identity plus display name and kind, cheap to clone
//! - [`DocumentSource`]: the storage layer's accessor, queried once per learning
//!   cycle and on demand for bodies
//!
//! All value types derive `Debug`, `Clone`, `Serialize`, and `Deserialize` so
//! that consumers can inspect and export them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a document (note or notebook).
///
/// Wraps a UUID v4. The storage layer assigns it once and keeps it stable for
/// the lifetime of the document, so leaderboards computed against one corpus
/// model can be resolved against the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Creates a new random DocumentId using UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a DocumentId from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ============================================================================
// Documents
// ============================================================================

/// What kind of text unit a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A single note inside a notebook.
    Note,
    /// A notebook (outline) ranked by its name and description.
    Notebook,
}

impl DocumentKind {
    /// Returns the lowercase name used in configuration and output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Notebook => "notebook",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "note" => Ok(Self::Note),
            "notebook" | "outline" => Ok(Self::Notebook),
            other => Err(CoreError::UnknownDocumentKind(other.to_string())),
        }
    }
}

/// A reference to an externally owned document.
///
/// Carries identity and display data only. The body is resolved on demand
/// through [`DocumentSource::text`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Stable identity.
    pub id: DocumentId,
    /// Display name (note title or notebook name).
    pub name: String,
    /// Note or notebook.
    pub kind: DocumentKind,
}

impl DocumentRef {
    /// Creates a reference with a fresh identity.
    pub fn new(name: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            kind,
        }
    }

    /// Creates a note reference with a fresh identity.
    pub fn note(name: impl Into<String>) -> Self {
        Self::new(name, DocumentKind::Note)
    }

    /// Creates a notebook reference with a fresh identity.
    pub fn notebook(name: impl Into<String>) -> Self {
        Self::new(name, DocumentKind::Notebook)
    }

    /// Replaces the identity (used by storage layers with persisted ids).
    #[must_use]
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }
}

/// Accessor for the document collection owned by the storage layer.
///
/// The engine pulls `all_documents()` at the start of every learning cycle
/// and never caches the returned list across cycles.
pub trait DocumentSource: Send + Sync {
    /// Returns every document of the corpus in stable corpus order.
    ///
    /// The order defines tie-breaking in leaderboards.
    fn all_documents(&self) -> Vec<DocumentRef>;

    /// Resolves the body text of a document.
    ///
    /// `None` (unknown or unreadable document) is treated as an empty body.
    fn text(&self, id: &DocumentId) -> Option<String>;
}

// ============================================================================
// Configuration values
// ============================================================================

/// Associations assessment algorithm selecting the ranking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AaAlgorithm {
    /// Cosine similarity of raw term-count vectors.
    BagOfWords,
    /// Rarity-weighted full-text similarity.
    #[default]
    WeightedFullText,
}

impl AaAlgorithm {
    /// Returns the canonical configuration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BagOfWords => "bag-of-words",
            Self::WeightedFullText => "weighted-fts",
        }
    }
}

impl fmt::Display for AaAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AaAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bow" | "bag-of-words" | "bag_of_words" => Ok(Self::BagOfWords),
            "weighted-fts" | "weighted-full-text" | "weighted_fts" | "fts" => {
                Ok(Self::WeightedFullText)
            }
            other => Err(CoreError::UnknownAlgorithm(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_display_and_parse() {
        let id = DocumentId::new();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn document_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<DocumentId>().is_err());
    }

    #[test]
    fn document_id_serializes_transparently() {
        let id = DocumentId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn document_kind_from_str() {
        assert_eq!("note".parse::<DocumentKind>().unwrap(), DocumentKind::Note);
        assert_eq!(
            " Notebook ".parse::<DocumentKind>().unwrap(),
            DocumentKind::Notebook
        );
        assert_eq!(
            "outline".parse::<DocumentKind>().unwrap(),
            DocumentKind::Notebook
        );
    }

    #[test]
    fn document_kind_unknown_is_error() {
        let err = "stencil".parse::<DocumentKind>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownDocumentKind(ref k) if k == "stencil"));
    }

    #[test]
    fn document_ref_constructors() {
        let note = DocumentRef::note("Rust ownership");
        assert_eq!(note.kind, DocumentKind::Note);
        assert_eq!(note.name, "Rust ownership");

        let id = DocumentId::new();
        let notebook = DocumentRef::notebook("Languages").with_id(id);
        assert_eq!(notebook.kind, DocumentKind::Notebook);
        assert_eq!(notebook.id, id);
    }

    #[test]
    fn algorithm_from_str() {
        assert_eq!("bow".parse::<AaAlgorithm>().unwrap(), AaAlgorithm::BagOfWords);
        assert_eq!(
            "weighted-fts".parse::<AaAlgorithm>().unwrap(),
            AaAlgorithm::WeightedFullText
        );
        assert!("neural".parse::<AaAlgorithm>().is_err());
    }

    #[test]
    fn algorithm_default_is_weighted() {
        assert_eq!(AaAlgorithm::default(), AaAlgorithm::WeightedFullText);
    }

    #[test]
    fn algorithm_serde_kebab_case() {
        let json = serde_json::to_string(&AaAlgorithm::BagOfWords).unwrap();
        assert_eq!(json, "\"bag-of-words\"");
    }
}
