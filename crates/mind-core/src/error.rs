//! Error types for the core data model.

use thiserror::Error;

/// Errors raised while interpreting core values.
///
/// These indicate a caller bug (an unrecognized resource kind or algorithm
/// name) rather than a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Document kind string is not recognized.
    #[error("unknown document kind: {0}")]
    UnknownDocumentKind(String),

    /// Associations assessment algorithm string is not recognized.
    #[error("unknown associations algorithm: {0}")]
    UnknownAlgorithm(String),
}
