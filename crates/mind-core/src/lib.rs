//! mind-core: Core types for the thinking notebook's associative engine
//!
//! This crate provides:
//! - Document identities and references (notes and notebooks)
//! - The `DocumentSource` accessor implemented by storage layers
//! - Associations and the size-bounded, deterministically ordered leaderboard
//! - The associations-assessment algorithm selector

pub mod error;
pub mod leaderboard;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::CoreError;
pub use leaderboard::{Association, Candidate, Leaderboard};
pub use types::{AaAlgorithm, DocumentId, DocumentKind, DocumentRef, DocumentSource};
