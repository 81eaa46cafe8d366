//! mind-ai: Associative relevance engine for the thinking notebook
//!
//! This crate provides:
//! - Tokenization and per-document word frequency indexes
//! - Corpus learning into an immutable, shareable model
//! - Two interchangeable ranking strategies (bag of words, weighted full-text)
//! - The `Sleeping` / `Dreaming` / `Thinking` engine lifecycle
//! - Future-like computation handles and a polling result distributor that
//!   delivers results on the consumer's own context
//!
//! ## Modules
//!
//! - [`tokenizer`]: term normalization and stop words
//! - [`index`]: word frequency indexes, corpus statistics and the corpus model
//! - [`vector`]: weighted term vectors and cosine similarity
//! - [`cache`]: token cache shared across learning cycles
//! - [`strategy`]: the ranking strategies
//! - [`engine`]: the association engine and its state machine
//! - [`handle`]: computation handles
//! - [`distributor`]: result distributor and consumer context
//! - [`config`]: configuration from the environment
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use mind_ai::{AiConfig, AssociationEngine, LearnRoute, LeaderboardRoute, ResultDistributor};
//!
//! let config = AiConfig::from_env()?;
//! let engine = AssociationEngine::new(config.clone(), source)?;
//! let (mut distributor, mut consumer) = ResultDistributor::from_config(&config);
//!
//! consumer.on_corpus_learned(|success, _| println!("learned: {success}"))?;
//! consumer.on_document_leaderboard(|document, board| {
//!     println!("{}: {} associations", document.name, board.len());
//! })?;
//! let worker = distributor.start()?;
//!
//! distributor.submit(engine.dream(), LearnRoute::DreamToThink);
//! consumer.dispatch_next().await;
//!
//! distributor.submit(
//!     engine.get_associated_notes(&note),
//!     LeaderboardRoute::Document(note.clone()),
//! );
//! consumer.dispatch_next().await;
//!
//! distributor.shutdown();
//! ```

pub use mind_core;

pub mod cache;
pub mod config;
pub mod distributor;
pub mod engine;
pub mod error;
pub mod handle;
pub mod index;
pub mod strategy;
pub mod tokenizer;
pub mod vector;

// Re-export main types for convenience
pub use cache::{CacheStats, TokenCache};
pub use config::{AiConfig, ConfigError, DEFAULT_LEADERBOARD_SIZE, DEFAULT_POLL_INTERVAL};
pub use distributor::{
    ConsumerContext, Deliverable, DistributorStats, LearnRoute, LeaderboardRoute, Notification,
    NotificationKind, ResultDistributor, TextQuery,
};
pub use engine::{AssociationEngine, EngineState};
pub use error::AiError;
pub use handle::{ComputationHandle, TaskOutput};
pub use index::{CorpusModel, CorpusStatistics, CorpusStats, SourceDocument, WordFrequencyIndex};
pub use strategy::{
    BagOfWordsRanking, NAME_BOOST, QueryTerms, RankingStrategy, WeightedFullTextRanking,
    strategy_for,
};
pub use vector::TermVector;
