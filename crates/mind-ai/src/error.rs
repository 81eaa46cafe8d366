//! Error types for the association engine.

use crate::distributor::NotificationKind;

/// Errors raised synchronously by the engine and the result distributor.
///
/// Failures of asynchronous computations never surface here: they are
/// captured as failure values inside a [`ComputationHandle`](crate::ComputationHandle).
#[derive(Debug, Clone, thiserror::Error)]
pub enum AiError {
    /// No Tokio runtime is available to run computations on.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// A lock guarding shared state was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// Corpus indexing failed.
    #[error("indexing failed: {0}")]
    IndexingFailed(String),

    /// The distributor worker is already running.
    #[error("distributor already running")]
    AlreadyRunning,

    /// A sink for this notification kind was already registered.
    #[error("sink already registered for {0} notifications")]
    SinkAlreadyRegistered(NotificationKind),
}
