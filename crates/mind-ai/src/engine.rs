//! Association engine and its lifecycle state machine.
//!
//! ## States
//!
//! - `Sleeping`: no model, queries are rejected
//! - `Dreaming`: a learning computation is running, queries are rejected
//! - `Thinking`: a model is published, queries are served
//!
//! `dream()` moves to `Dreaming` and starts learning on a blocking worker.
//! The worker itself publishes the model and moves to `Thinking`, or clears
//! it and falls back to `Sleeping` when learning fails or the worker never
//! runs. `sleep()` and
//! `amnesia()` drop the model, and refuse to do so while any computation is
//! in flight.
//!
//! The published model is an `Arc<CorpusModel>`. Every query takes its own
//! reference when it starts, so a query always sees one complete model.
//!
//! ## Example
//!
//! ```rust,ignore
//! let engine = AssociationEngine::new(AiConfig::from_env()?, source)?;
//!
//! assert!(engine.dream().wait().await);
//! let board = engine.get_associated_notes(&note).wait().await;
//! for association in &board {
//!     println!("{:.3} {}", association.score, association.document.name);
//! }
//! ```

use mind_core::{AaAlgorithm, DocumentRef, DocumentSource, Leaderboard};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::AiConfig;
use crate::error::AiError;
use crate::handle::{ComputationHandle, TaskOutput};
use crate::index::{CorpusModel, CorpusStatistics, SourceDocument};
use crate::strategy::{QueryTerms, RankingStrategy, strategy_for};

/// Lifecycle state of an [`AssociationEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// No model loaded.
    #[default]
    Sleeping,
    /// Learning in progress.
    Dreaming,
    /// Model ready, queries servable.
    Thinking,
}

impl EngineState {
    /// Returns the string representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sleeping => "sleeping",
            Self::Dreaming => "dreaming",
            Self::Thinking => "thinking",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Default)]
struct Shared {
    lifecycle: Mutex<EngineState>,
    model: RwLock<Option<Arc<CorpusModel>>>,
    in_flight: AtomicUsize,
}

impl Shared {
    // Lock order: lifecycle, then model.
    fn lifecycle(&self) -> MutexGuard<'_, EngineState> {
        self.lifecycle.lock().unwrap_or_else(|poisoned| {
            warn!("Engine lifecycle lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn model(&self) -> Option<Arc<CorpusModel>> {
        match self.model.read() {
            Ok(model) => model.clone(),
            Err(poisoned) => {
                warn!("Engine model lock poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    fn publish(&self, model: Option<Arc<CorpusModel>>) {
        match self.model.write() {
            Ok(mut slot) => *slot = model,
            Err(poisoned) => {
                warn!("Engine model lock poisoned, recovering");
                *poisoned.into_inner() = model;
            }
        }
    }
}

/// Counts one in-flight computation until dropped.
struct InFlight(Arc<Shared>);

impl InFlight {
    fn enter(shared: &Arc<Shared>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(shared.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A running dream.
///
/// Dropped without settling (the worker never ran), it moves the engine from
/// `Dreaming` back to `Sleeping`.
struct Dream {
    shared: Arc<Shared>,
    settled: bool,
    _in_flight: InFlight,
}

impl Dream {
    fn enter(shared: &Arc<Shared>) -> Self {
        Self {
            shared: shared.clone(),
            settled: false,
            _in_flight: InFlight::enter(shared),
        }
    }

    fn settle(
        mut self,
        algorithm: AaAlgorithm,
        learned: Result<CorpusModel, AiError>,
        elapsed: Duration,
    ) -> bool {
        self.settled = true;
        finish_dream(&self.shared, algorithm, learned, elapsed)
    }
}

impl Drop for Dream {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.shared.lifecycle();
        warn!("Dream abandoned before learning, {} -> sleeping", *state);
        self.shared.publish(None);
        *state = EngineState::Sleeping;
    }
}

/// Learns a corpus model and answers association queries against it.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct AssociationEngine {
    config: AiConfig,
    source: Arc<dyn DocumentSource>,
    strategy: Arc<dyn RankingStrategy>,
    shared: Arc<Shared>,
    runtime: Handle,
}

impl AssociationEngine {
    /// Creates a sleeping engine on the current Tokio runtime.
    ///
    /// The ranking strategy is picked from `config.algorithm` here and never
    /// changes for the life of the engine.
    pub fn new(config: AiConfig, source: Arc<dyn DocumentSource>) -> Result<Self, AiError> {
        let runtime = Handle::try_current().map_err(|e| AiError::NoRuntime(e.to_string()))?;
        let strategy = strategy_for(config.algorithm);
        info!(
            "Association engine created: algorithm {}, leaderboard size {}",
            config.algorithm, config.leaderboard_size
        );

        Ok(Self {
            config,
            source,
            strategy,
            shared: Arc::new(Shared::default()),
            runtime,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.shared.lifecycle()
    }

    /// Returns true if queries are servable.
    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Thinking
    }

    /// Ranking algorithm of this engine.
    pub fn algorithm(&self) -> AaAlgorithm {
        self.strategy.algorithm()
    }

    /// Maximum associations per leaderboard.
    pub fn leaderboard_size(&self) -> usize {
        self.config.leaderboard_size
    }

    /// Summary of the published model, if any.
    pub fn statistics(&self) -> Option<CorpusStatistics> {
        self.shared
            .model()
            .map(|model| model.statistics(self.algorithm()))
    }

    /// Number of computations currently running.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Learns the corpus.
    ///
    /// Legal from `Sleeping` and `Thinking`. While a dream is already running
    /// the returned handle is settled with `false` and nothing changes.
    pub fn dream(&self) -> ComputationHandle<bool> {
        let guard = {
            let mut state = self.shared.lifecycle();
            if *state == EngineState::Dreaming {
                warn!("dream() while already dreaming, rejected");
                return ComputationHandle::failed();
            }
            info!("{} -> dreaming", *state);
            *state = EngineState::Dreaming;
            Dream::enter(&self.shared)
        };

        let source = self.source.clone();
        let strategy = self.strategy.clone();

        self.spawn("dream", guard, move |dream| {
            let start = Instant::now();
            let learned = panic::catch_unwind(AssertUnwindSafe(|| {
                learn(source.as_ref(), strategy.as_ref())
            }))
            .unwrap_or_else(|payload| Err(AiError::IndexingFailed(panic_message(payload))));

            dream.settle(strategy.algorithm(), learned, start.elapsed())
        })
    }

    /// Ranks the corpus by similarity to a document.
    ///
    /// The document is excluded from its own leaderboard. Outside `Thinking`
    /// the handle is settled with a failed leaderboard.
    pub fn get_associated_notes(&self, document: &DocumentRef) -> ComputationHandle<Leaderboard> {
        let Some((model, guard)) = self.thinking("get_associated_notes") else {
            return ComputationHandle::failed();
        };

        let source = self.source.clone();
        let strategy = self.strategy.clone();
        let document = document.clone();
        let limit = self.config.leaderboard_size;

        self.spawn("document query", guard, move |_in_flight| {
            let query = QueryTerms::for_document(&document, &model, source.as_ref());
            strategy.score(&query, &model, limit)
        })
    }

    /// Ranks the corpus by similarity to free text.
    ///
    /// `exclude`, when given, never appears in the leaderboard. Outside
    /// `Thinking` the handle is settled with a failed leaderboard.
    pub fn get_associated_notes_by_text(
        &self,
        text: &str,
        exclude: Option<&DocumentRef>,
    ) -> ComputationHandle<Leaderboard> {
        let Some((model, guard)) = self.thinking("get_associated_notes_by_text") else {
            return ComputationHandle::failed();
        };

        let strategy = self.strategy.clone();
        let text = text.to_string();
        let exclude = exclude.map(|document| document.id);
        let limit = self.config.leaderboard_size;

        self.spawn("text query", guard, move |_in_flight| {
            let query = QueryTerms::from_text(&text, exclude);
            strategy.score(&query, &model, limit)
        })
    }

    /// Drops the model, keeping the strategy's caches.
    ///
    /// Returns false and changes nothing while a computation is in flight.
    pub fn sleep(&self) -> bool {
        self.unlearn("sleep", false)
    }

    /// Drops the model and every cached per-strategy structure.
    ///
    /// Returns false and changes nothing while a computation is in flight.
    pub fn amnesia(&self) -> bool {
        self.unlearn("amnesia", true)
    }

    fn unlearn(&self, operation: &str, forget: bool) -> bool {
        let mut state = self.shared.lifecycle();
        let in_flight = self.in_flight();
        if *state == EngineState::Dreaming || in_flight > 0 {
            warn!(
                "{}() while {} with {} computations in flight, rejected",
                operation, *state, in_flight
            );
            return false;
        }

        self.shared.publish(None);
        if forget {
            self.strategy.forget();
        }
        info!("{} -> sleeping ({})", *state, operation);
        *state = EngineState::Sleeping;
        true
    }

    /// Returns the published model if queries are servable, counting the
    /// query as in flight before the lifecycle lock is released.
    fn thinking(&self, operation: &str) -> Option<(Arc<CorpusModel>, InFlight)> {
        let state = self.shared.lifecycle();
        if *state != EngineState::Thinking {
            warn!("{}() while {}, rejected", operation, *state);
            return None;
        }

        match self.shared.model() {
            Some(model) => Some((model, InFlight::enter(&self.shared))),
            None => {
                warn!("{}() while thinking without a model, rejected", operation);
                None
            }
        }
    }

    /// Runs `work` on a blocking worker. The guard is handed to `work` and
    /// released before the handle settles; if the worker never runs, both are
    /// dropped and the handle settles with the failure value.
    fn spawn<T, G, F>(&self, label: &'static str, guard: G, work: F) -> ComputationHandle<T>
    where
        T: TaskOutput,
        G: Send + 'static,
        F: FnOnce(G) -> T + Send + 'static,
    {
        let (handle, completer) = ComputationHandle::pending();

        self.runtime.spawn_blocking(move || {
            let start = Instant::now();
            let value = panic::catch_unwind(AssertUnwindSafe(move || work(guard)))
                .unwrap_or_else(|payload| {
                    warn!("{} panicked: {}", label, panic_message(payload));
                    T::failure()
                });
            debug!("{} finished in {:?}", label, start.elapsed());

            completer.complete(value);
        });

        handle
    }
}

impl fmt::Debug for AssociationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationEngine")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Pulls the corpus from the source and builds the model.
fn learn(
    source: &dyn DocumentSource,
    strategy: &dyn RankingStrategy,
) -> Result<CorpusModel, AiError> {
    let documents: Vec<SourceDocument> = source
        .all_documents()
        .into_iter()
        .map(|document| {
            let text = source.text(&document.id).unwrap_or_default();
            SourceDocument { document, text }
        })
        .collect();

    strategy.build_model(&documents)
}

fn finish_dream(
    shared: &Shared,
    algorithm: AaAlgorithm,
    learned: Result<CorpusModel, AiError>,
    elapsed: Duration,
) -> bool {
    let mut state = shared.lifecycle();
    match learned {
        Ok(model) => {
            info!(
                "Learned {} documents with {} in {:?}, dreaming -> thinking",
                model.len(),
                algorithm,
                elapsed
            );
            shared.publish(Some(Arc::new(model)));
            *state = EngineState::Thinking;
            true
        }
        Err(e) => {
            warn!("Dream failed after {:?}: {}, dreaming -> sleeping", elapsed, e);
            shared.publish(None);
            *state = EngineState::Sleeping;
            false
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
