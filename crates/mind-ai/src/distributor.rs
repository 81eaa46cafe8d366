//! Asynchronous result delivery.
//!
//! Computations finish on worker threads, but their results belong to the
//! consumer (a UI thread, the CLI's main task). The distributor bridges the
//! two without the consumer ever blocking on a handle.
//!
//! ## Architecture
//!
//! - `ResultDistributor`: holds pending handles with their routing metadata
//!   and runs a polling loop on its own Tokio task
//! - `Notification`: a settled result plus its route, sent over a channel
//! - `ConsumerContext`: the consumer end of the channel; it owns the sinks and
//!   invokes them only when the consumer drains it
//!
//! ## Ordering
//!
//! Every tick scans pending handles in registration order with a zero-wait
//! readiness check. Ready handles are removed and sent in scan order; handles
//! that are not ready stay queued in place. Each handle is delivered exactly
//! once.
//!
//! ## Example
//!
//! ```rust,ignore
//! let (distributor, mut consumer) = ResultDistributor::from_config(&config);
//! consumer.on_corpus_learned(|success, _| println!("learned: {success}"))?;
//! let worker = distributor.start()?;
//!
//! distributor.submit(engine.dream(), LearnRoute::DreamToThink);
//! consumer.dispatch_next().await;
//! ```

use mind_core::{DocumentRef, Leaderboard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AiConfig;
use crate::error::AiError;
use crate::handle::{ComputationHandle, TaskOutput};

/// Why a learning computation was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearnRoute {
    /// First learning cycle, from sleeping to thinking.
    DreamToThink,
    /// Relearning an already learned corpus.
    Relearn,
}

/// A free-text association query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuery {
    /// The query text.
    pub query: String,
    /// Document excluded from the results.
    pub exclude: Option<DocumentRef>,
}

/// What a leaderboard is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardRoute {
    /// Documents related to a document.
    Document(DocumentRef),
    /// Documents related to free text.
    Text(TextQuery),
}

/// A settled result on its way to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A learning cycle finished.
    CorpusLearned { success: bool, route: LearnRoute },
    /// Leaderboard for a document.
    DocumentLeaderboard {
        document: DocumentRef,
        leaderboard: Leaderboard,
    },
    /// Leaderboard for a free-text query.
    TextLeaderboard {
        query: TextQuery,
        leaderboard: Leaderboard,
    },
}

impl Notification {
    /// The notification kind, used to pick its sink.
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::CorpusLearned { .. } => NotificationKind::CorpusLearned,
            Self::DocumentLeaderboard { .. } => NotificationKind::DocumentLeaderboard,
            Self::TextLeaderboard { .. } => NotificationKind::TextLeaderboard,
        }
    }

    /// Returns true if the carried result reports success.
    pub fn is_success(&self) -> bool {
        match self {
            Self::CorpusLearned { success, .. } => *success,
            Self::DocumentLeaderboard { leaderboard, .. }
            | Self::TextLeaderboard { leaderboard, .. } => leaderboard.is_success(),
        }
    }
}

/// Kinds of notifications, one consumer sink each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    CorpusLearned,
    DocumentLeaderboard,
    TextLeaderboard,
}

impl NotificationKind {
    /// Returns the string representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CorpusLearned => "corpus-learned",
            Self::DocumentLeaderboard => "document-leaderboard",
            Self::TextLeaderboard => "text-leaderboard",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Results that can be routed to the consumer.
///
/// Ties each result type to the metadata that routes it, so a learn handle
/// can only become a learn notification.
pub trait Deliverable: TaskOutput {
    /// Routing metadata attached at submission.
    type Route: Send + 'static;

    /// Wraps the result and its route into a notification.
    fn into_notification(self, route: Self::Route) -> Notification;
}

impl Deliverable for bool {
    type Route = LearnRoute;

    fn into_notification(self, route: LearnRoute) -> Notification {
        Notification::CorpusLearned {
            success: self,
            route,
        }
    }
}

impl Deliverable for Leaderboard {
    type Route = LeaderboardRoute;

    fn into_notification(self, route: LeaderboardRoute) -> Notification {
        match route {
            LeaderboardRoute::Document(document) => Notification::DocumentLeaderboard {
                document,
                leaderboard: self,
            },
            LeaderboardRoute::Text(query) => Notification::TextLeaderboard {
                query,
                leaderboard: self,
            },
        }
    }
}

/// A registered handle, type-erased for the pending set.
trait PendingDelivery: Send {
    fn is_ready(&mut self) -> bool;
    fn into_notification(self: Box<Self>) -> Notification;
}

struct Pending<T: Deliverable> {
    handle: ComputationHandle<T>,
    route: T::Route,
}

impl<T: Deliverable> PendingDelivery for Pending<T> {
    fn is_ready(&mut self) -> bool {
        self.handle.is_ready()
    }

    fn into_notification(self: Box<Self>) -> Notification {
        let Pending { mut handle, route } = *self;
        let value = handle.try_take().unwrap_or_else(T::failure);
        value.into_notification(route)
    }
}

type PendingSet = Arc<Mutex<Vec<Box<dyn PendingDelivery>>>>;

/// Delivery statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributorStats {
    /// Polling passes over the pending set.
    pub ticks: u64,
    /// Notifications handed to the consumer channel.
    pub dispatched: u64,
    /// Dispatched notifications carrying a failure value.
    pub failed: u64,
    /// Notifications lost because the consumer was gone.
    pub undeliverable: u64,
}

/// Polls pending computations and forwards settled results to the consumer.
pub struct ResultDistributor {
    pending: PendingSet,
    sender: mpsc::UnboundedSender<Notification>,
    stats: Arc<Mutex<DistributorStats>>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl ResultDistributor {
    /// Creates a distributor and the consumer end it delivers to.
    pub fn new(poll_interval: Duration) -> (Self, ConsumerContext) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        let distributor = Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            sender,
            stats: Arc::new(Mutex::new(DistributorStats::default())),
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        };
        (distributor, ConsumerContext::new(receiver))
    }

    /// Creates a distributor polling at the configured interval.
    pub fn from_config(config: &AiConfig) -> (Self, ConsumerContext) {
        Self::new(config.poll_interval)
    }

    /// Registers a handle with its routing metadata.
    ///
    /// Safe to call from any thread.
    pub fn submit<T: Deliverable>(&self, handle: ComputationHandle<T>, route: T::Route) {
        let mut pending = lock_pending(&self.pending);
        pending.push(Box::new(Pending { handle, route }));
        debug!("Submitted computation, {} pending", pending.len());
    }

    /// Number of handles waiting for their result.
    pub fn pending(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    /// Returns the current delivery statistics.
    pub fn stats(&self) -> DistributorStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// The polling interval of the worker loop.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Runs one polling pass and returns the number of notifications sent.
    pub fn poll_once(&self) -> usize {
        poll_pending(&self.pending, &self.sender, &self.stats)
    }

    /// Starts the polling loop on the current Tokio runtime.
    ///
    /// A distributor that was shut down can be started again once its
    /// previous worker has exited.
    pub fn start(&self) -> Result<JoinHandle<()>, AiError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AiError::NoRuntime(e.to_string()))?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(AiError::AlreadyRunning);
        }

        let pending = self.pending.clone();
        let sender = self.sender.clone();
        let stats = self.stats.clone();
        let running = self.running.clone();
        let poll_interval = self.poll_interval.max(Duration::from_millis(1));
        self.shutdown_tx.send_replace(false);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        Ok(runtime.spawn(async move {
            info!("Result distributor started, polling every {:?}", poll_interval);
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        poll_pending(&pending, &sender, &stats);
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Result distributor shutting down");
                            break;
                        }
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
        }))
    }

    /// Signals the polling loop to stop.
    ///
    /// Handles still pending stay registered and can be flushed with
    /// [`poll_once`](Self::poll_once).
    pub fn shutdown(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

impl fmt::Debug for ResultDistributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultDistributor")
            .field("pending", &self.pending())
            .field("poll_interval", &self.poll_interval)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

fn lock_pending(pending: &PendingSet) -> MutexGuard<'_, Vec<Box<dyn PendingDelivery>>> {
    pending.lock().unwrap_or_else(|poisoned| {
        warn!("Pending set lock poisoned, recovering");
        poisoned.into_inner()
    })
}

fn poll_pending(
    pending: &PendingSet,
    sender: &mpsc::UnboundedSender<Notification>,
    stats: &Mutex<DistributorStats>,
) -> usize {
    let ready: Vec<Box<dyn PendingDelivery>> = {
        let mut pending = lock_pending(pending);
        let mut ready = Vec::new();
        let mut waiting = Vec::with_capacity(pending.len());
        for mut entry in pending.drain(..) {
            if entry.is_ready() {
                ready.push(entry);
            } else {
                waiting.push(entry);
            }
        }
        *pending = waiting;
        ready
    };

    let mut sent = 0;
    let mut failed = 0;
    let mut undeliverable = 0;
    for entry in ready {
        let notification = entry.into_notification();
        let kind = notification.kind();
        let success = notification.is_success();
        match sender.send(notification) {
            Ok(()) => {
                debug!("Dispatched {} notification", kind);
                sent += 1;
                if !success {
                    failed += 1;
                }
            }
            Err(_) => {
                warn!("Consumer gone, dropping {} notification", kind);
                undeliverable += 1;
            }
        }
    }

    if let Ok(mut s) = stats.lock() {
        s.ticks += 1;
        s.dispatched += sent as u64;
        s.failed += failed;
        s.undeliverable += undeliverable;
    }

    sent
}

type CorpusLearnedSink = Box<dyn FnMut(bool, LearnRoute)>;
type DocumentLeaderboardSink = Box<dyn FnMut(DocumentRef, Leaderboard)>;
type TextLeaderboardSink = Box<dyn FnMut(TextQuery, Leaderboard)>;

/// Consumer end of a [`ResultDistributor`].
///
/// Sinks run only inside [`dispatch_pending`](Self::dispatch_pending) and
/// [`dispatch_next`](Self::dispatch_next), on whatever context calls them.
/// They need not be `Send`.
pub struct ConsumerContext {
    receiver: mpsc::UnboundedReceiver<Notification>,
    corpus_learned: Option<CorpusLearnedSink>,
    document_leaderboard: Option<DocumentLeaderboardSink>,
    text_leaderboard: Option<TextLeaderboardSink>,
}

impl ConsumerContext {
    fn new(receiver: mpsc::UnboundedReceiver<Notification>) -> Self {
        Self {
            receiver,
            corpus_learned: None,
            document_leaderboard: None,
            text_leaderboard: None,
        }
    }

    /// Registers the sink for finished learning cycles.
    pub fn on_corpus_learned<F>(&mut self, sink: F) -> Result<(), AiError>
    where
        F: FnMut(bool, LearnRoute) + 'static,
    {
        register(&mut self.corpus_learned, NotificationKind::CorpusLearned, Box::new(sink))
    }

    /// Registers the sink for document leaderboards.
    pub fn on_document_leaderboard<F>(&mut self, sink: F) -> Result<(), AiError>
    where
        F: FnMut(DocumentRef, Leaderboard) + 'static,
    {
        register(
            &mut self.document_leaderboard,
            NotificationKind::DocumentLeaderboard,
            Box::new(sink),
        )
    }

    /// Registers the sink for free-text leaderboards.
    pub fn on_text_leaderboard<F>(&mut self, sink: F) -> Result<(), AiError>
    where
        F: FnMut(TextQuery, Leaderboard) + 'static,
    {
        register(
            &mut self.text_leaderboard,
            NotificationKind::TextLeaderboard,
            Box::new(sink),
        )
    }

    /// Dispatches every notification received so far without waiting.
    ///
    /// Returns the number of notifications handed to a sink.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(notification) = self.receiver.try_recv() {
            if self.dispatch(notification) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Waits for the next notification and dispatches it.
    ///
    /// Returns its kind, or `None` once the distributor is gone and the
    /// channel is drained.
    pub async fn dispatch_next(&mut self) -> Option<NotificationKind> {
        let notification = self.receiver.recv().await?;
        let kind = notification.kind();
        self.dispatch(notification);
        Some(kind)
    }

    fn dispatch(&mut self, notification: Notification) -> bool {
        let kind = notification.kind();
        let delivered = match notification {
            Notification::CorpusLearned { success, route } => self
                .corpus_learned
                .as_mut()
                .map(|sink| sink(success, route))
                .is_some(),
            Notification::DocumentLeaderboard {
                document,
                leaderboard,
            } => self
                .document_leaderboard
                .as_mut()
                .map(|sink| sink(document, leaderboard))
                .is_some(),
            Notification::TextLeaderboard { query, leaderboard } => self
                .text_leaderboard
                .as_mut()
                .map(|sink| sink(query, leaderboard))
                .is_some(),
        };

        if !delivered {
            warn!("No sink registered for {} notification, dropping it", kind);
        }
        delivered
    }
}

impl fmt::Debug for ConsumerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerContext")
            .field("corpus_learned", &self.corpus_learned.is_some())
            .field("document_leaderboard", &self.document_leaderboard.is_some())
            .field("text_leaderboard", &self.text_leaderboard.is_some())
            .finish()
    }
}

fn register<S>(slot: &mut Option<S>, kind: NotificationKind, sink: S) -> Result<(), AiError> {
    if slot.is_some() {
        return Err(AiError::SinkAlreadyRegistered(kind));
    }
    *slot = Some(sink);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mind_core::Candidate;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn board(document: &DocumentRef) -> Leaderboard {
        Leaderboard::rank([Candidate::new(0, document.clone(), 0.5)], 10)
    }

    #[test]
    fn notification_kinds() {
        let note = DocumentRef::note("a");
        assert_eq!(
            true.into_notification(LearnRoute::DreamToThink).kind(),
            NotificationKind::CorpusLearned
        );
        assert_eq!(
            Leaderboard::empty()
                .into_notification(LeaderboardRoute::Document(note))
                .kind(),
            NotificationKind::DocumentLeaderboard
        );
        let text = TextQuery {
            query: "apple".to_string(),
            exclude: None,
        };
        assert_eq!(
            Leaderboard::failed()
                .into_notification(LeaderboardRoute::Text(text))
                .kind(),
            NotificationKind::TextLeaderboard
        );
        assert_eq!(NotificationKind::TextLeaderboard.to_string(), "text-leaderboard");
    }

    #[test]
    fn submit_and_poll_ready_handle() {
        let (distributor, mut consumer) = ResultDistributor::new(Duration::from_millis(10));
        let learned = Rc::new(RefCell::new(Vec::new()));
        let sink = learned.clone();
        consumer
            .on_corpus_learned(move |success, route| sink.borrow_mut().push((success, route)))
            .unwrap();

        distributor.submit(ComputationHandle::ready(true), LearnRoute::DreamToThink);
        assert_eq!(distributor.pending(), 1);

        assert_eq!(distributor.poll_once(), 1);
        assert_eq!(distributor.pending(), 0);
        assert_eq!(consumer.dispatch_pending(), 1);
        assert_eq!(*learned.borrow(), vec![(true, LearnRoute::DreamToThink)]);
    }

    #[test]
    fn registration_order_and_exactly_once() {
        let (distributor, mut consumer) = ResultDistributor::new(Duration::from_millis(10));
        let docs: Vec<DocumentRef> = ["H1", "H2", "H3"].into_iter().map(DocumentRef::note).collect();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        consumer
            .on_document_leaderboard(move |document, _| sink.borrow_mut().push(document.name))
            .unwrap();

        let mut completers = Vec::new();
        for document in &docs {
            let (handle, completer) = ComputationHandle::<Leaderboard>::pending();
            distributor.submit(handle, LeaderboardRoute::Document(document.clone()));
            completers.push(Some(completer));
        }

        // Nothing ready: several ticks deliver nothing.
        for _ in 0..3 {
            assert_eq!(distributor.poll_once(), 0);
        }

        completers[1].take().unwrap().complete(board(&docs[0]));
        assert_eq!(distributor.poll_once(), 1);
        assert_eq!(distributor.pending(), 2);
        assert_eq!(distributor.poll_once(), 0);

        completers[2].take().unwrap().complete(board(&docs[0]));
        completers[0].take().unwrap().complete(board(&docs[1]));
        assert_eq!(distributor.poll_once(), 2);

        for _ in 0..3 {
            assert_eq!(distributor.poll_once(), 0);
        }

        consumer.dispatch_pending();
        assert_eq!(*seen.borrow(), vec!["H2", "H1", "H3"]);

        let stats = distributor.stats();
        assert_eq!(stats.dispatched, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.ticks, 9);
    }

    #[test]
    fn failures_are_still_dispatched() {
        let (distributor, mut consumer) = ResultDistributor::new(Duration::from_millis(10));
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = results.clone();
        consumer
            .on_text_leaderboard(move |query, board| {
                sink.borrow_mut().push((query.query, board.is_success()))
            })
            .unwrap();

        let (handle, completer) = ComputationHandle::<Leaderboard>::pending();
        distributor.submit(
            handle,
            LeaderboardRoute::Text(TextQuery {
                query: "apple".to_string(),
                exclude: None,
            }),
        );
        drop(completer);

        assert_eq!(distributor.poll_once(), 1);
        consumer.dispatch_pending();
        assert_eq!(*results.borrow(), vec![("apple".to_string(), false)]);
        assert_eq!(distributor.stats().failed, 1);
    }

    #[test]
    fn second_sink_is_rejected() {
        let (_distributor, mut consumer) = ResultDistributor::new(Duration::from_millis(10));
        consumer.on_corpus_learned(|_, _| {}).unwrap();

        let err = consumer.on_corpus_learned(|_, _| {}).unwrap_err();
        assert!(matches!(
            err,
            AiError::SinkAlreadyRegistered(NotificationKind::CorpusLearned)
        ));
    }

    #[test]
    fn missing_sink_drops_notification() {
        let (distributor, mut consumer) = ResultDistributor::new(Duration::from_millis(10));
        distributor.submit(ComputationHandle::ready(false), LearnRoute::Relearn);

        distributor.poll_once();

        assert_eq!(consumer.dispatch_pending(), 0);
        assert_eq!(distributor.stats().dispatched, 1);
    }

    #[test]
    fn dropped_consumer_counts_undeliverable() {
        let (distributor, consumer) = ResultDistributor::new(Duration::from_millis(10));
        drop(consumer);
        distributor.submit(ComputationHandle::ready(true), LearnRoute::DreamToThink);

        assert_eq!(distributor.poll_once(), 0);
        assert_eq!(distributor.pending(), 0);
        assert_eq!(distributor.stats().undeliverable, 1);
    }

    #[test]
    fn start_without_runtime_fails() {
        let (distributor, _consumer) = ResultDistributor::new(Duration::from_millis(10));
        assert!(matches!(distributor.start(), Err(AiError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn worker_delivers_and_shuts_down() {
        let (mut distributor, mut consumer) = ResultDistributor::new(Duration::from_millis(5));
        let learned = Rc::new(RefCell::new(0));
        let sink = learned.clone();
        consumer
            .on_corpus_learned(move |_, _| *sink.borrow_mut() += 1)
            .unwrap();

        let worker = distributor.start().unwrap();
        assert!(matches!(distributor.start(), Err(AiError::AlreadyRunning)));

        let (handle, completer) = ComputationHandle::<bool>::pending();
        distributor.submit(handle, LearnRoute::DreamToThink);
        tokio::spawn(async move { completer.complete(true) });

        let kind = tokio::time::timeout(Duration::from_secs(5), consumer.dispatch_next())
            .await
            .unwrap();
        assert_eq!(kind, Some(NotificationKind::CorpusLearned));
        assert_eq!(*learned.borrow(), 1);

        distributor.shutdown();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
        assert!(distributor.stats().ticks > 0);
    }

    #[tokio::test]
    async fn restart_after_shutdown_delivers() {
        let (mut distributor, mut consumer) = ResultDistributor::new(Duration::from_millis(5));
        let learned = Rc::new(RefCell::new(Vec::new()));
        let sink = learned.clone();
        consumer
            .on_corpus_learned(move |success, _| sink.borrow_mut().push(success))
            .unwrap();

        let worker = distributor.start().unwrap();
        distributor.shutdown();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();

        let worker = distributor.start().unwrap();
        distributor.submit(ComputationHandle::ready(true), LearnRoute::Relearn);

        let kind = tokio::time::timeout(Duration::from_secs(5), consumer.dispatch_next())
            .await
            .unwrap();
        assert_eq!(kind, Some(NotificationKind::CorpusLearned));
        assert_eq!(*learned.borrow(), vec![true]);
        assert_eq!(distributor.pending(), 0);

        distributor.shutdown();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_distributor_stops_worker() {
        let (distributor, _consumer) = ResultDistributor::new(Duration::from_millis(5));
        let worker = distributor.start().unwrap();
        drop(distributor);

        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
