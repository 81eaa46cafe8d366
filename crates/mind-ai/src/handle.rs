//! Handles to in-flight computations.
//!
//! Every `dream()` and query runs on its own blocking worker and reports
//! through a one-shot channel. The receiving end is a [`ComputationHandle`],
//! which can be polled without waiting (the distributor does this every tick)
//! or awaited directly.
//!
//! A computation that dies without reporting (its worker panicked, or the
//! runtime went away) resolves to the result type's failure value, so a
//! handle always settles.

use mind_core::Leaderboard;
use tokio::sync::oneshot::{self, error::TryRecvError};

/// Result types carried by a [`ComputationHandle`].
pub trait TaskOutput: Send + 'static {
    /// Value reported when the computation failed or never reported.
    fn failure() -> Self;

    /// Returns true if the value reports a successful computation.
    fn is_success(&self) -> bool;
}

impl TaskOutput for bool {
    fn failure() -> Self {
        false
    }

    fn is_success(&self) -> bool {
        *self
    }
}

impl TaskOutput for Leaderboard {
    fn failure() -> Self {
        Leaderboard::failed()
    }

    fn is_success(&self) -> bool {
        Leaderboard::is_success(self)
    }
}

#[derive(Debug)]
enum Slot<T> {
    Pending(oneshot::Receiver<T>),
    Ready(T),
    Taken,
}

/// Future-like token for one asynchronous computation.
///
/// Single use: the result can be taken once.
#[derive(Debug)]
pub struct ComputationHandle<T: TaskOutput> {
    slot: Slot<T>,
}

impl<T: TaskOutput> ComputationHandle<T> {
    /// Creates a pending handle and the completer that settles it.
    pub(crate) fn pending() -> (Self, Completer<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Slot::Pending(rx),
            },
            Completer { tx },
        )
    }

    /// A handle that is already settled with `value`.
    pub fn ready(value: T) -> Self {
        Self {
            slot: Slot::Ready(value),
        }
    }

    /// A handle that is already settled with the failure value.
    pub fn failed() -> Self {
        Self::ready(T::failure())
    }

    /// Zero-wait readiness check.
    ///
    /// Returns true once the result is available (or was already taken).
    pub fn is_ready(&mut self) -> bool {
        if let Slot::Pending(rx) = &mut self.slot {
            match rx.try_recv() {
                Ok(value) => self.slot = Slot::Ready(value),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Closed) => self.slot = Slot::Ready(T::failure()),
            }
        }
        true
    }

    /// Takes the result if it is ready.
    ///
    /// Yields `Some` at most once over the life of the handle.
    pub fn try_take(&mut self) -> Option<T> {
        if !self.is_ready() {
            return None;
        }
        match std::mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if the result was already taken.
    pub fn is_taken(&self) -> bool {
        matches!(self.slot, Slot::Taken)
    }

    /// Waits for the result.
    ///
    /// A handle whose result was already taken resolves to the failure value.
    pub async fn wait(self) -> T {
        match self.slot {
            Slot::Pending(rx) => rx.await.unwrap_or_else(|_| T::failure()),
            Slot::Ready(value) => value,
            Slot::Taken => T::failure(),
        }
    }
}

/// Sending side of a [`ComputationHandle`].
///
/// Dropping it without calling [`complete`](Self::complete) settles the
/// handle with the failure value.
#[derive(Debug)]
pub(crate) struct Completer<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Completer<T> {
    /// Settles the handle. A discarded handle is not an error.
    pub(crate) fn complete(self, value: T) {
        let _ = self.tx.send(value);
    }
}
