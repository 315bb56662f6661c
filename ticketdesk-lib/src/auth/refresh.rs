//! Single-flight coordination of token refreshes.
//!
//! When several requests hit a 401 at once, only the first one (the leader)
//! calls the refresh endpoint. Everyone else parks a continuation in a FIFO
//! queue and is settled with the leader's outcome: the new access token, or
//! the error that tore the session down.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use tokio::sync::oneshot;

use crate::error::RefreshError;

/// Outcome of a refresh: the new access token or the shared failure.
pub type RefreshOutcome = Result<String, RefreshError>;

/// Coordinates token refreshes so at most one is in flight.
///
/// The coordinator is a two-state machine, `IDLE` and `REFRESHING`. Its only
/// mutators are [`acquire_refresh_or_enqueue`](Self::acquire_refresh_or_enqueue)
/// and [`RefreshGuard::settle`]. The check-and-set of the refreshing flag
/// happens under a lock with no suspension point, and continuations are
/// invoked only after the lock is released.
///
/// # Example
///
/// ```
/// use ticketdesk_lib::auth::{Acquire, RefreshCoordinator};
///
/// let coordinator = RefreshCoordinator::new();
///
/// let Acquire::Leader(guard) = coordinator.acquire_refresh_or_enqueue() else {
///     unreachable!("the first caller leads");
/// };
/// assert!(coordinator.is_refreshing());
///
/// let Acquire::Follower(_pending) = coordinator.acquire_refresh_or_enqueue() else {
///     unreachable!("a refresh is already in flight");
/// };
/// assert_eq!(coordinator.pending(), 1);
///
/// guard.settle(Ok("T2".to_string()));
/// assert!(!coordinator.is_refreshing());
/// assert_eq!(coordinator.pending(), 0);
/// ```
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<CoordinatorState>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    refreshing: bool,
    /// Suspended callers in arrival order. Non-empty only while `refreshing`.
    pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// What a caller that observed a 401 should do next.
#[derive(Debug)]
pub enum Acquire<'a> {
    /// No refresh was in flight; this caller must perform it and settle the guard.
    Leader(RefreshGuard<'a>),
    /// A refresh is already in flight; wait for its outcome.
    Follower(PendingRefresh),
}

impl RefreshCoordinator {
    /// Creates an idle coordinator with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `IDLE -> REFRESHING` and returns the leader guard, or enqueues
    /// the caller behind the refresh already in flight.
    pub fn acquire_refresh_or_enqueue(&self) -> Acquire<'_> {
        let mut state = self.lock();

        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push_back(tx);
            Acquire::Follower(PendingRefresh { rx })
        } else {
            state.refreshing = true;
            Acquire::Leader(RefreshGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Returns `true` while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Returns the number of callers waiting for the in-flight refresh.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Drains the queue and returns to `IDLE` in one step, then settles every
    /// drained caller in arrival order. Returns how many callers were settled.
    fn settle(&self, outcome: &RefreshOutcome) -> usize {
        let drained = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        let count = drained.len();
        for waiter in drained {
            // A caller that gave up waiting has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the holder is the one caller performing the refresh.
///
/// Settling the guard resolves or rejects every queued caller and returns the
/// coordinator to `IDLE`. Dropping it unsettled (the leader's task was
/// cancelled or panicked) rejects the queue with [`RefreshError::Abandoned`],
/// so the coordinator can never be left stuck in `REFRESHING`.
#[derive(Debug)]
#[must_use = "an unsettled guard rejects every queued caller when dropped"]
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Settles the in-flight refresh with `outcome`.
    ///
    /// Returns the number of queued callers that were settled.
    pub fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.settle(&outcome)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(RefreshError::Abandoned));
        }
    }
}

/// A caller suspended behind another caller's refresh.
#[derive(Debug)]
pub struct PendingRefresh {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl PendingRefresh {
    /// Waits for the in-flight refresh to settle.
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    /// Returns the outcome if the refresh has already settled.
    pub fn try_outcome(&mut self) -> Option<RefreshOutcome> {
        self.rx.try_recv().ok()
    }
}
