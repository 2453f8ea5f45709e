//! # Task Futures
//!
//! A [`TaskFuture`] is the submitter's handle on work queued in a
//! [`WorkerPool`](super::worker_pool::WorkerPool). The executing worker is the
//! only writer; any number of readers may block in [`TaskFuture::get`] and all
//! of them observe the same terminal outcome.

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::worker_pool;
use crate::error::{CheckError, Result};

/// Observable lifecycle of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl FutureState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FutureState::Completed | FutureState::Failed)
    }
}

enum Slot<T> {
    Pending,
    Running,
    Completed(T),
    Failed(CheckError),
}

impl<T> Slot<T> {
    fn state(&self) -> FutureState {
        match self {
            Slot::Pending => FutureState::Pending,
            Slot::Running => FutureState::Running,
            Slot::Completed(_) => FutureState::Completed,
            Slot::Failed(_) => FutureState::Failed,
        }
    }

    fn outcome(&self) -> Option<Result<T>>
    where
        T: Clone,
    {
        match self {
            Slot::Completed(value) => Some(Ok(value.clone())),
            Slot::Failed(error) => Some(Err(error.clone())),
            Slot::Pending | Slot::Running => None,
        }
    }
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
    pool_id: u64,
}

/// Handle on the eventual result of a submitted task
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFuture")
            .field("state", &self.state())
            .field("pool_id", &self.shared.pool_id)
            .finish()
    }
}

impl<T> TaskFuture<T> {
    /// Create a pending future and the completer its worker will settle it with
    pub(crate) fn pending(pool_id: u64) -> (Self, Completer<T>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Pending),
            settled: Condvar::new(),
            pool_id,
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Completer {
                shared,
                settled: false,
            },
        )
    }

    pub fn state(&self) -> FutureState {
        self.shared.slot.lock().state()
    }

    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Block until the task finishes, then return its value or its failure.
    ///
    /// Safe to call repeatedly and from several threads at once.
    pub fn get(&self) -> Result<T>
    where
        T: Clone,
    {
        self.guard_self_blocking()?;

        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = slot.outcome() {
                return outcome;
            }
            self.shared.settled.wait(&mut slot);
        }
    }

    /// Like [`get`](Self::get) but gives up after `timeout`.
    ///
    /// Expiry leaves the task untouched; it keeps running and a later `get`
    /// still observes its outcome.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T>
    where
        T: Clone,
    {
        self.guard_self_blocking()?;

        // A deadline past the end of the clock never expires
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.get();
        };
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = slot.outcome() {
                return outcome;
            }
            if self
                .shared
                .settled
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return slot.outcome().unwrap_or_else(|| {
                    Err(CheckError::timeout("task result", timeout.as_secs_f64()))
                });
            }
        }
    }

    /// A worker blocking on its own pool can exhaust the pool's capacity and
    /// deadlock every worker, so that pattern is refused outright.
    fn guard_self_blocking(&self) -> Result<()> {
        match worker_pool::current_worker() {
            Some((pool_id, worker)) if pool_id == self.shared.pool_id => {
                Err(CheckError::SelfBlocking { worker })
            }
            _ => Ok(()),
        }
    }
}

/// Write side of a [`TaskFuture`], owned by the queued task.
///
/// Dropping a completer that never settled (the task was discarded with the
/// queue) fails the future with [`CheckError::PoolShutDown`].
pub(crate) struct Completer<T> {
    shared: Arc<Shared<T>>,
    settled: bool,
}

impl<T> Completer<T> {
    pub(crate) fn mark_running(&self) {
        let mut slot = self.shared.slot.lock();
        if let Slot::Pending = *slot {
            *slot = Slot::Running;
        }
    }

    pub(crate) fn complete(mut self, outcome: Result<T>) {
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: Result<T>) {
        if self.settled {
            return;
        }
        self.settled = true;

        let mut slot = self.shared.slot.lock();
        *slot = match outcome {
            Ok(value) => Slot::Completed(value),
            Err(error) => Slot::Failed(error),
        };
        drop(slot);
        self.shared.settled.notify_all();
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Err(CheckError::PoolShutDown));
        }
    }
}
