//! Service lifecycle state machine.
//!
//! # States
//! - Created: built, never started
//! - Starting: pools and listener being set up
//! - Running: accepting connections
//! - Stopping: listener closed, connections draining, pools shutting down
//! - Stopped: fully released
//! - StartFailed: startup failed, resources released
//!
//! # State Transitions
//! ```text
//! Created  → Starting     start()
//! Starting → Running      listener bound, pools up
//! Starting → Stopping     bind or pool failure
//! Running  → Stopping     stop() or acceptance loop ended
//! Stopping → Stopped | StartFailed
//! Created  → Stopped      stop() before start()
//! ```
//!
//! # Design Decisions
//! - Transitions are compare-and-set under one mutex
//! - Waiters block on a condvar instead of polling

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Where the service is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    StartFailed,
}

impl LifecycleState {
    /// No further transitions happen from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::StartFailed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::StartFailed => "start failed",
        };
        f.write_str(s)
    }
}

/// Shared, blocking-waitable lifecycle state.
#[derive(Debug)]
pub struct StateCell {
    state: Mutex<LifecycleState>,
    changed: Condvar,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Created),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> LifecycleState {
        *self.lock()
    }

    /// Move `from → to`. Returns the actual state when it is not `from`.
    pub fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleState> {
        let mut state = self.lock();
        if *state != from {
            return Err(*state);
        }
        *state = to;
        drop(state);
        tracing::debug!(from = %from, to = %to, "Lifecycle transition");
        self.changed.notify_all();
        Ok(())
    }

    /// Unconditionally set the state.
    pub fn set(&self, to: LifecycleState) {
        let mut state = self.lock();
        let from = std::mem::replace(&mut *state, to);
        drop(state);
        tracing::debug!(from = %from, to = %to, "Lifecycle transition");
        self.changed.notify_all();
    }

    /// Handle a stop request. Returns the state observed before the request.
    ///
    /// A service that never started goes straight to `Stopped`; any other
    /// state is left to the thread running `start()`.
    pub fn request_stop(&self) -> LifecycleState {
        let mut state = self.lock();
        let observed = *state;
        if observed == LifecycleState::Created {
            *state = LifecycleState::Stopped;
            drop(state);
            tracing::debug!(from = %observed, to = %LifecycleState::Stopped, "Lifecycle transition");
            self.changed.notify_all();
        }
        observed
    }

    /// Block until `pred` holds or `timeout` elapses. Returns the last state seen.
    pub fn wait_until<F>(&self, pred: F, timeout: Option<Duration>) -> LifecycleState
    where
        F: Fn(LifecycleState) -> bool,
    {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();
        while !pred(*state) {
            match deadline {
                None => {
                    state = self
                        .changed
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    state = self
                        .changed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
        *state
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
