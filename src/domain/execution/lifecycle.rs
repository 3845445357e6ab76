//! Transaction lifecycle state machine
//!
//! `Idle -> Building -> Signing -> Confirming -> {Success, Error}`. Building may
//! fail into `Error` or be abandoned back to `Idle`; terminal states reset to `Idle`.
//! State changes are published on a `watch` channel for the UI.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Idle,
    Building,
    Signing,
    Confirming,
    Success,
    Error,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Building)
                | (Building, Signing)
                | (Building, Error)
                | (Building, Idle)
                | (Signing, Confirming)
                | (Signing, Error)
                | (Confirming, Success)
                | (Confirming, Error)
                | (Success, Idle)
                | (Error, Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Success | LifecycleState::Error)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Building => "building",
            LifecycleState::Signing => "signing",
            LifecycleState::Confirming => "confirming",
            LifecycleState::Success => "success",
            LifecycleState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid lifecycle transition {from} -> {to}")]
pub struct LifecycleError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Shared handle over one action's lifecycle
#[derive(Debug, Clone)]
pub struct TransactionLifecycle {
    sender: Arc<watch::Sender<LifecycleState>>,
}

impl Default for TransactionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLifecycle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(LifecycleState::Idle);
        Self { sender: Arc::new(sender) }
    }

    pub fn state(&self) -> LifecycleState {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.sender.subscribe()
    }

    pub fn advance(&self, next: LifecycleState) -> Result<(), LifecycleError> {
        let mut outcome = Ok(());
        self.sender.send_if_modified(|state| {
            if state.can_transition_to(next) {
                debug!("Lifecycle {} -> {}", state, next);
                *state = next;
                true
            } else {
                outcome = Err(LifecycleError { from: *state, to: next });
                false
            }
        });
        outcome
    }

    /// Move to `Error` from wherever the action currently is
    pub fn fail(&self) {
        let current = self.state();
        if current == LifecycleState::Confirming
            || current == LifecycleState::Signing
            || current == LifecycleState::Building
        {
            let _ = self.advance(LifecycleState::Error);
        }
    }

    /// Return a finished action to `Idle`
    pub fn reset(&self) {
        if self.state().is_terminal() {
            let _ = self.advance(LifecycleState::Idle);
        }
    }
}
