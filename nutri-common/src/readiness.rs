//! Readiness state published by the ingestion pipeline
//!
//! Readiness is the only signal shared between the ingestion task and the
//! rest of the process. It is a three-state machine held in a
//! `tokio::sync::watch` channel, so late subscribers always observe the
//! current state and never miss a transition that already happened.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// How far the store's contents have been loaded
///
/// States are ordered: `Uninitialized < BasicReady < FullReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// Nothing loaded yet (or a reset is in progress)
    Uninitialized,
    /// Identity fields loaded; scored fields may still be null
    BasicReady,
    /// Every parsed row carries its full set of fields
    FullReady,
}

impl ReadinessState {
    pub fn basic_ready(self) -> bool {
        self >= ReadinessState::BasicReady
    }

    pub fn full_ready(self) -> bool {
        self == ReadinessState::FullReady
    }
}

/// Publisher of [`ReadinessState`]
///
/// Cloning yields another handle to the same channel.
///
/// # Examples
///
/// ```
/// use nutri_common::{ReadinessPublisher, ReadinessState};
///
/// let readiness = ReadinessPublisher::new();
/// let rx = readiness.subscribe();
///
/// readiness.advance(ReadinessState::BasicReady);
/// assert!(rx.borrow().basic_ready());
///
/// // Never moves backwards within a run
/// readiness.advance(ReadinessState::Uninitialized);
/// assert_eq!(readiness.current(), ReadinessState::BasicReady);
///
/// readiness.reset();
/// assert_eq!(readiness.current(), ReadinessState::Uninitialized);
/// ```
#[derive(Debug, Clone)]
pub struct ReadinessPublisher {
    tx: Arc<watch::Sender<ReadinessState>>,
}

impl Default for ReadinessPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessPublisher {
    /// New publisher in the `Uninitialized` state
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ReadinessState::Uninitialized);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> ReadinessState {
        *self.tx.borrow()
    }

    pub fn basic_ready(&self) -> bool {
        self.current().basic_ready()
    }

    pub fn full_ready(&self) -> bool {
        self.current().full_ready()
    }

    /// Receiver observing the current state and every later change
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.tx.subscribe()
    }

    /// Move forward to `to`
    ///
    /// A request to move to an earlier (or the same) state is ignored.
    /// Returns whether the state changed.
    pub fn advance(&self, to: ReadinessState) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if to > *state {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            info!(state = ?to, "Readiness advanced");
        }
        changed
    }

    /// Return to `Uninitialized`
    pub fn reset(&self) {
        let changed = self.tx.send_if_modified(|state| {
            let changed = *state != ReadinessState::Uninitialized;
            *state = ReadinessState::Uninitialized;
            changed
        });
        if changed {
            info!("Readiness reset");
        }
    }

    /// Wait until the state is at least `target`
    pub async fn wait_until(&self, target: ReadinessState) -> ReadinessState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| *state >= target).await {
            Ok(state) => *state,
            // Sender lives as long as `self`
            Err(_) => self.current(),
        };
        state
    }
}
