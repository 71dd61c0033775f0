//! App-state machine
//!
//! Holds the current app-state name and a monotonically increasing state id.
//! Every `set_state` call bumps the id, even when the name does not change;
//! the id is what in-flight navigations compare against to detect that the
//! app state moved under them.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Record of one state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub previous: String,
    pub current: String,
    pub id: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct StateMachine {
    current: RwLock<String>,
    last_transition: RwLock<Option<StateTransition>>,
    id: AtomicU64,
}

impl StateMachine {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(initial.into()),
            last_transition: RwLock::new(None),
            id: AtomicU64::new(0),
        }
    }

    /// Moves to `next`, returning the recorded transition
    pub fn set_state(&self, next: impl Into<String>) -> StateTransition {
        let next = next.into();
        let previous = std::mem::replace(&mut *self.current.write(), next.clone());
        let id = self.id.fetch_add(1, Ordering::SeqCst) + 1;

        let transition = StateTransition {
            previous,
            current: next,
            id,
            timestamp: Utc::now(),
        };

        tracing::debug!(
            previous = %transition.previous,
            current = %transition.current,
            state_id = id,
            "app state changed"
        );

        *self.last_transition.write() = Some(transition.clone());
        transition
    }

    pub fn current(&self) -> String {
        self.current.read().clone()
    }

    /// Name of the state before the last transition
    pub fn previous(&self) -> Option<String> {
        self.last_transition
            .read()
            .as_ref()
            .map(|t| t.previous.clone())
    }

    pub fn last_transition(&self) -> Option<StateTransition> {
        self.last_transition.read().clone()
    }

    pub fn state_id(&self) -> u64 {
        self.id.load(Ordering::SeqCst)
    }
}
