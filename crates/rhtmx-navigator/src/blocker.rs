//! Navigation blockers
//!
//! A blocker is consulted after the route is matched and before any hook
//! runs. [`ConfirmationBlocker`] is the usual one: components register a
//! guard while they hold unsaved state, and navigation then needs the user's
//! confirmation.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::config::NavigationConfig;
use crate::navigator::NavigationContext;
use crate::providers::ConfirmationProvider;

#[async_trait]
pub trait NavigationBlocker: Send + Sync {
    /// `false` vetoes the navigation
    async fn allow(&self, context: &NavigationContext) -> bool;
}

type Guard = Arc<dyn Fn(&NavigationContext) -> bool + Send + Sync>;

/// Asks for confirmation while any registered guard is active
pub struct ConfirmationBlocker {
    guards: RwLock<Vec<(String, Guard)>>,
    confirmation: Arc<dyn ConfirmationProvider>,
    message: String,
}

impl ConfirmationBlocker {
    pub fn new(confirmation: Arc<dyn ConfirmationProvider>, message: impl Into<String>) -> Self {
        Self {
            guards: RwLock::new(Vec::new()),
            confirmation,
            message: message.into(),
        }
    }

    /// Blocker using the configured confirmation message
    pub fn from_config(confirmation: Arc<dyn ConfirmationProvider>, config: &NavigationConfig) -> Self {
        Self::new(confirmation, config.confirm_message.clone())
    }

    /// Registers a guard, replacing any guard with the same id
    pub fn block<F>(&self, id: impl Into<String>, predicate: F)
    where
        F: Fn(&NavigationContext) -> bool + Send + Sync + 'static,
    {
        let id = id.into();
        let mut guards = self.guards.write();
        guards.retain(|(existing, _)| *existing != id);
        guards.push((id, Arc::new(predicate)));
    }

    /// Registers a guard that is active for every navigation
    pub fn block_always(&self, id: impl Into<String>) {
        self.block(id, |_| true);
    }

    pub fn unblock(&self, id: &str) -> bool {
        let mut guards = self.guards.write();
        let before = guards.len();
        guards.retain(|(existing, _)| existing != id);
        guards.len() != before
    }

    /// Whether any guard wants confirmation for this navigation
    pub fn is_blocking(&self, context: &NavigationContext) -> bool {
        let guards: Vec<Guard> = self.guards.read().iter().map(|(_, g)| Arc::clone(g)).collect();
        guards.iter().any(|guard| guard(context))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ConfirmationBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.guards.read().iter().map(|(id, _)| id.clone()).collect();
        f.debug_struct("ConfirmationBlocker")
            .field("guards", &ids)
            .field("message", &self.message)
            .finish()
    }
}

#[async_trait]
impl NavigationBlocker for ConfirmationBlocker {
    async fn allow(&self, context: &NavigationContext) -> bool {
        if !self.is_blocking(context) {
            return true;
        }

        let confirmed = self.confirmation.confirm(&self.message).await;
        tracing::debug!(path = %context.to, confirmed, "navigation confirmation");
        confirmed
    }
}
