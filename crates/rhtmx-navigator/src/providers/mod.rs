//! Collaborator contracts the navigator drives
//!
//! The engine never touches a browser, a DOM or a store directly. Everything
//! observable goes through these traits; [`memory`] has in-process versions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::NavigationError;
use crate::index::RouteEntry;
use crate::layout::ResolvedLayout;
use crate::loader::Component;
use crate::navigator::{HistoryState, ScrollPosition};
use crate::path::Location;

pub mod memory;

pub use memory::{
    CollectingErrorSink, MemoryHistory, MemoryLocation, MemoryScroll, MemoryStorage,
    StaticConfirmation, TracingErrorSink,
};

/// Listener for back/forward events
pub type PopStateCallback = Arc<dyn Fn(Option<HistoryState>) + Send + Sync>;

/// Handle returned by subscriptions; unsubscribes when dropped
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Subscription with nothing to undo
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Session history and the address bar
pub trait HistoryProvider: Send + Sync {
    fn location(&self) -> Location;

    /// Record attached to the current entry, if any
    fn history_state(&self) -> Option<HistoryState>;

    /// Turns an app path into the URL written to history
    fn build_url(&self, path: &str) -> String;

    fn push(&self, url: &str, state: HistoryState);

    fn replace(&self, url: &str, state: HistoryState);

    fn go(&self, delta: i64);

    fn on_pop_state(&self, callback: PopStateCallback) -> Subscription;
}

/// Scroll positions and the intended-path slot
///
/// Implementations choose their own eviction policy.
pub trait StorageProvider: Send + Sync {
    fn save_scroll_position(&self, navigation_id: u64, position: ScrollPosition);

    fn scroll_position(&self, navigation_id: u64) -> Option<ScrollPosition>;

    fn save_intended_path(&self, path: &str);

    /// Returns and clears the remembered path
    fn pop_intended_path(&self) -> Option<String>;
}

/// Everything the view layer needs to render a committed route
#[derive(Clone)]
pub struct LocationUpdate {
    pub navigation_id: u64,
    pub location: Location,
    pub route: Arc<RouteEntry>,
    pub params: HashMap<String, String>,
    pub app_state: String,
    pub view: Component,
    pub layout: Option<ResolvedLayout>,
}

impl fmt::Debug for LocationUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationUpdate")
            .field("navigation_id", &self.navigation_id)
            .field("location", &self.location)
            .field("route", &self.route.path())
            .field("params", &self.params)
            .field("app_state", &self.app_state)
            .field("layout", &self.layout.as_ref().map(|l| l.id.as_str()))
            .finish()
    }
}

/// Reactive location state; only the pipeline writes to it
pub trait LocationSink: Send + Sync {
    fn update(&self, update: LocationUpdate);

    fn set_navigating(&self, navigating: bool);

    fn set_error(&self, error: Option<NavigationError>);

    fn clear_error(&self) {
        self.set_error(None);
    }
}

pub trait ScrollController: Send + Sync {
    fn position(&self) -> ScrollPosition;

    fn scroll_to(&self, position: ScrollPosition);

    /// Scrolls to the element with this id; `false` when there is none
    fn scroll_to_anchor(&self, id: &str) -> bool;
}

#[async_trait]
pub trait ConfirmationProvider: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Where an error reported to the [`ErrorSink`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Navigation,
    BeforeHook,
    OnHook,
    AfterHook,
    Render,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub source: ErrorSource,
    pub path: String,
    pub navigation_id: Option<u64>,
}

impl ErrorContext {
    pub fn new(source: ErrorSource, path: impl Into<String>, navigation_id: Option<u64>) -> Self {
        Self {
            source,
            path: path.into(),
            navigation_id,
        }
    }
}

/// Global error reporting
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, error: &NavigationError, context: &ErrorContext);
}
