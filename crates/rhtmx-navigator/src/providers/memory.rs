//! In-process collaborators
//!
//! Used by default when a navigator is built without explicit providers, and
//! by tests. Nothing here persists beyond the process.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{
    ConfirmationProvider, ErrorContext, ErrorSink, HistoryProvider, LocationSink, LocationUpdate,
    PopStateCallback, ScrollController, StorageProvider, Subscription,
};
use crate::error::{ErrorCode, NavigationError};
use crate::navigator::{HistoryState, ScrollPosition};
use crate::path::{split_path, Location};

/// Default number of scroll positions kept by [`MemoryStorage`]
pub const DEFAULT_SCROLL_CAPACITY: usize = 100;

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone)]
struct HistoryEntry {
    url: String,
    state: Option<HistoryState>,
}

#[derive(Debug)]
struct HistoryStack {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

type Listeners = Arc<Mutex<Vec<(u64, PopStateCallback)>>>;

/// Entry stack with a cursor, like a browser tab's session history
///
/// `go` moves the cursor and notifies pop-state listeners synchronously;
/// `push` drops every entry after the cursor.
pub struct MemoryHistory {
    base: String,
    stack: Mutex<HistoryStack>,
    listeners: Listeners,
    next_listener: AtomicU64,
}

impl MemoryHistory {
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            base: String::new(),
            stack: Mutex::new(HistoryStack {
                entries: vec![HistoryEntry {
                    url: initial_path.into(),
                    state: None,
                }],
                cursor: 0,
            }),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Prefix prepended by [`HistoryProvider::build_url`]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// URLs of all entries, oldest first
    pub fn urls(&self) -> Vec<String> {
        self.stack
            .lock()
            .entries
            .iter()
            .map(|e| e.url.clone())
            .collect()
    }

    pub fn cursor(&self) -> usize {
        self.stack.lock().cursor
    }

    pub fn len(&self) -> usize {
        self.stack.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.lock().entries.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn strip_base<'a>(&self, url: &'a str) -> &'a str {
        if self.base.is_empty() {
            return url;
        }
        match url.strip_prefix(self.base.as_str()) {
            Some("") => "/",
            Some(rest) => rest,
            None => url,
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HistoryProvider for MemoryHistory {
    fn location(&self) -> Location {
        let url = {
            let stack = self.stack.lock();
            stack.entries[stack.cursor].url.clone()
        };
        split_path(self.strip_base(&url))
    }

    fn history_state(&self) -> Option<HistoryState> {
        let stack = self.stack.lock();
        stack.entries[stack.cursor].state.clone()
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn push(&self, url: &str, state: HistoryState) {
        let mut stack = self.stack.lock();
        let keep = stack.cursor + 1;
        stack.entries.truncate(keep);
        stack.entries.push(HistoryEntry {
            url: url.to_string(),
            state: Some(state),
        });
        stack.cursor = stack.entries.len() - 1;
    }

    fn replace(&self, url: &str, state: HistoryState) {
        let mut stack = self.stack.lock();
        let cursor = stack.cursor;
        stack.entries[cursor] = HistoryEntry {
            url: url.to_string(),
            state: Some(state),
        };
    }

    fn go(&self, delta: i64) {
        let state = {
            let mut stack = self.stack.lock();
            let target = stack.cursor as i64 + delta;
            if delta == 0 || target < 0 || target >= stack.entries.len() as i64 {
                return;
            }
            stack.cursor = target as usize;
            stack.entries[stack.cursor].state.clone()
        };

        // Snapshot so listeners may unsubscribe while being notified
        let listeners: Vec<PopStateCallback> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for listener in listeners {
            listener(state.clone());
        }
    }

    fn on_pop_state(&self, callback: PopStateCallback) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, callback));

        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            listeners.lock().retain(|(listener_id, _)| *listener_id != id);
        })
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Default)]
struct ScrollCache {
    positions: HashMap<u64, ScrollPosition>,
    order: VecDeque<u64>,
}

impl ScrollCache {
    fn touch(&mut self, key: u64) {
        self.order.retain(|k| *k != key);
        self.order.push_back(key);
    }
}

/// Scroll positions in a bounded LRU plus a single intended-path slot
#[derive(Debug)]
pub struct MemoryStorage {
    capacity: usize,
    scroll: Mutex<ScrollCache>,
    intended_path: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SCROLL_CAPACITY)
    }

    /// Storage keeping at most `capacity` scroll positions
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            scroll: Mutex::new(ScrollCache::default()),
            intended_path: Mutex::new(None),
        }
    }

    /// Number of stored scroll positions
    pub fn size(&self) -> usize {
        self.scroll.lock().positions.len()
    }

    /// Peeks at the intended path without clearing it
    pub fn intended_path(&self) -> Option<String> {
        self.intended_path.lock().clone()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageProvider for MemoryStorage {
    fn save_scroll_position(&self, navigation_id: u64, position: ScrollPosition) {
        let mut cache = self.scroll.lock();
        cache.positions.insert(navigation_id, position);
        cache.touch(navigation_id);

        while cache.order.len() > self.capacity {
            if let Some(evicted) = cache.order.pop_front() {
                cache.positions.remove(&evicted);
            }
        }
    }

    fn scroll_position(&self, navigation_id: u64) -> Option<ScrollPosition> {
        let mut cache = self.scroll.lock();
        let position = cache.positions.get(&navigation_id).copied()?;
        cache.touch(navigation_id);
        Some(position)
    }

    fn save_intended_path(&self, path: &str) {
        *self.intended_path.lock() = Some(path.to_string());
    }

    fn pop_intended_path(&self) -> Option<String> {
        self.intended_path.lock().take()
    }
}

// ============================================================================
// Location state
// ============================================================================

#[derive(Debug, Default)]
struct LocationState {
    current: Option<LocationUpdate>,
    navigating: bool,
    error: Option<NavigationError>,
    published: Vec<String>,
}

/// Mirror of the reactive location state
#[derive(Debug, Default)]
pub struct MemoryLocation {
    state: RwLock<LocationState>,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<LocationUpdate> {
        self.state.read().current.clone()
    }

    /// Full path of the last published location
    pub fn current_path(&self) -> Option<String> {
        self.state
            .read()
            .current
            .as_ref()
            .map(|update| update.location.full_path())
    }

    pub fn is_navigating(&self) -> bool {
        self.state.read().navigating
    }

    pub fn error(&self) -> Option<NavigationError> {
        self.state.read().error.clone()
    }

    /// Every published path, in publication order
    pub fn published(&self) -> Vec<String> {
        self.state.read().published.clone()
    }
}

impl LocationSink for MemoryLocation {
    fn update(&self, update: LocationUpdate) {
        let mut state = self.state.write();
        state.published.push(update.location.full_path());
        state.current = Some(update);
    }

    fn set_navigating(&self, navigating: bool) {
        self.state.write().navigating = navigating;
    }

    fn set_error(&self, error: Option<NavigationError>) {
        self.state.write().error = error;
    }
}

// ============================================================================
// Scroll
// ============================================================================

/// Scroll controller over a virtual viewport
#[derive(Debug, Default)]
pub struct MemoryScroll {
    position: Mutex<ScrollPosition>,
    anchors: HashSet<String>,
    last_anchor: Mutex<Option<String>>,
}

impl MemoryScroll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an element id that anchor scrolling can find
    pub fn with_anchor(mut self, id: impl Into<String>) -> Self {
        self.anchors.insert(id.into());
        self
    }

    /// Simulates the user scrolling
    pub fn set_position(&self, position: ScrollPosition) {
        *self.position.lock() = position;
    }

    pub fn last_anchor(&self) -> Option<String> {
        self.last_anchor.lock().clone()
    }
}

impl ScrollController for MemoryScroll {
    fn position(&self) -> ScrollPosition {
        *self.position.lock()
    }

    fn scroll_to(&self, position: ScrollPosition) {
        *self.position.lock() = position;
    }

    fn scroll_to_anchor(&self, id: &str) -> bool {
        if !self.anchors.contains(id) {
            return false;
        }
        *self.last_anchor.lock() = Some(id.to_string());
        true
    }
}

// ============================================================================
// Confirmation and error sinks
// ============================================================================

/// Confirmation provider that always gives the same answer
#[derive(Debug)]
pub struct StaticConfirmation {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl StaticConfirmation {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Messages the provider was asked to confirm
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl ConfirmationProvider for StaticConfirmation {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.lock().push(message.to_string());
        self.answer
    }
}

/// Default error sink: logs every error
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn on_error(&self, error: &NavigationError, context: &ErrorContext) {
        tracing::error!(
            code = %error.code,
            path = %context.path,
            navigation_id = ?context.navigation_id,
            source = ?context.source,
            cause = ?error.cause.as_ref().map(|c| c.to_string()),
            "{}",
            error.message
        );
    }
}

/// Error sink that keeps everything it receives
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    errors: Mutex<Vec<(NavigationError, ErrorContext)>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<(NavigationError, ErrorContext)> {
        self.errors.lock().clone()
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.errors.lock().iter().map(|(e, _)| e.code).collect()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn on_error(&self, error: &NavigationError, context: &ErrorContext) {
        self.errors.lock().push((error.clone(), context.clone()));
    }
}
