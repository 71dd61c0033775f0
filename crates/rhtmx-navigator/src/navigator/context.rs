//! Request, context and history-record types shared by the pipeline,
//! lifecycle hooks and blockers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::index::RouteEntry;
use crate::path::Location;

/// How a navigation was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationType {
    /// New history entry
    Push,
    /// Current history entry is replaced
    Replace,
    /// Back/forward through existing entries; history is not written
    Pop,
    /// Landing after an app-state change; replaces the current entry
    #[serde(rename = "state-change")]
    StateChange,
}

/// Direction of a pop navigation relative to the current entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Back,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

impl ScrollPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn top() -> Self {
        Self::default()
    }
}

/// Caller override for scroll handling after commit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollBehavior {
    /// Scroll to explicit coordinates
    To(ScrollPosition),
    /// Leave the scroll position untouched
    Preserve,
    /// Scroll to the top regardless of configuration
    Top,
}

/// Per-call navigation options
#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
    pub replace: bool,
    pub scroll: Option<ScrollBehavior>,
    /// Free-form payload stored on the history record
    pub data: Option<serde_json::Value>,
}

impl NavigateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn with_scroll(mut self, scroll: ScrollBehavior) -> Self {
        self.scroll = Some(scroll);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Record stored with every history entry the navigator writes
///
/// `marker` distinguishes navigator-written entries from foreign ones, `id`
/// is the attempt id that committed the entry (and the scroll-storage key),
/// and `position` is the entry's index used to derive pop direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    pub marker: bool,
    pub id: u64,
    pub position: u64,
    pub app_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// What hooks, blockers and observers see about a navigation
#[derive(Debug, Clone)]
pub struct NavigationContext {
    /// Attempt id of the pipeline run that produced this context
    pub navigation_id: u64,
    /// Location before the navigation, `None` for the first one
    pub from: Option<Location>,
    pub to: Location,
    pub route: Arc<RouteEntry>,
    pub params: HashMap<String, String>,
    pub navigation_type: NavigationType,
    pub direction: Direction,
    /// App state the route was matched in
    pub app_state: String,
    pub data: Option<serde_json::Value>,
}

impl NavigationContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_pop(&self) -> bool {
        self.navigation_type == NavigationType::Pop
    }
}

/// One navigation request as it flows through redirects
#[derive(Debug, Clone)]
pub(crate) struct NavigationRequest {
    pub path: String,
    pub navigation_type: NavigationType,
    pub direction: Direction,
    pub scroll: Option<ScrollBehavior>,
    pub data: Option<serde_json::Value>,
    /// Record delivered with a pop event
    pub history_state: Option<HistoryState>,
    /// Set once a blocker let this request through
    pub confirmed: bool,
}

impl NavigationRequest {
    pub fn new(path: impl Into<String>, options: NavigateOptions) -> Self {
        Self {
            path: path.into(),
            navigation_type: if options.replace {
                NavigationType::Replace
            } else {
                NavigationType::Push
            },
            direction: Direction::Unknown,
            scroll: options.scroll,
            data: options.data,
            history_state: None,
            confirmed: false,
        }
    }

    pub fn state_change(path: impl Into<String>) -> Self {
        Self {
            navigation_type: NavigationType::StateChange,
            ..Self::new(path, NavigateOptions::new().replace())
        }
    }

    pub fn pop(path: impl Into<String>, direction: Direction, state: Option<HistoryState>) -> Self {
        Self {
            path: path.into(),
            navigation_type: NavigationType::Pop,
            direction,
            scroll: None,
            data: state.as_ref().and_then(|s| s.data.clone()),
            history_state: state,
            confirmed: false,
        }
    }

    /// Continuation of this request towards a redirect target
    ///
    /// Keeps the type and replace flag; a pop continuation commits with
    /// replace since the browser already moved to the popped entry.
    pub fn redirect(&self, target: String) -> Self {
        let navigation_type = match self.navigation_type {
            NavigationType::Pop => NavigationType::Replace,
            other => other,
        };
        Self {
            path: target,
            navigation_type,
            history_state: None,
            ..self.clone()
        }
    }
}
