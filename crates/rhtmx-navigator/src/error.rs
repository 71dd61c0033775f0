//! Error types for configuration, layout loading and navigation
//!
//! Two families live here:
//! - [`ConfigError`] is raised while building route tables and is fatal to startup.
//! - [`NavigationError`] is the single error shape every failed navigation attempt
//!   produces, tagged with exactly one [`ErrorCode`].

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Shared, clonable error cause
pub type SharedCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Configuration-time errors raised while compiling or validating routes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("route pattern `{pattern}` must start with `/`")]
    MissingLeadingSlash { pattern: String },

    #[error("route pattern `{pattern}` has a malformed segment `{segment}`")]
    MalformedSegment { pattern: String, segment: String },

    #[error("catch-all segment `{segment}` must be the last segment of `{pattern}`")]
    CatchAllNotLast { pattern: String, segment: String },

    #[error("parameter `{param}` appears more than once in `{pattern}`")]
    DuplicateParam { pattern: String, param: String },

    #[error("path `{path}` is declared more than once in state `{state}`")]
    DuplicatePath { state: String, path: String },

    #[error("redirect `{path}` in state `{state}` points at itself")]
    SelfRedirect { state: String, path: String },

    #[error("state names must not be empty")]
    EmptyStateName,
}

/// Layout loading failure, annotated with the layout identity
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("failed to load layout `{layout_id}`")]
    LoadFailed {
        layout_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LayoutError {
    /// Identity of the layout whose loader failed
    pub fn layout_id(&self) -> &str {
        match self {
            LayoutError::LoadFailed { layout_id, .. } => layout_id,
        }
    }
}

/// Error code attached to every failed navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Superseded by a newer attempt or an app-state change
    Cancelled,
    /// A before-navigate hook denied the navigation
    Aborted,
    /// The user declined a confirmation
    Blocked,
    /// No route anywhere matches
    NotFound,
    /// The route exists only in another app state and no default exists
    StateMismatch,
    /// Loading the view or layout failed
    LoadFailed,
    /// The redirect loop guard tripped
    TooManyRedirects,
    /// The view layer failed to render a committed route
    RenderError,
}

impl ErrorCode {
    /// Visual errors are shown to the end user; the rest are flow control only
    pub fn is_visual(self) -> bool {
        !matches!(self, ErrorCode::Cancelled | ErrorCode::Blocked)
    }

    /// Only load failures are worth retrying
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCode::LoadFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Aborted => "aborted",
            ErrorCode::Blocked => "blocked",
            ErrorCode::NotFound => "not-found",
            ErrorCode::StateMismatch => "state-mismatch",
            ErrorCode::LoadFailed => "load-failed",
            ErrorCode::TooManyRedirects => "too-many-redirects",
            ErrorCode::RenderError => "render-error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error produced by a failed navigation attempt
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct NavigationError {
    pub code: ErrorCode,
    pub message: String,
    /// The path the attempt was navigating to
    pub path: String,
    #[source]
    pub cause: Option<SharedCause>,
}

impl NavigationError {
    pub fn new(code: ErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: path.into(),
            cause: None,
        }
    }

    /// Attaches the underlying failure
    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = cause.into();
        self.cause = Some(Arc::from(boxed));
        self
    }

    pub fn cancelled(path: impl Into<String>) -> Self {
        Self::new(ErrorCode::Cancelled, path, "navigation superseded")
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!("no route matches `{}`", path);
        Self::new(ErrorCode::NotFound, path, message)
    }

    pub fn too_many_redirects(path: impl Into<String>, limit: usize) -> Self {
        let path = path.into();
        let message = format!("more than {} redirects while navigating to `{}`", limit, path);
        Self::new(ErrorCode::TooManyRedirects, path, message)
    }

    pub fn is_visual(&self) -> bool {
        self.code.is_visual()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}
