//! # RHTMX Navigator
//!
//! A state-aware client-side navigation engine:
//! - Bracket route patterns (`/users/[id]`, `/posts/[slug?]`, `/docs/[...path]`,
//!   `/files/[...path?]`) compiled into scored matchers
//! - One route table per app state (guest, authenticated, ...) with default
//!   paths, redirects and "wrong state" diagnostics
//! - Layouts cached by a stable identity
//! - Before/on/after lifecycle hooks and confirmation blockers
//! - A nine-phase navigation pipeline that cancels superseded attempts and
//!   attempts overtaken by an app-state change
//!
//! ## Route Scoring
//!
//! Each segment contributes to a route's score; higher scores match first,
//! ties keep declaration order:
//!
//! | Segment            | Example          | Score |
//! |--------------------|------------------|-------|
//! | static             | `users`          | 100   |
//! | required           | `[id]`           | 10    |
//! | optional           | `[id?]`          | 5     |
//! | catch-all          | `[...path]`      | 2     |
//! | optional catch-all | `[...path?]`     | 1     |
//!
//! ## Example
//!
//! ```
//! use rhtmx_navigator::{
//!     ComponentLoader, MemoryLocation, Navigator, RouteDefinition, RouteIndex, StateConfig,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let view = |id: &str| ComponentLoader::ready(id, id.to_string());
//! let index = RouteIndex::new([(
//!     "authenticated",
//!     StateConfig::new()
//!         .with_route(RouteDefinition::new("/projects/[id]", view("project")))
//!         .with_route(RouteDefinition::new("/projects/new", view("new-project")))
//!         .with_default_path("/projects/new"),
//! )])
//! .unwrap();
//!
//! let location = Arc::new(MemoryLocation::new());
//! let navigator = Navigator::builder(index, "authenticated")
//!     .location(location.clone())
//!     .build();
//!
//! let context = navigator.navigate("/projects/42").await.unwrap();
//! assert_eq!(context.param("id"), Some("42"));
//! assert_eq!(location.current_path().as_deref(), Some("/projects/42"));
//! # }
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod blocker;
pub mod config;
pub mod error;
pub mod index;
pub mod layout;
pub mod lifecycle;
pub mod loader;
pub mod navigator;
pub mod path;
pub mod providers;
pub mod route;
pub mod state;
pub mod validate;

// ============================================================================
// Re-exports
// ============================================================================

pub use blocker::{ConfirmationBlocker, NavigationBlocker};
pub use config::NavigationConfig;
pub use error::{ConfigError, ErrorCode, LayoutError, NavigationError};
pub use index::{
    ContextData, DefaultPath, MatchOutcome, RouteDefinition, RouteEntry, RouteIndex, RouteMatch,
    StateConfig,
};
pub use layout::{LayoutResolver, ResolvedLayout};
pub use lifecycle::{BeforeNavigate, HookId, NavigationLifecycle};
pub use loader::{BoxFuture, Component, ComponentLoader, LayoutConfig};
pub use navigator::{
    Direction, HistoryState, NavigateOptions, NavigationContext, NavigationType, Navigator,
    NavigatorBuilder, ObserverId, RestoreUrl, ScrollBehavior, ScrollPosition,
};
pub use path::Location;
pub use providers::{
    CollectingErrorSink, ConfirmationProvider, ErrorContext, ErrorSink, ErrorSource,
    HistoryProvider, LocationSink, LocationUpdate, MemoryHistory, MemoryLocation, MemoryScroll,
    MemoryStorage, ScrollController, StaticConfirmation, StorageProvider, Subscription,
    TracingErrorSink,
};
pub use route::{compile, PatternSegment, RoutePattern};
pub use state::{StateMachine, StateTransition};
pub use validate::{validate_state, validate_states};
