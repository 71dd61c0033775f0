//! The navigation pipeline
//!
//! Every navigation runs the same nine phases in order:
//!
//! 1. initiate: new attempt id, capture the state id, mark navigating
//! 2. match the route (redirects, expansion, state-mismatch fallback)
//! 3. check blockers
//! 4. run before-navigate hooks
//! 5. save the outgoing scroll position
//! 6. load view and layout, publish the new location
//! 7. run on-navigate hooks
//! 8. commit to history and position the viewport
//! 9. clear navigating, spawn after-navigate hooks, notify observers
//!
//! Between phases the attempt re-checks two keys: its attempt id must still be
//! the latest one and the app-state id must still be the one captured in
//! phase 1. Either mismatch ends the attempt as `cancelled` without further
//! side effects. Redirects restart at phase 1 and draw from one shared budget.

mod context;
mod scroll;

pub use context::{
    Direction, HistoryState, NavigateOptions, NavigationContext, NavigationType, ScrollBehavior,
    ScrollPosition,
};
pub use scroll::{decide as decide_scroll, ScrollAction, ScrollInput};

pub(crate) use context::NavigationRequest;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::blocker::NavigationBlocker;
use crate::config::NavigationConfig;
use crate::error::{ConfigError, ErrorCode, NavigationError};
use crate::index::{ContextData, MatchOutcome, RouteDefinition, RouteEntry, RouteIndex};
use crate::layout::LayoutResolver;
use crate::lifecycle::{BeforeNavigate, NavigationLifecycle};
use crate::path::{decode_segment, split_path, Location};
use crate::providers::{
    ErrorContext, ErrorSink, ErrorSource, HistoryProvider, LocationSink, LocationUpdate,
    MemoryHistory, MemoryLocation, MemoryScroll, MemoryStorage, ScrollController, StorageProvider,
    Subscription, TracingErrorSink,
};
use crate::state::StateMachine;

/// Puts the address bar back after a blocked back/forward navigation
///
/// Receives the pop direction and the location that was showing before.
pub type RestoreUrl = Arc<dyn Fn(Direction, Option<&Location>) + Send + Sync>;

type CompleteObserver = Arc<dyn Fn(&NavigationContext) + Send + Sync>;

/// Handle for a navigation-complete observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    MatchRoute,
    CheckBlockers,
    BeforeNavigate,
    Deactivate,
    Load,
    OnNavigate,
    Commit,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::MatchRoute => "match-route",
            Phase::CheckBlockers => "check-blockers",
            Phase::BeforeNavigate => "before-navigate",
            Phase::Deactivate => "deactivate",
            Phase::Load => "load",
            Phase::OnNavigate => "on-navigate",
            Phase::Commit => "commit",
        }
    }
}

/// The two keys captured in phase 1
#[derive(Debug, Clone, Copy)]
struct Attempt {
    id: u64,
    state_id: u64,
}

/// Why a pipeline run stopped before completing
enum Halt {
    Redirect(String),
    Fail(NavigationError),
}

impl From<NavigationError> for Halt {
    fn from(error: NavigationError) -> Self {
        Halt::Fail(error)
    }
}

/// The committed location
#[derive(Debug, Clone)]
struct CurrentEntry {
    navigation_id: u64,
    location: Location,
    route: Arc<RouteEntry>,
    params: HashMap<String, String>,
    app_state: String,
    /// Id of the history record, used as scroll-storage key
    history_id: u64,
}

pub struct Navigator {
    index: RwLock<RouteIndex>,
    state: StateMachine,
    layouts: LayoutResolver,
    lifecycle: NavigationLifecycle,
    config: NavigationConfig,

    history: Arc<dyn HistoryProvider>,
    storage: Arc<dyn StorageProvider>,
    location: Arc<dyn LocationSink>,
    scroll: Arc<dyn ScrollController>,
    errors: Arc<dyn ErrorSink>,
    blocker: Option<Arc<dyn NavigationBlocker>>,
    restore_url: Option<RestoreUrl>,

    attempt: AtomicU64,
    navigating: AtomicBool,
    position: AtomicU64,
    current: RwLock<Option<CurrentEntry>>,
    context_data: RwLock<ContextData>,
    last_path: Mutex<Option<String>>,

    observers: RwLock<Vec<(ObserverId, CompleteObserver)>>,
    next_observer: AtomicU64,

    attached: AtomicBool,
    ignore_next_pop: AtomicBool,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("state", &self.state.current())
            .field("attempt", &self.attempt.load(Ordering::SeqCst))
            .field("navigating", &self.navigating.load(Ordering::SeqCst))
            .field("current", &self.current_location())
            .finish()
    }
}

impl Navigator {
    /// Starts building a navigator over a route index
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::{ComponentLoader, Navigator, RouteDefinition, RouteIndex, StateConfig};
    ///
    /// let index = RouteIndex::new([(
    ///     "guest",
    ///     StateConfig::new().with_route(RouteDefinition::new("/", ComponentLoader::ready("home", ()))),
    /// )])
    /// .unwrap();
    ///
    /// let navigator = Navigator::builder(index, "guest").build();
    /// assert_eq!(navigator.state_machine().current(), "guest");
    /// assert!(navigator.current_location().is_none());
    /// ```
    pub fn builder(index: RouteIndex, initial_state: impl Into<String>) -> NavigatorBuilder {
        NavigatorBuilder::new(index, initial_state)
    }

    // ========================================================================
    // Navigation entry points
    // ========================================================================

    /// Push navigation to `path`
    pub async fn navigate(&self, path: &str) -> Result<NavigationContext, NavigationError> {
        self.navigate_with(path, NavigateOptions::default()).await
    }

    pub async fn navigate_with(
        &self,
        path: &str,
        options: NavigateOptions,
    ) -> Result<NavigationContext, NavigationError> {
        self.run(NavigationRequest::new(path, options)).await
    }

    /// Switches the app state and lands on a route that exists in it
    ///
    /// The state change cancels every in-flight attempt. The target is, in
    /// order: `path`, the remembered intended path when it matches in the new
    /// state, the new state's default path. Commits with replace semantics.
    pub async fn navigate_after_state_change(
        &self,
        state: impl Into<String>,
        path: Option<&str>,
    ) -> Result<NavigationContext, NavigationError> {
        let state = state.into();
        self.state.set_state(state.clone());

        let target = match path {
            Some(path) => Some(path.to_string()),
            None => self.intended_path_for(&state).or_else(|| {
                let context = self.context_data.read().clone();
                let default = self.index.read().default_path(&state, &context);
                default
            }),
        };

        match target {
            Some(target) => self.run(NavigationRequest::state_change(target)).await,
            None => {
                let attempt = self.initiate("");
                let message = format!("state `{}` has no default path", state);
                Err(self.fail(attempt, NavigationError::new(ErrorCode::NotFound, "", message)))
            }
        }
    }

    /// Pop navigation to the history provider's current location
    pub async fn handle_pop_state(
        &self,
        state: Option<HistoryState>,
    ) -> Result<NavigationContext, NavigationError> {
        let location = self.history.location();
        let direction = match &state {
            Some(record) if record.marker => {
                let current = self.position.load(Ordering::SeqCst);
                if record.position < current {
                    Direction::Back
                } else if record.position > current {
                    Direction::Forward
                } else {
                    Direction::Unknown
                }
            }
            _ => Direction::Unknown,
        };

        self.run(NavigationRequest::pop(location.full_path(), direction, state))
            .await
    }

    /// Re-runs the last requested path with replace semantics
    pub async fn retry(&self) -> Result<NavigationContext, NavigationError> {
        let last = self.last_path.lock().clone();
        match last {
            Some(path) => {
                self.run(NavigationRequest::new(path, NavigateOptions::new().replace()))
                    .await
            }
            None => Err(NavigationError::new(
                ErrorCode::NotFound,
                "",
                "no navigation to retry",
            )),
        }
    }

    pub fn back(&self) {
        self.history.go(-1);
    }

    pub fn forward(&self) {
        self.history.go(1);
    }

    pub fn go(&self, delta: i64) {
        self.history.go(delta);
    }

    /// Feeds the history provider's pop events into [`Navigator::handle_pop_state`]
    ///
    /// Each event is handled on the current tokio runtime. Dropping the
    /// returned subscription detaches.
    pub fn attach(self: &Arc<Self>) -> Subscription {
        let weak = Arc::downgrade(self);
        self.attached.store(true, Ordering::SeqCst);

        let listener = self.history.on_pop_state(Arc::new(move |state| {
            let Some(navigator) = weak.upgrade() else {
                return;
            };
            if navigator.ignore_next_pop.swap(false, Ordering::SeqCst) {
                tracing::debug!("pop event from URL restore ignored");
                return;
            }
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        let _ = navigator.handle_pop_state(state).await;
                    });
                }
                Err(_) => tracing::warn!("no tokio runtime, pop event dropped"),
            }
        }));

        let weak = Arc::downgrade(self);
        Subscription::new(move || {
            drop(listener);
            if let Some(navigator) = weak.upgrade() {
                navigator.attached.store(false, Ordering::SeqCst);
                navigator.ignore_next_pop.store(false, Ordering::SeqCst);
            }
        })
    }

    /// Normalizes a view-layer failure into a `render-error`
    pub fn report_render_error(&self, error: anyhow::Error) -> NavigationError {
        let (path, navigation_id) = self
            .current
            .read()
            .as_ref()
            .map(|entry| (entry.location.full_path(), Some(entry.navigation_id)))
            .unwrap_or_default();

        let error = NavigationError::new(ErrorCode::RenderError, path.clone(), "failed to render route")
            .with_cause(error);
        self.location.set_error(Some(error.clone()));
        self.errors
            .on_error(&error, &ErrorContext::new(ErrorSource::Render, path, navigation_id));
        error
    }

    // ========================================================================
    // Observers, context data, routes
    // ========================================================================

    pub fn on_navigation_complete<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&NavigationContext) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Sets a value used for path expansion and computed default paths
    pub fn set_context_data(&self, key: impl Into<String>, value: impl Into<String>) {
        self.context_data.write().insert(key.into(), value.into());
    }

    pub fn remove_context_data(&self, key: &str) -> Option<String> {
        self.context_data.write().remove(key)
    }

    pub fn context_data(&self) -> ContextData {
        self.context_data.read().clone()
    }

    /// Adds routes to a state; must not be called while navigating
    pub fn add_routes<I>(&self, state: &str, routes: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        self.index.write().add_routes(state, routes)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn lifecycle(&self) -> &NavigationLifecycle {
        &self.lifecycle
    }

    pub fn layouts(&self) -> &LayoutResolver {
        &self.layouts
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.state
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn current_location(&self) -> Option<Location> {
        self.current.read().as_ref().map(|entry| entry.location.clone())
    }

    pub fn current_route(&self) -> Option<Arc<RouteEntry>> {
        self.current.read().as_ref().map(|entry| Arc::clone(&entry.route))
    }

    pub fn current_params(&self) -> HashMap<String, String> {
        self.current
            .read()
            .as_ref()
            .map(|entry| entry.params.clone())
            .unwrap_or_default()
    }

    pub fn is_navigating(&self) -> bool {
        self.navigating.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    async fn run(&self, mut request: NavigationRequest) -> Result<NavigationContext, NavigationError> {
        let origin = request.path.clone();
        *self.last_path.lock() = Some(origin.clone());

        let mut redirects = 0usize;
        loop {
            let attempt = self.initiate(&request.path);
            let outcome = AssertUnwindSafe(self.pipeline(attempt, &mut request))
                .catch_unwind()
                .await;
            let outcome = outcome
                .unwrap_or_else(|panic| Err(Halt::Fail(panic_error(&request.path, panic))));

            match outcome {
                Ok(context) => return Ok(context),
                Err(Halt::Fail(error)) => return Err(self.fail(attempt, error)),
                Err(Halt::Redirect(target)) => {
                    redirects += 1;
                    if redirects > self.config.max_redirects {
                        let error =
                            NavigationError::too_many_redirects(&origin, self.config.max_redirects);
                        return Err(self.fail(attempt, error));
                    }

                    tracing::debug!(
                        navigation_id = attempt.id,
                        from = %request.path,
                        to = %target,
                        redirects,
                        "redirect"
                    );
                    request = request.redirect(target);
                }
            }
        }
    }

    /// Phase 1
    fn initiate(&self, path: &str) -> Attempt {
        let id = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let state_id = self.state.state_id();

        self.navigating.store(true, Ordering::SeqCst);
        self.location.set_navigating(true);

        tracing::debug!(navigation_id = id, path, phase = "initiate", "navigation phase");
        Attempt { id, state_id }
    }

    fn is_stale(&self, attempt: Attempt) -> bool {
        self.attempt.load(Ordering::SeqCst) != attempt.id || self.state.state_id() != attempt.state_id
    }

    fn is_latest(&self, attempt: Attempt) -> bool {
        self.attempt.load(Ordering::SeqCst) == attempt.id
    }

    fn checkpoint(&self, attempt: Attempt, phase: Phase, path: &str) -> Result<(), NavigationError> {
        if self.is_stale(attempt) {
            return Err(NavigationError::cancelled(path));
        }
        tracing::debug!(
            navigation_id = attempt.id,
            path,
            phase = phase.as_str(),
            "navigation phase"
        );
        Ok(())
    }

    /// Phases 2 to 9 for one hop
    async fn pipeline(
        &self,
        attempt: Attempt,
        request: &mut NavigationRequest,
    ) -> Result<NavigationContext, Halt> {
        let from = self.current_location();
        let path = request.path.clone();

        // Phase 2: match
        self.checkpoint(attempt, Phase::MatchRoute, &path)?;
        let target = split_path(&path);
        let app_state = self.state.current();
        let outcome = self.index.read().match_path(&target.pathname, &app_state);

        let route_match = match outcome {
            MatchOutcome::Matched(route_match) => route_match,
            MatchOutcome::Redirect { target: to } => {
                return Err(Halt::Redirect(carry_query(&to, &target)))
            }
            MatchOutcome::StateMismatch {
                available_in_state, ..
            } => return Err(self.unmatched(request, &target, &app_state, Some(&available_in_state))),
            MatchOutcome::NoMatch => return Err(self.unmatched(request, &target, &app_state, None)),
        };

        let context = NavigationContext {
            navigation_id: attempt.id,
            from,
            to: target,
            route: Arc::clone(&route_match.route),
            params: route_match.params,
            navigation_type: request.navigation_type,
            direction: request.direction,
            app_state: route_match.state,
            data: request.data.clone(),
        };

        // Phase 3: blockers
        self.checkpoint(attempt, Phase::CheckBlockers, &path)?;
        if let Some(blocker) = self.blocker.as_ref().filter(|_| !request.confirmed) {
            let allowed = blocker.allow(&context).await;
            self.checkpoint(attempt, Phase::CheckBlockers, &path)?;
            if !allowed {
                if request.navigation_type == NavigationType::Pop {
                    self.restore_url(request.direction, context.from.as_ref());
                }
                return Err(Halt::Fail(NavigationError::new(
                    ErrorCode::Blocked,
                    path,
                    "navigation blocked",
                )));
            }
            request.confirmed = true;
        }

        // Phase 4: before hooks
        self.checkpoint(attempt, Phase::BeforeNavigate, &path)?;
        let verdict = self.lifecycle.run_before(&context, &self.errors).await;
        self.checkpoint(attempt, Phase::BeforeNavigate, &path)?;
        match verdict {
            BeforeNavigate::Continue => {}
            BeforeNavigate::Redirect(target) => return Err(Halt::Redirect(target)),
            BeforeNavigate::Abort => {
                return Err(Halt::Fail(NavigationError::new(
                    ErrorCode::Aborted,
                    path,
                    "navigation aborted by a before-navigate hook",
                )))
            }
        }

        // Phase 5: deactivate
        self.checkpoint(attempt, Phase::Deactivate, &path)?;
        if self.config.scroll_restoration {
            let outgoing = self.current.read().as_ref().map(|entry| entry.history_id);
            if let Some(history_id) = outgoing {
                self.storage.save_scroll_position(history_id, self.scroll.position());
            }
        }

        // Phase 6: load and publish
        self.checkpoint(attempt, Phase::Load, &path)?;
        let state_config = self
            .index
            .read()
            .state_config(&context.app_state)
            .unwrap_or_default();
        let definition = &context.route.definition;
        let (view, layout) = futures::future::join(
            definition.view.load(),
            self.layouts.load_layout(definition, &state_config),
        )
        .await;
        self.checkpoint(attempt, Phase::Load, &path)?;

        let view = view.map_err(|err| {
            let message = format!("failed to load view `{}`", definition.view.id());
            NavigationError::new(ErrorCode::LoadFailed, path.clone(), message).with_cause(err)
        })?;
        let layout = layout.map_err(|err| {
            let message = err.to_string();
            NavigationError::new(ErrorCode::LoadFailed, path.clone(), message)
                .with_cause(anyhow::Error::new(err))
        })?;

        self.layouts.commit(layout.as_ref());
        self.location.clear_error();
        self.location.update(LocationUpdate {
            navigation_id: attempt.id,
            location: context.to.clone(),
            route: Arc::clone(&context.route),
            params: context.params.clone(),
            app_state: context.app_state.clone(),
            view,
            layout,
        });

        // Phase 7: on hooks
        self.checkpoint(attempt, Phase::OnNavigate, &path)?;
        self.lifecycle.run_on(&context, &self.errors).await;

        // Phase 8: commit
        self.checkpoint(attempt, Phase::Commit, &path)?;
        let history_id = self.commit_history(attempt, request, &context);
        *self.current.write() = Some(CurrentEntry {
            navigation_id: attempt.id,
            location: context.to.clone(),
            route: Arc::clone(&context.route),
            params: context.params.clone(),
            app_state: context.app_state.clone(),
            history_id,
        });
        self.apply_scroll(request, &context, history_id);

        // Phase 9: after
        if self.is_latest(attempt) {
            self.finish_navigating();
        }
        self.lifecycle.run_after(&context, &self.errors);
        self.notify_observers(&context);

        tracing::info!(
            navigation_id = attempt.id,
            path = %context.to,
            route = context.route.path(),
            state = %context.app_state,
            "navigation complete"
        );
        Ok(context)
    }

    /// Phase 2 when the current state has no route for the path
    ///
    /// Tries expansion first, then the state-mismatch fallback to the
    /// state's default path.
    fn unmatched(
        &self,
        request: &NavigationRequest,
        target: &Location,
        app_state: &str,
        available_in_state: Option<&str>,
    ) -> Halt {
        let context = self.context_data.read().clone();
        let expanded = self
            .index
            .read()
            .try_expand_path(&target.pathname, app_state, &context);
        if let Some(expanded) = expanded {
            return Halt::Redirect(carry_query(&expanded, target));
        }

        let Some(available_in_state) = available_in_state else {
            return Halt::Fail(NavigationError::not_found(target.pathname.clone()));
        };

        let default = self.index.read().default_path(app_state, &context);
        match default {
            Some(default) => {
                if self.config.save_intended_path {
                    self.storage.save_intended_path(&request.path);
                }
                tracing::debug!(
                    path = %target,
                    state = app_state,
                    available_in_state,
                    fallback = %default,
                    "route belongs to another state, falling back to default path"
                );
                Halt::Redirect(default)
            }
            None => {
                let message = format!(
                    "`{}` is only available in state `{}` and state `{}` has no default path",
                    target.pathname, available_in_state, app_state
                );
                Halt::Fail(NavigationError::new(
                    ErrorCode::StateMismatch,
                    target.pathname.clone(),
                    message,
                ))
            }
        }
    }

    /// Writes the history entry; returns the scroll-storage key of the new entry
    fn commit_history(
        &self,
        attempt: Attempt,
        request: &NavigationRequest,
        context: &NavigationContext,
    ) -> u64 {
        let url = self.history.build_url(&context.to.full_path());
        let record = |position: u64| HistoryState {
            marker: true,
            id: attempt.id,
            position,
            app_state: context.app_state.clone(),
            data: context.data.clone(),
        };

        match request.navigation_type {
            NavigationType::Push => {
                let position = self.position.load(Ordering::SeqCst) + 1;
                self.history.push(&url, record(position));
                self.position.store(position, Ordering::SeqCst);
                attempt.id
            }
            NavigationType::Replace | NavigationType::StateChange => {
                let position = self.position.load(Ordering::SeqCst);
                self.history.replace(&url, record(position));
                attempt.id
            }
            NavigationType::Pop => match &request.history_state {
                Some(state) if state.marker => {
                    self.position.store(state.position, Ordering::SeqCst);
                    state.id
                }
                // Foreign entry: stamp it so it can be restored later
                _ => {
                    let position = self.position.load(Ordering::SeqCst);
                    self.history.replace(&url, record(position));
                    attempt.id
                }
            },
        }
    }

    fn apply_scroll(&self, request: &NavigationRequest, context: &NavigationContext, history_id: u64) {
        let saved = match request.navigation_type {
            NavigationType::Pop if self.config.scroll_restoration => {
                self.storage.scroll_position(history_id)
            }
            _ => None,
        };

        let action = decide_scroll(ScrollInput {
            requested: request.scroll,
            navigation_type: request.navigation_type,
            saved,
            hash: &context.to.hash,
            scroll_to_top: self.config.scroll_to_top,
        });

        match action {
            ScrollAction::To(position) => self.scroll.scroll_to(position),
            ScrollAction::Top => self.scroll.scroll_to(ScrollPosition::top()),
            ScrollAction::Anchor(anchor) => {
                let found = self.scroll.scroll_to_anchor(&decode_segment(&anchor));
                if !found && self.config.scroll_to_top {
                    self.scroll.scroll_to(ScrollPosition::top());
                }
            }
            ScrollAction::None => {}
        }
    }

    /// Undoes the URL change of a blocked pop navigation
    fn restore_url(&self, direction: Direction, previous: Option<&Location>) {
        if let Some(restore) = &self.restore_url {
            restore(direction, previous);
            return;
        }

        match direction {
            Direction::Back => self.go_silently(1),
            Direction::Forward => self.go_silently(-1),
            Direction::Unknown => {
                let current = self.current.read().clone();
                if let (Some(previous), Some(current)) = (previous, current) {
                    let url = self.history.build_url(&previous.full_path());
                    self.history.replace(
                        &url,
                        HistoryState {
                            marker: true,
                            id: current.history_id,
                            position: self.position.load(Ordering::SeqCst),
                            app_state: current.app_state,
                            data: None,
                        },
                    );
                }
            }
        }
    }

    /// History move whose pop event must not start a navigation
    fn go_silently(&self, delta: i64) {
        if self.attached.load(Ordering::SeqCst) {
            self.ignore_next_pop.store(true, Ordering::SeqCst);
        }
        self.history.go(delta);
    }

    fn intended_path_for(&self, state: &str) -> Option<String> {
        let intended = self.storage.pop_intended_path()?;
        let pathname = split_path(&intended).pathname;
        let outcome = self.index.read().match_path(&pathname, state);

        match outcome {
            MatchOutcome::Matched(_) | MatchOutcome::Redirect { .. } => Some(intended),
            _ => None,
        }
    }

    fn finish_navigating(&self) {
        self.navigating.store(false, Ordering::SeqCst);
        self.location.set_navigating(false);
    }

    fn notify_observers(&self, context: &NavigationContext) {
        let observers: Vec<CompleteObserver> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(context);
        }
    }

    /// Terminal bookkeeping for a failed attempt
    ///
    /// Only the latest attempt touches the navigating flag and the error
    /// surfaces; visual errors go to both the location sink and the error sink.
    fn fail(&self, attempt: Attempt, error: NavigationError) -> NavigationError {
        let latest = self.is_latest(attempt);

        if !error.is_visual() {
            tracing::warn!(
                navigation_id = attempt.id,
                path = %error.path,
                code = %error.code,
                "navigation stopped"
            );
            if latest {
                self.finish_navigating();
            }
            return error;
        }

        if !latest {
            tracing::debug!(
                navigation_id = attempt.id,
                code = %error.code,
                "error from superseded attempt dropped"
            );
            return error;
        }

        tracing::warn!(
            navigation_id = attempt.id,
            path = %error.path,
            code = %error.code,
            "navigation failed: {}",
            error.message
        );
        self.finish_navigating();
        self.location.set_error(Some(error.clone()));
        self.errors.on_error(
            &error,
            &ErrorContext::new(ErrorSource::Navigation, error.path.clone(), Some(attempt.id)),
        );
        error
    }
}

/// Appends the search and hash of `from` unless `target` brings its own
fn carry_query(target: &str, from: &Location) -> String {
    let own = split_path(target);
    let search = if own.search.is_empty() { from.search.as_str() } else { own.search.as_str() };
    let hash = if own.hash.is_empty() { from.hash.as_str() } else { own.hash.as_str() };
    format!("{}{}{}", own.pathname, search, hash)
}

fn panic_error(path: &str, panic: Box<dyn Any + Send>) -> NavigationError {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    NavigationError::new(ErrorCode::LoadFailed, path, "navigation panicked")
        .with_cause(anyhow::anyhow!(detail))
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Navigator`]; unset collaborators default to the in-memory ones
pub struct NavigatorBuilder {
    index: RouteIndex,
    initial_state: String,
    history: Option<Arc<dyn HistoryProvider>>,
    storage: Option<Arc<dyn StorageProvider>>,
    location: Option<Arc<dyn LocationSink>>,
    scroll: Option<Arc<dyn ScrollController>>,
    errors: Option<Arc<dyn ErrorSink>>,
    blocker: Option<Arc<dyn NavigationBlocker>>,
    restore_url: Option<RestoreUrl>,
    config: NavigationConfig,
}

impl NavigatorBuilder {
    pub fn new(index: RouteIndex, initial_state: impl Into<String>) -> Self {
        Self {
            index,
            initial_state: initial_state.into(),
            history: None,
            storage: None,
            location: None,
            scroll: None,
            errors: None,
            blocker: None,
            restore_url: None,
            config: NavigationConfig::default(),
        }
    }

    pub fn history(mut self, history: Arc<dyn HistoryProvider>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn location(mut self, location: Arc<dyn LocationSink>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn scroll(mut self, scroll: Arc<dyn ScrollController>) -> Self {
        self.scroll = Some(scroll);
        self
    }

    pub fn errors(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn blocker(mut self, blocker: Arc<dyn NavigationBlocker>) -> Self {
        self.blocker = Some(blocker);
        self
    }

    pub fn restore_url<F>(mut self, restore: F) -> Self
    where
        F: Fn(Direction, Option<&Location>) + Send + Sync + 'static,
    {
        self.restore_url = Some(Arc::new(restore));
        self
    }

    pub fn config(mut self, config: NavigationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Navigator {
        Navigator {
            index: RwLock::new(self.index),
            state: StateMachine::new(self.initial_state),
            layouts: LayoutResolver::new(),
            lifecycle: NavigationLifecycle::new(),
            config: self.config,
            history: self
                .history
                .unwrap_or_else(|| Arc::new(MemoryHistory::default())),
            storage: self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            location: self.location.unwrap_or_else(|| Arc::new(MemoryLocation::new())),
            scroll: self.scroll.unwrap_or_else(|| Arc::new(MemoryScroll::new())),
            errors: self.errors.unwrap_or_else(|| Arc::new(TracingErrorSink)),
            blocker: self.blocker,
            restore_url: self.restore_url,
            attempt: AtomicU64::new(0),
            navigating: AtomicBool::new(false),
            position: AtomicU64::new(0),
            current: RwLock::new(None),
            context_data: RwLock::new(ContextData::new()),
            last_path: Mutex::new(None),
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU64::new(0),
            attached: AtomicBool::new(false),
            ignore_next_pop: AtomicBool::new(false),
        }
    }
}
