//! Navigation lifecycle hooks
//!
//! Three hook kinds, each with its own contract:
//! - **before**: run concurrently; any abort (or error) wins over redirects,
//!   otherwise the first redirect in registration order is taken
//! - **on**: run one after another, each awaited before the next starts
//! - **after**: spawned and never awaited
//!
//! Hook errors are reported to the [`ErrorSink`] and never reach the caller
//! of `navigate`. Registration returns a [`HookId`] for later removal; every
//! run works on a snapshot of the hook list.

use futures::future::join_all;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ErrorCode, NavigationError};
use crate::loader::BoxFuture;
use crate::navigator::NavigationContext;
use crate::providers::{ErrorContext, ErrorSink, ErrorSource};

/// Verdict of a before-navigate hook
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BeforeNavigate {
    #[default]
    Continue,
    Abort,
    Redirect(String),
}

/// Handle identifying a registered hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type BeforeHook =
    Arc<dyn Fn(NavigationContext) -> BoxFuture<'static, anyhow::Result<BeforeNavigate>> + Send + Sync>;
type Hook = Arc<dyn Fn(NavigationContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Default)]
pub struct NavigationLifecycle {
    next_id: AtomicU64,
    before: RwLock<Vec<(HookId, BeforeHook)>>,
    on: RwLock<Vec<(HookId, Hook)>>,
    after: RwLock<Vec<(HookId, Hook)>>,
}

impl fmt::Debug for NavigationLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationLifecycle")
            .field("before", &self.before.read().len())
            .field("on", &self.on.read().len())
            .field("after", &self.after.read().len())
            .finish()
    }
}

impl NavigationLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> HookId {
        HookId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a guard that may abort or redirect a navigation
    pub fn register_before<F, Fut>(&self, hook: F) -> HookId
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<BeforeNavigate>> + Send + 'static,
    {
        let id = self.next_id();
        let hook: BeforeHook = Arc::new(move |ctx| Box::pin(hook(ctx)));
        self.before.write().push((id, hook));
        id
    }

    /// Registers a hook awaited in order after the new view is published
    pub fn register_on<F, Fut>(&self, hook: F) -> HookId
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = self.next_id();
        let hook: Hook = Arc::new(move |ctx| Box::pin(hook(ctx)));
        self.on.write().push((id, hook));
        id
    }

    /// Registers a fire-and-forget hook run once a navigation completed
    pub fn register_after<F, Fut>(&self, hook: F) -> HookId
    where
        F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = self.next_id();
        let hook: Hook = Arc::new(move |ctx| Box::pin(hook(ctx)));
        self.after.write().push((id, hook));
        id
    }

    /// Removes a hook of any kind; `false` if it was not registered
    pub fn unregister(&self, id: HookId) -> bool {
        fn remove<T>(hooks: &RwLock<Vec<(HookId, T)>>, id: HookId) -> bool {
            let mut hooks = hooks.write();
            let before = hooks.len();
            hooks.retain(|(hook_id, _)| *hook_id != id);
            hooks.len() != before
        }

        remove(&self.before, id) || remove(&self.on, id) || remove(&self.after, id)
    }

    /// Number of registered hooks (before, on, after)
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.before.read().len(),
            self.on.read().len(),
            self.after.read().len(),
        )
    }

    pub fn clear(&self) {
        self.before.write().clear();
        self.on.write().clear();
        self.after.write().clear();
    }

    /// Runs every before-hook concurrently and folds their verdicts
    pub async fn run_before(
        &self,
        context: &NavigationContext,
        errors: &Arc<dyn ErrorSink>,
    ) -> BeforeNavigate {
        let hooks = snapshot(&self.before);
        if hooks.is_empty() {
            return BeforeNavigate::Continue;
        }

        let results = join_all(hooks.iter().map(|hook| hook(context.clone()))).await;

        let mut redirect = None;
        let mut aborted = false;
        for result in results {
            match result {
                Ok(BeforeNavigate::Continue) => {}
                Ok(BeforeNavigate::Abort) => aborted = true,
                Ok(BeforeNavigate::Redirect(target)) => {
                    redirect.get_or_insert(target);
                }
                Err(err) => {
                    aborted = true;
                    report(
                        errors,
                        context,
                        ErrorSource::BeforeHook,
                        ErrorCode::Aborted,
                        "before-navigate hook failed",
                        err,
                    );
                }
            }
        }

        match (aborted, redirect) {
            (true, _) => BeforeNavigate::Abort,
            (false, Some(target)) => BeforeNavigate::Redirect(target),
            (false, None) => BeforeNavigate::Continue,
        }
    }

    /// Runs on-hooks strictly in sequence
    pub async fn run_on(&self, context: &NavigationContext, errors: &Arc<dyn ErrorSink>) {
        for hook in snapshot(&self.on) {
            if let Err(err) = hook(context.clone()).await {
                report(
                    errors,
                    context,
                    ErrorSource::OnHook,
                    ErrorCode::LoadFailed,
                    "on-navigate hook failed",
                    err,
                );
            }
        }
    }

    /// Spawns every after-hook without waiting for any of them
    ///
    /// Does nothing outside a tokio runtime.
    pub fn run_after(&self, context: &NavigationContext, errors: &Arc<dyn ErrorSink>) {
        let hooks = snapshot(&self.after);
        if hooks.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no tokio runtime, after-navigate hooks skipped");
            return;
        };

        for hook in hooks {
            let context = context.clone();
            let errors = Arc::clone(errors);
            runtime.spawn(async move {
                if let Err(err) = hook(context.clone()).await {
                    report(
                        &errors,
                        &context,
                        ErrorSource::AfterHook,
                        ErrorCode::LoadFailed,
                        "after-navigate hook failed",
                        err,
                    );
                }
            });
        }
    }
}

fn snapshot<T: Clone>(hooks: &RwLock<Vec<(HookId, T)>>) -> Vec<T> {
    hooks.read().iter().map(|(_, hook)| hook.clone()).collect()
}

fn report(
    errors: &Arc<dyn ErrorSink>,
    context: &NavigationContext,
    source: ErrorSource,
    code: ErrorCode,
    message: &str,
    err: anyhow::Error,
) {
    tracing::warn!(
        navigation_id = context.navigation_id,
        path = %context.to,
        error = %err,
        "{}",
        message
    );

    let path = context.to.full_path();
    let error = NavigationError::new(code, path.clone(), message).with_cause(err);
    errors.on_error(&error, &ErrorContext::new(source, path, Some(context.navigation_id)));
}
