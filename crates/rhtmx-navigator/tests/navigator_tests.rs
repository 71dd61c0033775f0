//! Integration tests for the navigation pipeline
//!
//! Tests are organized by feature area and cover:
//! - Publishing, history commits and navigation ids
//! - Redirect budget (route redirects, hooks, fallbacks)
//! - Cancellation by newer attempts and by state changes
//! - Layout caching across navigations
//! - Lifecycle hooks and observers
//! - Blockers and URL restoration on back/forward
//! - State changes, intended paths and retry
//! - Scroll handling and error reporting

use pretty_assertions::assert_eq;
use rhtmx_navigator::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

// ============================================================================
// Helpers
// ============================================================================

fn view(id: &str) -> ComponentLoader {
    ComponentLoader::ready(id, id.to_string())
}

fn route(path: &str) -> RouteDefinition {
    RouteDefinition::new(path, view(path))
}

fn app_index(paths: &[&str]) -> RouteIndex {
    RouteIndex::new([(
        "app",
        StateConfig::new().with_routes(paths.iter().map(|p| route(p))),
    )])
    .unwrap()
}

struct Harness {
    navigator: Arc<Navigator>,
    history: Arc<MemoryHistory>,
    storage: Arc<MemoryStorage>,
    location: Arc<MemoryLocation>,
    scroll: Arc<MemoryScroll>,
    errors: Arc<CollectingErrorSink>,
}

fn harness(index: RouteIndex, state: &str) -> Harness {
    harness_with(index, state, |builder| builder)
}

fn harness_with<F>(index: RouteIndex, state: &str, configure: F) -> Harness
where
    F: FnOnce(NavigatorBuilder) -> NavigatorBuilder,
{
    let history = Arc::new(MemoryHistory::new("/"));
    let storage = Arc::new(MemoryStorage::new());
    let location = Arc::new(MemoryLocation::new());
    let scroll = Arc::new(MemoryScroll::new().with_anchor("faq"));
    let errors = Arc::new(CollectingErrorSink::new());

    let builder = Navigator::builder(index, state)
        .history(history.clone())
        .storage(storage.clone())
        .location(location.clone())
        .scroll(scroll.clone())
        .errors(errors.clone());

    Harness {
        navigator: Arc::new(configure(builder).build()),
        history,
        storage,
        location,
        scroll,
        errors,
    }
}

/// A view loader that signals when it starts and waits for a release
fn gated_view(id: &str, started: Arc<Notify>, release: Arc<Notify>) -> ComponentLoader {
    let value = id.to_string();
    ComponentLoader::new(id, move || {
        let started = Arc::clone(&started);
        let release = Arc::clone(&release);
        let value = value.clone();
        async move {
            started.notify_one();
            release.notified().await;
            Ok::<Component, anyhow::Error>(Arc::new(value))
        }
    })
}

fn counting_layout(id: &str, loads: Arc<AtomicUsize>) -> LayoutConfig {
    let value = id.to_string();
    ComponentLoader::new(id, move || {
        let loads = Arc::clone(&loads);
        let value = value.clone();
        async move {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<Component, anyhow::Error>(Arc::new(value))
        }
    })
}

// ============================================================================
// Basic navigation
// ============================================================================

#[tokio::test]
async fn test_navigate_publishes_and_pushes() {
    let h = harness(app_index(&["/", "/users/[id]"]), "app");

    let context = h.navigator.navigate("/users/42?tab=posts").await.unwrap();
    assert_eq!(context.param("id"), Some("42"));
    assert_eq!(context.to.search, "?tab=posts");
    assert_eq!(context.navigation_type, NavigationType::Push);
    assert_eq!(context.from, None);

    let update = h.location.current().unwrap();
    assert_eq!(update.location.full_path(), "/users/42?tab=posts");
    assert_eq!(update.route.path(), "/users/[id]");
    assert_eq!(update.view.downcast_ref::<String>().map(String::as_str), Some("/users/[id]"));
    assert!(!h.location.is_navigating());
    assert!(!h.navigator.is_navigating());

    assert_eq!(h.history.urls(), vec!["/", "/users/42?tab=posts"]);
    let record = h.history.history_state().unwrap();
    assert!(record.marker);
    assert_eq!(record.id, context.navigation_id);
    assert_eq!(record.position, 1);
    assert_eq!(record.app_state, "app");
}

#[tokio::test]
async fn test_replace_keeps_history_length() {
    let h = harness(app_index(&["/a", "/b"]), "app");

    h.navigator.navigate("/a").await.unwrap();
    h.navigator
        .navigate_with("/b", NavigateOptions::new().replace())
        .await
        .unwrap();

    assert_eq!(h.history.urls(), vec!["/", "/b"]);
    assert_eq!(h.navigator.current_location().unwrap().pathname, "/b");
}

#[tokio::test]
async fn test_navigation_data_is_stored_on_history_record() {
    let h = harness(app_index(&["/a"]), "app");
    let data = serde_json::json!({"source": "search"});

    let context = h
        .navigator
        .navigate_with("/a", NavigateOptions::new().with_data(data.clone()))
        .await
        .unwrap();

    assert_eq!(context.data, Some(data.clone()));
    assert_eq!(h.history.history_state().unwrap().data, Some(data));
}

#[tokio::test]
async fn test_navigation_ids_follow_attempts() {
    let index = RouteIndex::new([(
        "app",
        StateConfig::new()
            .with_route(route("/new"))
            .with_redirect("/old", "/new"),
    )])
    .unwrap();
    let h = harness(index, "app");

    let first = h.navigator.navigate("/new").await.unwrap();
    assert_eq!(first.navigation_id, 1);

    // The redirect hop is its own attempt
    let second = h.navigator.navigate("/old").await.unwrap();
    assert_eq!(second.navigation_id, 3);
    assert_eq!(second.to.pathname, "/new");
    assert_eq!(second.from.unwrap().pathname, "/new");
}

#[tokio::test]
async fn test_not_found_is_reported() {
    let h = harness(app_index(&["/"]), "app");

    let err = h.navigator.navigate("/missing").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(h.errors.codes(), vec![ErrorCode::NotFound]);
    assert_eq!(h.location.error().map(|e| e.code), Some(ErrorCode::NotFound));
    assert!(!h.location.is_navigating());
    assert_eq!(h.history.len(), 1);
}

// ============================================================================
// Redirects
// ============================================================================

#[tokio::test]
async fn test_redirect_loop_stops_with_too_many_redirects() {
    let index = RouteIndex::new([(
        "app",
        StateConfig::new()
            .with_redirect("/a", "/b")
            .with_redirect("/b", "/a"),
    )])
    .unwrap();
    let h = harness(index, "app");

    let err = h.navigator.navigate("/a").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TooManyRedirects);
    assert_eq!(err.path, "/a");
    assert!(!err.is_retryable());
    assert_eq!(h.errors.codes(), vec![ErrorCode::TooManyRedirects]);
    assert!(!h.navigator.is_navigating());
}

#[tokio::test]
async fn test_route_redirect_keeps_search_and_hash() {
    let index = RouteIndex::new([(
        "app",
        StateConfig::new()
            .with_route(route("/new"))
            .with_redirect("/old", "/new")
            .with_redirect("/legacy", "/new?tab=all"),
    )])
    .unwrap();
    let h = harness(index, "app");

    let context = h.navigator.navigate("/old?page=2#faq").await.unwrap();
    assert_eq!(context.to.full_path(), "/new?page=2#faq");
    assert_eq!(h.history.urls(), vec!["/", "/new?page=2#faq"]);

    // A query on the redirect target wins
    let context = h.navigator.navigate("/legacy?page=2").await.unwrap();
    assert_eq!(context.to.full_path(), "/new?tab=all");
}

#[tokio::test]
async fn test_hook_redirect_loop_uses_the_same_budget() {
    let h = harness(app_index(&["/a", "/b"]), "app");
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    h.navigator.lifecycle().register_before(move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        let target = if ctx.to.pathname == "/a" { "/b" } else { "/a" };
        async move { Ok(BeforeNavigate::Redirect(target.to_string())) }
    });

    let err = h.navigator.navigate("/a").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TooManyRedirects);
    // Ten redirects followed, the eleventh trips the guard
    assert_eq!(calls.load(Ordering::SeqCst), 11);
}

#[tokio::test]
async fn test_redirect_budget_is_configurable() {
    let index = || {
        RouteIndex::new([(
            "app",
            StateConfig::new()
                .with_route(route("/d"))
                .with_redirect("/a", "/b")
                .with_redirect("/b", "/c")
                .with_redirect("/c", "/d"),
        )])
        .unwrap()
    };

    let tight = harness_with(index(), "app", |b| {
        b.config(NavigationConfig::default().with_max_redirects(2))
    });
    let err = tight.navigator.navigate("/a").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TooManyRedirects);

    let enough = harness_with(index(), "app", |b| {
        b.config(NavigationConfig::default().with_max_redirects(3))
    });
    let context = enough.navigator.navigate("/a").await.unwrap();
    assert_eq!(context.to.pathname, "/d");
    assert_eq!(enough.history.urls(), vec!["/", "/d"]);
}

#[tokio::test]
async fn test_path_expansion_in_pipeline() {
    let index = RouteIndex::new([(
        "authenticated",
        StateConfig::new().with_route(route("/[org]/incidents")),
    )])
    .unwrap();
    let h = harness(index, "authenticated");

    let err = h.navigator.navigate("/incidents").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    h.navigator.set_context_data("org", "Acme");
    let context = h.navigator.navigate("/incidents?open=1").await.unwrap();
    assert_eq!(context.to.full_path(), "/acme/incidents?open=1");
    assert_eq!(context.param("org"), Some("acme"));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_newer_navigation_cancels_older() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let index = RouteIndex::new([(
        "app",
        StateConfig::new()
            .with_route(RouteDefinition::new(
                "/x",
                gated_view("x", Arc::clone(&started), Arc::clone(&release)),
            ))
            .with_route(route("/y")),
    )])
    .unwrap();
    let h = harness(index, "app");

    let navigator = Arc::clone(&h.navigator);
    let first = tokio::spawn(async move { navigator.navigate("/x").await });
    started.notified().await;

    let second = h.navigator.navigate("/y").await.unwrap();
    assert_eq!(second.to.pathname, "/y");

    release.notify_one();
    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);
    assert!(!err.is_visual());

    assert_eq!(h.location.published(), vec!["/y"]);
    assert_eq!(h.location.current_path().as_deref(), Some("/y"));
    assert_eq!(h.history.urls(), vec!["/", "/y"]);
    assert!(h.errors.is_empty());
    assert!(!h.navigator.is_navigating());
}

#[tokio::test]
async fn test_state_change_cancels_in_flight_navigation() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let index = RouteIndex::new([(
        "app",
        StateConfig::new().with_route(RouteDefinition::new(
            "/x",
            gated_view("x", Arc::clone(&started), Arc::clone(&release)),
        )),
    )])
    .unwrap();
    let h = harness(index, "app");

    let navigator = Arc::clone(&h.navigator);
    let pending = tokio::spawn(async move { navigator.navigate("/x").await });
    started.notified().await;

    // Same state name still invalidates: only the id matters
    h.navigator.state_machine().set_state("app");
    release.notify_one();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);
    assert!(h.location.published().is_empty());
    assert!(!h.navigator.is_navigating());
    assert!(!h.location.is_navigating());
}

// ============================================================================
// Layouts
// ============================================================================

#[tokio::test]
async fn test_shared_layout_loads_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let admin_loads = Arc::new(AtomicUsize::new(0));
    let index = RouteIndex::new([(
        "app",
        StateConfig::new()
            .with_layout(counting_layout("shell", Arc::clone(&loads)))
            .with_route(route("/a"))
            .with_route(route("/b"))
            .with_route(route("/admin").with_layout(counting_layout("admin", Arc::clone(&admin_loads)))),
    )])
    .unwrap();
    let h = harness(index, "app");

    h.navigator.navigate("/a").await.unwrap();
    h.navigator.navigate("/b").await.unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.location.current().unwrap().layout.map(|l| l.id),
        Some("shell".to_string())
    );

    h.navigator.navigate("/admin").await.unwrap();
    assert_eq!(admin_loads.load(Ordering::SeqCst), 1);
    assert_eq!(h.navigator.layouts().current_id(), Some("admin".to_string()));

    h.navigator.navigate("/a").await.unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancelled_attempt_does_not_replace_cached_layout() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let y_loads = Arc::new(AtomicUsize::new(0));
    let index = RouteIndex::new([(
        "app",
        StateConfig::new()
            .with_route(route("/x").with_layout(gated_view(
                "layout-x",
                Arc::clone(&started),
                Arc::clone(&release),
            )))
            .with_route(route("/y").with_layout(counting_layout("layout-y", Arc::clone(&y_loads)))),
    )])
    .unwrap();
    let h = harness(index, "app");

    let navigator = Arc::clone(&h.navigator);
    let first = tokio::spawn(async move { navigator.navigate("/x").await });
    started.notified().await;

    h.navigator.navigate("/y").await.unwrap();
    assert_eq!(h.navigator.layouts().current_id(), Some("layout-y".to_string()));

    release.notify_one();
    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);

    let displayed = h.location.current().unwrap().layout.map(|l| l.id);
    assert_eq!(displayed, Some("layout-y".to_string()));
    assert_eq!(h.navigator.layouts().current_id(), displayed);

    // Same layout again: served from cache
    h.navigator.navigate("/y").await.unwrap();
    assert_eq!(y_loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_layout_failure_is_load_failed_with_identity() {
    let broken = ComponentLoader::new("broken-shell", || async {
        Err::<Component, _>(anyhow::anyhow!("chunk missing"))
    });
    let index = RouteIndex::new([(
        "app",
        StateConfig::new().with_layout(broken).with_route(route("/a")),
    )])
    .unwrap();
    let h = harness(index, "app");

    let err = h.navigator.navigate("/a").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::LoadFailed);
    assert!(err.message.contains("broken-shell"));
    assert!(err.is_retryable());
    assert!(err.cause.is_some());
}

// ============================================================================
// Lifecycle hooks and observers
// ============================================================================

#[tokio::test]
async fn test_before_hook_abort() {
    let h = harness(app_index(&["/a", "/b"]), "app");
    h.navigator.navigate("/a").await.unwrap();

    h.navigator.lifecycle().register_before(|ctx| async move {
        if ctx.to.pathname == "/b" {
            Ok(BeforeNavigate::Abort)
        } else {
            Ok(BeforeNavigate::Continue)
        }
    });

    let err = h.navigator.navigate("/b").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Aborted);
    assert_eq!(h.navigator.current_location().unwrap().pathname, "/a");
    assert_eq!(h.location.published(), vec!["/a"]);
}

#[tokio::test]
async fn test_before_hook_redirect() {
    let h = harness(app_index(&["/login", "/settings"]), "app");
    h.navigator.lifecycle().register_before(|ctx| async move {
        if ctx.to.pathname == "/settings" {
            Ok(BeforeNavigate::Redirect("/login".to_string()))
        } else {
            Ok(BeforeNavigate::Continue)
        }
    });

    let context = h.navigator.navigate("/settings").await.unwrap();
    assert_eq!(context.to.pathname, "/login");
    assert_eq!(h.history.urls(), vec!["/", "/login"]);
}

#[tokio::test]
async fn test_throwing_before_hook_denies_and_reports() {
    let h = harness(app_index(&["/a"]), "app");
    h.navigator
        .lifecycle()
        .register_before(|_| async { Err(anyhow::anyhow!("guard crashed")) });

    let err = h.navigator.navigate("/a").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Aborted);

    let sources: Vec<ErrorSource> = h.errors.errors().iter().map(|(_, c)| c.source).collect();
    assert_eq!(sources, vec![ErrorSource::BeforeHook, ErrorSource::Navigation]);
}

#[tokio::test]
async fn test_on_hooks_see_published_location() {
    let h = harness(app_index(&["/a"]), "app");
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let location = Arc::clone(&h.location);
    let log = Arc::clone(&seen);
    h.navigator.lifecycle().register_on(move |_| {
        log.lock().push(location.current_path());
        async { Ok(()) }
    });

    h.navigator.navigate("/a").await.unwrap();
    assert_eq!(*seen.lock(), vec![Some("/a".to_string())]);
}

#[tokio::test]
async fn test_after_hooks_and_observers_run() {
    let h = harness(app_index(&["/a"]), "app");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    h.navigator.lifecycle().register_after(move |ctx| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(ctx.to.pathname.clone());
            Ok(())
        }
    });

    let completed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completed);
    let observer = h.navigator.on_navigation_complete(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    h.navigator.navigate("/a").await.unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(rx.recv().await.as_deref(), Some("/a"));

    assert!(h.navigator.remove_observer(observer));
    h.navigator.navigate("/a").await.unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Blockers
// ============================================================================

#[tokio::test]
async fn test_blocked_push_leaves_everything_untouched() {
    let confirmation = Arc::new(StaticConfirmation::new(false));
    let blocker = Arc::new(ConfirmationBlocker::new(confirmation.clone(), "Leave?"));
    let h = harness_with(app_index(&["/a", "/b"]), "app", |b| b.blocker(blocker.clone()));

    h.navigator.navigate("/a").await.unwrap();
    blocker.block_always("editor");

    let err = h.navigator.navigate("/b").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Blocked);
    assert_eq!(confirmation.asked(), vec!["Leave?".to_string()]);
    assert_eq!(h.history.urls(), vec!["/", "/a"]);
    assert!(h.errors.is_empty());
    assert!(h.location.error().is_none());
    assert!(!h.navigator.is_navigating());
}

#[tokio::test]
async fn test_blocked_back_restores_url() {
    let confirmation = Arc::new(StaticConfirmation::new(false));
    let blocker = Arc::new(ConfirmationBlocker::new(confirmation.clone(), "Leave?"));
    let h = harness_with(app_index(&["/a", "/b"]), "app", |b| b.blocker(blocker.clone()));

    h.navigator.navigate("/a").await.unwrap();
    h.navigator.navigate("/b").await.unwrap();
    blocker.block_always("editor");

    h.history.go(-1);
    assert_eq!(h.history.location().pathname, "/a");

    let err = h
        .navigator
        .handle_pop_state(h.history.history_state())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Blocked);
    assert_eq!(h.history.location().pathname, "/b");
    assert_eq!(h.history.cursor(), 2);
    assert_eq!(h.navigator.current_location().unwrap().pathname, "/b");
}

#[tokio::test]
async fn test_custom_restore_url_callback() {
    let confirmation = Arc::new(StaticConfirmation::new(false));
    let blocker = Arc::new(ConfirmationBlocker::new(confirmation, "Leave?"));
    let restored = Arc::new(parking_lot::Mutex::new(None));

    let sink = Arc::clone(&restored);
    let h = harness_with(app_index(&["/a", "/b"]), "app", |b| {
        b.blocker(blocker.clone()).restore_url(move |direction, previous| {
            *sink.lock() = Some((direction, previous.map(|l| l.pathname.clone())));
        })
    });

    h.navigator.navigate("/a").await.unwrap();
    h.navigator.navigate("/b").await.unwrap();
    blocker.block_always("editor");

    h.history.go(-1);
    h.navigator
        .handle_pop_state(h.history.history_state())
        .await
        .unwrap_err();

    assert_eq!(
        *restored.lock(),
        Some((Direction::Back, Some("/b".to_string())))
    );
    // The callback owns restoration
    assert_eq!(h.history.location().pathname, "/a");
}

#[tokio::test]
async fn test_confirmed_navigation_asks_once_across_redirects() {
    let confirmation = Arc::new(StaticConfirmation::new(true));
    let blocker = Arc::new(ConfirmationBlocker::new(confirmation.clone(), "Leave?"));
    let h = harness_with(app_index(&["/a", "/old", "/new"]), "app", |b| {
        b.blocker(blocker.clone())
    });
    h.navigator.lifecycle().register_before(|ctx| async move {
        if ctx.to.pathname == "/old" {
            Ok(BeforeNavigate::Redirect("/new".to_string()))
        } else {
            Ok(BeforeNavigate::Continue)
        }
    });

    h.navigator.navigate("/a").await.unwrap();
    blocker.block_always("editor");

    // Confirmed on the first hop, the hook redirect does not ask again
    let context = h.navigator.navigate("/old").await.unwrap();
    assert_eq!(context.to.pathname, "/new");
    assert_eq!(confirmation.asked().len(), 1);
}

// ============================================================================
// Pop navigation
// ============================================================================

#[tokio::test]
async fn test_back_restores_scroll_position() {
    let h = harness(app_index(&["/a", "/b"]), "app");

    h.navigator.navigate("/a").await.unwrap();
    h.scroll.set_position(ScrollPosition::new(0.0, 480.0));
    h.navigator.navigate("/b").await.unwrap();
    assert_eq!(h.scroll.position(), ScrollPosition::top());

    h.history.go(-1);
    let context = h
        .navigator
        .handle_pop_state(h.history.history_state())
        .await
        .unwrap();

    assert_eq!(context.navigation_type, NavigationType::Pop);
    assert_eq!(context.direction, Direction::Back);
    assert_eq!(h.scroll.position(), ScrollPosition::new(0.0, 480.0));
    // Pop never writes history
    assert_eq!(h.history.urls(), vec!["/", "/a", "/b"]);
}

#[tokio::test]
async fn test_attached_navigator_follows_history_events() {
    let h = harness(app_index(&["/a", "/b"]), "app");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    h.navigator.on_navigation_complete(move |ctx| {
        let _ = tx.send((ctx.to.pathname.clone(), ctx.navigation_type));
    });

    h.navigator.navigate("/a").await.unwrap();
    h.navigator.navigate("/b").await.unwrap();
    rx.recv().await.unwrap();
    rx.recv().await.unwrap();

    let subscription = h.navigator.attach();
    h.navigator.back();
    assert_eq!(
        rx.recv().await,
        Some(("/a".to_string(), NavigationType::Pop))
    );

    drop(subscription);
    assert_eq!(h.history.listener_count(), 0);
}

// ============================================================================
// Scroll
// ============================================================================

#[tokio::test]
async fn test_scroll_options() {
    let h = harness(app_index(&["/a", "/b"]), "app");

    h.navigator.navigate("/a#faq").await.unwrap();
    assert_eq!(h.scroll.last_anchor(), Some("faq".to_string()));

    h.scroll.set_position(ScrollPosition::new(0.0, 100.0));
    h.navigator
        .navigate_with("/b", NavigateOptions::new().with_scroll(ScrollBehavior::Preserve))
        .await
        .unwrap();
    assert_eq!(h.scroll.position(), ScrollPosition::new(0.0, 100.0));

    let target = ScrollPosition::new(10.0, 20.0);
    h.navigator
        .navigate_with("/a", NavigateOptions::new().with_scroll(ScrollBehavior::To(target)))
        .await
        .unwrap();
    assert_eq!(h.scroll.position(), target);
    assert_eq!(h.storage.size(), 2);
}

// ============================================================================
// App-state changes
// ============================================================================

fn auth_index() -> RouteIndex {
    RouteIndex::new([
        (
            "guest",
            StateConfig::new()
                .with_route(route("/login"))
                .with_default_path("/login"),
        ),
        (
            "authenticated",
            StateConfig::new()
                .with_route(route("/home"))
                .with_route(route("/dashboard"))
                .with_default_path("/home"),
        ),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_state_mismatch_falls_back_and_remembers_intended_path() {
    let h = harness(auth_index(), "guest");

    let context = h.navigator.navigate("/dashboard").await.unwrap();
    assert_eq!(context.to.pathname, "/login");
    assert_eq!(h.storage.intended_path(), Some("/dashboard".to_string()));

    let context = h
        .navigator
        .navigate_after_state_change("authenticated", None)
        .await
        .unwrap();
    assert_eq!(context.to.pathname, "/dashboard");
    assert_eq!(context.navigation_type, NavigationType::StateChange);
    assert_eq!(h.storage.intended_path(), None);
    assert_eq!(h.history.urls(), vec!["/", "/dashboard"]);
}

#[tokio::test]
async fn test_state_change_uses_explicit_path_then_default() {
    let h = harness(auth_index(), "guest");

    let context = h
        .navigator
        .navigate_after_state_change("authenticated", Some("/dashboard"))
        .await
        .unwrap();
    assert_eq!(context.to.pathname, "/dashboard");

    let context = h
        .navigator
        .navigate_after_state_change("guest", None)
        .await
        .unwrap();
    assert_eq!(context.to.pathname, "/login");
    assert_eq!(h.navigator.state_machine().previous(), Some("authenticated".to_string()));
}

#[tokio::test]
async fn test_state_mismatch_without_default() {
    let index = RouteIndex::new([
        ("guest", StateConfig::new().with_route(route("/login"))),
        ("authenticated", StateConfig::new().with_route(route("/dashboard"))),
    ])
    .unwrap();
    let h = harness(index, "guest");

    let err = h.navigator.navigate("/dashboard").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StateMismatch);
    assert!(err.message.contains("authenticated"));

    let err = h
        .navigator
        .navigate_after_state_change("authenticated", None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

// ============================================================================
// Errors and retry
// ============================================================================

#[tokio::test]
async fn test_retry_after_load_failure() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let flaky = ComponentLoader::new("flaky", move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                Err(anyhow::anyhow!("network down"))
            } else {
                Ok::<Component, anyhow::Error>(Arc::new("flaky"))
            }
        }
    });
    let index = RouteIndex::new([(
        "app",
        StateConfig::new().with_route(RouteDefinition::new("/flaky", flaky)),
    )])
    .unwrap();
    let h = harness(index, "app");

    let err = h.navigator.navigate("/flaky").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::LoadFailed);
    assert!(err.is_retryable());
    assert_eq!(err.message, "failed to load view `flaky`");
    assert!(h.location.error().is_some());

    let context = h.navigator.retry().await.unwrap();
    assert_eq!(context.navigation_type, NavigationType::Replace);
    assert!(h.location.error().is_none());
    assert_eq!(h.history.urls(), vec!["/flaky"]);
}

#[tokio::test]
async fn test_retry_without_navigation() {
    let h = harness(app_index(&["/"]), "app");
    assert!(h.navigator.retry().await.is_err());
}

#[tokio::test]
async fn test_panicking_loader_becomes_load_failed() {
    let exploding = ComponentLoader::new("exploding", || async {
        if "boom".len() == 4 {
            panic!("loader exploded");
        }
        Ok::<Component, anyhow::Error>(Arc::new(()))
    });
    let index = RouteIndex::new([(
        "app",
        StateConfig::new().with_route(RouteDefinition::new("/boom", exploding)),
    )])
    .unwrap();
    let h = harness(index, "app");

    let err = h.navigator.navigate("/boom").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::LoadFailed);
    assert_eq!(err.cause.map(|c| c.to_string()).as_deref(), Some("loader exploded"));
    assert!(!h.navigator.is_navigating());
}

#[tokio::test]
async fn test_render_error_is_reported() {
    let h = harness(app_index(&["/a"]), "app");
    h.navigator.navigate("/a").await.unwrap();

    let err = h.navigator.report_render_error(anyhow::anyhow!("template blew up"));
    assert_eq!(err.code, ErrorCode::RenderError);
    assert_eq!(err.path, "/a");
    assert!(err.is_visual());

    let reported = h.errors.errors();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].1.source, ErrorSource::Render);
    assert_eq!(h.location.error().map(|e| e.code), Some(ErrorCode::RenderError));
}

#[tokio::test]
async fn test_add_routes_through_navigator() {
    let h = harness(app_index(&["/projects/[id]"]), "app");
    h.navigator.add_routes("app", [route("/projects/new")]).unwrap();

    let context = h.navigator.navigate("/projects/new").await.unwrap();
    assert_eq!(context.route.path(), "/projects/new");
    assert!(h.navigator.add_routes("app", [route("/projects/new/")]).is_err());
}
