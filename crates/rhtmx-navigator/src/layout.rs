//! Layout resolution with a single-slot cache
//!
//! A route-level layout wins over the state layout. The resolver keeps the
//! last loaded `(id, component)` pair and returns it without calling the loader
//! when the next route resolves to the same layout id, so same-layout
//! navigations never remount the wrapper.
//!
//! The cache only changes on [`LayoutResolver::commit`] (or through
//! [`LayoutResolver::resolve_layout`], which commits right away); a load on
//! its own never replaces it.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::LayoutError;
use crate::index::{RouteDefinition, StateConfig};
use crate::loader::{Component, LayoutConfig};

/// A layout ready to wrap a view
#[derive(Clone)]
pub struct ResolvedLayout {
    pub id: String,
    pub component: Component,
}

impl std::fmt::Debug for ResolvedLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedLayout").field("id", &self.id).finish()
    }
}

#[derive(Debug, Default)]
pub struct LayoutResolver {
    cache: Mutex<Option<ResolvedLayout>>,
    loads: AtomicU64,
}

impl LayoutResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout config that applies to a route
    fn applicable<'a>(route: &'a RouteDefinition, state: &'a StateConfig) -> Option<&'a LayoutConfig> {
        route.layout.as_ref().or(state.layout.as_ref())
    }

    /// Resolves the layout for a route and caches the result
    ///
    /// Returns `Ok(None)` and clears the cache when no layout applies.
    ///
    /// # Errors
    ///
    /// [`LayoutError::LoadFailed`] annotated with the layout id when the loader fails.
    pub async fn resolve_layout(
        &self,
        route: &RouteDefinition,
        state: &StateConfig,
    ) -> Result<Option<ResolvedLayout>, LayoutError> {
        let resolved = self.load_layout(route, state).await?;
        self.commit(resolved.as_ref());
        Ok(resolved)
    }

    /// Loads the layout for a route without touching the cache
    ///
    /// A cached layout with the same id is returned as is. The result only
    /// becomes the cached layout once passed to [`LayoutResolver::commit`].
    pub async fn load_layout(
        &self,
        route: &RouteDefinition,
        state: &StateConfig,
    ) -> Result<Option<ResolvedLayout>, LayoutError> {
        let Some(config) = Self::applicable(route, state) else {
            return Ok(None);
        };

        let cached = self.cache.lock().as_ref().filter(|c| c.id == config.id()).cloned();
        if let Some(cached) = cached {
            return Ok(Some(cached));
        }

        let component = config.load().await.map_err(|source| LayoutError::LoadFailed {
            layout_id: config.id().to_string(),
            source,
        })?;
        self.loads.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(layout = config.id(), "layout loaded");
        Ok(Some(ResolvedLayout {
            id: config.id().to_string(),
            component,
        }))
    }

    /// Makes `layout` the cached layout; `None` clears the cache
    pub fn commit(&self, layout: Option<&ResolvedLayout>) {
        *self.cache.lock() = layout.cloned();
    }

    /// Whether resolving this route would change the current layout
    ///
    /// Compares ids only; never invokes a loader.
    pub fn will_layout_change(&self, route: &RouteDefinition, state: &StateConfig) -> bool {
        let next = Self::applicable(route, state).map(|c| c.id());
        let current = self.cache.lock().as_ref().map(|c| c.id.clone());
        next != current.as_deref()
    }

    /// Forces the next resolution to reload
    pub fn clear_cache(&self) {
        *self.cache.lock() = None;
    }

    /// Id of the cached layout, if any
    pub fn current_id(&self) -> Option<String> {
        self.cache.lock().as_ref().map(|c| c.id.clone())
    }

    /// Number of loader invocations so far
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}
