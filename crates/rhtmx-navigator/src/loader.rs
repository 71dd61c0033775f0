//! Async loaders for views and layouts

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A loaded, renderable unit (view or layout)
///
/// The engine never inspects components; the view layer downcasts them.
pub type Component = Arc<dyn Any + Send + Sync>;

type LoadFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<Component>> + Send + Sync;

/// A loader paired with the stable identity it loads
///
/// Identity comparisons (layout caching, error annotation) use `id`, never
/// the closure itself.
#[derive(Clone)]
pub struct ComponentLoader {
    id: String,
    load: Arc<LoadFn>,
}

impl ComponentLoader {
    /// Creates a loader from an async closure
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::ComponentLoader;
    /// use std::sync::Arc;
    ///
    /// let loader = ComponentLoader::new("users-list", || async {
    ///     Ok::<rhtmx_navigator::Component, anyhow::Error>(Arc::new("users list"))
    /// });
    /// assert_eq!(loader.id(), "users-list");
    /// ```
    pub fn new<F, Fut>(id: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Component>> + Send + 'static,
    {
        Self {
            id: id.into(),
            load: Arc::new(move || Box::pin(load())),
        }
    }

    /// Loader that resolves immediately to the given value
    pub fn ready<T>(id: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync + Clone,
    {
        Self::new(id, move || {
            let value = value.clone();
            async move { Ok::<Component, anyhow::Error>(Arc::new(value)) }
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Runs the loader
    pub async fn load(&self) -> anyhow::Result<Component> {
        (self.load)().await
    }
}

impl fmt::Debug for ComponentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentLoader").field("id", &self.id).finish()
    }
}

/// Layout declared on a route or a state
pub type LayoutConfig = ComponentLoader;
