//! State-aware route index
//!
//! The index owns one route table per app state. Each table keeps:
//! - Compiled routes sorted by specificity (score desc, declaration order asc)
//! - A static-path lookup (O(1)) keyed by both `/x` and `/x/`
//! - A redirect lookup (O(1)) keyed by exact path
//! - "Expandable" routes of the shape `/[param]/rest` for [`RouteIndex::try_expand_path`]
//!
//! Tables are built once. [`RouteIndex::add_routes`] rebuilds a single table and
//! must only be called before the first navigation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::loader::{ComponentLoader, LayoutConfig};
use crate::path::trim_trailing_slash;
use crate::route::{PatternSegment, RoutePattern};
use crate::validate::compile_state;

/// Caller-provided data used for path expansion and default-path resolution
pub type ContextData = HashMap<String, String>;

type ResolveFn = dyn Fn(&ContextData) -> Option<String> + Send + Sync;

/// Where a state sends users when a requested route is unavailable
#[derive(Clone, Default)]
pub enum DefaultPath {
    #[default]
    None,
    Path(String),
    Resolve(Arc<ResolveFn>),
}

impl DefaultPath {
    /// Computed default path
    pub fn resolve<F>(f: F) -> Self
    where
        F: Fn(&ContextData) -> Option<String> + Send + Sync + 'static,
    {
        DefaultPath::Resolve(Arc::new(f))
    }

    /// Resolves against the given context data
    pub fn get(&self, context: &ContextData) -> Option<String> {
        match self {
            DefaultPath::None => None,
            DefaultPath::Path(path) => Some(path.clone()),
            DefaultPath::Resolve(f) => f(context),
        }
    }
}

impl fmt::Debug for DefaultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultPath::None => f.write_str("None"),
            DefaultPath::Path(path) => f.debug_tuple("Path").field(path).finish(),
            DefaultPath::Resolve(_) => f.write_str("Resolve(..)"),
        }
    }
}

/// A route as declared by the application
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    /// Path pattern such as `/users/[id]`
    pub path: String,
    /// View loader, identified by a stable id
    pub view: ComponentLoader,
    /// Route-level layout, takes precedence over the state layout
    pub layout: Option<LayoutConfig>,
    /// Arbitrary metadata (titles, permissions, ...)
    pub meta: HashMap<String, String>,
}

impl RouteDefinition {
    pub fn new(path: impl Into<String>, view: ComponentLoader) -> Self {
        Self {
            path: path.into(),
            view,
            layout: None,
            meta: HashMap::new(),
        }
    }

    /// Sets the route-level layout
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Sets a metadata key-value pair
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn get_meta(&self, key: &str) -> Option<&String> {
        self.meta.get(key)
    }
}

/// Per-state bundle of routes, default path, layout and redirects
#[derive(Debug, Clone, Default)]
pub struct StateConfig {
    pub routes: Vec<RouteDefinition>,
    pub default: DefaultPath,
    pub layout: Option<LayoutConfig>,
    /// Exact path → target path, in declaration order
    pub redirects: Vec<(String, String)>,
}

impl StateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, route: RouteDefinition) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with_routes<I>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        self.routes.extend(routes);
        self
    }

    pub fn with_default(mut self, default: DefaultPath) -> Self {
        self.default = default;
        self
    }

    /// Shorthand for a fixed default path
    pub fn with_default_path(self, path: impl Into<String>) -> Self {
        self.with_default(DefaultPath::Path(path.into()))
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.push((from.into(), to.into()));
        self
    }
}

/// A compiled route together with its definition
#[derive(Debug)]
pub struct RouteEntry {
    pub pattern: RoutePattern,
    pub definition: RouteDefinition,
    /// Declaration order within the state, used to break score ties
    pub order: usize,
}

impl RouteEntry {
    pub fn path(&self) -> &str {
        &self.pattern.pattern
    }
}

impl PartialEq for RouteEntry {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.order == other.order
    }
}

/// A successful match
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub route: Arc<RouteEntry>,
    /// Percent-decoded parameters; unmatched optionals are empty strings
    pub params: HashMap<String, String>,
    /// State the route was matched in
    pub state: String,
}

/// Result of matching a pathname against one state
///
/// Exactly one outcome applies; callers branch on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The path is redirected within the requested state
    Redirect { target: String },
    /// A route in the requested state matches
    Matched(RouteMatch),
    /// No route in the requested state, but one exists in another state
    StateMismatch {
        requested_state: String,
        available_in_state: String,
        pathname: String,
    },
    /// No route matches in any state
    NoMatch,
}

/// Route of the shape `/[param]/rest`
#[derive(Debug, Clone)]
struct Expansion {
    param: String,
    route: Arc<RouteEntry>,
}

/// Compiled tables for one state
#[derive(Debug)]
struct StateTable {
    name: String,
    config: Arc<StateConfig>,
    routes: Vec<Arc<RouteEntry>>,
    static_routes: HashMap<String, Arc<RouteEntry>>,
    redirects: HashMap<String, String>,
    expand_by_rest: HashMap<String, Vec<Expansion>>,
    expand_dynamic: Vec<Expansion>,
}

impl StateTable {
    fn build(name: &str, config: StateConfig) -> Result<Self, ConfigError> {
        let patterns = compile_state(name, &config)?;

        let mut routes: Vec<Arc<RouteEntry>> = patterns
            .into_iter()
            .zip(&config.routes)
            .enumerate()
            .map(|(order, (pattern, definition))| {
                Arc::new(RouteEntry {
                    pattern,
                    definition: definition.clone(),
                    order,
                })
            })
            .collect();

        // Specificity invariant: score desc, declaration order asc
        routes.sort_by(|a, b| {
            b.pattern
                .score
                .cmp(&a.pattern.score)
                .then(a.order.cmp(&b.order))
        });

        let mut static_routes = HashMap::new();
        for route in routes.iter().filter(|r| r.pattern.is_static()) {
            let key = trim_trailing_slash(route.path()).into_owned();
            if key != "/" {
                static_routes
                    .entry(format!("{}/", key))
                    .or_insert_with(|| Arc::clone(route));
            }
            static_routes.entry(key).or_insert_with(|| Arc::clone(route));
        }

        let mut redirects = HashMap::new();
        for (from, to) in &config.redirects {
            let key = trim_trailing_slash(from).into_owned();
            if key != "/" {
                redirects
                    .entry(format!("{}/", key))
                    .or_insert_with(|| to.clone());
            }
            redirects.entry(key).or_insert_with(|| to.clone());
        }

        let mut expand_by_rest: HashMap<String, Vec<Expansion>> = HashMap::new();
        let mut expand_dynamic = Vec::new();
        for route in &routes {
            let segments = &route.pattern.segments;
            let param = match segments.first() {
                Some(PatternSegment::Required(param)) if segments.len() > 1 => param.clone(),
                _ => continue,
            };

            let expansion = Expansion {
                param,
                route: Arc::clone(route),
            };

            if segments[1..].iter().all(PatternSegment::is_static) {
                let rest: String = segments[1..]
                    .iter()
                    .map(|s| match s {
                        PatternSegment::Static(text) => format!("/{}", text),
                        _ => String::new(),
                    })
                    .collect();
                expand_by_rest.entry(rest).or_default().push(expansion);
            } else {
                expand_dynamic.push(expansion);
            }
        }

        Ok(Self {
            name: name.to_string(),
            config: Arc::new(config),
            routes,
            static_routes,
            redirects,
            expand_by_rest,
            expand_dynamic,
        })
    }

    fn redirect_for(&self, pathname: &str) -> Option<&String> {
        self.redirects.get(pathname)
    }

    /// Static lookup first, then the sorted param routes
    fn match_routes(&self, pathname: &str) -> Option<RouteMatch> {
        if let Some(route) = self.static_routes.get(pathname) {
            return Some(RouteMatch {
                route: Arc::clone(route),
                params: HashMap::new(),
                state: self.name.clone(),
            });
        }

        self.routes
            .iter()
            .filter(|route| !route.pattern.is_static())
            .find_map(|route| {
                route.pattern.matches(pathname).map(|params| RouteMatch {
                    route: Arc::clone(route),
                    params,
                    state: self.name.clone(),
                })
            })
    }
}

/// Per-state route tables
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::{ComponentLoader, MatchOutcome, RouteDefinition, RouteIndex, StateConfig};
///
/// let view = ComponentLoader::ready("view", ());
/// let index = RouteIndex::new([(
///     "app",
///     StateConfig::new()
///         .with_route(RouteDefinition::new("/projects/[id]", view.clone()))
///         .with_route(RouteDefinition::new("/projects/new", view)),
/// )])
/// .unwrap();
///
/// match index.match_path("/projects/new", "app") {
///     MatchOutcome::Matched(m) => assert_eq!(m.route.path(), "/projects/new"),
///     other => panic!("unexpected outcome: {:?}", other),
/// }
/// ```
#[derive(Debug, Default)]
pub struct RouteIndex {
    states: Vec<StateTable>,
}

impl RouteIndex {
    /// Builds the index from the full state → routes configuration
    ///
    /// Validates every state first; any configuration error aborts construction.
    pub fn new<I, S>(states: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, StateConfig)>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for (name, config) in states {
            let name = name.into();
            let table = StateTable::build(&name, config)?;
            index.insert_table(table);
        }

        tracing::debug!(states = index.states.len(), "route index built");
        Ok(index)
    }

    fn insert_table(&mut self, table: StateTable) {
        match self.states.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.states.push(table),
        }
    }

    fn table(&self, state: &str) -> Option<&StateTable> {
        self.states.iter().find(|t| t.name == state)
    }

    /// Adds routes to a state and rebuilds its tables
    ///
    /// The specificity ordering covers old and new routes combined. Creates the
    /// state when it does not exist yet. Not safe to call while navigations are
    /// in flight.
    pub fn add_routes<I>(&mut self, state: &str, routes: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        let mut config = self
            .table(state)
            .map(|t| StateConfig::clone(&t.config))
            .unwrap_or_default();
        config.routes.extend(routes);

        let table = StateTable::build(state, config)?;
        self.insert_table(table);
        Ok(())
    }

    /// Matches a pathname against a state
    ///
    /// Order: redirects, static lookup, sorted param routes, then every other
    /// state to tell "wrong mode" apart from a true miss.
    pub fn match_path(&self, pathname: &str, state: &str) -> MatchOutcome {
        if let Some(table) = self.table(state) {
            if let Some(target) = table.redirect_for(pathname) {
                return MatchOutcome::Redirect {
                    target: target.clone(),
                };
            }

            if let Some(route_match) = table.match_routes(pathname) {
                return MatchOutcome::Matched(route_match);
            }
        }

        self.states
            .iter()
            .filter(|t| t.name != state)
            .find(|t| t.match_routes(pathname).is_some())
            .map(|t| MatchOutcome::StateMismatch {
                requested_state: state.to_string(),
                available_in_state: t.name.clone(),
                pathname: pathname.to_string(),
            })
            .unwrap_or(MatchOutcome::NoMatch)
    }

    /// Expands a short path into a `/[param]/rest` route using context data
    ///
    /// Returns `/{lowercased value}{pathname}` only when that candidate actually
    /// matches the expandable route.
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::{ComponentLoader, ContextData, RouteDefinition, RouteIndex, StateConfig};
    ///
    /// let view = ComponentLoader::ready("incidents", ());
    /// let index = RouteIndex::new([(
    ///     "authenticated",
    ///     StateConfig::new().with_route(RouteDefinition::new("/[org]/incidents", view)),
    /// )])
    /// .unwrap();
    ///
    /// let mut context = ContextData::new();
    /// context.insert("org".to_string(), "Acme".to_string());
    ///
    /// assert_eq!(
    ///     index.try_expand_path("/incidents", "authenticated", &context),
    ///     Some("/acme/incidents".to_string())
    /// );
    /// ```
    pub fn try_expand_path(
        &self,
        pathname: &str,
        state: &str,
        context: &ContextData,
    ) -> Option<String> {
        let table = self.table(state)?;
        let pathname = trim_trailing_slash(pathname);

        table
            .expand_by_rest
            .get(&*pathname)
            .into_iter()
            .flatten()
            .chain(table.expand_dynamic.iter())
            .find_map(|expansion| {
                let value = context
                    .get(&expansion.param)
                    .filter(|value| !value.is_empty())?;
                let candidate = format!("/{}{}", value.to_lowercase(), pathname);
                expansion
                    .route
                    .pattern
                    .is_match(&candidate)
                    .then_some(candidate)
            })
    }

    /// Resolves a state's default path
    pub fn default_path(&self, state: &str, context: &ContextData) -> Option<String> {
        self.table(state)?.config.default.get(context)
    }

    /// The configuration a state was built from
    pub fn state_config(&self, state: &str) -> Option<Arc<StateConfig>> {
        self.table(state).map(|t| Arc::clone(&t.config))
    }

    /// Compiled routes of a state in match order
    pub fn routes(&self, state: &str) -> &[Arc<RouteEntry>] {
        self.table(state).map(|t| t.routes.as_slice()).unwrap_or(&[])
    }

    /// State names in declaration order
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|t| t.name.as_str())
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.table(state).is_some()
    }
}
