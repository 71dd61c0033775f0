/// Pattern compilation and specificity scoring
///
/// Turns a route path pattern such as `/projects/[id]/files/[...path?]` into a
/// [`RoutePattern`]: an anchored regex, the ordered parameter names and a
/// specificity score. Compilation happens once per route when the route index
/// is built, so every error here is a configuration error.
use regex::Regex;
use std::collections::HashMap;

use super::pattern::{classify_segment, PatternSegment};
use crate::error::ConfigError;
use crate::path::decode_segment;

/// A compiled, immutable route pattern
#[derive(Debug, Clone)]
pub struct RoutePattern {
    /// The pattern as declared, e.g. `/users/[id]`
    pub pattern: String,
    /// Owning app state
    pub state: String,
    /// Parameter names in positional order
    pub params: Vec<String>,
    /// Typed segments, in order
    pub segments: Vec<PatternSegment>,
    /// Sum of the segment scores
    pub score: u32,
    regex: Regex,
}

impl RoutePattern {
    /// True when every segment is literal text
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(PatternSegment::is_static)
    }

    /// The anchored regex this pattern compiles to
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Matches a pathname, returning percent-decoded parameters
    ///
    /// Unmatched optional segments yield an empty string, never a missing key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigator::route::compile;
    ///
    /// let route = compile("/files/[...path?]", "app").unwrap();
    /// assert_eq!(route.matches("/files").unwrap()["path"], "");
    /// assert_eq!(route.matches("/files/a/b").unwrap()["path"], "a/b");
    /// ```
    pub fn matches(&self, pathname: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(pathname)?;

        let params = self
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = captures
                    .get(i + 1)
                    .map(|m| decode_segment(m.as_str().trim_end_matches('/')))
                    .unwrap_or_default();
                (name.clone(), value)
            })
            .collect();

        Some(params)
    }

    /// Whether the pattern accepts the pathname, without extracting params
    pub fn is_match(&self, pathname: &str) -> bool {
        self.regex.is_match(pathname)
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.state == other.state && self.score == other.score
    }
}

impl Eq for RoutePattern {}

/// Accumulator for fold-based compilation
///
/// All mutations are local to the fold; each step consumes and returns Self.
#[derive(Default)]
struct CompileState {
    source: String,
    params: Vec<String>,
    segments: Vec<PatternSegment>,
    score: u32,
}

impl CompileState {
    fn with_segment(mut self, segment: PatternSegment) -> Self {
        match &segment {
            PatternSegment::Static(text) => {
                self.source.push('/');
                self.source.push_str(&regex::escape(text));
            }
            PatternSegment::Required(_) => self.source.push_str("/([^/]+)"),
            PatternSegment::Optional(_) => self.source.push_str("(?:/([^/]+))?"),
            PatternSegment::CatchAll(_) => self.source.push_str("/(.+)"),
            PatternSegment::OptionalCatchAll(_) => self.source.push_str("(?:/(.+))?"),
        }

        if let Some(name) = segment.param_name() {
            self.params.push(name.to_string());
        }
        self.score += segment.score();
        self.segments.push(segment);
        self
    }
}

/// Compiles a route pattern for the given state
///
/// # Errors
///
/// - [`ConfigError::MissingLeadingSlash`] when the pattern is not absolute
/// - [`ConfigError::MalformedSegment`] for invalid bracket syntax
/// - [`ConfigError::CatchAllNotLast`] when a catch-all is followed by more segments
/// - [`ConfigError::DuplicateParam`] when a parameter name repeats
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::route::compile;
///
/// let route = compile("/projects/[id]", "app").unwrap();
/// assert_eq!(route.params, vec!["id"]);
/// assert_eq!(route.score, 110);
///
/// assert!(compile("/docs/[...slug]/edit", "app").is_err());
/// ```
pub fn compile(pattern: &str, state: &str) -> Result<RoutePattern, ConfigError> {
    if !pattern.starts_with('/') {
        return Err(ConfigError::MissingLeadingSlash {
            pattern: pattern.to_string(),
        });
    }

    let raw: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();

    let compiled = raw
        .iter()
        .enumerate()
        .try_fold(CompileState::default(), |acc, (i, raw_segment)| {
            let segment =
                classify_segment(raw_segment).ok_or_else(|| ConfigError::MalformedSegment {
                    pattern: pattern.to_string(),
                    segment: raw_segment.to_string(),
                })?;

            if segment.is_catch_all() && i + 1 < raw.len() {
                return Err(ConfigError::CatchAllNotLast {
                    pattern: pattern.to_string(),
                    segment: raw_segment.to_string(),
                });
            }

            if let Some(name) = segment.param_name() {
                if acc.params.iter().any(|p| p == name) {
                    return Err(ConfigError::DuplicateParam {
                        pattern: pattern.to_string(),
                        param: name.to_string(),
                    });
                }
            }

            Ok(acc.with_segment(segment))
        })?;

    // Trailing slash is always optional
    let source = format!("^{}/?$", compiled.source);
    let regex = Regex::new(&source).map_err(|_| ConfigError::MalformedSegment {
        pattern: pattern.to_string(),
        segment: pattern.to_string(),
    })?;

    Ok(RoutePattern {
        pattern: pattern.to_string(),
        state: state.to_string(),
        params: compiled.params,
        segments: compiled.segments,
        score: compiled.score,
        regex,
    })
}
