/// Segment classification for route patterns
///
/// Pure functional parsing of bracket syntax into typed segments.
/// All functions are **pure**: same input → same output, no side effects.

/// The kinds of segment a route pattern is built from
///
/// Functional sum type: each dynamic variant carries its parameter name.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::route::pattern::{classify_segment, PatternSegment};
///
/// assert_eq!(classify_segment("about"), Some(PatternSegment::Static("about".into())));
/// assert_eq!(classify_segment("[id]"), Some(PatternSegment::Required("id".into())));
/// assert_eq!(classify_segment("[id?]"), Some(PatternSegment::Optional("id".into())));
/// assert_eq!(classify_segment("[...slug]"), Some(PatternSegment::CatchAll("slug".into())));
/// assert_eq!(
///     classify_segment("[...slug?]"),
///     Some(PatternSegment::OptionalCatchAll("slug".into()))
/// );
///
/// // Malformed bracket syntax
/// assert_eq!(classify_segment("[id"), None);
/// assert_eq!(classify_segment("[]"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Literal text: `about`
    Static(String),
    /// Required parameter: `[id]`
    Required(String),
    /// Optional parameter: `[id?]`
    Optional(String),
    /// Catch-all, one or more segments: `[...path]`
    CatchAll(String),
    /// Catch-all, zero or more segments: `[...path?]`
    OptionalCatchAll(String),
}

impl PatternSegment {
    /// Specificity contribution of this segment
    ///
    /// `static=100, required=10, optional=5, catch-all=2, optional catch-all=1`
    pub fn score(&self) -> u32 {
        match self {
            PatternSegment::Static(_) => 100,
            PatternSegment::Required(_) => 10,
            PatternSegment::Optional(_) => 5,
            PatternSegment::CatchAll(_) => 2,
            PatternSegment::OptionalCatchAll(_) => 1,
        }
    }

    /// Parameter name, `None` for static segments
    pub fn param_name(&self) -> Option<&str> {
        match self {
            PatternSegment::Static(_) => None,
            PatternSegment::Required(name)
            | PatternSegment::Optional(name)
            | PatternSegment::CatchAll(name)
            | PatternSegment::OptionalCatchAll(name) => Some(name),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, PatternSegment::Static(_))
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(
            self,
            PatternSegment::CatchAll(_) | PatternSegment::OptionalCatchAll(_)
        )
    }
}

/// Classifies one non-empty segment (pure function)
///
/// # Parsing Rules (evaluated in order)
///
/// 1. **Optional catch-all**: `[...name?]`
/// 2. **Catch-all**: `[...name]`
/// 3. **Optional param**: `[name?]`
/// 4. **Required param**: `[name]`
/// 5. **Static**: any text without brackets
///
/// Returns `None` for malformed bracket syntax: unbalanced brackets,
/// brackets mixed with literal text, nested brackets or an invalid name.
pub fn classify_segment(segment: &str) -> Option<PatternSegment> {
    match segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) => {
            if let Some(rest) = inner.strip_prefix("...") {
                return match rest.strip_suffix('?') {
                    Some(name) => valid_name(name).map(PatternSegment::OptionalCatchAll),
                    None => valid_name(rest).map(PatternSegment::CatchAll),
                };
            }

            match inner.strip_suffix('?') {
                Some(name) => valid_name(name).map(PatternSegment::Optional),
                None => valid_name(inner).map(PatternSegment::Required),
            }
        }
        None if segment.contains(['[', ']']) => None,
        None => Some(PatternSegment::Static(segment.to_string())),
    }
}

/// Parameter names are non-empty runs of word characters or `-`
fn valid_name(name: &str) -> Option<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    valid.then(|| name.to_string())
}
