//! Configuration-time validation of state route tables
//!
//! Runs as the first step of building each state table; the compiled
//! patterns are handed on. Every failure is a [`ConfigError`] and is meant to
//! abort startup.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::index::StateConfig;
use crate::path::trim_trailing_slash;
use crate::route::{compile, PatternSegment, RoutePattern};

/// Validates one state's configuration
///
/// Rejects empty state names, malformed patterns (see [`compile`]), duplicate
/// paths within the state and redirects that point at themselves.
///
/// Two patterns are duplicates when they have the same shape, e.g.
/// `/users/[id]` and `/users/[slug]/`.
pub fn validate_state(name: &str, config: &StateConfig) -> Result<(), ConfigError> {
    compile_state(name, config).map(|_| ())
}

/// Validates one state and returns its compiled patterns in declaration order
pub(crate) fn compile_state(name: &str, config: &StateConfig) -> Result<Vec<RoutePattern>, ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::EmptyStateName);
    }

    let mut seen = HashSet::new();
    let mut patterns = Vec::with_capacity(config.routes.len());
    for route in &config.routes {
        let compiled = compile(&route.path, name)?;
        if !seen.insert(shape_key(&compiled.segments)) {
            return Err(ConfigError::DuplicatePath {
                state: name.to_string(),
                path: route.path.clone(),
            });
        }
        patterns.push(compiled);
    }

    for (from, to) in &config.redirects {
        if !from.starts_with('/') {
            return Err(ConfigError::MissingLeadingSlash {
                pattern: from.clone(),
            });
        }
        if trim_trailing_slash(from) == trim_trailing_slash(to) {
            return Err(ConfigError::SelfRedirect {
                state: name.to_string(),
                path: from.clone(),
            });
        }
    }

    Ok(patterns)
}

/// Validates a whole configuration
pub fn validate_states<'a, I>(states: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (&'a str, &'a StateConfig)>,
{
    states
        .into_iter()
        .try_for_each(|(name, config)| validate_state(name, config))
}

/// Pattern shape with parameter names erased
fn shape_key(segments: &[PatternSegment]) -> String {
    let shape: String = segments
        .iter()
        .map(|segment| match segment {
            PatternSegment::Static(text) => format!("/{}", text),
            PatternSegment::Required(_) => "/[]".to_string(),
            PatternSegment::Optional(_) => "/[?]".to_string(),
            PatternSegment::CatchAll(_) => "/[...]".to_string(),
            PatternSegment::OptionalCatchAll(_) => "/[...?]".to_string(),
        })
        .collect();

    if shape.is_empty() {
        "/".to_string()
    } else {
        shape
    }
}
