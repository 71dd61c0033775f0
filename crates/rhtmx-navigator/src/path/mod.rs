/// Path utilities for splitting, normalizing and decoding request paths
///
/// All functions are **pure**: given same input, always produce same output with no side effects.
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A location split into its URL parts
///
/// `search` keeps its leading `?` and `hash` its leading `#`, both empty when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    pub fn new(
        pathname: impl Into<String>,
        search: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            pathname: pathname.into(),
            search: search.into(),
            hash: hash.into(),
        }
    }

    /// Pathname, search and hash joined back together
    pub fn full_path(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// Splits a request path into pathname, search and hash
///
/// A missing or relative pathname is made absolute.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::path::split_path;
///
/// let location = split_path("/users/42?tab=posts#latest");
/// assert_eq!(location.pathname, "/users/42");
/// assert_eq!(location.search, "?tab=posts");
/// assert_eq!(location.hash, "#latest");
///
/// assert_eq!(split_path("?q=1").pathname, "/");
/// ```
pub fn split_path(path: &str) -> Location {
    let (rest, hash) = match path.find('#') {
        Some(i) => (&path[..i], &path[i..]),
        None => (path, ""),
    };
    let (pathname, search) = match rest.find('?') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };

    let pathname = if pathname.is_empty() {
        "/".to_string()
    } else if pathname.starts_with('/') {
        pathname.to_string()
    } else {
        format!("/{}", pathname)
    };

    Location {
        pathname,
        search: search.to_string(),
        hash: hash.to_string(),
    }
}

/// Removes a trailing slash, keeping the root as `/`
///
/// Returns `Cow::Borrowed` when nothing needs to change.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::path::trim_trailing_slash;
///
/// assert_eq!(trim_trailing_slash("/about/"), "/about");
/// assert_eq!(trim_trailing_slash("/"), "/");
/// ```
pub fn trim_trailing_slash(path: &str) -> Cow<'_, str> {
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            Cow::Borrowed("/")
        } else {
            Cow::Owned(trimmed.to_string())
        }
    } else {
        Cow::Borrowed(path)
    }
}

/// Percent-decodes a captured value
///
/// Falls back to the raw text when the decoded bytes are not valid UTF-8.
pub fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}
