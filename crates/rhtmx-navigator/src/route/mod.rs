/// Route module for pattern classification and compilation
///
/// Contains pure functional components:
/// - `pattern` classifies bracket syntax into typed segments
/// - `compiler` turns a whole pattern into a scored, matchable [`RoutePattern`]

pub mod compiler;
pub mod pattern;

// Re-export commonly used types
pub use compiler::{compile, RoutePattern};
pub use pattern::{classify_segment, PatternSegment};
