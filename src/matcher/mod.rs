//! Pluggable regular-expression matcher backends
//!
//! Backends are selected at build and configuration time: the `standard`
//! backend exists when the `regex-backend` feature is compiled in, the
//! `simple` backend always exists, and either can be switched off through
//! [`QueryConfig::disabled_matchers`](crate::config::QueryConfig).
//!
//! Matching is whole-value: `is_match("a.c", "abc")` is true,
//! `is_match("b", "abc")` is false.

mod backend;
mod errors;
mod registry;
mod simple;
#[cfg(feature = "regex-backend")]
mod standard;

pub use backend::{MatcherBackend, RegexMatcher};
pub use errors::{MatcherError, MatcherResult};
pub use registry::MatcherRegistry;
pub use simple::{SimpleBackend, SimpleMatcher};
#[cfg(feature = "regex-backend")]
pub use standard::{StandardBackend, StandardMatcher};

/// Name of the backend used when no default is configured
pub const STANDARD_MATCHER: &str = "standard";

/// Name of the built-in fallback backend
pub const SIMPLE_MATCHER: &str = "simple";
