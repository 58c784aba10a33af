//! Matcher traits

use std::fmt;
use std::sync::Arc;

use crate::config::QueryConfig;

use super::errors::MatcherResult;

/// A regular-expression engine behind one match interface
pub trait RegexMatcher: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn supported_version(&self) -> &str;

    /// Whether `value` matches `pattern` as a whole
    fn is_match(&self, pattern: &str, value: &str) -> MatcherResult<bool>;
}

/// Factory for one kind of [`RegexMatcher`]
pub trait MatcherBackend: Send + Sync {
    fn name(&self) -> &str;

    fn supported_version(&self) -> &str;

    /// Whether the backend may be used under `config`
    fn is_available(&self, config: &QueryConfig) -> bool {
        !config.disabled_matchers.iter().any(|d| d == self.name())
    }

    /// Builds the matcher instance. Called at most once per registry.
    fn create(&self) -> MatcherResult<Arc<dyn RegexMatcher>>;
}
