//! `standard` backend over the `regex` crate

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use regex::Regex;

use super::backend::{MatcherBackend, RegexMatcher};
use super::errors::{MatcherError, MatcherResult};
use super::STANDARD_MATCHER;

const VERSION: &str = "1";

/// Factory for [`StandardMatcher`]
#[derive(Debug, Default)]
pub struct StandardBackend;

impl MatcherBackend for StandardBackend {
    fn name(&self) -> &str {
        STANDARD_MATCHER
    }

    fn supported_version(&self) -> &str {
        VERSION
    }

    fn create(&self) -> MatcherResult<Arc<dyn RegexMatcher>> {
        Ok(Arc::new(StandardMatcher::new()))
    }
}

/// Full regular-expression syntax, one compiled `Regex` per pattern
#[derive(Debug, Default)]
pub struct StandardMatcher {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl StandardMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn regex(&self, pattern: &str) -> MatcherResult<Regex> {
        if let Ok(compiled) = self.compiled.read() {
            if let Some(regex) = compiled.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            MatcherError::InvalidPattern {
                backend: STANDARD_MATCHER.to_string(),
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Ok(mut compiled) = self.compiled.write() {
            compiled.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }

    /// Number of distinct patterns compiled
    pub fn cached_patterns(&self) -> usize {
        self.compiled.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl RegexMatcher for StandardMatcher {
    fn name(&self) -> &str {
        STANDARD_MATCHER
    }

    fn supported_version(&self) -> &str {
        VERSION
    }

    fn is_match(&self, pattern: &str, value: &str) -> MatcherResult<bool> {
        Ok(self.regex(pattern)?.is_match(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_value_match() {
        let matcher = StandardMatcher::new();
        assert!(matcher.is_match("a.c", "abc").unwrap());
        assert!(!matcher.is_match("b", "abc").unwrap());
        assert!(matcher.is_match("(foo|bar)\\d{2}", "bar42").unwrap());
        // alternation stays inside the anchors
        assert!(!matcher.is_match("a|b", "ab").unwrap());
    }

    #[test]
    fn test_patterns_are_cached() {
        let matcher = StandardMatcher::new();
        matcher.is_match("x+", "xx").unwrap();
        matcher.is_match("x+", "xxx").unwrap();
        matcher.is_match("y+", "y").unwrap();
        assert_eq!(matcher.cached_patterns(), 2);
    }

    #[test]
    fn test_invalid_pattern() {
        let matcher = StandardMatcher::new();
        assert!(matches!(
            matcher.is_match("(unclosed", "x"),
            Err(MatcherError::InvalidPattern { .. })
        ));
    }
}
