//! Compiled LIKE patterns

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::value::Value;

/// One step of a compiled LIKE pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSymbol {
    /// A wildcard preceded this literal: search for it
    Find(String),
    /// No wildcard preceded this literal: it must start here
    Exact(String),
    /// Trailing wildcard
    Any,
    /// End of subject
    End,
}

/// Immutable, reusable compiled LIKE pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    pattern: String,
    wildcard: String,
    symbols: Vec<PatternSymbol>,
}

impl LikePattern {
    /// Splits `pattern` on `wildcard` into symbols.
    ///
    /// `'a%b%'` compiles to `[Exact(a), Find(b), Any]`, `'%a'` to
    /// `[Find(a), End]`. An empty wildcard makes the whole pattern literal.
    pub fn compile(pattern: &str, wildcard: &str) -> Self {
        let mut symbols = Vec::new();

        if wildcard.is_empty() {
            if !pattern.is_empty() {
                symbols.push(PatternSymbol::Exact(pattern.to_string()));
            }
            symbols.push(PatternSymbol::End);
        } else {
            let pieces: Vec<&str> = pattern.split(wildcard).collect();
            for (i, piece) in pieces.iter().enumerate() {
                if piece.is_empty() {
                    continue;
                }
                symbols.push(if i == 0 {
                    PatternSymbol::Exact(piece.to_string())
                } else {
                    PatternSymbol::Find(piece.to_string())
                });
            }

            let trailing_wildcard = pieces.len() > 1 && pieces.last().map_or(false, |p| p.is_empty());
            symbols.push(if trailing_wildcard {
                PatternSymbol::Any
            } else {
                PatternSymbol::End
            });
        }

        Self {
            pattern: pattern.to_string(),
            wildcard: wildcard.to_string(),
            symbols,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn wildcard(&self) -> &str {
        &self.wildcard
    }

    pub fn symbols(&self) -> &[PatternSymbol] {
        &self.symbols
    }

    /// Walks the symbols over `subject`.
    ///
    /// `Find` takes the last occurrence of its literal in the remaining
    /// text, so `'%a%b'` does not match `"ab_a"`.
    pub fn matches(&self, subject: &str) -> bool {
        let mut pos = 0;
        for symbol in &self.symbols {
            match symbol {
                PatternSymbol::Any => return true,
                PatternSymbol::End => return pos == subject.len(),
                PatternSymbol::Exact(lit) => {
                    if !subject[pos..].starts_with(lit.as_str()) {
                        return false;
                    }
                    pos += lit.len();
                }
                PatternSymbol::Find(lit) => match subject[pos..].rfind(lit.as_str()) {
                    Some(i) => pos += i + lit.len(),
                    None => return false,
                },
            }
        }
        true
    }
}

impl fmt::Display for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.pattern)
    }
}

/// Applies `pattern` to a value.
///
/// Null never matches. Every element of a list must match. With
/// `ignore_case` the subject is lower-cased; the pattern is expected to be
/// lower-cased already.
pub fn like_matches(pattern: &LikePattern, value: &Value, ignore_case: bool, negate: bool) -> bool {
    all_match(pattern, value, ignore_case) != negate
}

fn all_match(pattern: &LikePattern, value: &Value, ignore_case: bool) -> bool {
    match value {
        Value::Null => false,
        Value::List(items) => items.iter().all(|item| all_match(pattern, item, ignore_case)),
        Value::Text(text) if !ignore_case => pattern.matches(text),
        other => {
            let text = other.to_text();
            if ignore_case {
                pattern.matches(&text.to_lowercase())
            } else {
                pattern.matches(&text)
            }
        }
    }
}

/// Shared cache of compiled patterns keyed by (pattern, wildcard)
#[derive(Debug, Default)]
pub struct LikePatternCache {
    patterns: RwLock<HashMap<(String, String), Arc<LikePattern>>>,
}

impl LikePatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pattern: &str, wildcard: &str) -> Option<Arc<LikePattern>> {
        let patterns = self.patterns.read().ok()?;
        patterns
            .get(&(pattern.to_string(), wildcard.to_string()))
            .cloned()
    }

    /// Stores `compiled`, returning the entry that won if another thread
    /// stored the same key first
    pub fn insert(&self, compiled: LikePattern) -> Arc<LikePattern> {
        let key = (compiled.pattern.clone(), compiled.wildcard.clone());
        let compiled = Arc::new(compiled);
        match self.patterns.write() {
            Ok(mut patterns) => Arc::clone(patterns.entry(key).or_insert(compiled)),
            Err(_) => compiled,
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn like(pattern: &str, subject: &str) -> bool {
        LikePattern::compile(pattern, "%").matches(subject)
    }

    #[test]
    fn test_compile_symbols() {
        use PatternSymbol::*;
        assert_eq!(
            LikePattern::compile("a%b%", "%").symbols(),
            &[Exact("a".into()), Find("b".into()), Any]
        );
        assert_eq!(LikePattern::compile("%a", "%").symbols(), &[Find("a".into()), End]);
        assert_eq!(LikePattern::compile("abc", "%").symbols(), &[Exact("abc".into()), End]);
        assert_eq!(LikePattern::compile("%", "%").symbols(), &[Any]);
        assert_eq!(LikePattern::compile("", "%").symbols(), &[End]);
    }

    #[test]
    fn test_leading_wildcard() {
        assert!(like("%abc", "xxabc"));
        assert!(like("%abc", "abc"));
        assert!(!like("%abc", "abcx"));
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(like("abc%", "abcxyz"));
        assert!(like("abc%", "abc"));
        assert!(!like("abc%", "xabc"));
    }

    #[test]
    fn test_inner_wildcard() {
        assert!(like("a%c", "abc"));
        assert!(like("a%c", "axyzc"));
        assert!(like("a%c", "ac"));
        assert!(!like("a%c", "acb"));
    }

    #[test]
    fn test_last_occurrence_search() {
        // "a" is found at its last position, leaving no "b" after it
        assert!(!like("%a%b", "ab_a"));
        assert!(like("%a%b", "a_ab"));
    }

    #[test]
    fn test_exact_and_empty() {
        assert!(like("abc", "abc"));
        assert!(!like("abc", "abcd"));
        assert!(like("", ""));
        assert!(!like("", "a"));
        assert!(like("%", ""));
    }

    #[test]
    fn test_custom_wildcard() {
        let pattern = LikePattern::compile("ab*", "*");
        assert!(pattern.matches("abz"));
        assert!(!pattern.matches("a%"));

        let literal = LikePattern::compile("a%", "");
        assert!(literal.matches("a%"));
        assert!(!literal.matches("ab"));
    }

    #[test]
    fn test_value_semantics() {
        let pattern = LikePattern::compile("v%", "%");
        assert!(like_matches(&pattern, &Value::from("volvo"), false, false));
        assert!(!like_matches(&pattern, &Value::from("Volvo"), false, false));
        assert!(like_matches(&pattern, &Value::from("Volvo"), true, false));
        assert!(!like_matches(&pattern, &Value::Null, false, false));
        assert!(like_matches(&pattern, &Value::from(vec!["vw", "volvo"]), false, false));
        assert!(!like_matches(&pattern, &Value::from(vec!["vw", "saab"]), false, false));
        assert!(like_matches(&pattern, &Value::from(vec!["vw", "saab"]), false, true));
    }

    #[test]
    fn test_non_text_subjects_use_text_form() {
        let pattern = LikePattern::compile("12%", "%");
        assert!(like_matches(&pattern, &Value::Integer(1234), false, false));
    }

    #[test]
    fn test_cache_reuses_entries() {
        let cache = LikePatternCache::new();
        assert!(cache.get("a%", "%").is_none());
        let first = cache.insert(LikePattern::compile("a%", "%"));
        let second = cache.get("a%", "%").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.get("a%", "*").is_none());
        assert_eq!(cache.len(), 1);
    }
}
