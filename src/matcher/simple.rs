//! `simple` backend: a small backtracking engine with no dependencies
//!
//! Supports `.` `*` `+` `?`, the classes `\d` `\w` `\s` and their negations,
//! bracket sets such as `[a-z_]` and `[^0-9]`, and escaped literals. Groups
//! and alternation are rejected. Patterns are implicitly anchored at both
//! ends; an explicit leading `^` or trailing `$` is accepted and ignored.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::backend::{MatcherBackend, RegexMatcher};
use super::errors::{MatcherError, MatcherResult};
use super::SIMPLE_MATCHER;

const VERSION: &str = "1";

/// Factory for [`SimpleMatcher`]
#[derive(Debug, Default)]
pub struct SimpleBackend;

impl MatcherBackend for SimpleBackend {
    fn name(&self) -> &str {
        SIMPLE_MATCHER
    }

    fn supported_version(&self) -> &str {
        VERSION
    }

    fn create(&self) -> MatcherResult<Arc<dyn RegexMatcher>> {
        Ok(Arc::new(SimpleMatcher::new()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CharClass {
    Any,
    Literal(char),
    Digit(bool),
    Word(bool),
    Space(bool),
    Set { negate: bool, items: Vec<SetItem> },
}

#[derive(Debug, Clone, PartialEq)]
enum SetItem {
    Char(char),
    Range(char, char),
    Class(CharClass),
}

impl CharClass {
    fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Any => true,
            CharClass::Literal(l) => c == *l,
            CharClass::Digit(negate) => c.is_ascii_digit() != *negate,
            CharClass::Word(negate) => (c.is_alphanumeric() || c == '_') != *negate,
            CharClass::Space(negate) => c.is_whitespace() != *negate,
            CharClass::Set { negate, items } => {
                let hit = items.iter().any(|item| match item {
                    SetItem::Char(x) => c == *x,
                    SetItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
                    SetItem::Class(class) => class.matches(c),
                });
                hit != *negate
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    class: CharClass,
    repeat: Repeat,
}

/// Parsed pattern, reused for every subject
#[derive(Debug, Clone, PartialEq)]
struct CompiledPattern {
    tokens: Vec<Token>,
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Result<Self, String> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens: Vec<Token> = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '^' if i == 0 => {
                    i += 1;
                }
                '$' if i == chars.len() - 1 => {
                    i += 1;
                }
                '*' | '+' | '?' => {
                    let last = tokens
                        .last_mut()
                        .filter(|t| t.repeat == Repeat::One)
                        .ok_or_else(|| format!("nothing to repeat at offset {}", i))?;
                    last.repeat = match c {
                        '*' => Repeat::ZeroOrMore,
                        '+' => Repeat::OneOrMore,
                        _ => Repeat::ZeroOrOne,
                    };
                    i += 1;
                }
                '(' | ')' | '|' => {
                    return Err(format!("unsupported '{}' at offset {}", c, i));
                }
                '\\' => {
                    let next = *chars.get(i + 1).ok_or("trailing escape")?;
                    tokens.push(Token {
                        class: escape_class(next),
                        repeat: Repeat::One,
                    });
                    i += 2;
                }
                '[' => {
                    let (class, len) = parse_set(&chars[i..])?;
                    tokens.push(Token {
                        class,
                        repeat: Repeat::One,
                    });
                    i += len;
                }
                '.' => {
                    tokens.push(Token {
                        class: CharClass::Any,
                        repeat: Repeat::One,
                    });
                    i += 1;
                }
                other => {
                    tokens.push(Token {
                        class: CharClass::Literal(other),
                        repeat: Repeat::One,
                    });
                    i += 1;
                }
            }
        }

        Ok(Self { tokens })
    }

    fn is_match(&self, value: &str) -> bool {
        let chars: Vec<char> = value.chars().collect();
        self.match_from(0, &chars, 0)
    }

    fn match_from(&self, ti: usize, chars: &[char], ci: usize) -> bool {
        let token = match self.tokens.get(ti) {
            Some(token) => token,
            None => return ci == chars.len(),
        };
        let accepts = |at: usize| at < chars.len() && token.class.matches(chars[at]);

        match token.repeat {
            Repeat::One => accepts(ci) && self.match_from(ti + 1, chars, ci + 1),
            Repeat::ZeroOrOne => {
                (accepts(ci) && self.match_from(ti + 1, chars, ci + 1))
                    || self.match_from(ti + 1, chars, ci)
            }
            Repeat::ZeroOrMore | Repeat::OneOrMore => {
                let min = if token.repeat == Repeat::OneOrMore { 1 } else { 0 };
                // greedy, then backtrack
                let mut end = ci;
                while accepts(end) {
                    end += 1;
                }
                (ci + min..=end)
                    .rev()
                    .any(|at| self.match_from(ti + 1, chars, at))
            }
        }
    }
}

fn escape_class(c: char) -> CharClass {
    match c {
        'd' => CharClass::Digit(false),
        'D' => CharClass::Digit(true),
        'w' => CharClass::Word(false),
        'W' => CharClass::Word(true),
        's' => CharClass::Space(false),
        'S' => CharClass::Space(true),
        't' => CharClass::Literal('\t'),
        'n' => CharClass::Literal('\n'),
        other => CharClass::Literal(other),
    }
}

/// Parses `[...]` at the start of `chars`; returns the class and the number
/// of chars consumed
fn parse_set(chars: &[char]) -> Result<(CharClass, usize), String> {
    let mut i = 1;
    let negate = chars.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut items = Vec::new();
    loop {
        let c = *chars.get(i).ok_or("unclosed '['")?;
        match c {
            // a leading ']' is literal
            ']' if !items.is_empty() => {
                return Ok((CharClass::Set { negate, items }, i + 1));
            }
            '\\' => {
                let next = *chars.get(i + 1).ok_or("trailing escape")?;
                items.push(match escape_class(next) {
                    CharClass::Literal(l) => SetItem::Char(l),
                    class => SetItem::Class(class),
                });
                i += 2;
            }
            lo => match (chars.get(i + 1), chars.get(i + 2)) {
                (Some('-'), Some(&hi)) if hi != ']' => {
                    if hi < lo {
                        return Err(format!("invalid range {}-{}", lo, hi));
                    }
                    items.push(SetItem::Range(lo, hi));
                    i += 3;
                }
                _ => {
                    items.push(SetItem::Char(lo));
                    i += 1;
                }
            },
        }
    }
}

/// Matcher over [`CompiledPattern`]s, one per distinct pattern string
#[derive(Debug, Default)]
pub struct SimpleMatcher {
    compiled: RwLock<HashMap<String, Arc<CompiledPattern>>>,
}

impl SimpleMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, pattern: &str) -> MatcherResult<Arc<CompiledPattern>> {
        if let Ok(compiled) = self.compiled.read() {
            if let Some(p) = compiled.get(pattern) {
                return Ok(Arc::clone(p));
            }
        }

        let parsed = CompiledPattern::compile(pattern).map_err(|reason| MatcherError::InvalidPattern {
            backend: SIMPLE_MATCHER.to_string(),
            pattern: pattern.to_string(),
            reason,
        })?;
        let parsed = Arc::new(parsed);

        if let Ok(mut compiled) = self.compiled.write() {
            return Ok(Arc::clone(
                compiled.entry(pattern.to_string()).or_insert(parsed),
            ));
        }
        Ok(parsed)
    }

    /// Number of distinct patterns compiled
    pub fn cached_patterns(&self) -> usize {
        self.compiled.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl RegexMatcher for SimpleMatcher {
    fn name(&self) -> &str {
        SIMPLE_MATCHER
    }

    fn supported_version(&self) -> &str {
        VERSION
    }

    fn is_match(&self, pattern: &str, value: &str) -> MatcherResult<bool> {
        Ok(self.compiled(pattern)?.is_match(value))
    }
}
