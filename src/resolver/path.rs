//! Property path parsing

use std::fmt;
use std::str::FromStr;

use super::errors::{PropertyResolutionError, ResolutionResult};

/// One step of a property path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// `.name` - field or accessor, or map key on maps
    Member(String),
    /// `[3]` - position in a list
    Index(usize),
    /// `[key]` - key in a map
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Member(name) => write!(f, "{}", name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Key(k) => write!(f, "[{}]", k),
        }
    }
}

/// Parsed, immutable property path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    text: String,
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Parses `a.b[0].c[key]`.
    ///
    /// Bracket contents may be quoted. Contents made only of digits are list
    /// indexes; anything else is a map key.
    pub fn parse(text: &str) -> ResolutionResult<Self> {
        let invalid = |reason: &str| PropertyResolutionError::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        let mut rest = text.trim();
        if rest.is_empty() {
            return Err(invalid("empty path"));
        }

        let mut segments = Vec::new();
        let mut first = true;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let end = after.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let segment =
                    Self::bracket_segment(&after[..end]).ok_or_else(|| invalid("empty brackets"))?;
                segments.push(segment);
                rest = &after[end + 1..];
            } else {
                if !first {
                    rest = rest
                        .strip_prefix('.')
                        .ok_or_else(|| invalid("expected '.' or '['"))?;
                }
                let end = rest
                    .find(|c: char| c == '.' || c == '[' || c == ']')
                    .unwrap_or(rest.len());
                let name = rest[..end].trim();
                if name.is_empty() {
                    return Err(invalid("empty property name"));
                }
                segments.push(PathSegment::Member(name.to_string()));
                rest = &rest[end..];
            }
            first = false;
        }

        Ok(Self {
            text: text.trim().to_string(),
            segments,
        })
    }

    fn bracket_segment(content: &str) -> Option<PathSegment> {
        let content = content.trim();
        let unquoted = ['\'', '"']
            .iter()
            .find_map(|q| {
                content
                    .strip_prefix(*q)
                    .and_then(|c| c.strip_suffix(*q))
            })
            .unwrap_or(content);

        if unquoted.is_empty() {
            return None;
        }
        // quoted digits stay keys
        if unquoted.len() == content.len() && unquoted.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = unquoted.parse::<usize>() {
                return Some(PathSegment::Index(index));
            }
        }
        Some(PathSegment::Key(unquoted.to_string()))
    }

    /// Builds a path from already-parsed segments
    pub fn from_segments(segments: Vec<PathSegment>) -> ResolutionResult<Self> {
        if segments.is_empty() {
            return Err(PropertyResolutionError::InvalidPath {
                path: String::new(),
                reason: "empty path".to_string(),
            });
        }
        let mut text = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 && matches!(segment, PathSegment::Member(_)) {
                text.push('.');
            }
            text.push_str(&segment.to_string());
        }
        Ok(Self { text, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name of the first segment, if it is a member
    pub fn root_member(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Member(name)) => Some(name),
            _ => None,
        }
    }

    /// Everything but the last segment, and the last segment
    pub fn split_last(&self) -> Option<(Option<PropertyPath>, &PathSegment)> {
        let (last, prefix) = self.segments.split_last()?;
        let prefix = if prefix.is_empty() {
            None
        } else {
            Self::from_segments(prefix.to_vec()).ok()
        };
        Some((prefix, last))
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl FromStr for PropertyPath {
    type Err = PropertyResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
