//! Observable events in objql
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Query lifecycle
    /// Query execution begins
    QueryBegin,
    /// Query execution complete
    QueryComplete,
    /// Query execution failed
    QueryError,

    // Pipeline stages
    /// A WHERE expression failed on a candidate
    WhereFilterFailed,
    /// A GROUP BY expression failed
    GroupingFailed,
    /// A comparator stored an evaluation error during a sort
    SortUnreliable,

    // Matcher backends
    /// A matcher backend was not available at probe time
    MatcherUnavailable,
    /// A matcher backend failed to initialise
    MatcherInitFailed,

    // Caches
    /// A property getter chain was compiled
    GetterCompiled,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryBegin => "QUERY_BEGIN",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryError => "QUERY_ERROR",
            Event::WhereFilterFailed => "WHERE_FILTER_FAILED",
            Event::GroupingFailed => "GROUPING_FAILED",
            Event::SortUnreliable => "SORT_UNRELIABLE",
            Event::MatcherUnavailable => "MATCHER_UNAVAILABLE",
            Event::MatcherInitFailed => "MATCHER_INIT_FAILED",
            Event::GetterCompiled => "GETTER_COMPILED",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::GetterCompiled => Severity::Trace,
            Event::QueryBegin | Event::QueryComplete | Event::ConfigLoaded => Severity::Info,
            Event::MatcherUnavailable | Event::MatcherInitFailed => Severity::Warn,
            Event::QueryError | Event::WhereFilterFailed | Event::GroupingFailed => Severity::Error,
            Event::SortUnreliable => Severity::Fatal,
        }
    }

    /// Returns true if this event means the query result cannot be trusted
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::QueryBegin,
            Event::QueryComplete,
            Event::QueryError,
            Event::WhereFilterFailed,
            Event::GroupingFailed,
            Event::SortUnreliable,
            Event::MatcherUnavailable,
            Event::MatcherInitFailed,
            Event::GetterCompiled,
            Event::ConfigLoaded,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::SortUnreliable.is_fatal());
        assert!(!Event::QueryError.is_fatal());
        assert!(!Event::GetterCompiled.is_fatal());
    }
}
