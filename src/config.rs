//! Query engine configuration
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by every query built with one context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Cache ORDER BY values per row (default: true)
    #[serde(default = "default_true")]
    pub ordering_cache: bool,

    /// Cache GROUP BY ORDER values per group (default: true)
    #[serde(default = "default_true")]
    pub group_ordering_cache: bool,

    /// Wildcard marker for LIKE patterns (default: "%")
    #[serde(default = "default_like_wildcard")]
    pub like_wildcard: String,

    /// Name of the default regex matcher backend (default: "standard")
    #[serde(default)]
    pub default_matcher: Option<String>,

    /// Minimum severity written by the logger (default: WARN)
    #[serde(default = "default_log_level")]
    pub log_level: Severity,

    /// Reject candidates that are not of the FROM type (default: true)
    #[serde(default = "default_true")]
    pub strict_from_type: bool,

    /// Built-in matcher backends to treat as unavailable
    #[serde(default)]
    pub disabled_matchers: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_like_wildcard() -> String {
    "%".to_string()
}

fn default_log_level() -> Severity {
    Severity::Warn
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            ordering_cache: true,
            group_ordering_cache: true,
            like_wildcard: default_like_wildcard(),
            default_matcher: None,
            log_level: default_log_level(),
            strict_from_type: true,
            disabled_matchers: Vec::new(),
        }
    }
}

impl QueryConfig {
    /// Config with both ordering caches disabled
    pub fn no_caching() -> Self {
        Self {
            ordering_cache: false,
            group_ordering_cache: false,
            ..Default::default()
        }
    }

    /// Parses and validates a JSON config
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: QueryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        let shown = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", shown.as_str())]);
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.like_wildcard.is_empty() {
            return Err(ConfigError::Invalid("like_wildcard must not be empty".to_string()));
        }
        if let Some(name) = &self.default_matcher {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("default_matcher must not be blank".to_string()));
            }
            if self.disabled_matchers.iter().any(|d| d == name) {
                return Err(ConfigError::Invalid(format!(
                    "default_matcher '{}' is also disabled",
                    name
                )));
            }
        }
        Ok(())
    }
}
