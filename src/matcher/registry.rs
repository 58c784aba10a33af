//! Matcher backend registry

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::QueryConfig;
use crate::observability::{log_event_with_fields, Event};

use super::backend::{MatcherBackend, RegexMatcher};
use super::errors::{MatcherError, MatcherResult};
use super::simple::SimpleBackend;
#[cfg(feature = "regex-backend")]
use super::standard::StandardBackend;
use super::STANDARD_MATCHER;

/// Available matcher backends, their lazily built instances, and the
/// default backend name.
///
/// Unknown names are absent rather than errors: [`instance`](Self::instance)
/// returns `None` for them.
pub struct MatcherRegistry {
    backends: RwLock<Vec<Arc<dyn MatcherBackend>>>,
    instances: RwLock<HashMap<String, Arc<dyn RegexMatcher>>>,
    default_name: RwLock<String>,
}

fn builtin_backends() -> Vec<Arc<dyn MatcherBackend>> {
    let mut backends: Vec<Arc<dyn MatcherBackend>> = Vec::new();
    #[cfg(feature = "regex-backend")]
    backends.push(Arc::new(StandardBackend));
    backends.push(Arc::new(SimpleBackend));
    backends
}

impl MatcherRegistry {
    /// Probes the built-in backends against `config` and keeps the
    /// available ones
    pub fn new(config: &QueryConfig) -> Self {
        let mut available = Vec::new();
        for backend in builtin_backends() {
            if backend.is_available(config) {
                available.push(backend);
            } else {
                log_event_with_fields(Event::MatcherUnavailable, &[("name", backend.name())]);
            }
        }

        let wanted = config.default_matcher.as_deref().unwrap_or(STANDARD_MATCHER);
        let default_name = if available.iter().any(|b| b.name() == wanted) {
            wanted.to_string()
        } else {
            if config.default_matcher.is_some() {
                log_event_with_fields(Event::MatcherUnavailable, &[("name", wanted)]);
            }
            available
                .first()
                .map(|b| b.name().to_string())
                .unwrap_or_default()
        };

        Self {
            backends: RwLock::new(available),
            instances: RwLock::new(HashMap::new()),
            default_name: RwLock::new(default_name),
        }
    }

    /// Adds (or replaces) a backend under its own name
    pub fn register(&self, backend: Arc<dyn MatcherBackend>, make_default: bool) {
        let name = backend.name().to_string();
        if let Ok(mut backends) = self.backends.write() {
            backends.retain(|b| b.name() != name);
            backends.push(backend);
        }
        // a replaced backend must not keep serving the old instance
        if let Ok(mut instances) = self.instances.write() {
            instances.remove(&name);
        }
        if make_default {
            if let Ok(mut default_name) = self.default_name.write() {
                *default_name = name;
            }
        }
    }

    /// Makes `name` the default backend
    pub fn set_default(&self, name: &str) -> MatcherResult<()> {
        if self.backend(name).is_none() {
            return Err(MatcherError::Unavailable(name.to_string()));
        }
        let mut default_name = self
            .default_name
            .write()
            .map_err(|_| MatcherError::Unavailable(name.to_string()))?;
        *default_name = name.to_string();
        Ok(())
    }

    pub fn default_name(&self) -> String {
        self.default_name
            .read()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// The singleton matcher for `name`, created on first request.
    ///
    /// Returns `None` for unknown names and for backends whose
    /// initialisation failed.
    pub fn instance(&self, name: &str) -> Option<Arc<dyn RegexMatcher>> {
        if let Ok(instances) = self.instances.read() {
            if let Some(instance) = instances.get(name) {
                return Some(Arc::clone(instance));
            }
        }

        let backend = self.backend(name)?;
        let created = match backend.create() {
            Ok(created) => created,
            Err(e) => {
                let reason = e.to_string();
                log_event_with_fields(
                    Event::MatcherInitFailed,
                    &[("name", name), ("reason", reason.as_str())],
                );
                return None;
            }
        };

        match self.instances.write() {
            Ok(mut instances) => Some(Arc::clone(
                instances.entry(name.to_string()).or_insert(created),
            )),
            Err(_) => Some(created),
        }
    }

    pub fn default_instance(&self) -> Option<Arc<dyn RegexMatcher>> {
        self.instance(&self.default_name())
    }

    pub fn supported_version(&self, name: &str) -> Option<String> {
        self.backend(name).map(|b| b.supported_version().to_string())
    }

    /// Registered backend names in registration order
    pub fn names(&self) -> Vec<String> {
        self.backends
            .read()
            .map(|b| b.iter().map(|b| b.name().to_string()).collect())
            .unwrap_or_default()
    }

    fn backend(&self, name: &str) -> Option<Arc<dyn MatcherBackend>> {
        let backends = self.backends.read().ok()?;
        backends.iter().find(|b| b.name() == name).cloned()
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}

impl std::fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("backends", &self.names())
            .field("default", &self.default_name())
            .finish()
    }
}
