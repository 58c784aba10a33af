//! Per-query mutable evaluation state

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::QueryConfig;
use crate::matcher::MatcherRegistry;
use crate::observability::MetricsRegistry;
use crate::pattern::{LikePattern, LikePatternCache};
use crate::resolver::PropertyResolver;
use crate::value::Value;

/// Named values memoised during evaluation
pub type SaveValues = HashMap<String, Value>;

/// Bind variable holding the enclosing row inside a sub-query
pub const PARENT_BIND_VARIABLE: &str = "_parent";

/// Mutable state of one query instance.
///
/// The engine sets the current object, the current object list and the
/// current group before evaluating any expression that may read them.
/// Caches and the matcher registry are shared handles; everything else is
/// owned by this context and never shared between executions.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    current_object: Value,
    all_objects: Arc<Vec<Value>>,
    current_group: Option<Arc<Vec<Value>>>,
    save_values: Arc<SaveValues>,
    bind_variables: HashMap<String, Value>,
    resolver: Arc<PropertyResolver>,
    matchers: Arc<MatcherRegistry>,
    like_patterns: Arc<LikePatternCache>,
    metrics: Arc<MetricsRegistry>,
    config: Arc<QueryConfig>,
}

impl ExecutionContext {
    /// Context with the process-wide property resolver and fresh caches
    pub fn new(config: QueryConfig) -> Self {
        let matchers = Arc::new(MatcherRegistry::new(&config));
        Self {
            current_object: Value::Null,
            all_objects: Arc::new(Vec::new()),
            current_group: None,
            save_values: Arc::new(SaveValues::new()),
            bind_variables: HashMap::new(),
            resolver: PropertyResolver::global(),
            matchers,
            like_patterns: Arc::new(LikePatternCache::new()),
            metrics: Arc::new(MetricsRegistry::new()),
            config: Arc::new(config),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<PropertyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_matchers(mut self, matchers: Arc<MatcherRegistry>) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn with_like_patterns(mut self, like_patterns: Arc<LikePatternCache>) -> Self {
        self.like_patterns = like_patterns;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Clears per-execution state. Bind variables survive.
    pub fn reset(&mut self) {
        self.current_object = Value::Null;
        self.all_objects = Arc::new(Vec::new());
        self.current_group = None;
        self.save_values = Arc::new(SaveValues::new());
    }

    /// Fresh context for a sub-query: shared caches, a copy of the bind
    /// variables, empty evaluation state
    pub fn child(&self) -> Self {
        let mut child = self.clone();
        child.reset();
        child
    }

    // Current object

    pub fn current_object(&self) -> &Value {
        &self.current_object
    }

    pub fn set_current_object(&mut self, object: Value) {
        self.current_object = object;
    }

    // Object lists

    /// Objects visible to aggregates: the candidates, the filtered results,
    /// or the current group's members depending on the stage
    pub fn all_objects(&self) -> &Arc<Vec<Value>> {
        &self.all_objects
    }

    pub fn set_all_objects(&mut self, objects: Arc<Vec<Value>>) {
        self.all_objects = objects;
    }

    pub fn current_group(&self) -> Option<&Arc<Vec<Value>>> {
        self.current_group.as_ref()
    }

    /// Points the context at one group: its members become the current
    /// object list and its save values become current
    pub fn switch_group(&mut self, members: Arc<Vec<Value>>, save_values: Arc<SaveValues>) {
        self.all_objects = Arc::clone(&members);
        self.current_group = Some(members);
        self.save_values = save_values;
    }

    pub fn clear_group(&mut self) {
        self.current_group = None;
    }

    // Save values

    pub fn save_value(&self, name: &str) -> Option<&Value> {
        self.save_values.get(name)
    }

    pub fn set_save_value(&mut self, name: impl Into<String>, value: Value) {
        Arc::make_mut(&mut self.save_values).insert(name.into(), value);
    }

    pub fn save_values(&self) -> &Arc<SaveValues> {
        &self.save_values
    }

    /// Installs `save_values`, returning the previous map
    pub fn replace_save_values(&mut self, save_values: Arc<SaveValues>) -> Arc<SaveValues> {
        std::mem::replace(&mut self.save_values, save_values)
    }

    // Bind variables

    pub fn bind_variable(&self, name: &str) -> Option<&Value> {
        self.bind_variables.get(name)
    }

    pub fn set_bind_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bind_variables.insert(name.into(), value.into());
    }

    pub fn bind_variables(&self) -> &HashMap<String, Value> {
        &self.bind_variables
    }

    // Shared services

    pub fn resolver(&self) -> &Arc<PropertyResolver> {
        &self.resolver
    }

    pub fn matchers(&self) -> &Arc<MatcherRegistry> {
        &self.matchers
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn like_wildcard(&self) -> &str {
        &self.config.like_wildcard
    }

    /// Compiled LIKE pattern for `pattern` under this context's wildcard
    pub fn like_pattern(&self, pattern: &str) -> Arc<LikePattern> {
        let wildcard = self.like_wildcard();
        if let Some(compiled) = self.like_patterns.get(pattern, wildcard) {
            return compiled;
        }
        self.metrics.increment_like_compilations();
        self.like_patterns.insert(LikePattern::compile(pattern, wildcard))
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_bind_variables() {
        let mut ctx = ExecutionContext::default();
        ctx.set_bind_variable("min", 3);
        ctx.set_save_value("total", Value::Integer(10));
        ctx.set_current_object(Value::from("row"));

        ctx.reset();
        assert!(ctx.current_object().is_null());
        assert!(ctx.save_value("total").is_none());
        assert_eq!(ctx.bind_variable("min"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_switch_group_swaps_state() {
        let mut ctx = ExecutionContext::default();
        let members = Arc::new(vec![Value::Integer(1), Value::Integer(2)]);
        let mut saved = SaveValues::new();
        saved.insert("n".to_string(), Value::Integer(2));

        ctx.switch_group(Arc::clone(&members), Arc::new(saved));
        assert_eq!(ctx.all_objects().len(), 2);
        assert!(Arc::ptr_eq(ctx.current_group().unwrap(), &members));
        assert_eq!(ctx.save_value("n"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_save_values_copy_on_write() {
        let mut ctx = ExecutionContext::default();
        ctx.set_save_value("a", Value::Integer(1));
        let snapshot = Arc::clone(ctx.save_values());

        ctx.set_save_value("a", Value::Integer(2));
        assert_eq!(snapshot.get("a"), Some(&Value::Integer(1)));
        assert_eq!(ctx.save_value("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_child_shares_caches() {
        let mut ctx = ExecutionContext::default();
        ctx.set_bind_variable("x", 1);
        ctx.set_save_value("s", Value::Null);

        let child = ctx.child();
        assert!(Arc::ptr_eq(child.resolver(), ctx.resolver()));
        assert!(Arc::ptr_eq(child.metrics(), ctx.metrics()));
        assert_eq!(child.bind_variable("x"), Some(&Value::Integer(1)));
        assert!(child.save_value("s").is_none());
    }

    #[test]
    fn test_like_pattern_compiled_once() {
        let ctx = ExecutionContext::default();
        let a = ctx.like_pattern("ab%");
        let b = ctx.like_pattern("ab%");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(ctx.metrics().snapshot().like_compilations, 1);
    }
}
