//! Executable query instances

use std::sync::Arc;

use crate::executor::{ExecutionContext, ExecutorResult, QueryExecutor, QueryResults};
use crate::observability::MetricsSnapshot;
use crate::value::Value;

use super::plan::QueryPlan;

/// A validated plan paired with its own execution context.
///
/// The plan is immutable and may be shared; the context holds bind
/// variables and per-execution state, so one `Query` runs one execution
/// at a time.
#[derive(Debug, Clone)]
pub struct Query {
    plan: Arc<QueryPlan>,
    context: ExecutionContext,
}

impl Query {
    pub(crate) fn new(plan: Arc<QueryPlan>, context: ExecutionContext) -> Self {
        Self { plan, context }
    }

    pub fn plan(&self) -> &Arc<QueryPlan> {
        &self.plan
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    pub fn bind_variable(&self, name: &str) -> Option<&Value> {
        self.context.bind_variable(name)
    }

    /// Sets a bind variable for subsequent executions
    pub fn set_bind_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.context.set_bind_variable(name, value);
    }

    /// Runs the plan over `candidates`
    pub fn execute(&mut self, candidates: Vec<Value>) -> ExecutorResult<QueryResults> {
        QueryExecutor::new(&self.plan).execute(&mut self.context, candidates)
    }

    /// Counters accumulated by every execution on this query's context
    pub fn metrics(&self) -> MetricsSnapshot {
        self.context.metrics().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use crate::expression::build::*;
    use crate::query::QueryBuilder;
    use crate::value::Value;
    use serde_json::json;

    fn people() -> Vec<Value> {
        vec![
            Value::from(json!({"name": "ann", "age": 31})),
            Value::from(json!({"name": "bob", "age": 17})),
            Value::from(json!({"name": "cid", "age": 45})),
        ]
    }

    #[test]
    fn test_rebinding_between_executions() {
        let mut query = QueryBuilder::new()
            .select(vec![prop("name")])
            .filter(gte(prop("age"), bind("min")))
            .bind("min", 18)
            .build()
            .unwrap();

        let adults = query.execute(people()).unwrap();
        assert_eq!(adults.row_count(), 2);

        query.set_bind_variable("min", 40);
        let seniors = query.execute(people()).unwrap();
        assert_eq!(seniors.columns().unwrap(), &[vec![Value::from("cid")]]);
        assert!(adults.stats().execution_id.is_some());
        assert_ne!(adults.stats().execution_id, seniors.stats().execution_id);

        let metrics = query.metrics();
        assert_eq!(metrics.queries_executed, 2);
        assert_eq!(metrics.objects_scanned, 6);
        assert_eq!(metrics.rows_returned, 3);
    }

    #[test]
    fn test_failed_execution_counted() {
        let mut query = QueryBuilder::new()
            .select(vec![div(prop("age"), lit(0))])
            .build()
            .unwrap();
        assert!(query.execute(people()).is_err());
        assert_eq!(query.metrics().queries_failed, 1);
        // the query stays usable
        assert!(query.execute(Vec::new()).unwrap().is_empty());
    }
}
