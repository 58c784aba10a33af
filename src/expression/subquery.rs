//! Nested queries

use std::fmt;
use std::sync::Arc;

use crate::executor::{
    ExecutionContext, ExecutorError, ExecutorResult, QueryExecutor, ResultSet,
    PARENT_BIND_VARIABLE,
};
use crate::query::QueryPlan;
use crate::value::{Value, ValueType};

use super::{ExprRef, Expression};

/// Runs a plan over the collection produced by `source`.
///
/// The nested query gets a child context: the same caches and bind
/// variables, its own evaluation state, and the enclosing row bound as
/// `:_parent`. The value is a list: whole objects in object mode, single
/// values for one-column results, otherwise one list per row.
#[derive(Debug, Clone)]
pub struct SubQuery {
    plan: Arc<QueryPlan>,
    source: ExprRef,
}

impl SubQuery {
    pub fn new(plan: Arc<QueryPlan>, source: ExprRef) -> Self {
        Self { plan, source }
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} FROM {})", self.plan, self.source)
    }
}

impl Expression for SubQuery {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let candidates = match self.source.evaluate(current, ctx)? {
            Value::Null => Vec::new(),
            Value::List(items) => items,
            other => vec![other],
        };

        let mut child = ctx.child();
        child.set_bind_variable(PARENT_BIND_VARIABLE, current.clone());

        let results = QueryExecutor::new(&self.plan)
            .run_nested(&mut child, candidates)
            .map_err(|e| ExecutorError::wrap("Sub-query", self, e))?;

        let values = match results.into_rows() {
            ResultSet::Objects(objects) => objects,
            ResultSet::Columns(rows) => rows
                .into_iter()
                .map(|mut row| {
                    if row.len() == 1 {
                        row.remove(0)
                    } else {
                        Value::List(row)
                    }
                })
                .collect(),
        };
        Ok(Value::List(values))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::List
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.source]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::build::*;
    use crate::query::QueryBuilder;
    use crate::resolver::PropertyResolver;
    use serde_json::json;

    #[test]
    fn test_subquery_over_property() {
        let mut ctx = ExecutionContext::default();
        let cheap_parts = QueryBuilder::new()
            .select(vec![prop("name")])
            .filter(lt(prop("cost"), lit(10)))
            .build_plan()
            .unwrap();
        let expr = subquery(Arc::new(cheap_parts), prop("parts"));

        let row = Value::from(json!({"parts": [
            {"name": "bolt", "cost": 1},
            {"name": "engine", "cost": 900},
            {"name": "nut", "cost": 2}
        ]}));
        assert_eq!(
            expr.evaluate(&row, &mut ctx).unwrap(),
            Value::from(vec!["bolt", "nut"])
        );
    }

    #[test]
    fn test_subquery_sees_parent() {
        let mut ctx = ExecutionContext::default();
        // parts costing more than the parent's budget
        let plan = QueryBuilder::new()
            .filter(gt(prop("cost"), prop_on(bind(PARENT_BIND_VARIABLE), "budget")))
            .build_plan()
            .unwrap();
        let expr = subquery(Arc::new(plan), prop("parts"));

        let row = Value::from(json!({"budget": 5, "parts": [{"cost": 1}, {"cost": 9}]}));
        let over = expr.evaluate(&row, &mut ctx).unwrap();
        assert_eq!(over.as_list().map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_subquery_counted_once() {
        let resolver = Arc::new(PropertyResolver::new());
        let cheap_parts = QueryBuilder::new()
            .select(vec![prop("name")])
            .filter(lt(prop("cost"), lit(10)))
            .build_plan()
            .unwrap();
        let mut query = QueryBuilder::new()
            .select(vec![prop("id"), subquery(Arc::new(cheap_parts), prop("parts"))])
            .resolver(Arc::clone(&resolver))
            .build()
            .unwrap();

        let rows: Vec<Value> = (0..3)
            .map(|id| {
                Value::from(json!({"id": id, "parts": [
                    {"name": "bolt", "cost": 1},
                    {"name": "engine", "cost": 900}
                ]}))
            })
            .collect();
        let results = query.execute(rows).unwrap();
        assert_eq!(results.row_count(), 3);

        let metrics = query.metrics();
        assert_eq!(metrics.queries_executed, 1);
        assert_eq!(metrics.objects_scanned, 3);
        assert_eq!(metrics.rows_returned, 3);
        assert_eq!(metrics.getter_compilations, resolver.compilations());
    }

    #[test]
    fn test_subquery_null_source() {
        let mut ctx = ExecutionContext::default();
        let plan = QueryBuilder::new().build_plan().unwrap();
        let expr = subquery(Arc::new(plan), prop("missing"));
        assert_eq!(
            expr.evaluate(&Value::from(json!({})), &mut ctx).unwrap(),
            Value::List(vec![])
        );
    }
}
