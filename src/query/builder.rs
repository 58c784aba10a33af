//! Query construction and build-time validation
//!
//! Validation order (first failure wins):
//! 1. Configuration is valid
//! 2. FROM type is not blank
//! 3. Every property path parses
//! 4. Group-only clauses have a GROUP BY
//! 5. WHERE and HAVING may be conditions
//! 6. Column positions are inside their lists
//! 7. LIMIT parts are row-independent and may be numbers

use std::collections::HashMap;
use std::sync::Arc;

use crate::compare::ValueComparator;
use crate::config::QueryConfig;
use crate::executor::{ExecutionContext, ExecutorErrorCode, Limit, SortItem, SortKey};
use crate::expression::{walk, ExprRef};
use crate::matcher::MatcherRegistry;
use crate::observability::Logger;
use crate::resolver::PropertyResolver;
use crate::value::Value;

use super::errors::{PlannerError, PlannerResult};
use super::plan::QueryPlan;
use super::query::Query;

/// Collects clauses and builds a validated [`QueryPlan`] or [`Query`]
#[derive(Default)]
pub struct QueryBuilder {
    plan: QueryPlan,
    config: QueryConfig,
    bind_variables: HashMap<String, Value>,
    matchers: Option<Arc<MatcherRegistry>>,
    resolver: Option<Arc<PropertyResolver>>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// SELECT columns. Without columns the query returns whole objects.
    pub fn select(mut self, columns: Vec<ExprRef>) -> Self {
        self.plan.columns = columns;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.plan.distinct = true;
        self
    }

    /// FROM: the type name every candidate must have
    pub fn from_type(mut self, type_name: &str) -> Self {
        self.plan.from_type = Some(type_name.to_string());
        self
    }

    /// WHERE
    pub fn filter(mut self, condition: ExprRef) -> Self {
        self.plan.where_clause = Some(condition);
        self
    }

    pub fn group_by(mut self, keys: Vec<ExprRef>) -> Self {
        self.plan.group_by = keys;
        self
    }

    pub fn having(mut self, condition: ExprRef) -> Self {
        self.plan.having = Some(condition);
        self
    }

    /// GROUP BY ORDER
    pub fn group_order(mut self, items: Vec<SortItem>) -> Self {
        self.plan.group_order = items;
        self
    }

    /// GROUP BY LIMIT
    pub fn group_limit(mut self, limit: Limit) -> Self {
        self.plan.group_limit = Some(limit);
        self
    }

    pub fn order_by(mut self, items: Vec<SortItem>) -> Self {
        self.plan.order_by = items;
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.plan.limit = Some(limit);
        self
    }

    pub fn execute_on_all(mut self, exprs: Vec<ExprRef>) -> Self {
        self.plan.execute_on_all = exprs;
        self
    }

    pub fn execute_on_results(mut self, exprs: Vec<ExprRef>) -> Self {
        self.plan.execute_on_results = exprs;
        self
    }

    pub fn execute_on_group_results(mut self, exprs: Vec<ExprRef>) -> Self {
        self.plan.execute_on_group_results = exprs;
        self
    }

    /// Orders this query's rows and groups with `comparator`
    pub fn comparator(mut self, comparator: ValueComparator) -> Self {
        self.plan.comparator = Some(comparator);
        self
    }

    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a variable before validation, so its type is known to the
    /// checks and its value to the built query
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bind_variables.insert(name.to_string(), value.into());
        self
    }

    /// Shares a matcher registry instead of creating one from the config
    pub fn matchers(mut self, matchers: Arc<MatcherRegistry>) -> Self {
        self.matchers = Some(matchers);
        self
    }

    /// Resolves properties through `resolver` instead of the process-wide one
    pub fn resolver(mut self, resolver: Arc<PropertyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Validates and returns the plan alone
    pub fn build_plan(self) -> PlannerResult<QueryPlan> {
        let (plan, _) = self.validated()?;
        Ok(plan)
    }

    /// Validates and returns a query with its own execution context. The
    /// process-wide log level follows the configuration.
    pub fn build(self) -> PlannerResult<Query> {
        let (plan, ctx) = self.validated()?;
        Logger::set_min_severity(ctx.config().log_level);
        Ok(Query::new(Arc::new(plan), ctx))
    }

    fn validated(self) -> PlannerResult<(QueryPlan, ExecutionContext)> {
        // 1. Configuration
        self.config
            .validate()
            .map_err(|e| PlannerError::query_invalid("CONFIG", e.to_string()))?;

        let mut ctx = ExecutionContext::new(self.config);
        if let Some(matchers) = self.matchers {
            ctx = ctx.with_matchers(matchers);
        }
        if let Some(resolver) = self.resolver {
            ctx = ctx.with_resolver(resolver);
        }
        for (name, value) in self.bind_variables {
            ctx.set_bind_variable(name, value);
        }

        let plan = self.plan;
        validate(&plan, &ctx)?;
        Ok((plan, ctx))
    }
}

fn validate(plan: &QueryPlan, ctx: &ExecutionContext) -> PlannerResult<()> {
    // 2. FROM
    if let Some(from) = plan.from_type() {
        if from.trim().is_empty() {
            return Err(PlannerError::from_type_mismatch("FROM type must not be blank"));
        }
    }

    // 3. Property paths
    for (clause, expr) in plan.expressions() {
        check_paths(clause, expr)?;
    }

    // 4. Group-only clauses
    if plan.group_by().is_empty() {
        if plan.having().is_some() {
            return Err(PlannerError::having_without_group_by("HAVING"));
        }
        if !plan.group_order().is_empty() {
            return Err(PlannerError::having_without_group_by("GROUP BY ORDER"));
        }
        if plan.group_limit().is_some() {
            return Err(PlannerError::having_without_group_by("GROUP BY LIMIT"));
        }
        if !plan.execute_on_group_results().is_empty() {
            return Err(PlannerError::having_without_group_by(
                "EXECUTE ON GROUP_BY_RESULTS",
            ));
        }
    }

    // 5. Conditions
    for (clause, condition) in [("WHERE", plan.where_clause()), ("HAVING", plan.having())] {
        if let Some(condition) = condition {
            let expected = condition.expected_type(ctx);
            if !expected.accepts_boolean() {
                return Err(PlannerError::not_boolean(
                    clause,
                    &condition.to_string(),
                    expected.as_str(),
                ));
            }
        }
    }

    // 6. Column positions
    check_columns("ORDER BY", plan.order_by(), plan.columns().len())?;
    check_columns("GROUP BY ORDER", plan.group_order(), plan.group_by().len())?;

    // 7. Limits
    for (clause, limit) in [("GROUP BY LIMIT", plan.group_limit()), ("LIMIT", plan.limit())] {
        if let Some(limit) = limit {
            limit.validate(ctx).map_err(|e| match e.code() {
                ExecutorErrorCode::ObjqlLimitNotNumeric => {
                    PlannerError::limit_not_numeric(clause, e.to_string())
                }
                _ => PlannerError::query_invalid(clause, e.to_string()),
            })?;
        }
    }

    Ok(())
}

fn check_paths(clause: &str, expr: &ExprRef) -> PlannerResult<()> {
    let mut failure = None;
    walk(expr, &mut |node| {
        if failure.is_some() {
            return;
        }
        if let Some(Err(err)) = node.as_property().map(|p| p.path()) {
            failure = Some(PlannerError::query_invalid(clause, err.to_string()));
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_columns(clause: &str, items: &[SortItem], available: usize) -> PlannerResult<()> {
    for item in items {
        if let SortKey::Column(position) = item.key() {
            if *position == 0 || *position > available {
                return Err(PlannerError::column_out_of_range(clause, *position, available));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SortDirection;
    use crate::expression::build::*;
    use crate::query::PlannerErrorCode;

    fn code(builder: QueryBuilder) -> PlannerErrorCode {
        builder.build_plan().unwrap_err().code()
    }

    #[test]
    fn test_valid_query_builds() {
        let query = QueryBuilder::new()
            .select(vec![prop("make")])
            .filter(gt(prop("year"), bind("since")))
            .order_by(vec![SortItem::column(1, SortDirection::Asc)])
            .limit(Limit::count(lit(5)))
            .bind("since", 2000)
            .build()
            .unwrap();
        assert_eq!(query.bind_variable("since"), Some(&Value::Integer(2000)));
    }

    #[test]
    fn test_invalid_path_rejected() {
        let err = QueryBuilder::new()
            .filter(eq(prop("owner..name"), lit(1)))
            .build_plan()
            .unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::ObjqlQueryInvalid);
        assert_eq!(err.clause(), Some("WHERE"));
    }

    #[test]
    fn test_limit_must_be_numeric() {
        assert_eq!(
            code(QueryBuilder::new().limit(Limit::count(lit("ten")))),
            PlannerErrorCode::ObjqlLimitNotNumeric
        );
        assert_eq!(
            code(QueryBuilder::new().limit(Limit::count(bind("n"))).bind("n", "ten")),
            PlannerErrorCode::ObjqlLimitNotNumeric
        );
        // row properties are not allowed in LIMIT
        assert_eq!(
            code(QueryBuilder::new().limit(Limit::count(prop("size")))),
            PlannerErrorCode::ObjqlQueryInvalid
        );
        assert!(QueryBuilder::new()
            .limit(Limit::count(bind("n")))
            .build_plan()
            .is_ok());
    }

    #[test]
    fn test_where_must_be_condition() {
        assert_eq!(
            code(QueryBuilder::new().filter(add(prop("a"), lit(1)))),
            PlannerErrorCode::ObjqlWhereNotBoolean
        );
        assert_eq!(
            code(QueryBuilder::new().filter(lit("yes"))),
            PlannerErrorCode::ObjqlWhereNotBoolean
        );
    }

    #[test]
    fn test_group_clauses_need_group_by() {
        assert_eq!(
            code(QueryBuilder::new().having(gt(count_all(), lit(1)))),
            PlannerErrorCode::ObjqlHavingWithoutGroupBy
        );
        assert_eq!(
            code(QueryBuilder::new().group_limit(Limit::count(lit(1)))),
            PlannerErrorCode::ObjqlHavingWithoutGroupBy
        );
    }

    #[test]
    fn test_column_positions() {
        assert_eq!(
            code(
                QueryBuilder::new()
                    .select(vec![prop("a")])
                    .order_by(vec![SortItem::column(2, SortDirection::Asc)])
            ),
            PlannerErrorCode::ObjqlColumnOutOfRange
        );
        assert_eq!(
            code(QueryBuilder::new().order_by(vec![SortItem::column(1, SortDirection::Asc)])),
            PlannerErrorCode::ObjqlColumnOutOfRange
        );
        assert_eq!(
            code(
                QueryBuilder::new()
                    .group_by(vec![prop("a")])
                    .group_order(vec![SortItem::column(0, SortDirection::Asc)])
            ),
            PlannerErrorCode::ObjqlColumnOutOfRange
        );
    }

    #[test]
    fn test_blank_from_and_bad_config() {
        assert_eq!(
            code(QueryBuilder::new().from_type(" ")),
            PlannerErrorCode::ObjqlFromTypeMismatch
        );
        let config = QueryConfig {
            like_wildcard: String::new(),
            ..Default::default()
        };
        let err = QueryBuilder::new().config(config).build_plan().unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::ObjqlQueryInvalid);
        assert_eq!(err.clause(), Some("CONFIG"));
    }
}
