//! Query executor for objql
//!
//! Runs a query plan over a list of candidate objects.
//!
//! Execution flow (strict order):
//! 1. Reset the context, check candidates against FROM, expose them to
//!    aggregates, run EXECUTE ON ALL
//! 2. Filter with WHERE; the first failing row fails the query
//! 3. Expose the matches to aggregates, run EXECUTE ON RESULTS
//! 4. Without GROUP BY: project, ORDER BY, DISTINCT, LIMIT
//! 5. With GROUP BY: bucket, then per group EXECUTE ON GROUP_BY_RESULTS
//!    and HAVING; GROUP BY ORDER, GROUP BY LIMIT; then step 4 within
//!    each group

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::expression::ExprRef;
use crate::observability::{log_event_with_fields, Event, ObservationScope, Timer};
use crate::query::QueryPlan;
use crate::value::Value;

use super::context::{ExecutionContext, SaveValues};
use super::errors::{ExecutorError, ExecutorResult};
use super::grouper::{GroupSet, Grouper};
use super::result::{ExecutionStats, GroupedResults, QueryResults, ResultSet};
use super::sorter::{GroupComparator, ResultRow, RowComparator};

/// Executes one plan. Holds no state between executions; everything
/// mutable lives in the [`ExecutionContext`].
pub struct QueryExecutor<'a> {
    plan: &'a QueryPlan,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(plan: &'a QueryPlan) -> Self {
        Self { plan }
    }

    /// Executes the plan over `candidates`.
    ///
    /// Same plan, same bind variables and same candidates give the same
    /// results.
    pub fn execute(
        &self,
        ctx: &mut ExecutionContext,
        candidates: Vec<Value>,
    ) -> ExecutorResult<QueryResults> {
        let from = self.plan.from_type().unwrap_or("*").to_string();
        let execution_id = Uuid::new_v4();
        let id_text = execution_id.to_string();
        let scope = ObservationScope::with_fields(
            "QUERY",
            &[("execution_id", id_text.as_str()), ("from", from.as_str())],
        );
        let compilations_before = ctx.resolver().compilations();

        let outcome = self.run(ctx, candidates).map(|mut results| {
            results.stats_mut().execution_id = Some(execution_id);
            results
        });

        let metrics = Arc::clone(ctx.metrics());
        metrics.add_getter_compilations(
            ctx.resolver()
                .compilations()
                .saturating_sub(compilations_before),
        );

        match outcome {
            Ok(results) => {
                let stats = results.stats();
                metrics.increment_queries_executed();
                metrics.add_objects_scanned(stats.objects_scanned);
                metrics.add_rows_returned(stats.rows_returned);
                metrics.add_comparisons(stats.comparisons);
                metrics.add_sort_cache_hits(stats.sort_cache_hits);
                let scanned = stats.objects_scanned.to_string();
                let rows = stats.rows_returned.to_string();
                scope.complete_with_fields(&[("scanned", scanned.as_str()), ("rows", rows.as_str())]);
                Ok(results)
            }
            Err(err) => {
                metrics.increment_queries_failed();
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    /// Executes the plan as part of an enclosing query: no QUERY_* log
    /// lines and no counters, the enclosing execution accounts for both.
    pub(crate) fn run_nested(
        &self,
        ctx: &mut ExecutionContext,
        candidates: Vec<Value>,
    ) -> ExecutorResult<QueryResults> {
        self.run(ctx, candidates)
    }

    fn run(&self, ctx: &mut ExecutionContext, candidates: Vec<Value>) -> ExecutorResult<QueryResults> {
        let total = Timer::new();
        let mut stats = ExecutionStats {
            objects_scanned: candidates.len() as u64,
            ..ExecutionStats::default()
        };

        ctx.reset();
        self.check_from_type(&candidates, ctx)?;

        let candidates = Arc::new(candidates);
        ctx.set_all_objects(Arc::clone(&candidates));
        self.execute_on(self.plan.execute_on_all(), "EXECUTE ON ALL", ctx)?;

        let timer = Timer::new();
        let matched = Arc::new(self.filter(&candidates, ctx)?);
        stats.where_micros = ExecutionStats::micros(timer.elapsed());
        stats.objects_matched = matched.len() as u64;

        ctx.set_all_objects(Arc::clone(&matched));
        ctx.set_current_object(Value::Null);
        self.execute_on(self.plan.execute_on_results(), "EXECUTE ON RESULTS", ctx)?;

        let mut results = if self.plan.group_by().is_empty() {
            let rows = self.order_and_project(&matched, ctx, &mut stats)?;
            stats.rows_returned = rows.len() as u64;
            QueryResults::new(rows, Arc::clone(ctx.save_values()), stats)
        } else {
            self.run_grouped(&matched, ctx, stats)?
        };

        results.stats_mut().total_micros = ExecutionStats::micros(total.elapsed());
        Ok(results)
    }

    fn check_from_type(&self, candidates: &[Value], ctx: &ExecutionContext) -> ExecutorResult<()> {
        let from = match self.plan.from_type() {
            Some(from) if ctx.config().strict_from_type => from,
            _ => return Ok(()),
        };
        for candidate in candidates.iter().filter(|c| !c.is_null()) {
            let found = candidate.type_name();
            if found != from {
                return Err(ExecutorError::type_mismatch(format!(
                    "Candidate of type '{}' does not match FROM {}",
                    found, from
                )));
            }
        }
        Ok(())
    }

    /// Evaluates EXECUTE ON expressions for their side effects
    fn execute_on(&self, exprs: &[ExprRef], stage: &str, ctx: &mut ExecutionContext) -> ExecutorResult<()> {
        for expr in exprs {
            let current = ctx.current_object().clone();
            expr.evaluate(&current, ctx)
                .map_err(|e| ExecutorError::wrap(stage, expr, e))?;
        }
        Ok(())
    }

    fn filter(&self, candidates: &[Value], ctx: &mut ExecutionContext) -> ExecutorResult<Vec<Value>> {
        let condition = match self.plan.where_clause() {
            Some(condition) => condition,
            None => return Ok(candidates.to_vec()),
        };

        let mut matched = Vec::new();
        for object in candidates {
            ctx.set_current_object(object.clone());
            match condition.is_true(object, ctx) {
                Ok(true) => matched.push(object.clone()),
                Ok(false) => {}
                Err(err) => {
                    let expression = condition.to_string();
                    log_event_with_fields(
                        Event::WhereFilterFailed,
                        &[("expression", expression.as_str()), ("reason", err.message())],
                    );
                    return Err(ExecutorError::wrap("WHERE", condition, err));
                }
            }
        }
        Ok(matched)
    }

    fn run_grouped(
        &self,
        matched: &Arc<Vec<Value>>,
        ctx: &mut ExecutionContext,
        mut stats: ExecutionStats,
    ) -> ExecutorResult<QueryResults> {
        let timer = Timer::new();
        let mut groups = Grouper::new(self.plan.group_by()).group(matched, ctx)?;
        let query_save_values = Arc::clone(ctx.save_values());

        self.filter_groups(&mut groups, ctx)?;

        ctx.clear_group();
        ctx.set_all_objects(Arc::clone(matched));
        ctx.replace_save_values(Arc::clone(&query_save_values));

        if !self.plan.group_order().is_empty() {
            let caching = ctx.config().group_ordering_cache;
            let mut comparator = GroupComparator::new(self.plan.group_order(), caching);
            if let Some(custom) = self.plan.comparator() {
                comparator = comparator.with_comparator(Arc::clone(custom));
            }
            let order = comparator.sort(&groups, ctx);
            stats.comparisons += comparator.comparisons();
            stats.sort_cache_hits += comparator.cache_hits();
            if let Some(err) = comparator.take_error() {
                return Err(self.unreliable("GROUP BY ORDER", err));
            }
            groups.select(&order);

            ctx.clear_group();
            ctx.set_all_objects(Arc::clone(matched));
            ctx.replace_save_values(Arc::clone(&query_save_values));
        }

        if let Some(limit) = self.plan.group_limit() {
            ctx.set_current_object(Value::Null);
            let all: Vec<usize> = (0..groups.len()).collect();
            let positions = limit.apply(all, ctx)?;
            groups.select(&positions);
        }
        stats.groups = groups.len() as u64;
        stats.group_micros = ExecutionStats::micros(timer.elapsed());

        let mut grouped = Vec::with_capacity(groups.len());
        for group in groups.iter() {
            ctx.switch_group(Arc::clone(group.members()), Arc::clone(group.save_values()));
            let rows = self.order_and_project(group.members(), ctx, &mut stats)?;
            grouped.push(GroupedResults {
                key: group.key().clone(),
                rows,
                save_values: Arc::clone(ctx.save_values()),
            });
        }

        ctx.clear_group();
        ctx.set_all_objects(Arc::clone(matched));
        ctx.replace_save_values(Arc::clone(&query_save_values));

        stats.rows_returned = grouped.len() as u64;
        Ok(QueryResults::grouped(grouped, query_save_values, stats))
    }

    /// Runs EXECUTE ON GROUP_BY_RESULTS and HAVING for every group,
    /// dropping the groups HAVING rejects
    fn filter_groups(&self, groups: &mut GroupSet, ctx: &mut ExecutionContext) -> ExecutorResult<()> {
        let mut keep = Vec::with_capacity(groups.len());
        for (position, group) in groups.groups_mut().iter_mut().enumerate() {
            ctx.switch_group(Arc::clone(group.members()), Arc::new(SaveValues::new()));
            let first = group.members().first().cloned().unwrap_or(Value::Null);
            ctx.set_current_object(first.clone());

            self.execute_on(
                self.plan.execute_on_group_results(),
                "EXECUTE ON GROUP_BY_RESULTS",
                ctx,
            )?;

            let passed = match self.plan.having() {
                Some(having) => having
                    .is_true(&first, ctx)
                    .map_err(|e| ExecutorError::wrap("HAVING", having, e))?,
                None => true,
            };

            group.set_save_values(Arc::clone(ctx.save_values()));
            if passed {
                keep.push(position);
            }
        }
        groups.select(&keep);
        Ok(())
    }

    /// SELECT projection, ORDER BY, DISTINCT and LIMIT over `objects`
    fn order_and_project(
        &self,
        objects: &[Value],
        ctx: &mut ExecutionContext,
        stats: &mut ExecutionStats,
    ) -> ExecutorResult<ResultSet> {
        let mut rows = Vec::with_capacity(objects.len());
        for (index, object) in objects.iter().enumerate() {
            let columns = self.project(object, ctx)?;
            rows.push(ResultRow::new(index, object.clone(), columns));
        }

        if !self.plan.order_by().is_empty() {
            let timer = Timer::new();
            let caching = ctx.config().ordering_cache;
            let mut comparator = RowComparator::new(self.plan.order_by(), caching);
            if let Some(custom) = self.plan.comparator() {
                comparator = comparator.with_comparator(Arc::clone(custom));
            }
            comparator.sort(&mut rows, ctx);
            stats.comparisons += comparator.comparisons();
            stats.sort_cache_hits += comparator.cache_hits();
            stats.order_micros += ExecutionStats::micros(timer.elapsed());
            if let Some(err) = comparator.take_error() {
                return Err(self.unreliable("ORDER BY", err));
            }
        }

        if self.plan.is_distinct() {
            rows = distinct(rows);
        }

        if let Some(limit) = self.plan.limit() {
            ctx.set_current_object(Value::Null);
            rows = limit.apply(rows, ctx)?;
        }

        Ok(if self.plan.columns().is_empty() {
            ResultSet::Objects(rows.into_iter().map(|r| r.object).collect())
        } else {
            ResultSet::Columns(
                rows.into_iter()
                    .map(|r| r.columns.unwrap_or_default())
                    .collect(),
            )
        })
    }

    fn project(&self, object: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Option<Vec<Value>>> {
        let columns = self.plan.columns();
        if columns.is_empty() {
            return Ok(None);
        }
        ctx.set_current_object(object.clone());
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            let value = column
                .evaluate(object, ctx)
                .map_err(|e| ExecutorError::wrap("SELECT", column, e))?;
            values.push(value);
        }
        Ok(Some(values))
    }

    fn unreliable(&self, clause: &str, err: ExecutorError) -> ExecutorError {
        let reason = err.to_string();
        log_event_with_fields(Event::SortUnreliable, &[("clause", clause), ("reason", reason.as_str())]);
        ExecutorError::sort_unreliable(clause, err)
    }
}

/// Drops rows equal to an earlier row: by columns when projected,
/// otherwise by object
fn distinct(rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let mut seen: HashSet<Value> = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let identity = match &row.columns {
                Some(columns) => Value::List(columns.clone()),
                None => row.object.clone(),
            };
            seen.insert(identity)
        })
        .collect()
}
