//! Ordering engine for ORDER BY and GROUP BY ORDER
//!
//! Both comparators evaluate sort keys lazily, optionally caching each
//! evaluated key per (entity, sort item) for the comparator's lifetime.
//! A key that fails to evaluate cannot be propagated through the sort
//! callback: the comparator stores the error, treats the pair as equal
//! and keeps going. Callers must check [`RowComparator::take_error`] or
//! [`GroupComparator::take_error`] once the sort has finished.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::compare::{compare, ValueComparator};
use crate::expression::ExprRef;
use crate::value::Value;

use super::context::ExecutionContext;
use super::errors::{ExecutorError, ExecutorResult};
use super::grouper::{Group, GroupSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// What a sort item orders by
#[derive(Debug, Clone)]
pub enum SortKey {
    Expression(ExprRef),
    /// 1-based position of a SELECT column, or of a GROUP BY expression
    /// when ordering groups
    Column(usize),
}

/// One ORDER BY key
#[derive(Debug, Clone)]
pub struct SortItem {
    key: SortKey,
    direction: SortDirection,
}

impl SortItem {
    pub fn asc(expr: ExprRef) -> Self {
        Self {
            key: SortKey::Expression(expr),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(expr: ExprRef) -> Self {
        Self {
            key: SortKey::Expression(expr),
            direction: SortDirection::Desc,
        }
    }

    pub fn column(position: usize, direction: SortDirection) -> Self {
        Self {
            key: SortKey::Column(position),
            direction,
        }
    }

    pub fn key(&self) -> &SortKey {
        &self.key
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

impl fmt::Display for SortItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            SortKey::Expression(expr) => write!(f, "{}", expr)?,
            SortKey::Column(position) => write!(f, "{}", position)?,
        }
        match self.direction {
            SortDirection::Asc => write!(f, " ASC"),
            SortDirection::Desc => write!(f, " DESC"),
        }
    }
}

/// A row being ordered: the source object and its projected columns.
/// `index` identifies the row to the key cache.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub index: usize,
    pub object: Value,
    pub columns: Option<Vec<Value>>,
}

impl ResultRow {
    pub fn new(index: usize, object: Value, columns: Option<Vec<Value>>) -> Self {
        Self {
            index,
            object,
            columns,
        }
    }
}

/// Key evaluation, caching and error capture shared by both comparators
struct SortState<'a> {
    items: &'a [SortItem],
    caching: bool,
    cache: HashMap<(usize, usize), Value>,
    comparisons: u64,
    cache_hits: u64,
    last_error: Option<ExecutorError>,
    comparator: Option<ValueComparator>,
}

impl<'a> SortState<'a> {
    fn new(items: &'a [SortItem], caching: bool) -> Self {
        Self {
            items,
            caching,
            cache: HashMap::new(),
            comparisons: 0,
            cache_hits: 0,
            last_error: None,
            comparator: None,
        }
    }

    fn key_value(
        &mut self,
        entity: usize,
        position: usize,
        item: &SortItem,
        eval: &mut impl FnMut(usize, &SortItem) -> ExecutorResult<Value>,
    ) -> ExecutorResult<Value> {
        if self.caching {
            if let Some(value) = self.cache.get(&(entity, position)) {
                self.cache_hits += 1;
                return Ok(value.clone());
            }
        }
        let value = eval(entity, item)?;
        if self.caching {
            self.cache.insert((entity, position), value.clone());
        }
        Ok(value)
    }

    fn compare(
        &mut self,
        a: usize,
        b: usize,
        mut eval: impl FnMut(usize, &SortItem) -> ExecutorResult<Value>,
    ) -> Ordering {
        self.comparisons += 1;

        let items = self.items;
        for (position, item) in items.iter().enumerate() {
            let left = match self.key_value(a, position, item, &mut eval) {
                Ok(value) => value,
                Err(err) => {
                    self.last_error = Some(err);
                    return Ordering::Equal;
                }
            };
            let right = match self.key_value(b, position, item, &mut eval) {
                Ok(value) => value,
                Err(err) => {
                    self.last_error = Some(err);
                    return Ordering::Equal;
                }
            };

            let ordering = match &self.comparator {
                Some(comparator) => comparator(&left, &right),
                None => compare(&left, &right),
            };
            let ordering = item.direction.apply(ordering);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Orders result rows by ORDER BY items
pub struct RowComparator<'a> {
    state: SortState<'a>,
}

impl<'a> RowComparator<'a> {
    pub fn new(items: &'a [SortItem], caching: bool) -> Self {
        Self {
            state: SortState::new(items, caching),
        }
    }

    /// Compares with `comparator` instead of the process-wide ordering
    pub fn with_comparator(mut self, comparator: ValueComparator) -> Self {
        self.state.comparator = Some(comparator);
        self
    }

    /// Comparator invocations so far
    pub fn comparisons(&self) -> u64 {
        self.state.comparisons
    }

    pub fn cache_hits(&self) -> u64 {
        self.state.cache_hits
    }

    /// Latest key evaluation failure, if any
    pub fn last_error(&self) -> Option<&ExecutorError> {
        self.state.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<ExecutorError> {
        self.state.last_error.take()
    }

    pub fn clear_cache(&mut self) {
        self.state.cache.clear();
    }

    pub fn compare(&mut self, a: &ResultRow, b: &ResultRow, ctx: &mut ExecutionContext) -> Ordering {
        self.state.compare(a.index, b.index, |index, item| {
            let row = if index == a.index { a } else { b };
            row_key(row, item, ctx)
        })
    }

    /// Stable sort of `rows`
    pub fn sort(&mut self, rows: &mut [ResultRow], ctx: &mut ExecutionContext) {
        rows.sort_by(|a, b| self.compare(a, b, ctx));
    }
}

fn row_key(row: &ResultRow, item: &SortItem, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
    match &item.key {
        SortKey::Column(position) => row
            .columns
            .as_ref()
            .and_then(|columns| columns.get(position.wrapping_sub(1)))
            .cloned()
            .ok_or_else(|| {
                ExecutorError::execution_failed(format!("No column {} to order by", position))
                    .with_expression(item)
            }),
        SortKey::Expression(expr) => {
            ctx.set_current_object(row.object.clone());
            expr.evaluate(&row.object, ctx)
        }
    }
}

/// Orders groups by GROUP BY ORDER items. Expressions are evaluated with
/// the group as the context's current group.
pub struct GroupComparator<'a> {
    state: SortState<'a>,
}

impl<'a> GroupComparator<'a> {
    pub fn new(items: &'a [SortItem], caching: bool) -> Self {
        Self {
            state: SortState::new(items, caching),
        }
    }

    /// Compares with `comparator` instead of the process-wide ordering
    pub fn with_comparator(mut self, comparator: ValueComparator) -> Self {
        self.state.comparator = Some(comparator);
        self
    }

    /// Comparator invocations so far
    pub fn comparisons(&self) -> u64 {
        self.state.comparisons
    }

    pub fn cache_hits(&self) -> u64 {
        self.state.cache_hits
    }

    /// Latest key evaluation failure, if any
    pub fn last_error(&self) -> Option<&ExecutorError> {
        self.state.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<ExecutorError> {
        self.state.last_error.take()
    }

    pub fn clear_cache(&mut self) {
        self.state.cache.clear();
    }

    /// Compares the groups at positions `a` and `b` of `groups`
    pub fn compare(
        &mut self,
        a: usize,
        b: usize,
        groups: &GroupSet,
        ctx: &mut ExecutionContext,
    ) -> Ordering {
        self.state.compare(a, b, |position, item| match groups.groups().get(position) {
            Some(group) => group_key(group, item, ctx),
            None => Err(ExecutorError::execution_failed(format!(
                "No group at position {}",
                position
            ))),
        })
    }

    /// Stable sort of the group positions of `groups`
    pub fn sort(&mut self, groups: &GroupSet, ctx: &mut ExecutionContext) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..groups.len()).collect();
        positions.sort_by(|&a, &b| self.compare(a, b, groups, ctx));
        positions
    }
}

fn group_key(group: &Group, item: &SortItem, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
    match &item.key {
        SortKey::Column(position) => group
            .key()
            .values()
            .get(position.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| {
                ExecutorError::execution_failed(format!("No GROUP BY column {} to order by", position))
                    .with_expression(item)
            }),
        SortKey::Expression(expr) => {
            ctx.switch_group(Arc::clone(group.members()), Arc::clone(group.save_values()));
            let first = group.members().first().cloned().unwrap_or(Value::Null);
            ctx.set_current_object(first.clone());
            expr.evaluate(&first, ctx)
        }
    }
}
