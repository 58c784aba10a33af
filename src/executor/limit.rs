//! LIMIT evaluation
//!
//! `LIMIT start, count` with a 1-based start. Both parts are evaluated
//! once per execution with no current row, so they may use literals, bind
//! variables, save values and aggregates but not row properties.

use std::fmt;

use crate::expression::{depends_on_row, ExprRef};
use crate::value::Value;

use super::context::ExecutionContext;
use super::errors::{ExecutorError, ExecutorResult};

#[derive(Debug, Clone, Default)]
pub struct Limit {
    start: Option<ExprRef>,
    count: Option<ExprRef>,
}

/// A resolved LIMIT: 0-based offset and optional row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitWindow {
    pub offset: usize,
    pub count: Option<usize>,
}

impl LimitWindow {
    pub fn unbounded() -> Self {
        Self {
            offset: 0,
            count: None,
        }
    }

    /// Slices `items` to the window, clamping at the end
    pub fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if self.offset >= items.len() {
            return Vec::new();
        }
        let end = match self.count {
            Some(count) => self.offset.saturating_add(count).min(items.len()),
            None => items.len(),
        };
        items.truncate(end);
        items.drain(..self.offset);
        items
    }
}

impl Limit {
    /// `LIMIT count`
    pub fn count(count: ExprRef) -> Self {
        Self {
            start: None,
            count: Some(count),
        }
    }

    /// `LIMIT start, count`
    pub fn range(start: ExprRef, count: ExprRef) -> Self {
        Self {
            start: Some(start),
            count: Some(count),
        }
    }

    /// `LIMIT start, *`: everything from `start`
    pub fn starting_at(start: ExprRef) -> Self {
        Self {
            start: Some(start),
            count: None,
        }
    }

    pub fn start_expr(&self) -> Option<&ExprRef> {
        self.start.as_ref()
    }

    pub fn count_expr(&self) -> Option<&ExprRef> {
        self.count.as_ref()
    }

    /// Build-time checks: neither part reads the row, and both are
    /// statically allowed to be numbers
    pub fn validate(&self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        for expr in self.start.iter().chain(self.count.iter()) {
            if depends_on_row(expr) {
                return Err(ExecutorError::execution_failed(
                    "LIMIT cannot reference properties of the current object",
                )
                .with_expression(expr));
            }
            let expected = expr.expected_type(ctx);
            if !expected.accepts_number() {
                return Err(ExecutorError::limit_not_numeric(expr, expected.as_str()));
            }
        }
        Ok(())
    }

    /// Evaluates both parts. A start below 1 is treated as 1, a count
    /// below 1 as "all remaining".
    pub fn resolve(&self, ctx: &mut ExecutionContext) -> ExecutorResult<LimitWindow> {
        let start = match &self.start {
            Some(expr) => Some(evaluate_number(expr, ctx)?),
            None => None,
        };
        let count = match &self.count {
            Some(expr) => Some(evaluate_number(expr, ctx)?),
            None => None,
        };

        let offset = start
            .map(|s| usize::try_from(s.max(1) - 1).unwrap_or(usize::MAX))
            .unwrap_or(0);
        let count = count
            .filter(|&c| c > 0)
            .map(|c| usize::try_from(c).unwrap_or(usize::MAX));
        Ok(LimitWindow { offset, count })
    }

    /// Resolves the window and slices `items`
    pub fn apply<T>(&self, items: Vec<T>, ctx: &mut ExecutionContext) -> ExecutorResult<Vec<T>> {
        Ok(self.resolve(ctx)?.apply(items))
    }
}

fn evaluate_number(expr: &ExprRef, ctx: &mut ExecutionContext) -> ExecutorResult<i64> {
    let value = expr.evaluate(&Value::Null, ctx)?;
    match value {
        Value::Integer(i) => Ok(i),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        other => Err(ExecutorError::limit_not_numeric(expr, &other.type_name())),
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.start, &self.count) {
            (Some(start), Some(count)) => write!(f, "LIMIT {}, {}", start, count),
            (Some(start), None) => write!(f, "LIMIT {}, *", start),
            (None, Some(count)) => write!(f, "LIMIT {}", count),
            (None, None) => write!(f, "LIMIT *"),
        }
    }
}
