//! Boolean connectives. Both binary forms short-circuit.

use std::fmt;

use crate::executor::{ExecutionContext, ExecutorResult};
use crate::value::{Value, ValueType};

use super::{ExprRef, Expression};

#[derive(Debug, Clone)]
pub struct And {
    left: ExprRef,
    right: ExprRef,
}

impl And {
    pub fn new(left: ExprRef, right: ExprRef) -> Self {
        Self { left, right }
    }
}

impl fmt::Display for And {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} AND {})", self.left, self.right)
    }
}

impl Expression for And {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        Ok(Value::Boolean(self.is_true(current, ctx)?))
    }

    fn is_true(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<bool> {
        Ok(self.left.is_true(current, ctx)? && self.right.is_true(current, ctx)?)
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.left, &self.right]
    }
}

#[derive(Debug, Clone)]
pub struct Or {
    left: ExprRef,
    right: ExprRef,
}

impl Or {
    pub fn new(left: ExprRef, right: ExprRef) -> Self {
        Self { left, right }
    }
}

impl fmt::Display for Or {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} OR {})", self.left, self.right)
    }
}

impl Expression for Or {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        Ok(Value::Boolean(self.is_true(current, ctx)?))
    }

    fn is_true(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<bool> {
        Ok(self.left.is_true(current, ctx)? || self.right.is_true(current, ctx)?)
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.left, &self.right]
    }
}

#[derive(Debug, Clone)]
pub struct Not {
    inner: ExprRef,
}

impl Not {
    pub fn new(inner: ExprRef) -> Self {
        Self { inner }
    }
}

impl fmt::Display for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT {}", self.inner)
    }
}

impl Expression for Not {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        Ok(Value::Boolean(self.is_true(current, ctx)?))
    }

    fn is_true(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<bool> {
        Ok(!self.inner.is_true(current, ctx)?)
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.inner]
    }
}
