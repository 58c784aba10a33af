//! Binary arithmetic

use std::fmt;

use crate::executor::{ExecutionContext, ExecutorError, ExecutorResult};
use crate::value::{Value, ValueType};

use super::{ExprRef, Expression};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

/// `left <op> right`.
///
/// Null on either side yields null. `+` concatenates when either side is
/// text. Integer results overflow into floats, and `/` always produces a
/// float.
#[derive(Debug, Clone)]
pub struct Arithmetic {
    left: ExprRef,
    op: ArithOp,
    right: ExprRef,
}

impl Arithmetic {
    pub fn new(left: ExprRef, op: ArithOp, right: ExprRef) -> Self {
        Self { left, op, right }
    }

    fn apply(&self, left: Value, right: Value) -> ExecutorResult<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        if self.op == ArithOp::Add
            && (matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)))
        {
            return Ok(Value::Text(format!("{}{}", left.to_text(), right.to_text())));
        }

        if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
            let (l, r) = (*l, *r);
            let exact = match self.op {
                ArithOp::Add => l.checked_add(r),
                ArithOp::Sub => l.checked_sub(r),
                ArithOp::Mul => l.checked_mul(r),
                ArithOp::Mod if r == 0 => return Err(self.division_by_zero()),
                ArithOp::Mod => l.checked_rem(r),
                ArithOp::Div => None,
            };
            if let Some(result) = exact {
                return Ok(Value::Integer(result));
            }
        }

        let (l, r) = match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) if left.is_numeric() && right.is_numeric() => (l, r),
            _ => {
                return Err(ExecutorError::type_mismatch(format!(
                    "Cannot apply '{}' to {} and {}",
                    self.op.symbol(),
                    left.type_name(),
                    right.type_name()
                ))
                .with_expression(self))
            }
        };

        let result = match self.op {
            ArithOp::Add => l + r,
            ArithOp::Sub => l - r,
            ArithOp::Mul => l * r,
            ArithOp::Div | ArithOp::Mod if r == 0.0 => return Err(self.division_by_zero()),
            ArithOp::Div => l / r,
            ArithOp::Mod => l % r,
        };
        Ok(Value::Float(result))
    }

    fn division_by_zero(&self) -> ExecutorError {
        ExecutorError::execution_failed("Division by zero").with_expression(self)
    }
}

impl fmt::Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.op.symbol(), self.right)
    }
}

impl Expression for Arithmetic {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let left = self.left.evaluate(current, ctx)?;
        let right = self.right.evaluate(current, ctx)?;
        self.apply(left, right)
    }

    fn expected_type(&self, ctx: &ExecutionContext) -> ValueType {
        let left = self.left.expected_type(ctx);
        let right = self.right.expected_type(ctx);
        match self.op {
            ArithOp::Add if left == ValueType::Text || right == ValueType::Text => ValueType::Text,
            ArithOp::Add if left == ValueType::Any && right == ValueType::Any => ValueType::Any,
            _ => ValueType::Number,
        }
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.left, &self.right]
    }
}
