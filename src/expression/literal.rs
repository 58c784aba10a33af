//! Leaf nodes and value holders

use std::fmt;

use crate::executor::{ExecutionContext, ExecutorError, ExecutorResult};
use crate::value::{Value, ValueType};

use super::{ExprRef, Expression};

/// A constant
#[derive(Debug, Clone)]
pub struct Literal {
    value: Value,
}

impl Literal {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Expression for Literal {
    fn evaluate(&self, _current: &Value, _ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        Ok(self.value.clone())
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        self.value.value_type()
    }

    fn constant_value(&self) -> Option<&Value> {
        Some(&self.value)
    }
}

/// `:name`. An unbound variable is an execution error.
#[derive(Debug, Clone)]
pub struct BindVariable {
    name: String,
}

impl BindVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BindVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.name)
    }
}

impl Expression for BindVariable {
    fn evaluate(&self, _current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        ctx.bind_variable(&self.name).cloned().ok_or_else(|| {
            ExecutorError::execution_failed(format!("Bind variable '{}' is not set", self.name))
                .with_expression(self)
        })
    }

    fn expected_type(&self, ctx: &ExecutionContext) -> ValueType {
        match ctx.bind_variable(&self.name) {
            Some(value) if !value.is_null() => value.value_type(),
            _ => ValueType::Any,
        }
    }
}

/// `@name`: a save value, null when not set
#[derive(Debug, Clone)]
pub struct SaveValueRef {
    name: String,
}

impl SaveValueRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for SaveValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

impl Expression for SaveValueRef {
    fn evaluate(&self, _current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        Ok(ctx.save_value(&self.name).cloned().unwrap_or(Value::Null))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Any
    }
}

/// `@name := expr`: evaluates `expr`, stores it as a save value and
/// returns it
#[derive(Debug, Clone)]
pub struct SetSaveValue {
    name: String,
    expr: ExprRef,
}

impl SetSaveValue {
    pub fn new(name: impl Into<String>, expr: ExprRef) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

impl fmt::Display for SetSaveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} := {}", self.name, self.expr)
    }
}

impl Expression for SetSaveValue {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let value = self.expr.evaluate(current, ctx)?;
        ctx.set_save_value(self.name.clone(), value.clone());
        Ok(value)
    }

    fn expected_type(&self, ctx: &ExecutionContext) -> ValueType {
        self.expr.expected_type(ctx)
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.expr]
    }
}

/// The row itself
#[derive(Debug, Clone, Default)]
pub struct CurrentObject;

impl fmt::Display for CurrentObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*")
    }
}

impl Expression for CurrentObject {
    fn evaluate(&self, current: &Value, _ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        Ok(current.clone())
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Any
    }

    fn reads_row(&self) -> bool {
        true
    }
}

/// `(a, b, c)`
#[derive(Debug, Clone)]
pub struct ListLiteral {
    items: Vec<ExprRef>,
}

impl ListLiteral {
    pub fn new(items: Vec<ExprRef>) -> Self {
        Self { items }
    }
}

impl fmt::Display for ListLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, ")")
    }
}

impl Expression for ListLiteral {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let mut values = Vec::with_capacity(self.items.len());
        for item in &self.items {
            values.push(item.evaluate(current, ctx)?);
        }
        Ok(Value::List(values))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::List
    }

    fn children(&self) -> Vec<&ExprRef> {
        self.items.iter().collect()
    }
}
