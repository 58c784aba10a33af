//! Scalar functions and aggregates

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::compare::compare;
use crate::executor::{ExecutionContext, ExecutorError, ExecutorResult};
use crate::value::{Value, ValueType};

use super::{ExprRef, Expression};

/// A user function over evaluated arguments
pub type CustomFn = Arc<dyn Fn(&[Value]) -> ExecutorResult<Value> + Send + Sync>;

/// Built-in scalar functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Lower,
    Upper,
    Trim,
    Length,
    Abs,
    Coalesce,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Lower => "lower",
            Builtin::Upper => "upper",
            Builtin::Trim => "trim",
            Builtin::Length => "length",
            Builtin::Abs => "abs",
            Builtin::Coalesce => "coalesce",
        }
    }

    /// Looks a builtin up by its name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lower" => Some(Builtin::Lower),
            "upper" => Some(Builtin::Upper),
            "trim" => Some(Builtin::Trim),
            "length" => Some(Builtin::Length),
            "abs" => Some(Builtin::Abs),
            "coalesce" => Some(Builtin::Coalesce),
            _ => None,
        }
    }

    fn check_arity(&self, count: usize) -> Result<(), String> {
        match self {
            Builtin::Coalesce if count == 0 => Err("coalesce() needs at least one argument".into()),
            Builtin::Coalesce => Ok(()),
            _ if count != 1 => Err(format!(
                "{}() takes 1 argument, {} given",
                self.name(),
                count
            )),
            _ => Ok(()),
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, String> {
        self.check_arity(args.len())?;

        if *self == Builtin::Coalesce {
            return Ok(args.iter().find(|a| !a.is_null()).cloned().unwrap_or(Value::Null));
        }

        let arg = &args[0];
        if arg.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Builtin::Lower => Ok(Value::Text(arg.to_text().to_lowercase())),
            Builtin::Upper => Ok(Value::Text(arg.to_text().to_uppercase())),
            Builtin::Trim => Ok(Value::Text(arg.to_text().trim().to_string())),
            Builtin::Length => Ok(match arg {
                Value::List(items) => Value::from(items.len()),
                Value::Map(map) => Value::from(map.len()),
                other => Value::from(other.to_text().chars().count()),
            }),
            Builtin::Abs => match arg {
                Value::Integer(i) => Ok(i
                    .checked_abs()
                    .map(Value::Integer)
                    .unwrap_or(Value::Float((*i as f64).abs()))),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(format!("abs() expects a number, got {}", other.type_name())),
            },
            Builtin::Coalesce => Ok(Value::Null),
        }
    }

    fn return_type(&self) -> ValueType {
        match self {
            Builtin::Lower | Builtin::Upper | Builtin::Trim => ValueType::Text,
            Builtin::Length | Builtin::Abs => ValueType::Number,
            Builtin::Coalesce => ValueType::Any,
        }
    }
}

#[derive(Clone)]
enum Callee {
    Builtin(Builtin),
    Custom {
        name: String,
        func: CustomFn,
        returns: ValueType,
    },
}

/// `name(args...)`
#[derive(Clone)]
pub struct FunctionCall {
    callee: Callee,
    args: Vec<ExprRef>,
}

impl FunctionCall {
    pub fn builtin(function: Builtin, args: Vec<ExprRef>) -> Self {
        Self {
            callee: Callee::Builtin(function),
            args,
        }
    }

    /// A user function. `returns` is reported to build-time validation.
    pub fn custom(
        name: impl Into<String>,
        returns: ValueType,
        func: CustomFn,
        args: Vec<ExprRef>,
    ) -> Self {
        Self {
            callee: Callee::Custom {
                name: name.into(),
                func,
                returns,
            },
            args,
        }
    }

    pub fn name(&self) -> &str {
        match &self.callee {
            Callee::Builtin(b) => b.name(),
            Callee::Custom { name, .. } => name,
        }
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCall")
            .field("name", &self.name())
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

impl Expression for FunctionCall {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            args.push(arg.evaluate(current, ctx)?);
        }

        match &self.callee {
            Callee::Builtin(builtin) => builtin
                .call(&args)
                .map_err(|reason| ExecutorError::execution_failed(reason).with_expression(self)),
            Callee::Custom { func, .. } => func(&args).map_err(|e| e.with_expression(self)),
        }
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        match &self.callee {
            Callee::Builtin(builtin) => builtin.return_type(),
            Callee::Custom { returns, .. } => *returns,
        }
    }

    fn children(&self) -> Vec<&ExprRef> {
        self.args.iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }
}

/// An aggregate over the context's current object list: every candidate in
/// EXECUTE ON ALL, the filtered rows in EXECUTE ON RESULTS, the bucket
/// inside a group.
///
/// Nulls are skipped. COUNT of nothing is 0, every other aggregate of
/// nothing is null. `count(*)` has no argument.
#[derive(Debug, Clone)]
pub struct Aggregate {
    function: AggregateFn,
    arg: Option<ExprRef>,
}

impl Aggregate {
    pub fn new(function: AggregateFn, arg: ExprRef) -> Self {
        Self {
            function,
            arg: Some(arg),
        }
    }

    pub fn count_all() -> Self {
        Self {
            function: AggregateFn::Count,
            arg: None,
        }
    }

    fn sum(&self, values: &[Value]) -> ExecutorResult<Value> {
        let mut exact: Option<i64> = Some(0);
        let mut float = 0.0;
        for value in values {
            let f = value.as_f64().ok_or_else(|| self.not_numeric(value))?;
            float += f;
            exact = match (exact, value) {
                (Some(acc), Value::Integer(i)) => acc.checked_add(*i),
                _ => None,
            };
        }
        Ok(match exact {
            Some(total) => Value::Integer(total),
            None => Value::Float(float),
        })
    }

    fn not_numeric(&self, value: &Value) -> ExecutorError {
        ExecutorError::type_mismatch(format!(
            "{}() expects numbers, got {}",
            self.function.name(),
            value.type_name()
        ))
        .with_expression(self)
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}({})", self.function.name(), arg),
            None => write!(f, "{}(*)", self.function.name()),
        }
    }
}

impl Expression for Aggregate {
    fn evaluate(&self, _current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let objects = Arc::clone(ctx.all_objects());

        let arg = match &self.arg {
            Some(arg) => arg,
            None => return Ok(Value::from(objects.len())),
        };

        let mut values = Vec::with_capacity(objects.len());
        for object in objects.iter() {
            let value = arg.evaluate(object, ctx)?;
            if !value.is_null() {
                values.push(value);
            }
        }

        match self.function {
            AggregateFn::Count => Ok(Value::from(values.len())),
            _ if values.is_empty() => Ok(Value::Null),
            AggregateFn::Sum => self.sum(&values),
            AggregateFn::Avg => {
                let total = self.sum(&values)?.as_f64().unwrap_or(0.0);
                Ok(Value::Float(total / values.len() as f64))
            }
            AggregateFn::Min | AggregateFn::Max => {
                let wanted = if self.function == AggregateFn::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut best = &values[0];
                for value in &values[1..] {
                    if compare(value, best) == wanted {
                        best = value;
                    }
                }
                Ok(best.clone())
            }
        }
    }

    fn expected_type(&self, ctx: &ExecutionContext) -> ValueType {
        match (self.function, &self.arg) {
            (AggregateFn::Min | AggregateFn::Max, Some(arg)) => arg.expected_type(ctx),
            _ => ValueType::Number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorErrorCode;
    use crate::expression::build::*;
    use serde_json::json;

    fn ctx_with(rows: serde_json::Value) -> ExecutionContext {
        let mut ctx = ExecutionContext::default();
        let rows = match Value::from(rows) {
            Value::List(items) => items,
            other => vec![other],
        };
        ctx.set_all_objects(Arc::new(rows));
        ctx
    }

    #[test]
    fn test_builtins() {
        let mut ctx = ExecutionContext::default();
        let row = Value::from(json!({"name": "  Volvo ", "tags": [1, 2], "delta": -4}));
        let eval = |e: ExprRef, ctx: &mut ExecutionContext| e.evaluate(&row, ctx).unwrap();

        assert_eq!(eval(call(Builtin::Upper, vec![prop("name")]), &mut ctx), Value::from("  VOLVO "));
        assert_eq!(eval(call(Builtin::Trim, vec![prop("name")]), &mut ctx), Value::from("Volvo"));
        assert_eq!(eval(call(Builtin::Length, vec![prop("tags")]), &mut ctx), Value::Integer(2));
        assert_eq!(eval(call(Builtin::Abs, vec![prop("delta")]), &mut ctx), Value::Integer(4));
        assert_eq!(
            eval(call(Builtin::Coalesce, vec![prop("missing"), lit("x")]), &mut ctx),
            Value::from("x")
        );
        assert!(eval(call(Builtin::Lower, vec![prop("missing")]), &mut ctx).is_null());
    }

    #[test]
    fn test_builtin_arity() {
        let mut ctx = ExecutionContext::default();
        let err = call(Builtin::Lower, vec![lit("a"), lit("b")])
            .evaluate(&Value::Null, &mut ctx)
            .unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::ObjqlExecutionFailed);
        assert_eq!(err.expression(), Some("lower('a', 'b')"));
        assert_eq!(Builtin::from_name("UPPER"), Some(Builtin::Upper));
    }

    #[test]
    fn test_custom_function() {
        let mut ctx = ExecutionContext::default();
        let double: CustomFn = Arc::new(|args: &[Value]| {
            Ok(Value::from(args[0].as_i64().unwrap_or(0) * 2))
        });
        let expr = custom("double", ValueType::Number, double, vec![lit(21)]);
        assert_eq!(expr.evaluate(&Value::Null, &mut ctx).unwrap(), Value::Integer(42));
        assert_eq!(expr.expected_type(&ctx), ValueType::Number);
        assert_eq!(expr.to_string(), "double(21)");
    }

    #[test]
    fn test_aggregates() {
        let mut ctx = ctx_with(json!([
            {"price": 10}, {"price": 30}, {"price": null}, {"price": 20}
        ]));
        let eval = |e: ExprRef, ctx: &mut ExecutionContext| e.evaluate(&Value::Null, ctx).unwrap();

        assert_eq!(eval(count_all(), &mut ctx), Value::Integer(4));
        assert_eq!(eval(count(prop("price")), &mut ctx), Value::Integer(3));
        assert_eq!(eval(sum(prop("price")), &mut ctx), Value::Integer(60));
        assert_eq!(eval(avg(prop("price")), &mut ctx), Value::Float(20.0));
        assert_eq!(eval(min(prop("price")), &mut ctx), Value::Integer(10));
        assert_eq!(eval(max(prop("price")), &mut ctx), Value::Integer(30));
    }

    #[test]
    fn test_aggregates_of_nothing() {
        let mut ctx = ctx_with(json!([]));
        assert_eq!(count(prop("a")).evaluate(&Value::Null, &mut ctx).unwrap(), Value::Integer(0));
        assert!(sum(prop("a")).evaluate(&Value::Null, &mut ctx).unwrap().is_null());
        assert!(max(prop("a")).evaluate(&Value::Null, &mut ctx).unwrap().is_null());
    }

    #[test]
    fn test_sum_rejects_text() {
        let mut ctx = ctx_with(json!([{"a": 1}, {"a": "x"}]));
        let err = sum(prop("a")).evaluate(&Value::Null, &mut ctx).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::ObjqlTypeMismatch);
    }
}
