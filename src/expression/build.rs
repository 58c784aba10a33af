//! Shorthand constructors for expression trees

use std::sync::Arc;

use crate::compare::Relation;
use crate::query::QueryPlan;
use crate::value::{Value, ValueType};

use super::*;

pub fn lit(value: impl Into<Value>) -> ExprRef {
    Arc::new(Literal::new(value))
}

pub fn null() -> ExprRef {
    Arc::new(Literal::new(Value::Null))
}

pub fn prop(path: &str) -> ExprRef {
    Arc::new(PropertyRef::new(path))
}

pub fn prop_on(target: ExprRef, path: &str) -> ExprRef {
    Arc::new(PropertyRef::on(target, path))
}

pub fn bind(name: &str) -> ExprRef {
    Arc::new(BindVariable::new(name))
}

pub fn save(name: &str) -> ExprRef {
    Arc::new(SaveValueRef::new(name))
}

pub fn set_save(name: &str, expr: ExprRef) -> ExprRef {
    Arc::new(SetSaveValue::new(name, expr))
}

pub fn current() -> ExprRef {
    Arc::new(CurrentObject)
}

pub fn list(items: Vec<ExprRef>) -> ExprRef {
    Arc::new(ListLiteral::new(items))
}

fn relation(left: ExprRef, relation: Relation, right: ExprRef) -> ExprRef {
    Arc::new(Comparison::new(left, relation, right))
}

pub fn eq(left: ExprRef, right: ExprRef) -> ExprRef {
    relation(left, Relation::Eq, right)
}

pub fn ne(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Comparison::new(left, Relation::Eq, right).negated())
}

pub fn gt(left: ExprRef, right: ExprRef) -> ExprRef {
    relation(left, Relation::Gt, right)
}

pub fn gte(left: ExprRef, right: ExprRef) -> ExprRef {
    relation(left, Relation::Gte, right)
}

pub fn lt(left: ExprRef, right: ExprRef) -> ExprRef {
    relation(left, Relation::Lt, right)
}

pub fn lte(left: ExprRef, right: ExprRef) -> ExprRef {
    relation(left, Relation::Lte, right)
}

/// `left $= right`
pub fn eq_ignore_case(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Comparison::new(left, Relation::Eq, right).ignore_case())
}

pub fn like(subject: ExprRef, pattern: ExprRef) -> ExprRef {
    Arc::new(Like::new(subject, pattern))
}

/// Case-insensitive LIKE
pub fn ilike(subject: ExprRef, pattern: ExprRef) -> ExprRef {
    Arc::new(Like::new(subject, pattern).ignore_case())
}

pub fn not_like(subject: ExprRef, pattern: ExprRef) -> ExprRef {
    Arc::new(Like::new(subject, pattern).negated())
}

pub fn regex(subject: ExprRef, pattern: ExprRef) -> ExprRef {
    Arc::new(RegexMatch::new(subject, pattern))
}

pub fn regex_using(subject: ExprRef, pattern: ExprRef, matcher: &str) -> ExprRef {
    Arc::new(RegexMatch::new(subject, pattern).using(matcher))
}

pub fn in_list(subject: ExprRef, items: Vec<ExprRef>) -> ExprRef {
    Arc::new(InList::new(subject, items))
}

pub fn not_in(subject: ExprRef, items: Vec<ExprRef>) -> ExprRef {
    Arc::new(InList::new(subject, items).negated())
}

pub fn between(subject: ExprRef, low: ExprRef, high: ExprRef) -> ExprRef {
    Arc::new(Between::new(subject, low, high))
}

pub fn is_null(subject: ExprRef) -> ExprRef {
    Arc::new(IsNull::new(subject))
}

pub fn is_not_null(subject: ExprRef) -> ExprRef {
    Arc::new(IsNull::new(subject).negated())
}

pub fn and(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(And::new(left, right))
}

pub fn or(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Or::new(left, right))
}

pub fn not(inner: ExprRef) -> ExprRef {
    Arc::new(Not::new(inner))
}

pub fn add(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Arithmetic::new(left, ArithOp::Add, right))
}

pub fn sub(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Arithmetic::new(left, ArithOp::Sub, right))
}

pub fn mul(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Arithmetic::new(left, ArithOp::Mul, right))
}

pub fn div(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Arithmetic::new(left, ArithOp::Div, right))
}

pub fn rem(left: ExprRef, right: ExprRef) -> ExprRef {
    Arc::new(Arithmetic::new(left, ArithOp::Mod, right))
}

pub fn call(function: Builtin, args: Vec<ExprRef>) -> ExprRef {
    Arc::new(FunctionCall::builtin(function, args))
}

pub fn custom(name: &str, returns: ValueType, func: CustomFn, args: Vec<ExprRef>) -> ExprRef {
    Arc::new(FunctionCall::custom(name, returns, func, args))
}

/// `count(*)`
pub fn count_all() -> ExprRef {
    Arc::new(Aggregate::count_all())
}

pub fn count(arg: ExprRef) -> ExprRef {
    Arc::new(Aggregate::new(AggregateFn::Count, arg))
}

pub fn sum(arg: ExprRef) -> ExprRef {
    Arc::new(Aggregate::new(AggregateFn::Sum, arg))
}

pub fn avg(arg: ExprRef) -> ExprRef {
    Arc::new(Aggregate::new(AggregateFn::Avg, arg))
}

pub fn min(arg: ExprRef) -> ExprRef {
    Arc::new(Aggregate::new(AggregateFn::Min, arg))
}

pub fn max(arg: ExprRef) -> ExprRef {
    Arc::new(Aggregate::new(AggregateFn::Max, arg))
}

/// Runs `plan` over the collection `source` evaluates to
pub fn subquery(plan: Arc<QueryPlan>, source: ExprRef) -> ExprRef {
    Arc::new(SubQuery::new(plan, source))
}
