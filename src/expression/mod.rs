//! Expression tree for objql
//!
//! Every clause of a query is an immutable tree of [`Expression`] nodes.
//! Nodes are evaluated against the current object with the query's
//! [`ExecutionContext`], and report a best-effort static type used by
//! build-time validation.
//!
//! ```ignore
//! use objql::expression::build::*;
//!
//! // price > 10 AND make LIKE 'V%'
//! let filter = and(gt(prop("price"), lit(10)), like(prop("make"), lit("V%")));
//! ```

mod accessor;
mod arithmetic;
pub mod build;
mod comparison;
mod function;
mod literal;
mod logical;
mod subquery;

use std::fmt;
use std::sync::Arc;

use crate::executor::{ExecutionContext, ExecutorResult};
use crate::value::{Value, ValueType};

pub use accessor::PropertyRef;
pub use arithmetic::{ArithOp, Arithmetic};
pub use comparison::{Between, Comparison, InList, IsNull, Like, RegexMatch};
pub use function::{Aggregate, AggregateFn, Builtin, CustomFn, FunctionCall};
pub use literal::{BindVariable, CurrentObject, ListLiteral, Literal, SaveValueRef, SetSaveValue};
pub use logical::{And, Not, Or};
pub use subquery::SubQuery;

/// Shared handle to an expression node
pub type ExprRef = Arc<dyn Expression>;

/// A node of an expression tree
pub trait Expression: fmt::Display + fmt::Debug + Send + Sync {
    /// Evaluates the node with `current` as the row
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value>;

    /// Type the node will produce, or `ValueType::Any` when unknown
    fn expected_type(&self, ctx: &ExecutionContext) -> ValueType;

    /// Evaluates the node as a condition
    fn is_true(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<bool> {
        Ok(self.evaluate(current, ctx)?.is_truthy())
    }

    /// The value, when the node is a constant
    fn constant_value(&self) -> Option<&Value> {
        None
    }

    /// Sub-expressions evaluated against the same row
    fn children(&self) -> Vec<&ExprRef> {
        Vec::new()
    }

    /// The node as a property reference
    fn as_property(&self) -> Option<&PropertyRef> {
        None
    }

    /// Whether this node itself reads the current row
    fn reads_row(&self) -> bool {
        false
    }
}

/// Depth-first walk over `expr` and the sub-expressions evaluated against
/// the same row
pub fn walk<'a>(expr: &'a ExprRef, visit: &mut dyn FnMut(&'a ExprRef)) {
    visit(expr);
    for child in expr.children() {
        walk(child, visit);
    }
}

/// Whether any node under `expr` reads the current row
pub fn depends_on_row(expr: &ExprRef) -> bool {
    let mut found = false;
    walk(expr, &mut |e| found |= e.reads_row());
    found
}
