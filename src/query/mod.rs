//! Query construction for objql
//!
//! [`QueryBuilder`] collects clauses, validates them and produces either a
//! bare [`QueryPlan`] or a runnable [`Query`].
//!
//! # Validation
//!
//! Rejections carry `Severity::Reject` and never reach execution:
//! malformed property paths, non-numeric or row-dependent LIMIT parts,
//! non-condition WHERE or HAVING, column positions outside their list,
//! group clauses without GROUP BY, and a blank FROM type.

mod builder;
mod errors;
mod plan;
mod query;

pub use builder::QueryBuilder;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use plan::QueryPlan;
pub use query::Query;
