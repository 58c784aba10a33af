//! Query Executor subsystem for objql
//!
//! Evaluates a [`QueryPlan`](crate::query::QueryPlan) over in-memory
//! candidate objects.
//!
//! # Execution Flow (strict order)
//!
//! 1. EXECUTE ON ALL over every candidate
//! 2. WHERE filtering
//! 3. EXECUTE ON RESULTS over the matches
//! 4. GROUP BY, EXECUTE ON GROUP_BY_RESULTS, HAVING, GROUP BY ORDER,
//!    GROUP BY LIMIT
//! 5. SELECT projection, ORDER BY, DISTINCT, LIMIT
//!
//! # Errors
//!
//! WHERE, GROUP BY, HAVING and SELECT failures surface immediately.
//! Ordering failures are deferred by the comparators and surface as
//! `OBJQL_SORT_UNRELIABLE` once the sort has finished.

mod context;
mod errors;
mod executor;
mod grouper;
mod limit;
mod result;
mod sorter;

pub use context::{ExecutionContext, SaveValues, PARENT_BIND_VARIABLE};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use executor::QueryExecutor;
pub use grouper::{Group, GroupKey, GroupSet, Grouper};
pub use limit::{Limit, LimitWindow};
pub use result::{ExecutionStats, GroupedResults, QueryResults, ResultSet};
pub use sorter::{GroupComparator, ResultRow, RowComparator, SortDirection, SortItem, SortKey};
