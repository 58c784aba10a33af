//! objql - SQL-like queries over in-memory object collections
//!
//! Queries are built from expression trees, validated once and executed
//! any number of times over lists of [`Value`]s: JSON-like maps, lists and
//! scalars, or user types registered through [`Introspect`].
//!
//! ```ignore
//! use objql::expression::build::*;
//! use objql::{QueryBuilder, SortItem, Value};
//!
//! let mut query = QueryBuilder::new()
//!     .select(vec![prop("name")])
//!     .filter(like(prop("name"), lit("%ann%")))
//!     .order_by(vec![SortItem::asc(prop("age"))])
//!     .build()?;
//! let results = query.execute(people)?;
//! ```

pub mod compare;
pub mod config;
pub mod executor;
pub mod expression;
pub mod matcher;
pub mod observability;
pub mod pattern;
pub mod query;
pub mod resolver;
pub mod value;

pub use compare::{compare, matches, Relation, ValueComparator};
pub use config::{ConfigError, QueryConfig};
pub use executor::{
    ExecutionContext, ExecutorError, ExecutorErrorCode, ExecutorResult, GroupKey, Limit,
    QueryResults, ResultSet, SortDirection, SortItem,
};
pub use expression::{ExprRef, Expression};
pub use matcher::{MatcherBackend, MatcherRegistry, RegexMatcher};
pub use pattern::{like_matches, LikePattern};
pub use query::{PlannerError, PlannerErrorCode, Query, QueryBuilder, QueryPlan};
pub use resolver::{PropertyResolutionError, PropertyResolver};
pub use value::{Introspect, ObjectRef, TypeBuilder, Value, ValueType};
