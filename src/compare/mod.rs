//! Comparison Kernel for objql
//!
//! Total-order comparison across mixed value types, and relational
//! predicates with all-match collection broadcast.
//!
//! # Ordering rules
//!
//! 1. Null sorts after every non-null value; two nulls are equal
//! 2. Two numbers compare by magnitude regardless of integer/float
//! 3. Two values of one naturally ordered type use that ordering
//! 4. Everything else compares by text form
//!
//! The whole ordering can be replaced process-wide with
//! [`set_global_comparator`].

mod kernel;
mod matches;

pub use kernel::{compare, global_comparator, natural_compare, set_global_comparator, ValueComparator};
pub use matches::{equals, matches, Relation};
