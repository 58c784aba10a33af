//! LIKE Pattern Matcher for objql
//!
//! A pattern is split on its wildcard into a symbol list once, then walked
//! against each subject:
//!
//! | Symbol | Meaning |
//! |---|---|
//! | `Exact(lit)` | `lit` must start at the current offset |
//! | `Find(lit)` | `lit` must occur at or after the current offset |
//! | `Any` | trailing wildcard, the rest of the subject matches |
//! | `End` | nothing may remain |

mod like;

pub use like::{like_matches, LikePattern, LikePatternCache, PatternSymbol};
