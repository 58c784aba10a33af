//! Property Resolver subsystem for objql
//!
//! Resolves dotted/bracketed property paths (`owner.accounts[0].balance`,
//! `attributes[colour]`) against values with no fixed schema.
//!
//! # Resolution rules
//!
//! 1. Paths are parsed once into immutable [`PropertyPath`]s
//! 2. A [`Getter`] is compiled once per (root type, path) and reused
//! 3. Member segments try: field `x`, method `getX`, method `get_x`, method `x`
//! 4. Numeric bracket segments index lists; other bracket segments look up map keys
//! 5. A null anywhere along the chain resolves to null

mod errors;
mod getter;
mod path;
mod setter;

pub use errors::{PropertyResolutionError, ResolutionResult};
pub use getter::{Getter, PropertyResolver};
pub use path::{PathSegment, PropertyPath};
pub use setter::Setter;
