//! Dynamic value model for objql
//!
//! Queries run over collections with no fixed schema. Every expression and
//! every property lookup produces a [`Value`], whose type is only discovered
//! at evaluation time.
//!
//! User types take part in queries by implementing [`Introspect`], which
//! describes their fields, accessor methods and setters once per type.

mod object;
mod value;

pub use object::{
    descriptor_of, Introspect, Member, MemberKind, Object, ObjectRef, ParamType, SetterMember,
    TypeBuilder, TypeDescriptor,
};
pub use value::{Value, ValueType};
