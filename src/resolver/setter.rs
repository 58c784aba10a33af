//! Property assignment

use crate::value::{ParamType, Value};

use super::errors::{PropertyResolutionError, ResolutionResult};
use super::getter::PropertyResolver;
use super::path::{PathSegment, PropertyPath};

/// Compiled assignment to the last member of a path.
///
/// The prefix is resolved like any getter. On the owning object the
/// candidate setters are `x`, `setX` and `set_x`; among their overloads the
/// best scoring parameter wins, earlier candidates first on ties.
#[derive(Debug)]
pub struct Setter {
    path: PropertyPath,
    owner: Option<PropertyPath>,
    member: String,
}

impl Setter {
    pub(crate) fn compile(path: &PropertyPath) -> ResolutionResult<Self> {
        let (owner, last) = path
            .split_last()
            .ok_or_else(|| PropertyResolutionError::InvalidPath {
                path: path.to_string(),
                reason: "empty path".to_string(),
            })?;

        let member = match last {
            PathSegment::Member(name) => name.clone(),
            other => {
                return Err(PropertyResolutionError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("cannot assign to {}", other),
                })
            }
        };

        Ok(Self {
            path: path.clone(),
            owner,
            member,
        })
    }

    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Assigns `value` through the owning object of `target`
    pub fn set(&self, resolver: &PropertyResolver, target: &Value, value: Value) -> ResolutionResult<()> {
        let owner = match &self.owner {
            Some(prefix) => resolver.resolve(target, prefix)?,
            None => target.clone(),
        };

        let object = owner
            .as_object()
            .ok_or_else(|| PropertyResolutionError::NoSetter {
                path: self.path.to_string(),
                member: self.member.clone(),
                type_name: owner.type_name(),
                value_type: value.type_name(),
            })?;

        let mut best: Option<(u8, ParamType, usize)> = None;
        let candidates = resolver.setter_candidates(object, &self.member);
        for (i, candidate) in candidates.iter().enumerate() {
            let score = candidate.param().score(&value);
            if score > 0 && best.map_or(true, |(s, _, _)| score > s) {
                best = Some((score, candidate.param(), i));
            }
        }

        let (_, param, i) = best.ok_or_else(|| PropertyResolutionError::NoSetter {
            path: self.path.to_string(),
            member: self.member.clone(),
            type_name: object.type_name().to_string(),
            value_type: value.type_name(),
        })?;

        candidates[i]
            .apply(object.as_any(), param.coerce(value))
            .map_err(|reason| PropertyResolutionError::SetterFailed {
                path: self.path.to_string(),
                member: self.member.clone(),
                reason,
            })
    }
}
