//! Property references

use std::fmt;
use std::sync::Arc;

use crate::executor::{ExecutionContext, ExecutorError, ExecutorResult};
use crate::resolver::{PropertyPath, PropertyResolutionError};
use crate::value::{Value, ValueType};

use super::{ExprRef, Expression};

/// A property path read from the current row, or from the value of another
/// expression (`:_parent.owner.name`).
///
/// A malformed path is kept as an error so trees can be built without
/// `Result` plumbing; query building rejects it before execution.
#[derive(Debug, Clone)]
pub struct PropertyRef {
    text: String,
    path: Result<Arc<PropertyPath>, PropertyResolutionError>,
    target: Option<ExprRef>,
}

impl PropertyRef {
    pub fn new(path: &str) -> Self {
        Self {
            text: path.trim().to_string(),
            path: PropertyPath::parse(path).map(Arc::new),
            target: None,
        }
    }

    /// Path resolved against the value of `target` instead of the row
    pub fn on(target: ExprRef, path: &str) -> Self {
        Self {
            target: Some(target),
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> Result<&PropertyPath, &PropertyResolutionError> {
        self.path.as_deref()
    }

    pub fn target(&self) -> Option<&ExprRef> {
        self.target.as_ref()
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}.{}", target, self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

impl Expression for PropertyRef {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let path = self
            .path
            .as_ref()
            .map_err(|e| ExecutorError::from(e.clone()).with_expression(self))?;

        let target = match &self.target {
            Some(target) => target.evaluate(current, ctx)?,
            None => current.clone(),
        };

        ctx.resolver()
            .resolve(&target, path)
            .map_err(|e| ExecutorError::from(e).with_expression(self))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Any
    }

    fn children(&self) -> Vec<&ExprRef> {
        self.target.iter().collect()
    }

    fn as_property(&self) -> Option<&PropertyRef> {
        Some(self)
    }

    fn reads_row(&self) -> bool {
        self.target.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorErrorCode;
    use crate::expression::BindVariable;
    use serde_json::json;

    #[test]
    fn test_resolves_on_current_row() {
        let mut ctx = ExecutionContext::default();
        let row = Value::from(json!({"owner": {"name": "Ann"}}));
        let name = PropertyRef::new("owner.name");
        assert_eq!(name.evaluate(&row, &mut ctx).unwrap(), Value::from("Ann"));
        assert!(name.reads_row());
    }

    #[test]
    fn test_resolves_on_target() {
        let mut ctx = ExecutionContext::default();
        ctx.set_bind_variable("_parent", Value::from(json!({"id": 4})));
        let parent_id = PropertyRef::on(Arc::new(BindVariable::new("_parent")), "id");
        assert_eq!(parent_id.evaluate(&Value::Null, &mut ctx).unwrap(), Value::Integer(4));
        assert!(!parent_id.reads_row());
        assert_eq!(parent_id.to_string(), ":_parent.id");
    }

    #[test]
    fn test_errors_name_the_path() {
        let mut ctx = ExecutionContext::default();
        let row = Value::from(json!({"items": [1]}));
        let err = PropertyRef::new("items[3]").evaluate(&row, &mut ctx).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::ObjqlPropertyResolution);
        assert_eq!(err.path(), Some("items[3]"));
        assert_eq!(err.expression(), Some("items[3]"));
    }

    #[test]
    fn test_malformed_path_fails_on_evaluate() {
        let mut ctx = ExecutionContext::default();
        let bad = PropertyRef::new("a..b");
        assert!(bad.path().is_err());
        assert!(bad.evaluate(&Value::Null, &mut ctx).is_err());
    }
}
