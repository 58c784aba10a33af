//! Execution-time errors
//!
//! Error codes:
//! - OBJQL_EXECUTION_FAILED (ERROR)
//! - OBJQL_PROPERTY_RESOLUTION (ERROR)
//! - OBJQL_LIMIT_NOT_NUMERIC (ERROR)
//! - OBJQL_TYPE_MISMATCH (ERROR)
//! - OBJQL_SORT_UNRELIABLE (FATAL)
//! - OBJQL_MATCHER_FAILED (ERROR)
//! - OBJQL_OBJECT_MODE_RESULTS (ERROR)

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::matcher::MatcherError;
use crate::resolver::PropertyResolutionError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The query failed on this input
    Error,
    /// The query produced results that cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Executor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// General evaluation failure
    ObjqlExecutionFailed,
    /// A property path could not be resolved
    ObjqlPropertyResolution,
    /// LIMIT evaluated to a non-number
    ObjqlLimitNotNumeric,
    /// An operand had the wrong runtime type
    ObjqlTypeMismatch,
    /// A sort key failed during ordering
    ObjqlSortUnreliable,
    /// A regex matcher failed or is missing
    ObjqlMatcherFailed,
    /// Column access on whole-object results
    ObjqlObjectModeResults,
}

impl ExecutorErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::ObjqlExecutionFailed => "OBJQL_EXECUTION_FAILED",
            ExecutorErrorCode::ObjqlPropertyResolution => "OBJQL_PROPERTY_RESOLUTION",
            ExecutorErrorCode::ObjqlLimitNotNumeric => "OBJQL_LIMIT_NOT_NUMERIC",
            ExecutorErrorCode::ObjqlTypeMismatch => "OBJQL_TYPE_MISMATCH",
            ExecutorErrorCode::ObjqlSortUnreliable => "OBJQL_SORT_UNRELIABLE",
            ExecutorErrorCode::ObjqlMatcherFailed => "OBJQL_MATCHER_FAILED",
            ExecutorErrorCode::ObjqlObjectModeResults => "OBJQL_OBJECT_MODE_RESULTS",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::ObjqlSortUnreliable => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    /// Text of the expression being evaluated
    expression: Option<String>,
    /// Property path, for resolution failures
    path: Option<String>,
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl ExecutorError {
    fn new(code: ExecutorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            expression: None,
            path: None,
            source: None,
        }
    }

    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::ObjqlExecutionFailed, reason)
    }

    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::ObjqlTypeMismatch, reason)
    }

    pub fn limit_not_numeric(expression: impl fmt::Display, found: &str) -> Self {
        Self::new(
            ExecutorErrorCode::ObjqlLimitNotNumeric,
            format!("LIMIT value must be a number, got {}", found),
        )
        .with_expression(expression)
    }

    /// A comparator stored `cause` while sorting
    pub fn sort_unreliable(clause: &str, cause: ExecutorError) -> Self {
        let message = format!("{} ordering is unreliable: {}", clause, cause.message);
        let mut err = Self::new(ExecutorErrorCode::ObjqlSortUnreliable, message);
        err.expression = cause.expression.clone();
        err.path = cause.path.clone();
        err.source = Some(Arc::new(cause));
        err
    }

    pub fn matcher_unavailable(name: &str) -> Self {
        Self::new(
            ExecutorErrorCode::ObjqlMatcherFailed,
            format!("No regex matcher '{}' is available", name),
        )
    }

    pub fn object_mode_results() -> Self {
        Self::new(
            ExecutorErrorCode::ObjqlObjectModeResults,
            "Results hold whole objects; column access is not supported",
        )
    }

    /// Wraps `cause` as the failure of `expression` during `stage`
    pub fn wrap(stage: &str, expression: impl fmt::Display, cause: ExecutorError) -> Self {
        let message = format!("{} failed: {}", stage, cause.message);
        let mut err = Self::new(cause.code, message);
        err.expression = Some(expression.to_string());
        err.path = cause.path.clone();
        err.source = Some(Arc::new(cause));
        err
    }

    /// Records the expression being evaluated, keeping the innermost one
    pub fn with_expression(mut self, expression: impl fmt::Display) -> Self {
        if self.expression.is_none() {
            self.expression = Some(expression.to_string());
        }
        self
    }

    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(expression) = &self.expression {
            write!(f, " (in {})", expression)?;
        }
        Ok(())
    }
}

impl Error for ExecutorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl From<PropertyResolutionError> for ExecutorError {
    fn from(err: PropertyResolutionError) -> Self {
        let mut wrapped = Self::new(ExecutorErrorCode::ObjqlPropertyResolution, err.to_string());
        wrapped.path = Some(err.path().to_string());
        wrapped.source = Some(Arc::new(err));
        wrapped
    }
}

impl From<MatcherError> for ExecutorError {
    fn from(err: MatcherError) -> Self {
        let mut wrapped = Self::new(ExecutorErrorCode::ObjqlMatcherFailed, err.to_string());
        wrapped.source = Some(Arc::new(err));
        wrapped
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ExecutorErrorCode::ObjqlExecutionFailed.code(),
            "OBJQL_EXECUTION_FAILED"
        );
        assert_eq!(
            ExecutorErrorCode::ObjqlSortUnreliable.code(),
            "OBJQL_SORT_UNRELIABLE"
        );
    }

    #[test]
    fn test_sort_unreliable_is_fatal() {
        let cause = ExecutorError::execution_failed("boom").with_expression("price * 2");
        let err = ExecutorError::sort_unreliable("ORDER BY", cause);
        assert!(err.is_fatal());
        assert_eq!(err.expression(), Some("price * 2"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_resolution_error_keeps_path() {
        let err: ExecutorError = PropertyResolutionError::NoSuchMember {
            path: "owner.name".into(),
            member: "owner".into(),
            type_name: "Car".into(),
        }
        .into();
        assert_eq!(err.code(), ExecutorErrorCode::ObjqlPropertyResolution);
        assert_eq!(err.path(), Some("owner.name"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_innermost_expression_wins() {
        let err = ExecutorError::type_mismatch("bad")
            .with_expression("a")
            .with_expression("a AND b");
        assert_eq!(err.expression(), Some("a"));
    }

    #[test]
    fn test_wrap_identifies_expression() {
        let cause = ExecutorError::execution_failed("division by zero");
        let err = ExecutorError::wrap("GROUP BY", "total / count", cause);
        assert_eq!(err.expression(), Some("total / count"));
        let display = err.to_string();
        assert!(display.contains("GROUP BY failed"));
        assert!(display.contains("total / count"));
        assert!(display.contains("[ERROR]"));
    }
}
