//! Query build errors
//!
//! Error codes:
//! - OBJQL_QUERY_INVALID (REJECT)
//! - OBJQL_LIMIT_NOT_NUMERIC (REJECT)
//! - OBJQL_WHERE_NOT_BOOLEAN (REJECT)
//! - OBJQL_COLUMN_OUT_OF_RANGE (REJECT)
//! - OBJQL_HAVING_WITHOUT_GROUP_BY (REJECT)
//! - OBJQL_FROM_TYPE_MISMATCH (REJECT)

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Query rejected before execution
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Malformed query structure
    ObjqlQueryInvalid,
    /// LIMIT part statically known not to be a number
    ObjqlLimitNotNumeric,
    /// WHERE or HAVING statically known not to be a condition
    ObjqlWhereNotBoolean,
    /// ORDER BY column position outside the SELECT list
    ObjqlColumnOutOfRange,
    /// HAVING or group clauses on a query without GROUP BY
    ObjqlHavingWithoutGroupBy,
    /// Invalid FROM type
    ObjqlFromTypeMismatch,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::ObjqlQueryInvalid => "OBJQL_QUERY_INVALID",
            PlannerErrorCode::ObjqlLimitNotNumeric => "OBJQL_LIMIT_NOT_NUMERIC",
            PlannerErrorCode::ObjqlWhereNotBoolean => "OBJQL_WHERE_NOT_BOOLEAN",
            PlannerErrorCode::ObjqlColumnOutOfRange => "OBJQL_COLUMN_OUT_OF_RANGE",
            PlannerErrorCode::ObjqlHavingWithoutGroupBy => "OBJQL_HAVING_WITHOUT_GROUP_BY",
            PlannerErrorCode::ObjqlFromTypeMismatch => "OBJQL_FROM_TYPE_MISMATCH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    /// Error code
    code: PlannerErrorCode,
    /// Human-readable message
    message: String,
    /// Clause name if applicable
    clause: Option<String>,
}

impl PlannerError {
    fn new(code: PlannerErrorCode, message: impl Into<String>, clause: Option<&str>) -> Self {
        Self {
            code,
            message: message.into(),
            clause: clause.map(str::to_string),
        }
    }

    /// Create a query invalid error
    pub fn query_invalid(clause: &str, reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::ObjqlQueryInvalid, reason, Some(clause))
    }

    /// Create a non-numeric limit error
    pub fn limit_not_numeric(clause: &str, reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::ObjqlLimitNotNumeric, reason, Some(clause))
    }

    /// Create a non-boolean condition error
    pub fn not_boolean(clause: &str, expression: &str, found: &str) -> Self {
        Self::new(
            PlannerErrorCode::ObjqlWhereNotBoolean,
            format!("'{}' must be a condition, found {}", expression, found),
            Some(clause),
        )
    }

    /// Create a column position error
    pub fn column_out_of_range(clause: &str, position: usize, available: usize) -> Self {
        Self::new(
            PlannerErrorCode::ObjqlColumnOutOfRange,
            format!(
                "Column {} is out of range, {} column(s) available",
                position, available
            ),
            Some(clause),
        )
    }

    /// Create a missing GROUP BY error
    pub fn having_without_group_by(clause: &str) -> Self {
        Self::new(
            PlannerErrorCode::ObjqlHavingWithoutGroupBy,
            format!("{} requires GROUP BY", clause),
            Some(clause),
        )
    }

    /// Create a FROM type error
    pub fn from_type_mismatch(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::ObjqlFromTypeMismatch, reason, Some("FROM"))
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the clause name if applicable
    pub fn clause(&self) -> Option<&str> {
        self.clause.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(clause) = &self.clause {
            write!(f, " [in {}]", clause)?;
        }
        Ok(())
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerErrorCode::ObjqlQueryInvalid.code(),
            "OBJQL_QUERY_INVALID"
        );
        assert_eq!(
            PlannerErrorCode::ObjqlLimitNotNumeric.code(),
            "OBJQL_LIMIT_NOT_NUMERIC"
        );
        assert_eq!(
            PlannerErrorCode::ObjqlHavingWithoutGroupBy.code(),
            "OBJQL_HAVING_WITHOUT_GROUP_BY"
        );
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::limit_not_numeric("LIMIT", "'ten' must be a number");
        let display = format!("{}", err);
        assert!(display.starts_with("[REJECT] OBJQL_LIMIT_NOT_NUMERIC"));
        assert!(display.contains("'ten'"));
        assert!(display.ends_with("[in LIMIT]"));
        assert_eq!(err.clause(), Some("LIMIT"));
    }

    #[test]
    fn test_column_out_of_range() {
        let err = PlannerError::column_out_of_range("ORDER BY", 4, 2);
        assert_eq!(err.code(), PlannerErrorCode::ObjqlColumnOutOfRange);
        assert!(err.message().contains("Column 4"));
    }
}
