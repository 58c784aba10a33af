//! Immutable query plans

use std::fmt;

use crate::compare::ValueComparator;
use crate::executor::{Limit, SortItem};
use crate::expression::ExprRef;

/// The clauses of one validated query (no runtime state).
///
/// Built by [`QueryBuilder`](super::QueryBuilder); shared between query
/// instances and sub-queries behind an `Arc`.
#[derive(Clone, Default)]
pub struct QueryPlan {
    pub(crate) distinct: bool,
    pub(crate) columns: Vec<ExprRef>,
    pub(crate) from_type: Option<String>,
    pub(crate) where_clause: Option<ExprRef>,
    pub(crate) group_by: Vec<ExprRef>,
    pub(crate) having: Option<ExprRef>,
    pub(crate) group_order: Vec<SortItem>,
    pub(crate) group_limit: Option<Limit>,
    pub(crate) order_by: Vec<SortItem>,
    pub(crate) limit: Option<Limit>,
    pub(crate) execute_on_all: Vec<ExprRef>,
    pub(crate) execute_on_results: Vec<ExprRef>,
    pub(crate) execute_on_group_results: Vec<ExprRef>,
    pub(crate) comparator: Option<ValueComparator>,
}

impl QueryPlan {
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// SELECT columns; empty when the query returns whole objects
    pub fn columns(&self) -> &[ExprRef] {
        &self.columns
    }

    pub fn from_type(&self) -> Option<&str> {
        self.from_type.as_deref()
    }

    pub fn where_clause(&self) -> Option<&ExprRef> {
        self.where_clause.as_ref()
    }

    pub fn group_by(&self) -> &[ExprRef] {
        &self.group_by
    }

    pub fn having(&self) -> Option<&ExprRef> {
        self.having.as_ref()
    }

    pub fn group_order(&self) -> &[SortItem] {
        &self.group_order
    }

    pub fn group_limit(&self) -> Option<&Limit> {
        self.group_limit.as_ref()
    }

    pub fn order_by(&self) -> &[SortItem] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<&Limit> {
        self.limit.as_ref()
    }

    pub fn execute_on_all(&self) -> &[ExprRef] {
        &self.execute_on_all
    }

    pub fn execute_on_results(&self) -> &[ExprRef] {
        &self.execute_on_results
    }

    pub fn execute_on_group_results(&self) -> &[ExprRef] {
        &self.execute_on_group_results
    }

    /// Value ordering used by this query's comparators instead of the
    /// process-wide one
    pub fn comparator(&self) -> Option<&ValueComparator> {
        self.comparator.as_ref()
    }

    /// Every expression of the plan, clause by clause
    pub(crate) fn expressions(&self) -> Vec<(&'static str, &ExprRef)> {
        let mut all = Vec::new();
        all.extend(self.columns.iter().map(|e| ("SELECT", e)));
        all.extend(self.execute_on_all.iter().map(|e| ("EXECUTE ON ALL", e)));
        all.extend(self.where_clause.iter().map(|e| ("WHERE", e)));
        all.extend(self.execute_on_results.iter().map(|e| ("EXECUTE ON RESULTS", e)));
        all.extend(self.group_by.iter().map(|e| ("GROUP BY", e)));
        all.extend(
            self.execute_on_group_results
                .iter()
                .map(|e| ("EXECUTE ON GROUP_BY_RESULTS", e)),
        );
        all.extend(self.having.iter().map(|e| ("HAVING", e)));
        for (clause, items) in [("GROUP BY ORDER", &self.group_order), ("ORDER BY", &self.order_by)] {
            for item in items {
                if let crate::executor::SortKey::Expression(expr) = item.key() {
                    all.push((clause, expr));
                }
            }
        }
        for (clause, limit) in [("GROUP BY LIMIT", &self.group_limit), ("LIMIT", &self.limit)] {
            if let Some(limit) = limit {
                all.extend(limit.start_expr().map(|e| (clause, e)));
                all.extend(limit.count_expr().map(|e| (clause, e)));
            }
        }
        all
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.columns.is_empty() {
            write!(f, "*")?;
        } else {
            write_list(f, &self.columns)?;
        }
        if let Some(from) = &self.from_type {
            write!(f, " FROM {}", from)?;
        }
        if !self.execute_on_all.is_empty() {
            write!(f, " EXECUTE ON ALL ")?;
            write_list(f, &self.execute_on_all)?;
        }
        if let Some(condition) = &self.where_clause {
            write!(f, " WHERE {}", condition)?;
        }
        if !self.execute_on_results.is_empty() {
            write!(f, " EXECUTE ON RESULTS ")?;
            write_list(f, &self.execute_on_results)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if !self.execute_on_group_results.is_empty() {
            write!(f, " EXECUTE ON GROUP_BY_RESULTS ")?;
            write_list(f, &self.execute_on_group_results)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.group_order.is_empty() {
            write!(f, " GROUP BY ORDER ")?;
            write_list(f, &self.group_order)?;
        }
        if let Some(limit) = &self.group_limit {
            write!(f, " GROUP BY {}", limit)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            write_list(f, &self.order_by)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " {}", limit)?;
        }
        Ok(())
    }
}

impl fmt::Debug for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPlan")
            .field("text", &self.to_string())
            .field("custom_comparator", &self.comparator.is_some())
            .finish()
    }
}
