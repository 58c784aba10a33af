//! Result types for query execution

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::value::Value;

use super::context::SaveValues;
use super::errors::{ExecutorError, ExecutorResult};
use super::grouper::GroupKey;

/// Result rows: whole objects when SELECT is `*`, otherwise one value per
/// SELECT column
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    Objects(Vec<Value>),
    Columns(Vec<Vec<Value>>),
}

impl ResultSet {
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Objects(objects) => objects.len(),
            ResultSet::Columns(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_object_mode(&self) -> bool {
        matches!(self, ResultSet::Objects(_))
    }

    /// Each row as one value: objects as-is, column rows as lists
    pub fn to_values(&self) -> Vec<Value> {
        match self {
            ResultSet::Objects(objects) => objects.clone(),
            ResultSet::Columns(rows) => rows.iter().map(|r| Value::List(r.clone())).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.to_values().iter().map(Value::to_json).collect())
    }
}

/// Rows of one group after HAVING, ordering and limits
#[derive(Debug, Clone)]
pub struct GroupedResults {
    pub key: GroupKey,
    pub rows: ResultSet,
    pub save_values: Arc<SaveValues>,
}

/// Counters and stage timings of one execution
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionStats {
    /// Also logged on the execution's QUERY_* lines
    pub execution_id: Option<Uuid>,
    pub objects_scanned: u64,
    pub objects_matched: u64,
    pub groups: u64,
    pub rows_returned: u64,
    pub comparisons: u64,
    pub sort_cache_hits: u64,
    pub where_micros: u64,
    pub group_micros: u64,
    pub order_micros: u64,
    pub total_micros: u64,
}

impl ExecutionStats {
    pub(crate) fn micros(duration: Duration) -> u64 {
        u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
    }
}

/// Output of one query execution
#[derive(Debug, Clone)]
pub struct QueryResults {
    rows: ResultSet,
    groups: Option<Vec<GroupedResults>>,
    group_index: HashMap<GroupKey, usize>,
    save_values: Arc<SaveValues>,
    stats: ExecutionStats,
}

impl QueryResults {
    pub(crate) fn new(rows: ResultSet, save_values: Arc<SaveValues>, stats: ExecutionStats) -> Self {
        Self {
            rows,
            groups: None,
            group_index: HashMap::new(),
            save_values,
            stats,
        }
    }

    /// Grouped output: one row of GROUP BY values per group
    pub(crate) fn grouped(
        groups: Vec<GroupedResults>,
        save_values: Arc<SaveValues>,
        stats: ExecutionStats,
    ) -> Self {
        let rows = groups.iter().map(|g| g.key.values().to_vec()).collect();
        let group_index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.key.clone(), i))
            .collect();
        Self {
            rows: ResultSet::Columns(rows),
            groups: Some(groups),
            group_index,
            save_values,
            stats,
        }
    }

    pub fn rows(&self) -> &ResultSet {
        &self.rows
    }

    pub fn into_rows(self) -> ResultSet {
        self.rows
    }

    /// Column rows. Fails in object mode, where there are no columns to
    /// hand out.
    pub fn columns(&self) -> ExecutorResult<&[Vec<Value>]> {
        match &self.rows {
            ResultSet::Columns(rows) => Ok(rows),
            ResultSet::Objects(_) => Err(ExecutorError::object_mode_results()),
        }
    }

    /// Whole objects, when SELECT is `*`
    pub fn objects(&self) -> Option<&[Value]> {
        match &self.rows {
            ResultSet::Objects(objects) => Some(objects),
            ResultSet::Columns(_) => None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_grouped(&self) -> bool {
        self.groups.is_some()
    }

    /// Groups in final order, when the query has GROUP BY
    pub fn group_results(&self) -> Option<&[GroupedResults]> {
        self.groups.as_deref()
    }

    pub fn group(&self, key: &GroupKey) -> Option<&GroupedResults> {
        let i = *self.group_index.get(key)?;
        self.groups.as_ref()?.get(i)
    }

    /// Save values set by EXECUTE ON ALL and EXECUTE ON RESULTS
    pub fn save_values(&self) -> &SaveValues {
        &self.save_values
    }

    pub fn save_value(&self, name: &str) -> Option<&Value> {
        self.save_values.get(name)
    }

    /// Save values set while processing one group
    pub fn group_save_values(&self, key: &GroupKey) -> Option<&SaveValues> {
        self.group(key).map(|g| g.save_values.as_ref())
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ExecutionStats {
        &mut self.stats
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        out.insert("rows".into(), self.rows.to_json());
        if let Some(groups) = &self.groups {
            let groups = groups
                .iter()
                .map(|g| {
                    serde_json::json!({
                        "key": g.key.to_value().to_json(),
                        "rows": g.rows.to_json(),
                    })
                })
                .collect();
            out.insert("groups".into(), serde_json::Value::Array(groups));
        }
        out.insert(
            "stats".into(),
            serde_json::to_value(&self.stats).unwrap_or(serde_json::Value::Null),
        );
        serde_json::Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorErrorCode;
    use serde_json::json;

    #[test]
    fn test_object_mode_rejects_columns() {
        let results = QueryResults::new(
            ResultSet::Objects(vec![Value::from(json!({"a": 1}))]),
            Arc::new(SaveValues::new()),
            ExecutionStats::default(),
        );
        assert_eq!(results.row_count(), 1);
        assert!(results.objects().is_some());
        let err = results.columns().unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::ObjqlObjectModeResults);
    }

    #[test]
    fn test_grouped_results() {
        let key = GroupKey::new(vec![Value::from("Volvo")]);
        let mut save_values = SaveValues::new();
        save_values.insert("total".into(), Value::Integer(3));
        let results = QueryResults::grouped(
            vec![GroupedResults {
                key: key.clone(),
                rows: ResultSet::Columns(vec![vec![Value::Integer(2004)]]),
                save_values: Arc::new(save_values),
            }],
            Arc::new(SaveValues::new()),
            ExecutionStats::default(),
        );

        assert!(results.is_grouped());
        assert_eq!(results.columns().unwrap(), &[vec![Value::from("Volvo")]]);
        assert_eq!(
            results.group_save_values(&key).unwrap()["total"],
            Value::Integer(3)
        );
        assert_eq!(
            results.to_json()["groups"][0]["rows"],
            json!([[2004]])
        );
    }
}
