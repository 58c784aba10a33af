//! GROUP BY bucketing
//!
//! Buckets keep encounter order: the first object that produces a key
//! creates its group, and members keep the order they arrived in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::expression::ExprRef;
use crate::observability::{log_event_with_fields, Event};
use crate::value::Value;

use super::context::{ExecutionContext, SaveValues};
use super::errors::{ExecutorError, ExecutorResult};

/// Evaluated GROUP BY expressions of one bucket, in declared order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<Value>);

impl GroupKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// The key as a result row value
    pub fn to_value(&self) -> Value {
        Value::List(self.0.clone())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<Value>> for GroupKey {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// One bucket and the save values set while processing it
#[derive(Debug, Clone)]
pub struct Group {
    key: GroupKey,
    members: Arc<Vec<Value>>,
    save_values: Arc<SaveValues>,
}

impl Group {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn members(&self) -> &Arc<Vec<Value>> {
        &self.members
    }

    pub fn save_values(&self) -> &Arc<SaveValues> {
        &self.save_values
    }

    pub fn set_save_values(&mut self, save_values: Arc<SaveValues>) {
        self.save_values = save_values;
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Ordered groups with lookup by key
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
    groups: Vec<Group>,
    index: HashMap<GroupKey, usize>,
}

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [Group] {
        &mut self.groups
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.iter().map(|g| &g.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Keeps the groups at `positions`, in that order
    pub fn select(&mut self, positions: &[usize]) {
        let mut old: Vec<Option<Group>> = std::mem::take(&mut self.groups)
            .into_iter()
            .map(Some)
            .collect();
        self.groups = positions
            .iter()
            .filter_map(|&p| old.get_mut(p).and_then(Option::take))
            .collect();
        self.reindex();
    }

    /// Keeps the groups for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&Group) -> bool) {
        self.groups.retain(|g| keep(g));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.key.clone(), i))
            .collect();
    }
}

/// Buckets objects by the values of the GROUP BY expressions
pub struct Grouper<'a> {
    keys: &'a [ExprRef],
}

impl<'a> Grouper<'a> {
    pub fn new(keys: &'a [ExprRef]) -> Self {
        Self { keys }
    }

    /// Groups `objects`. A key expression failing on any object fails the
    /// whole grouping.
    pub fn group(&self, objects: &[Value], ctx: &mut ExecutionContext) -> ExecutorResult<GroupSet> {
        let mut buckets: Vec<(GroupKey, Vec<Value>)> = Vec::new();
        let mut index: HashMap<GroupKey, usize> = HashMap::new();

        for object in objects {
            ctx.set_current_object(object.clone());

            let mut values = Vec::with_capacity(self.keys.len());
            for expr in self.keys {
                match expr.evaluate(object, ctx) {
                    Ok(value) => values.push(value),
                    Err(err) => {
                        let expression = expr.to_string();
                        log_event_with_fields(
                            Event::GroupingFailed,
                            &[("expression", expression.as_str()), ("reason", err.message())],
                        );
                        return Err(ExecutorError::wrap("GROUP BY", expr, err));
                    }
                }
            }

            let key = GroupKey(values);
            match index.get(&key) {
                Some(&i) => buckets[i].1.push(object.clone()),
                None => {
                    index.insert(key.clone(), buckets.len());
                    buckets.push((key, vec![object.clone()]));
                }
            }
        }

        let groups = buckets
            .into_iter()
            .map(|(key, members)| Group {
                key,
                members: Arc::new(members),
                save_values: Arc::new(SaveValues::new()),
            })
            .collect();

        Ok(GroupSet { groups, index })
    }
}
