//! Value ordering

use std::cmp::Ordering;
use std::sync::{Arc, OnceLock, RwLock};

use crate::value::Value;

/// A replacement ordering for values
pub type ValueComparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

fn override_slot() -> &'static RwLock<Option<ValueComparator>> {
    static OVERRIDE: OnceLock<RwLock<Option<ValueComparator>>> = OnceLock::new();
    OVERRIDE.get_or_init(|| RwLock::new(None))
}

/// Replaces [`compare`] for the whole process. `None` restores
/// [`natural_compare`].
pub fn set_global_comparator(comparator: Option<ValueComparator>) {
    match override_slot().write() {
        Ok(mut slot) => *slot = comparator,
        Err(poisoned) => *poisoned.into_inner() = comparator,
    }
}

/// The installed process-wide override, if any
pub fn global_comparator() -> Option<ValueComparator> {
    match override_slot().read() {
        Ok(slot) => slot.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Orders two values, honouring the process-wide override
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match global_comparator() {
        Some(comparator) => comparator(a, b),
        None => natural_compare(a, b),
    }
}

/// The built-in ordering
pub fn natural_compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,

        // exact for the whole i64 range
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (x, y) if x.is_numeric() && y.is_numeric() => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
        }

        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::Object(x), Value::Object(y)) => match x.compare_to(y.as_ref()) {
            Some(ordering) => ordering,
            None => lexical(a, b),
        },

        _ => lexical(a, b),
    }
}

fn lexical(a: &Value, b: &Value) -> Ordering {
    a.to_text().cmp(&b.to_text())
}
