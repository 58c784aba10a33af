//! Relational predicates with collection broadcast

use std::cmp::Ordering;
use std::fmt;

use crate::value::Value;

use super::kernel::compare;

/// Relational operator of a comparison predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Relation {
    /// Whether `ordering` (left against right) satisfies the relation
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Relation::Gt => ordering == Ordering::Greater,
            Relation::Gte => ordering != Ordering::Less,
            Relation::Lt => ordering == Ordering::Less,
            Relation::Lte => ordering != Ordering::Greater,
            Relation::Eq => ordering == Ordering::Equal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Gt => ">",
            Relation::Gte => ">=",
            Relation::Lt => "<",
            Relation::Lte => "<=",
            Relation::Eq => "=",
        }
    }

    fn admits_equal(&self) -> bool {
        matches!(self, Relation::Eq | Relation::Gte | Relation::Lte)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evaluates `left <relation> right`.
///
/// A list operand broadcasts: the relation must hold for every element
/// against the other side, and for every pairing when both sides are lists.
/// An empty list holds vacuously. With `ignore_case` both sides compare as
/// lower-cased text. `negate` inverts the final result.
pub fn matches(left: &Value, right: &Value, ignore_case: bool, relation: Relation, negate: bool) -> bool {
    all_match(left, right, ignore_case, relation) != negate
}

/// `compare(a, b) == Equal`
pub fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

fn all_match(left: &Value, right: &Value, ignore_case: bool, relation: Relation) -> bool {
    match (left, right) {
        (Value::List(ls), Value::List(rs)) => ls
            .iter()
            .all(|l| rs.iter().all(|r| all_match(l, r, ignore_case, relation))),
        (Value::List(ls), r) => ls.iter().all(|l| all_match(l, r, ignore_case, relation)),
        (l, Value::List(rs)) => rs.iter().all(|r| all_match(l, r, ignore_case, relation)),
        (l, r) => scalar_match(l, r, ignore_case, relation),
    }
}

fn scalar_match(left: &Value, right: &Value, ignore_case: bool, relation: Relation) -> bool {
    match (left.is_null(), right.is_null()) {
        (true, true) => return relation.admits_equal(),
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    let ordering = if ignore_case {
        compare(
            &Value::Text(left.to_text().to_lowercase()),
            &Value::Text(right.to_text().to_lowercase()),
        )
    } else {
        compare(left, right)
    };
    relation.holds(ordering)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[i64]) -> Value {
        Value::from(items.to_vec())
    }

    #[test]
    fn test_scalar_relations() {
        let (two, three) = (Value::Integer(2), Value::Float(3.0));
        assert!(matches(&three, &two, false, Relation::Gt, false));
        assert!(matches(&three, &three, false, Relation::Gte, false));
        assert!(!matches(&three, &two, false, Relation::Lt, false));
        assert!(matches(&two, &Value::Float(2.0), false, Relation::Eq, false));
        assert!(matches(&two, &three, false, Relation::Eq, true));
    }

    #[test]
    fn test_list_broadcast_is_all_match() {
        let zero = Value::Integer(0);
        assert!(matches(&list(&[1, 2, 3]), &zero, false, Relation::Gt, false));
        assert!(!matches(&list(&[1, 2, -3]), &zero, false, Relation::Gt, false));
        // scalar on the left
        assert!(matches(&zero, &list(&[1, 2, 3]), false, Relation::Lt, false));
    }

    #[test]
    fn test_cross_product_broadcast() {
        assert!(matches(&list(&[5, 6]), &list(&[1, 4]), false, Relation::Gt, false));
        assert!(!matches(&list(&[5, 6]), &list(&[1, 5]), false, Relation::Gt, false));
    }

    #[test]
    fn test_empty_list_is_vacuous() {
        assert!(matches(&list(&[]), &Value::Integer(0), false, Relation::Eq, false));
        assert!(!matches(&list(&[]), &Value::Integer(0), false, Relation::Eq, true));
    }

    #[test]
    fn test_ignore_case() {
        let (a, b) = (Value::from("Volvo"), Value::from("VOLVO"));
        assert!(!matches(&a, &b, false, Relation::Eq, false));
        assert!(matches(&a, &b, true, Relation::Eq, false));
    }

    #[test]
    fn test_null_relations() {
        let null = Value::Null;
        assert!(matches(&null, &null, false, Relation::Eq, false));
        assert!(matches(&null, &null, false, Relation::Lte, false));
        assert!(!matches(&null, &null, false, Relation::Gt, false));
        // one null side matches nothing, so only the negation holds
        assert!(!matches(&null, &Value::Integer(1), false, Relation::Eq, false));
        assert!(!matches(&Value::Integer(1), &null, false, Relation::Lt, false));
        assert!(matches(&null, &Value::Integer(1), false, Relation::Eq, true));
    }
}
