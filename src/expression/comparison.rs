//! Predicate nodes

use std::fmt;

use crate::compare::{equals, matches, Relation};
use crate::executor::{ExecutionContext, ExecutorError, ExecutorResult};
use crate::matcher::{MatcherResult, RegexMatcher};
use crate::pattern::like_matches;
use crate::value::{Value, ValueType};

use super::{ExprRef, Expression};

/// `left <relation> right`, with list broadcast
#[derive(Debug, Clone)]
pub struct Comparison {
    left: ExprRef,
    right: ExprRef,
    relation: Relation,
    ignore_case: bool,
    negate: bool,
}

impl Comparison {
    pub fn new(left: ExprRef, relation: Relation, right: ExprRef) -> Self {
        Self {
            left,
            right,
            relation,
            ignore_case: false,
            negate: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match (self.relation, self.negate) {
            (Relation::Eq, true) => "!=",
            (Relation::Gt, true) => "<=",
            (Relation::Gte, true) => "<",
            (Relation::Lt, true) => ">=",
            (Relation::Lte, true) => ">",
            (relation, false) => relation.as_str(),
        };
        let prefix = if self.ignore_case { "$" } else { "" };
        write!(f, "{} {}{} {}", self.left, prefix, op, self.right)
    }
}

impl Expression for Comparison {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let left = self.left.evaluate(current, ctx)?;
        let right = self.right.evaluate(current, ctx)?;
        Ok(Value::Boolean(matches(
            &left,
            &right,
            self.ignore_case,
            self.relation,
            self.negate,
        )))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.left, &self.right]
    }
}

/// `subject [NOT] LIKE pattern`
#[derive(Debug, Clone)]
pub struct Like {
    subject: ExprRef,
    pattern: ExprRef,
    ignore_case: bool,
    negate: bool,
}

impl Like {
    pub fn new(subject: ExprRef, pattern: ExprRef) -> Self {
        Self {
            subject,
            pattern,
            ignore_case: false,
            negate: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl fmt::Display for Like {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.negate { "NOT " } else { "" };
        let prefix = if self.ignore_case { "$" } else { "" };
        write!(f, "{} {}{}LIKE {}", self.subject, not, prefix, self.pattern)
    }
}

impl Expression for Like {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let subject = self.subject.evaluate(current, ctx)?;
        let pattern = match self.pattern.constant_value() {
            Some(constant) => constant.clone(),
            None => self.pattern.evaluate(current, ctx)?,
        };
        if pattern.is_null() {
            return Ok(Value::Boolean(self.negate));
        }

        // the wildcard itself keeps its case
        let text = if self.ignore_case {
            let wildcard = ctx.like_wildcard();
            pattern
                .to_text()
                .split(wildcard)
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(wildcard)
        } else {
            pattern.to_text()
        };
        let compiled = ctx.like_pattern(&text);
        Ok(Value::Boolean(like_matches(
            &compiled,
            &subject,
            self.ignore_case,
            self.negate,
        )))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.subject, &self.pattern]
    }
}

/// `subject [NOT] REGEXP pattern`, whole-value match through a matcher
/// backend
#[derive(Debug, Clone)]
pub struct RegexMatch {
    subject: ExprRef,
    pattern: ExprRef,
    matcher: Option<String>,
    negate: bool,
}

impl RegexMatch {
    pub fn new(subject: ExprRef, pattern: ExprRef) -> Self {
        Self {
            subject,
            pattern,
            matcher: None,
            negate: false,
        }
    }

    /// Uses the named backend instead of the registry default
    pub fn using(mut self, matcher: impl Into<String>) -> Self {
        self.matcher = Some(matcher.into());
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl fmt::Display for RegexMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.negate { "NOT " } else { "" };
        write!(f, "{} {}REGEXP {}", self.subject, not, self.pattern)
    }
}

impl Expression for RegexMatch {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let subject = self.subject.evaluate(current, ctx)?;
        let pattern = self.pattern.evaluate(current, ctx)?;
        if pattern.is_null() {
            return Ok(Value::Boolean(self.negate));
        }
        let pattern = pattern.to_text();

        let matcher = match &self.matcher {
            Some(name) => ctx.matchers().instance(name),
            None => ctx.matchers().default_instance(),
        }
        .ok_or_else(|| {
            let name = self
                .matcher
                .clone()
                .unwrap_or_else(|| ctx.matchers().default_name());
            ExecutorError::matcher_unavailable(&name).with_expression(self)
        })?;

        let matched = regex_all_match(matcher.as_ref(), &pattern, &subject)
            .map_err(|e| ExecutorError::from(e).with_expression(self))?;
        Ok(Value::Boolean(matched != self.negate))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.subject, &self.pattern]
    }
}

fn regex_all_match(matcher: &dyn RegexMatcher, pattern: &str, value: &Value) -> MatcherResult<bool> {
    match value {
        Value::Null => Ok(false),
        Value::List(items) => {
            for item in items {
                if !regex_all_match(matcher, pattern, item)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => matcher.is_match(pattern, &other.to_text()),
    }
}

/// `subject [NOT] IN (items)`.
///
/// List-valued items are flattened into the candidate set. A scalar subject
/// needs one equal candidate; a list subject needs every element to have
/// one.
#[derive(Debug, Clone)]
pub struct InList {
    subject: ExprRef,
    items: Vec<ExprRef>,
    ignore_case: bool,
    negate: bool,
}

impl InList {
    pub fn new(subject: ExprRef, items: Vec<ExprRef>) -> Self {
        Self {
            subject,
            items,
            ignore_case: false,
            negate: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    fn contains(&self, candidates: &[Value], value: &Value) -> bool {
        if self.ignore_case {
            candidates
                .iter()
                .any(|c| matches(value, c, true, Relation::Eq, false))
        } else {
            candidates.iter().any(|c| equals(value, c))
        }
    }
}

impl fmt::Display for InList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.negate { "NOT " } else { "" };
        write!(f, "{} {}IN (", self.subject, not)?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, ")")
    }
}

impl Expression for InList {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let subject = self.subject.evaluate(current, ctx)?;

        let mut candidates = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item.evaluate(current, ctx)? {
                Value::List(values) => candidates.extend(values),
                value => candidates.push(value),
            }
        }

        let found = match &subject {
            Value::Null => false,
            Value::List(values) => values.iter().all(|v| self.contains(&candidates, v)),
            value => self.contains(&candidates, value),
        };
        Ok(Value::Boolean(found != self.negate))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        let mut children = vec![&self.subject];
        children.extend(self.items.iter());
        children
    }
}

/// `subject [NOT] BETWEEN low AND high`, bounds inclusive
#[derive(Debug, Clone)]
pub struct Between {
    subject: ExprRef,
    low: ExprRef,
    high: ExprRef,
    negate: bool,
}

impl Between {
    pub fn new(subject: ExprRef, low: ExprRef, high: ExprRef) -> Self {
        Self {
            subject,
            low,
            high,
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl fmt::Display for Between {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.negate { "NOT " } else { "" };
        write!(f, "{} {}BETWEEN {} AND {}", self.subject, not, self.low, self.high)
    }
}

impl Expression for Between {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let subject = self.subject.evaluate(current, ctx)?;
        let low = self.low.evaluate(current, ctx)?;
        let high = self.high.evaluate(current, ctx)?;
        let inside = matches(&subject, &low, false, Relation::Gte, false)
            && matches(&subject, &high, false, Relation::Lte, false);
        Ok(Value::Boolean(inside != self.negate))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.subject, &self.low, &self.high]
    }
}

/// `subject IS [NOT] NULL`
#[derive(Debug, Clone)]
pub struct IsNull {
    subject: ExprRef,
    negate: bool,
}

impl IsNull {
    pub fn new(subject: ExprRef) -> Self {
        Self {
            subject,
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl fmt::Display for IsNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.negate { "NOT " } else { "" };
        write!(f, "{} IS {}NULL", self.subject, not)
    }
}

impl Expression for IsNull {
    fn evaluate(&self, current: &Value, ctx: &mut ExecutionContext) -> ExecutorResult<Value> {
        let subject = self.subject.evaluate(current, ctx)?;
        Ok(Value::Boolean(subject.is_null() != self.negate))
    }

    fn expected_type(&self, _ctx: &ExecutionContext) -> ValueType {
        ValueType::Boolean
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.subject]
    }
}
