//! Predicate evaluation against records.
//!
//! No type coercion: numbers compare numerically, strings lexicographically,
//! and an ordered comparison between a number and a string is an error rather
//! than a silent mismatch.

use crate::query::{Clause, FieldCondition, Filter, Operator};
use crate::{error::Result, Error, Record};
use serde_json::{Number, Value};
use std::cmp::Ordering;

impl Filter {
    /// Checks if a record matches every clause (AND semantics).
    ///
    /// Every clause is evaluated, so a type error surfaces regardless of
    /// clause order.
    pub fn matches(&self, record: &Record) -> Result<bool> {
        all(&self.clauses, |clause| clause.matches(record))
    }
}

impl Clause {
    fn matches(&self, record: &Record) -> Result<bool> {
        match self {
            Clause::Field { field, condition } => condition.matches(field, record.lookup(field)),
            Clause::Or(branches) => any(branches, |branch| branch.matches(record)),
            Clause::And(branches) => all(branches, |branch| branch.matches(record)),
            Clause::Not(inner) => Ok(!inner.matches(record)?),
        }
    }
}

impl FieldCondition {
    /// `value` is `None` when the record lacks the field.
    fn matches(&self, field: &str, value: Option<&Value>) -> Result<bool> {
        match self {
            FieldCondition::Equals(expected) => Ok(equals(value, expected)),
            FieldCondition::Operators(operators) => all(operators, |op| op.matches(field, value)),
        }
    }
}

impl Operator {
    fn matches(&self, field: &str, value: Option<&Value>) -> Result<bool> {
        match self {
            Operator::In(candidates) => Ok(is_member(value, candidates)),
            Operator::Nin(candidates) => Ok(!is_member(value, candidates)),
            Operator::Ne(other) => Ok(!equals(value, other)),
            Operator::Lt(bound) => ordered(field, self, value, bound, Ordering::is_lt),
            Operator::Lte(bound) => ordered(field, self, value, bound, Ordering::is_le),
            Operator::Gt(bound) => ordered(field, self, value, bound, Ordering::is_gt),
            Operator::Gte(bound) => ordered(field, self, value, bound, Ordering::is_ge),
            Operator::Not(inner) => Ok(!inner.matches(field, value)?),
        }
    }
}

/// Conjunction without short-circuit: the first error wins.
fn all<T>(items: &[T], mut check: impl FnMut(&T) -> Result<bool>) -> Result<bool> {
    let mut result = true;
    for item in items {
        result &= check(item)?;
    }
    Ok(result)
}

/// Disjunction without short-circuit.
fn any<T>(items: &[T], mut check: impl FnMut(&T) -> Result<bool>) -> Result<bool> {
    let mut result = false;
    for item in items {
        result |= check(item)?;
    }
    Ok(result)
}

/// A missing field equals only `null`.
fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        Some(actual) => values_equal(actual, expected),
        None => expected.is_null(),
    }
}

fn is_member(value: Option<&Value>, candidates: &[Value]) -> bool {
    value.is_some_and(|actual| candidates.iter().any(|c| values_equal(actual, c)))
}

fn ordered(
    field: &str,
    op: &Operator,
    value: Option<&Value>,
    bound: &Value,
    accept: fn(Ordering) -> bool,
) -> Result<bool> {
    let actual = match value {
        None | Some(Value::Null) => return Ok(false),
        Some(actual) => actual,
    };

    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => Ok(accept(compare_numbers(a, b))),
        (Value::String(a), Value::String(b)) => Ok(accept(a.as_str().cmp(b.as_str()))),
        _ => Err(Error::bad_request(format!(
            "cannot compare field '{field}' ({}) with {} operand ({})",
            type_name(actual),
            op.name(),
            type_name(bound)
        ))),
    }
}

/// Strict equality, except that numbers compare by numeric value.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Ordering::Equal,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Total order on JSON numbers. Integers compare exactly, including against
/// floats beyond 2^53.
pub(crate) fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (integer(a), integer(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(a), None) => compare_integer_float(a, b.as_f64().unwrap_or(0.0)),
        (None, Some(b)) => compare_integer_float(b, a.as_f64().unwrap_or(0.0)).reverse(),
        (None, None) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn compare_integer_float(i: i128, f: f64) -> Ordering {
    // Rounding is monotonic, so a strict result through f64 is exact. A tie
    // means `f` is integral (or `i` is exactly representable).
    match (i as f64).partial_cmp(&f) {
        Some(Ordering::Equal) => i.cmp(&(f as i128)),
        Some(ordering) => ordering,
        None => Ordering::Equal,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
