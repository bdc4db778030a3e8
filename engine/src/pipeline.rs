//! Query execution: filter → sort → skip → limit → select.

use crate::predicate::compare_numbers;
use crate::query::{Query, SortDirection, SortKey};
use crate::{error::Result, Record};
use serde_json::Value;
use std::cmp::Ordering;

/// Result of running a query over a record set.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Number of records that matched the filter, before skip and limit
    pub total: usize,
    /// Records in final order, projected
    pub records: Vec<Record>,
}

/// Run `query` over `records`, which must be given in insertion order.
pub fn execute<'a, I>(records: I, query: &Query, id_field: &str) -> Result<Outcome>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut matched = Vec::new();
    for record in records {
        if query.filter.matches(record)? {
            matched.push(record);
        }
    }
    let total = matched.len();

    if !query.sort.is_empty() {
        sort_records(&mut matched, &query.sort);
    }

    let window = matched
        .into_iter()
        .skip(query.skip)
        .take(query.limit.unwrap_or(usize::MAX));

    let records: Vec<Record> = match &query.select {
        Some(fields) => window.map(|r| r.project(id_field, fields)).collect(),
        None => window.cloned().collect(),
    };

    tracing::trace!(matched = total, returned = records.len(), "query executed");

    Ok(Outcome { total, records })
}

/// Stable multi-key sort; later keys break ties of earlier ones.
pub fn sort_records(records: &mut [&Record], keys: &[SortKey]) {
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ordering = compare_values(a.lookup(&key.field), b.lookup(&key.field));
                match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Compares two field values for sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string < array < object
/// - For same types, natural ordering; arrays element-wise, objects equal
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let type_order = |v: &Value| -> u8 {
                match v {
                    Value::Null => 0,
                    Value::Bool(_) => 1,
                    Value::Number(_) => 2,
                    Value::String(_) => 3,
                    Value::Array(_) => 4,
                    Value::Object(_) => 5,
                }
            };

            let a_type = type_order(a_val);
            let b_type = type_order(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
                (Value::String(x), Value::String(y)) => x.cmp(y),
                (Value::Array(x), Value::Array(y)) => x
                    .iter()
                    .zip(y)
                    .map(|(p, q)| compare_values(Some(p), Some(q)))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or_else(|| x.len().cmp(&y.len())),
                _ => Ordering::Equal,
            }
        }
    }
}
