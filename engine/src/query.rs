//! Query model and parser.
//!
//! A raw query object is parsed once into a closed structure: shape
//! directives (`$sort`, `$skip`, `$limit`, `$select`) and a [`Filter`] tree
//! made of field conditions and boolean combinators (`$or`, `$and`, `$not`).
//! Anything unrecognized is rejected here, so evaluation never has to guess.

use crate::{error::Result, Error};
use serde_json::{Map, Value};

/// Sort direction for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `$sort` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A parsed `find` query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Predicate part
    pub filter: Filter,
    /// Sort keys, earlier keys take precedence
    pub sort: Vec<SortKey>,
    /// Records to drop from the front of the ordered result
    pub skip: usize,
    /// Maximum number of records returned
    pub limit: Option<usize>,
    /// Fields to keep besides the identifier
    pub select: Option<Vec<String>>,
}

/// A conjunction of clauses. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
}

/// One entry of a filter object.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `field: value` or `field: { $op: operand, ... }`
    Field {
        field: String,
        condition: FieldCondition,
    },
    /// `$or: [filter, ...]`
    Or(Vec<Filter>),
    /// `$and: [filter, ...]`
    And(Vec<Filter>),
    /// `$not: filter`
    Not(Box<Filter>),
}

/// Constraint placed on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    Equals(Value),
    /// Every operator must hold.
    Operators(Vec<Operator>),
}

/// Field-level operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    In(Vec<Value>),
    Nin(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Ne(Value),
    Not(Box<FieldCondition>),
}

impl Operator {
    /// The operator as written in a query.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::In(_) => "$in",
            Operator::Nin(_) => "$nin",
            Operator::Lt(_) => "$lt",
            Operator::Lte(_) => "$lte",
            Operator::Gt(_) => "$gt",
            Operator::Gte(_) => "$gte",
            Operator::Ne(_) => "$ne",
            Operator::Not(_) => "$not",
        }
    }

    fn parse(name: &str, operand: &Value) -> Result<Self> {
        match name {
            "$in" => Ok(Operator::In(array_operand(name, operand)?)),
            "$nin" => Ok(Operator::Nin(array_operand(name, operand)?)),
            "$lt" => Ok(Operator::Lt(ordered_operand(name, operand)?)),
            "$lte" => Ok(Operator::Lte(ordered_operand(name, operand)?)),
            "$gt" => Ok(Operator::Gt(ordered_operand(name, operand)?)),
            "$gte" => Ok(Operator::Gte(ordered_operand(name, operand)?)),
            "$ne" => Ok(Operator::Ne(operand.clone())),
            "$not" => Ok(Operator::Not(Box::new(FieldCondition::parse(operand)?))),
            other => Err(Error::bad_request(format!("unknown operator '{other}'"))),
        }
    }
}

impl Query {
    /// Parse a raw query value. `null` is the empty query.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Self::parse(map),
            other => Err(Error::bad_request(format!(
                "query must be an object, got {other}"
            ))),
        }
    }

    /// Parse a raw query object.
    pub fn parse(raw: &Map<String, Value>) -> Result<Self> {
        let mut query = Query::default();

        for (key, value) in raw {
            match key.as_str() {
                "$sort" => query.sort = parse_sort(value)?,
                "$skip" => query.skip = parse_count(key, value)?,
                "$limit" => query.limit = Some(parse_count(key, value)?),
                "$select" => query.select = Some(parse_select(value)?),
                _ => query.filter.clauses.push(Clause::parse(key, value)?),
            }
        }

        Ok(query)
    }
}

impl Filter {
    /// Parse a filter object. Shape directives are not allowed here.
    pub fn parse(raw: &Map<String, Value>) -> Result<Self> {
        let clauses = raw
            .iter()
            .map(|(key, value)| Clause::parse(key, value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl Clause {
    fn parse(key: &str, value: &Value) -> Result<Self> {
        match key {
            "$or" => Ok(Clause::Or(parse_filter_list(key, value)?)),
            "$and" => Ok(Clause::And(parse_filter_list(key, value)?)),
            "$not" => match value {
                Value::Object(map) => Ok(Clause::Not(Box::new(Filter::parse(map)?))),
                _ => Err(Error::bad_request("$not expects an object")),
            },
            "$sort" | "$skip" | "$limit" | "$select" => Err(Error::bad_request(format!(
                "{key} is only valid at the top level of a query"
            ))),
            directive if directive.starts_with('$') => Err(Error::bad_request(format!(
                "unknown query directive '{directive}'"
            ))),
            field => Ok(Clause::Field {
                field: field.to_string(),
                condition: FieldCondition::parse(value)?,
            }),
        }
    }
}

impl FieldCondition {
    fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
                if !map.keys().all(|k| k.starts_with('$')) {
                    return Err(Error::bad_request(
                        "a condition cannot mix operators and plain fields",
                    ));
                }
                map.iter()
                    .map(|(name, operand)| Operator::parse(name, operand))
                    .collect::<Result<Vec<_>>>()
                    .map(FieldCondition::Operators)
            }
            literal => Ok(FieldCondition::Equals(literal.clone())),
        }
    }
}

fn parse_filter_list(name: &str, value: &Value) -> Result<Vec<Filter>> {
    let items = match value {
        Value::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(Error::bad_request(format!(
                "{name} expects a non-empty array of objects"
            )))
        }
    };

    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => Filter::parse(map),
            _ => Err(Error::bad_request(format!(
                "{name} expects a non-empty array of objects"
            ))),
        })
        .collect()
}

fn array_operand(name: &str, operand: &Value) -> Result<Vec<Value>> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(Error::bad_request(format!("{name} expects an array"))),
    }
}

fn ordered_operand(name: &str, operand: &Value) -> Result<Value> {
    match operand {
        Value::Number(_) | Value::String(_) => Ok(operand.clone()),
        other => Err(Error::bad_request(format!(
            "{name} expects a number or a string, got {other}"
        ))),
    }
}

/// `$skip` / `$limit`: non-negative integers, numeric strings accepted.
fn parse_count(name: &str, value: &Value) -> Result<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::bad_request(format!(
            "{name} expects a non-negative integer, got {value}"
        ))
    })
}

fn parse_sort(value: &Value) -> Result<Vec<SortKey>> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::bad_request("$sort expects an object of field: 1 | -1"))?;

    map.iter()
        .map(|(field, direction)| {
            let direction = match direction {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            match direction {
                Some(1) => Ok(SortKey::asc(field.as_str())),
                Some(-1) => Ok(SortKey::desc(field.as_str())),
                _ => Err(Error::bad_request(format!(
                    "invalid $sort direction for '{field}': expected 1 or -1"
                ))),
            }
        })
        .collect()
}

fn parse_select(value: &Value) -> Result<Vec<String>> {
    let invalid = || Error::bad_request("$select expects an array of field names");
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|field| field.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Query> {
        Query::from_value(&value)
    }

    #[test]
    fn empty_query() {
        assert_eq!(parse(json!({})).unwrap(), Query::default());
        assert_eq!(parse(Value::Null).unwrap(), Query::default());
        assert!(parse(json!([1, 2])).is_err());
    }

    #[test]
    fn directives_are_not_predicates() {
        let query = parse(json!({
            "name": "Alice",
            "$sort": {"name": 1, "age": -1},
            "$skip": 1,
            "$limit": "2",
            "$select": ["name"]
        }))
        .unwrap();

        assert_eq!(
            query.filter.clauses,
            vec![Clause::Field {
                field: "name".into(),
                condition: FieldCondition::Equals(json!("Alice")),
            }]
        );
        assert_eq!(query.sort, vec![SortKey::asc("name"), SortKey::desc("age")]);
        assert_eq!(query.skip, 1);
        assert_eq!(query.limit, Some(2));
        assert_eq!(query.select, Some(vec!["name".to_string()]));
    }

    #[test]
    fn operator_objects() {
        let query = parse(json!({"age": {"$gte": 18, "$not": 25}})).unwrap();

        assert_eq!(
            query.filter.clauses,
            vec![Clause::Field {
                field: "age".into(),
                condition: FieldCondition::Operators(vec![
                    Operator::Gte(json!(18)),
                    Operator::Not(Box::new(FieldCondition::Equals(json!(25)))),
                ]),
            }]
        );
    }

    #[test]
    fn plain_object_is_literal() {
        let query = parse(json!({"address": {"city": "Oslo"}})).unwrap();
        assert!(matches!(
            &query.filter.clauses[0],
            Clause::Field { condition: FieldCondition::Equals(v), .. } if v == &json!({"city": "Oslo"})
        ));
    }

    #[test]
    fn combinators() {
        let query = parse(json!({
            "$or": [{"name": "Alice"}, {"$not": {"age": 25}}],
            "$and": [{"age": {"$lt": 40}}]
        }))
        .unwrap();

        match &query.filter.clauses[0] {
            Clause::Or(branches) => {
                assert_eq!(branches.len(), 2);
                assert!(matches!(branches[1].clauses[0], Clause::Not(_)));
            }
            other => panic!("expected $or, got {other:?}"),
        }
        assert!(matches!(query.filter.clauses[1], Clause::And(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = parse(json!({"name": {"$regex": "^A"}})).unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(err.to_string(), "unknown operator '$regex'");

        let err = parse(json!({"$nor": [{"name": "Alice"}]})).unwrap_err();
        assert_eq!(err.to_string(), "unknown query directive '$nor'");
    }

    #[test]
    fn malformed_directives() {
        assert!(parse(json!({"$limit": -1})).is_err());
        assert!(parse(json!({"$skip": 1.5})).is_err());
        assert!(parse(json!({"$limit": "many"})).is_err());
        assert!(parse(json!({"$sort": {"name": 2}})).is_err());
        assert!(parse(json!({"$sort": ["name"]})).is_err());
        assert!(parse(json!({"$select": "name"})).is_err());
        assert!(parse(json!({"$select": ["name", 1]})).is_err());
        assert!(parse(json!({"$or": []})).is_err());
        assert!(parse(json!({"$or": [1]})).is_err());
        assert!(parse(json!({"$not": [1]})).is_err());
    }

    #[test]
    fn malformed_operands() {
        assert!(parse(json!({"name": {"$in": "Alice"}})).is_err());
        assert!(parse(json!({"age": {"$lt": [30]}})).is_err());
        assert!(parse(json!({"age": {"$gt": null}})).is_err());
        assert!(parse(json!({"age": {"$gt": 1, "plain": 2}})).is_err());
    }

    #[test]
    fn shape_directives_only_at_top_level() {
        let err = parse(json!({"$or": [{"$limit": 1}]})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "$limit is only valid at the top level of a query"
        );
        assert!(parse(json!({"$not": {"$sort": {"name": 1}}})).is_err());
    }

    #[test]
    fn sort_accepts_string_directions() {
        let query = parse(json!({"$sort": {"name": "-1"}})).unwrap();
        assert_eq!(query.sort, vec![SortKey::desc("name")]);
    }
}
