//! Record types for storing data.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Index;

/// Unique identifier of a record.
///
/// Identifiers are either integers or strings. Two identifiers with the same
/// string form address the same record (`1` and `"1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Read an identifier out of a JSON value.
    ///
    /// `null` means "no identifier". Anything other than an integer or a
    /// string is rejected.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(RecordId::Str(s.clone()))),
            Value::Number(n) => n
                .as_i64()
                .map(|i| Some(RecordId::Int(i)))
                .ok_or_else(|| Error::bad_request(format!("invalid id '{n}': not an integer"))),
            other => Err(Error::bad_request(format!(
                "invalid id {other}: must be a string or an integer"
            ))),
        }
    }

    /// The JSON form stored in the record's identifier field.
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(i) => Value::from(*i),
            RecordId::Str(s) => Value::from(s.as_str()),
        }
    }

    /// Key used by the store index.
    pub(crate) fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{i}"),
            RecordId::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Str(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Str(s)
    }
}

impl From<i64> for RecordId {
    fn from(i: i64) -> Self {
        RecordId::Int(i)
    }
}

impl From<i32> for RecordId {
    fn from(i: i32) -> Self {
        RecordId::Int(i64::from(i))
    }
}

/// A stored record: an ordered mapping of field names to JSON values.
///
/// Records handed out by the store always carry the identifier field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record with `id` as its first field followed by `fields`.
    ///
    /// Any identifier already present in `fields` is replaced.
    pub(crate) fn with_id(id_field: &str, id: &RecordId, fields: Map<String, Value>) -> Self {
        let mut map = Map::with_capacity(fields.len() + 1);
        map.insert(id_field.to_string(), id.to_value());
        for (key, value) in fields {
            if key != id_field {
                map.insert(key, value);
            }
        }
        Self(map)
    }

    /// Get a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Resolve a field name, falling back to a dotted path through nested
    /// objects (`address.city`) when no top-level key matches exactly.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Read the identifier stored under `id_field`.
    pub fn id(&self, id_field: &str) -> Option<RecordId> {
        self.0
            .get(id_field)
            .and_then(|v| RecordId::from_value(v).ok().flatten())
    }

    /// Check if a top-level field is present.
    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Borrow the underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields, identifier included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Merge `patch` into this record, leaving unlisted fields untouched.
    /// The identifier field is never overwritten.
    pub(crate) fn merge(&mut self, patch: Map<String, Value>, id_field: &str) {
        for (key, value) in patch {
            if key != id_field {
                self.0.insert(key, value);
            }
        }
    }

    /// Keep only the identifier field and the named fields.
    pub(crate) fn project(&self, id_field: &str, fields: &[String]) -> Record {
        let map = self
            .0
            .iter()
            .filter(|(key, _)| key.as_str() == id_field || fields.iter().any(|f| f == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Record(map)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

impl<'a> Index<&'a str> for Record {
    type Output = Value;

    /// Missing fields index to `Value::Null`, as `serde_json::Value` does.
    fn index(&self, field: &'a str) -> &Value {
        static NULL: Value = Value::Null;
        self.0.get(field).unwrap_or(&NULL)
    }
}
