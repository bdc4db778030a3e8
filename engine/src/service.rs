//! Service - the public CRUD + find API.
//!
//! Every call validates its arguments first (missing identifier, missing or
//! malformed payload, malformed query) and only then touches the store. The
//! store sits behind a single async read/write lock: mutations are serialized
//! and atomic, reads run concurrently and never observe a partial write.
//! Records are cloned on the way out.

use crate::pipeline::{execute, Outcome};
use crate::{error::Result, Error, Query, Record, RecordId, ServiceConfig, Store};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Per-call parameters.
///
/// Only `query` is interpreted. Everything else lands in `extra` and is
/// carried through untouched for the caller's own use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub query: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params carrying only a query.
    pub fn with_query(query: Value) -> Self {
        Self {
            query,
            extra: Map::new(),
        }
    }

    fn parse_query(&self) -> Result<Query> {
        Query::from_value(&self.query)
    }
}

/// Result of `create`: one record for an object payload, several for an
/// array payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Created {
    One(Record),
    Many(Vec<Record>),
}

impl Created {
    /// The created records, in payload order.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Created::One(record) => vec![record],
            Created::Many(records) => records,
        }
    }

    /// The single created record, if the payload was an object.
    pub fn into_one(self) -> Option<Record> {
        match self {
            Created::One(record) => Some(record),
            Created::Many(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Created::One(_) => 1,
            Created::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A page of `find` results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Records matching the filter, ignoring skip and limit
    pub total: usize,
    /// Effective page size
    pub limit: Option<usize>,
    pub skip: usize,
    pub data: Vec<Record>,
}

/// The record service.
#[derive(Debug)]
pub struct Service {
    config: ServiceConfig,
    store: RwLock<Store>,
}

impl Default for Service {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}

impl Service {
    /// Create an empty service.
    pub fn new(config: ServiceConfig) -> Self {
        let store = Store::new(config.id_field.clone(), config.id_strategy);
        Self {
            config,
            store: RwLock::new(store),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Name of the identifier field.
    pub fn id_field(&self) -> &str {
        &self.config.id_field
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Get a record by ID.
    ///
    /// Filter clauses in `params.query` must also match, otherwise the record
    /// is reported as not found. `$select` projects the result.
    pub async fn get(&self, id: Option<RecordId>, params: &Params) -> Result<Record> {
        let id = require_id(id, "get")?;
        let query = params.parse_query()?;

        let store = self.store.read().await;
        let record = scoped(&store, &id, &query)?;
        Ok(self.select(record, &query))
    }

    /// Find every record matching `params.query`.
    pub async fn find(&self, params: &Params) -> Result<Vec<Record>> {
        let query = params.parse_query()?;
        let outcome = self.run(&query).await?;
        Ok(outcome.records)
    }

    /// Like [`find`](Self::find), but applies the configured pagination and
    /// reports the total match count.
    pub async fn find_page(&self, params: &Params) -> Result<Page> {
        let mut query = params.parse_query()?;
        if let Some(paginate) = &self.config.paginate {
            query.limit = paginate.effective_limit(query.limit);
        }

        let outcome = self.run(&query).await?;
        Ok(Page {
            total: outcome.total,
            limit: query.limit,
            skip: query.skip,
            data: outcome.records,
        })
    }

    /// Create one record from an object payload, or several from an array of
    /// objects.
    ///
    /// Bulk creation is all-or-nothing.
    pub async fn create(&self, data: Option<Value>, params: &Params) -> Result<Created> {
        let data = data.ok_or_else(|| missing_data("create"))?;
        let query = params.parse_query()?;

        let (many, payloads) = match data {
            Value::Object(map) => (false, vec![map]),
            Value::Array(items) => {
                let payloads = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(map) => Ok(map),
                        other => Err(not_an_object("create", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                (true, payloads)
            }
            other => return Err(not_an_object("create", &other)),
        };

        let created = {
            let mut store = self.store.write().await;
            match store.insert_many(payloads) {
                Ok(created) => created,
                Err(err) => {
                    if let Error::Conflict(id) = &err {
                        tracing::warn!(id = %id, "create rejected: id already in use");
                    }
                    return Err(err);
                }
            }
        };

        for record in &created {
            if let Some(id) = record.id(&self.config.id_field) {
                tracing::debug!(id = %id, "record created");
            }
        }

        let mut created: Vec<Record> = created
            .iter()
            .map(|record| self.select(record, &query))
            .collect();

        if many {
            Ok(Created::Many(created))
        } else {
            created
                .pop()
                .map(Created::One)
                .ok_or_else(|| Error::bad_request("nothing was created"))
        }
    }

    /// Replace a record's fields with `data`, keeping its identifier.
    pub async fn update(
        &self,
        id: Option<RecordId>,
        data: Option<Value>,
        params: &Params,
    ) -> Result<Record> {
        let id = require_id(id, "update")?;
        let data = require_object(data, "update")?;
        let query = params.parse_query()?;

        let mut store = self.store.write().await;
        scoped(&store, &id, &query)?;
        let record = store.replace(&id, data)?;
        drop(store);

        tracing::debug!(id = %id, "record updated");
        Ok(self.select(&record, &query))
    }

    /// Merge `data` into a record, leaving other fields untouched.
    pub async fn patch(
        &self,
        id: Option<RecordId>,
        data: Option<Value>,
        params: &Params,
    ) -> Result<Record> {
        let id = require_id(id, "patch")?;
        let data = require_object(data, "patch")?;
        let query = params.parse_query()?;

        let mut store = self.store.write().await;
        scoped(&store, &id, &query)?;
        let record = store.merge(&id, data)?;
        drop(store);

        tracing::debug!(id = %id, "record patched");
        Ok(self.select(&record, &query))
    }

    /// Delete a record and return it.
    pub async fn remove(&self, id: Option<RecordId>, params: &Params) -> Result<Record> {
        let id = require_id(id, "remove")?;
        let query = params.parse_query()?;

        let mut store = self.store.write().await;
        scoped(&store, &id, &query)?;
        let record = store.remove(&id)?;
        drop(store);

        tracing::debug!(id = %id, "record removed");
        Ok(self.select(&record, &query))
    }

    async fn run(&self, query: &Query) -> Result<Outcome> {
        let store = self.store.read().await;
        execute(store.records(), query, &self.config.id_field)
    }

    fn select(&self, record: &Record, query: &Query) -> Record {
        match &query.select {
            Some(fields) => record.project(&self.config.id_field, fields),
            None => record.clone(),
        }
    }
}

/// Look up a record that must also satisfy the query's filter.
fn scoped<'s>(store: &'s Store, id: &RecordId, query: &Query) -> Result<&'s Record> {
    let record = store.get(id)?;
    if query.filter.matches(record)? {
        Ok(record)
    } else {
        Err(Error::NotFound(id.clone()))
    }
}

fn require_id(id: Option<RecordId>, method: &str) -> Result<RecordId> {
    id.ok_or_else(|| {
        Error::bad_request(format!("An id must be provided to the '{method}' method"))
    })
}

fn require_object(data: Option<Value>, method: &str) -> Result<Map<String, Value>> {
    match data {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(not_an_object(method, &other)),
        None => Err(missing_data(method)),
    }
}

fn missing_data(method: &str) -> Error {
    Error::bad_request(format!(
        "A data object must be provided to the '{method}' method"
    ))
}

fn not_an_object(method: &str, value: &Value) -> Error {
    Error::bad_request(format!(
        "'{method}' expects an object payload, got {value}"
    ))
}
