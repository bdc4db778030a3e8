//! Store - the in-memory record container.
//!
//! The Store owns every record, keeps them in insertion order and assigns
//! identifiers. It knows nothing about queries or locking; the
//! [`Service`](crate::Service) wraps it for shared async access.

use crate::{error::Result, Error, IdStrategy, Record, RecordId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sequence number giving a record its position in insertion order.
type Slot = u64;

/// The record container.
#[derive(Debug, Clone)]
pub struct Store {
    /// Name of the identifier field
    id_field: String,
    /// How missing identifiers are filled in
    id_strategy: IdStrategy,
    /// Next candidate for sequential identifiers
    next_id: i64,
    /// Next insertion slot
    next_slot: Slot,
    /// Records by insertion slot
    records: BTreeMap<Slot, Record>,
    /// Identifier key to slot
    index: HashMap<String, Slot>,
}

impl Store {
    /// Create an empty store.
    pub fn new(id_field: impl Into<String>, id_strategy: IdStrategy) -> Self {
        let next_id = match id_strategy {
            IdStrategy::Sequential { start } => start,
            IdStrategy::Uuid => 0,
        };

        Self {
            id_field: id_field.into(),
            id_strategy,
            next_id,
            next_slot: 0,
            records: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Get the identifier field name.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Count of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(&id.key())
    }

    /// All records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Get a record by ID.
    pub fn get(&self, id: &RecordId) -> Result<&Record> {
        self.index
            .get(&id.key())
            .and_then(|slot| self.records.get(slot))
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    /// Insert a single payload, assigning an identifier if it has none.
    pub fn insert(&mut self, payload: Map<String, Value>) -> Result<Record> {
        let mut created = self.insert_many(vec![payload])?;
        created
            .pop()
            .ok_or_else(|| Error::bad_request("nothing to create"))
    }

    /// Insert several payloads.
    ///
    /// All-or-nothing: every explicit identifier is checked before the first
    /// record is stored, so a conflict leaves the store untouched.
    pub fn insert_many(&mut self, payloads: Vec<Map<String, Value>>) -> Result<Vec<Record>> {
        let mut claimed = HashSet::new();
        let mut explicit = Vec::with_capacity(payloads.len());

        for payload in &payloads {
            let id = match payload.get(&self.id_field) {
                Some(value) => RecordId::from_value(value)?,
                None => None,
            };
            if let Some(id) = &id {
                if self.contains(id) || !claimed.insert(id.key()) {
                    return Err(Error::Conflict(id.clone()));
                }
            }
            explicit.push(id);
        }

        let mut created = Vec::with_capacity(payloads.len());
        for (payload, id) in payloads.into_iter().zip(explicit) {
            let id = match id {
                Some(id) => id,
                None => self.generate_id(&claimed),
            };
            let record = Record::with_id(&self.id_field, &id, payload);
            self.push(&id, record.clone());
            created.push(record);
        }

        Ok(created)
    }

    /// Replace a record's fields wholesale, keeping its identifier and
    /// position.
    pub fn replace(&mut self, id: &RecordId, payload: Map<String, Value>) -> Result<Record> {
        let slot = self.slot(id)?;
        // Keep the stored identifier form, not the caller's spelling of it.
        let stored_id = self
            .records
            .get(&slot)
            .and_then(|r| r.id(&self.id_field))
            .unwrap_or_else(|| id.clone());
        let record = Record::with_id(&self.id_field, &stored_id, payload);
        self.records.insert(slot, record.clone());
        Ok(record)
    }

    /// Merge fields into a record, leaving unlisted fields untouched.
    pub fn merge(&mut self, id: &RecordId, payload: Map<String, Value>) -> Result<Record> {
        let slot = self.slot(id)?;
        let record = self
            .records
            .get_mut(&slot)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        record.merge(payload, &self.id_field);
        Ok(record.clone())
    }

    /// Delete a record, returning it as it was just before deletion.
    pub fn remove(&mut self, id: &RecordId) -> Result<Record> {
        let slot = self
            .index
            .remove(&id.key())
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        self.records
            .remove(&slot)
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn slot(&self, id: &RecordId) -> Result<Slot> {
        self.index
            .get(&id.key())
            .copied()
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn push(&mut self, id: &RecordId, record: Record) {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.index.insert(id.key(), slot);
        self.records.insert(slot, record);
    }

    /// Produce an identifier not used by any stored record nor by `reserved`.
    fn generate_id(&mut self, reserved: &HashSet<String>) -> RecordId {
        loop {
            let id = match self.id_strategy {
                IdStrategy::Sequential { .. } => {
                    let id = RecordId::Int(self.next_id);
                    self.next_id = self.next_id.wrapping_add(1);
                    id
                }
                IdStrategy::Uuid => RecordId::Str(uuid::Uuid::new_v4().to_string()),
            };
            let key = id.key();
            if !self.index.contains_key(&key) && !reserved.contains(&key) {
                return id;
            }
        }
    }
}
