//! Primary store records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// An identified entity from the primary store.
///
/// `fields` holds the domain attributes as a JSON object. The identifier is
/// kept outside the object so it can never be lost by a field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The record's unique identifier.
    pub id: Uuid,
    /// Domain attributes.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record with the given identifier and fields.
    pub fn new(id: Uuid, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Create a record with a fresh identifier and no fields.
    pub fn empty() -> Self {
        Self::new(Uuid::new_v4(), Map::new())
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
