//! Record transformer implementation.
//!
//! Transforms records into IndexableDocument structures for indexing.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::processor::schema::{FieldMapping, IndexSchema};
use resync_shared::{IndexableDocument, Record};

/// Why a record cannot be projected into the index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required attribute is absent, null, or blank.
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// An attribute has the wrong type.
    #[error("Field {field} must be of type {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

/// Transformer that projects records into search documents.
///
/// The transformer is responsible for:
/// - Validating records against the index schema
/// - Renaming attributes to their index-side names
/// - Filling defaults for absent attributes
///
/// It is a pure function of its input and holds no mutable state, so one
/// instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    schema: IndexSchema,
}

impl RecordTransformer {
    /// Create a new transformer for the given schema.
    pub fn new(schema: IndexSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Transform a single record.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexableDocument)` - The document carrying the record id and every mapped field
    /// * `Err(ValidationError)` - If a required field is missing or a field has the wrong type
    pub fn transform(&self, record: &Record) -> Result<IndexableDocument, ValidationError> {
        let mut fields = Map::with_capacity(self.schema.fields().len());

        for mapping in self.schema.fields() {
            let value = match resolve(record, mapping) {
                Some(value) => value,
                None if mapping.required => {
                    debug!(
                        record_id = %record.id,
                        field = %mapping.source,
                        "Record is missing a required field"
                    );
                    return Err(ValidationError::MissingField {
                        field: mapping.source.clone(),
                    });
                }
                None => continue,
            };

            if !mapping.field_type.accepts(&value) {
                return Err(ValidationError::InvalidField {
                    field: mapping.source.clone(),
                    expected: mapping.field_type.name(),
                });
            }

            fields.insert(mapping.target.clone(), value);
        }

        Ok(IndexableDocument::new(record.id, fields))
    }

    /// Return the record with schema defaults applied.
    ///
    /// This is the corrected record written back to the store. Attributes
    /// not covered by the schema are kept as they are.
    pub fn normalize(&self, mut record: Record) -> Record {
        for mapping in self.schema.fields() {
            let Some(default) = &mapping.default else {
                continue;
            };
            if record.get(&mapping.source).map_or(true, is_blank) {
                record
                    .fields
                    .insert(mapping.source.clone(), default.clone());
            }
        }
        record
    }
}

/// The value of a mapped attribute after defaults, or `None` if there is none.
fn resolve(record: &Record, mapping: &FieldMapping) -> Option<Value> {
    match record.get(&mapping.source) {
        Some(value) if !is_blank(value) => Some(value.clone()),
        _ => mapping.default.clone(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
