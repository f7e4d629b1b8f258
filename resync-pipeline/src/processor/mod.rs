//! Processor module for the resync pipeline.
//!
//! Transforms primary store records into search documents.

mod record_transformer;
mod schema;

pub use record_transformer::{RecordTransformer, ValidationError};
pub use schema::{FieldMapping, FieldType, IndexSchema};
