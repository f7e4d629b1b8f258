//! Search-engine bound documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The search index projection of a [`crate::Record`].
///
/// Carries the record identifier and every indexed field. Documents are
/// derived per pipeline pass and never stored by the pipeline itself. Two
/// documents built from the same record are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexableDocument {
    /// Identifier of the source record, also used as the document id.
    pub id: Uuid,
    /// Indexed fields, keyed by their index-side name.
    pub fields: Map<String, Value>,
}

impl IndexableDocument {
    pub fn new(id: Uuid, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// The body sent to the search engine, stamped with the current time.
    ///
    /// Fields are flattened next to `indexed_at`; the id travels as the
    /// document id rather than inside the body.
    pub fn to_source(&self) -> Value {
        self.to_source_at(Utc::now())
    }

    /// The body sent to the search engine, stamped with `indexed_at`.
    pub fn to_source_at(&self, indexed_at: DateTime<Utc>) -> Value {
        let mut source = self.fields.clone();
        source.insert(
            "indexed_at".to_string(),
            Value::String(indexed_at.to_rfc3339()),
        );
        Value::Object(source)
    }

    /// Concatenated text of every string field, used for query-string matching.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for value in self.fields.values() {
            collect_text(value, &mut text);
        }
        text
    }
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push_str(s);
            out.push(' ');
        }
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_text(item, out)),
        _ => {}
    }
}
