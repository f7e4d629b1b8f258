//! Criteria restricting which records a cursor yields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::Record;

/// Equality criteria over top-level record fields.
///
/// An empty filter matches every record. Stores are free to evaluate the
/// filter natively; [`RecordFilter::matches`] is the reference semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordFilter {
    criteria: Map<String, Value>,
}

impl RecordFilter {
    /// A filter matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(field.into(), value.into());
        self
    }

    /// Build a filter from a JSON object.
    ///
    /// Returns `None` when `value` is not an object.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(criteria) => Some(Self { criteria }),
            _ => None,
        }
    }

    /// Check whether the filter has no criteria.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// The criteria as a JSON object.
    pub fn as_json(&self) -> Value {
        Value::Object(self.criteria.clone())
    }

    /// Check whether `record` satisfies every criterion.
    pub fn matches(&self, record: &Record) -> bool {
        self.criteria
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = RecordFilter::all();

        assert!(filter.is_empty());
        assert!(filter.matches(&Record::empty()));
        assert!(filter.matches(&Record::empty().with_field("title", "Dune")));
    }

    #[test]
    fn test_field_criteria() {
        let filter = RecordFilter::all().with_field("genre", "fiction");

        assert!(filter.matches(&Record::empty().with_field("genre", "fiction")));
        assert!(!filter.matches(&Record::empty().with_field("genre", "poetry")));
        assert!(!filter.matches(&Record::empty()));
    }

    #[test]
    fn test_from_json() {
        let filter = RecordFilter::from_json(json!({ "genre": "fiction" })).unwrap();
        assert_eq!(filter.as_json(), json!({ "genre": "fiction" }));

        assert!(RecordFilter::from_json(json!(["genre"])).is_none());
    }
}
