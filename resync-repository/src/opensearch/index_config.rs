//! OpenSearch index configuration and mappings.
//!
//! The mapping is derived from the list of indexed fields so that the index
//! always matches what the transformer produces.

use serde_json::{json, Map, Value};

/// Name and indexed fields of the target search index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    /// Index name.
    pub name: String,
    /// Index-side names of the text fields.
    pub text_fields: Vec<String>,
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl IndexConfig {
    /// Create a single-shard configuration for the given index.
    pub fn new(name: impl Into<String>, text_fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            text_fields,
            number_of_shards: 1,
            number_of_replicas: 1,
        }
    }

    /// Get the index settings and mappings.
    ///
    /// Every text field is analyzed as `text` with a `raw` keyword subfield
    /// for exact matching and sorting. `indexed_at` is a date.
    pub fn settings(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.text_fields {
            properties.insert(
                field.clone(),
                json!({
                    "type": "text",
                    "fields": {
                        "raw": { "type": "keyword", "ignore_above": 256 }
                    }
                }),
            );
        }
        properties.insert("indexed_at".to_string(), json!({ "type": "date" }));

        json!({
            "settings": {
                "number_of_shards": self.number_of_shards,
                "number_of_replicas": self.number_of_replicas
            },
            "mappings": {
                "properties": properties
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let config = IndexConfig::new("books", vec!["title".to_string()]);
        let settings = config.settings();

        assert_eq!(settings["settings"]["number_of_shards"], 1);
        assert_eq!(settings["mappings"]["properties"]["title"]["type"], "text");
        assert_eq!(
            settings["mappings"]["properties"]["title"]["fields"]["raw"]["type"],
            "keyword"
        );
        assert_eq!(settings["mappings"]["properties"]["indexed_at"]["type"], "date");
    }

    #[test]
    fn test_no_text_fields() {
        let settings = IndexConfig::new("empty", vec![]).settings();
        let properties = settings["mappings"]["properties"].as_object().unwrap();

        assert_eq!(properties.len(), 1);
        assert!(properties.contains_key("indexed_at"));
    }
}
