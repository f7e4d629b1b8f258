//! Field mappings from record attributes to index fields.

use serde_json::Value;

/// The value type an indexed field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A string, or an array of strings.
    Text,
    Number,
    Boolean,
    /// Any JSON value.
    Any,
}

impl FieldType {
    /// Check whether `value` has this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Text => match value {
                Value::String(_) => true,
                Value::Array(items) => items.iter().all(Value::is_string),
                _ => false,
            },
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Any => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Any => "any",
        }
    }
}

/// How one record attribute is projected into the index.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    /// Attribute name on the record.
    pub source: String,
    /// Field name in the index.
    pub target: String,
    pub field_type: FieldType,
    /// Whether a record without this attribute is invalid.
    pub required: bool,
    /// Value used when the attribute is absent or null.
    pub default: Option<Value>,
}

impl FieldMapping {
    /// Map an attribute of the given type to an index field of the same name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            target: name.clone(),
            source: name,
            field_type,
            required: false,
            default: None,
        }
    }

    /// Map a text attribute.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Mark the attribute as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Index the attribute under a different name.
    pub fn indexed_as(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Fill absent values with `default`.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// The ordered set of field mappings defining an index document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSchema {
    fields: Vec<FieldMapping>,
}

impl IndexSchema {
    pub fn new(fields: Vec<FieldMapping>) -> Self {
        Self { fields }
    }

    /// Append a mapping.
    pub fn field(mut self, mapping: FieldMapping) -> Self {
        self.fields.push(mapping);
        self
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Index-side names of the text fields, used to build index mappings.
    pub fn text_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|mapping| mapping.field_type == FieldType::Text)
            .map(|mapping| mapping.target.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::Text.accepts(&json!("Beloved")));
        assert!(FieldType::Text.accepts(&json!(["a", "b"])));
        assert!(!FieldType::Text.accepts(&json!(["a", 1])));
        assert!(!FieldType::Text.accepts(&json!(3)));
        assert!(FieldType::Number.accepts(&json!(3.5)));
        assert!(FieldType::Boolean.accepts(&json!(false)));
        assert!(FieldType::Any.accepts(&json!({ "nested": true })));
    }

    #[test]
    fn test_mapping_builder() {
        let mapping = FieldMapping::text("title")
            .required()
            .indexed_as("name")
            .with_default("Untitled");

        assert_eq!(mapping.source, "title");
        assert_eq!(mapping.target, "name");
        assert!(mapping.required);
        assert_eq!(mapping.default, Some(json!("Untitled")));
    }

    #[test]
    fn test_text_fields() {
        let schema = IndexSchema::default()
            .field(FieldMapping::text("title").required())
            .field(FieldMapping::new("pages", FieldType::Number))
            .field(FieldMapping::text("author").indexed_as("writer"));

        assert_eq!(schema.text_fields(), vec!["title", "writer"]);
        assert_eq!(schema.fields().len(), 3);
    }
}
