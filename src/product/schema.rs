use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::product::is_truthy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Per-category schema document, keyed by `Category`.
pub struct Schema {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(default)]
    pub settings: SchemaSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSettings {
    /// Fields every product of the category must carry.
    #[serde(default)]
    pub mandatory_fields: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Schema {
    /// First mandatory field that is missing, falsy or blank on `product`.
    pub fn missing_field(&self, product: &Value) -> Option<&str> {
        self.settings
            .mandatory_fields
            .iter()
            .find(|field| match product.get(field.as_str()) {
                None => true,
                Some(Value::String(text)) => text.trim().is_empty(),
                Some(value) => !is_truthy(value),
            })
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn phone_schema() -> Schema {
        serde_json::from_value(json!({
            "Category": "Phones",
            "settings": { "mandatory_fields": ["name", "brand", "category"] }
        }))
        .unwrap()
    }

    #[test]
    fn test_complete_product() {
        let product = json!({ "name": "P1", "brand": "B", "category": "Phones" });
        assert_eq!(phone_schema().missing_field(&product), None);
    }

    #[test]
    fn test_blank_and_missing_fields() {
        let schema = phone_schema();
        assert_eq!(
            schema.missing_field(&json!({ "name": "P1", "category": "Phones" })),
            Some("brand")
        );
        assert_eq!(
            schema.missing_field(&json!({ "name": "   ", "brand": "B", "category": "Phones" })),
            Some("name")
        );
        assert_eq!(
            schema.missing_field(&json!({ "name": "P1", "brand": 0, "category": "Phones" })),
            Some("brand")
        );
    }

    #[test]
    fn test_schema_without_settings() {
        let schema: Schema = serde_json::from_value(json!({ "Category": "Misc" })).unwrap();
        assert_eq!(schema.missing_field(&json!({})), None);
    }
}
