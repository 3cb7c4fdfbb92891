use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::product::FeatureMap;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
/// A product document as stored in the catalog.
///
/// Only `name` and `features` are interpreted; every other field of the
/// document (`category`, `brand`, `price`, `rating`, `image`, ...) is kept in
/// `extra` and written back untouched.
pub struct Product {
    /// Model name of the product.
    #[serde(default)]
    pub name: String,
    /// Feature tree grouped by feature category, e.g. `Camera`, `Display`.
    #[serde(default)]
    pub features: FeatureMap,
    /// Remaining document fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// A string field from the rest of the document, e.g. `brand`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_keeps_unknown_fields() {
        let product: Product = serde_json::from_value(json!({
            "name": "Pixel 8",
            "brand": "Google",
            "price": 699,
            "features": { "Display": { "Size": "6.2in" } }
        }))
        .unwrap();

        assert_eq!(product.name, "Pixel 8");
        assert_eq!(product.field("brand"), Some("Google"));
        assert_eq!(product.features.len(), 1);

        let back = serde_json::to_value(&product).unwrap();
        assert_eq!(back["price"], json!(699));
        assert_eq!(back["features"]["Display"]["Size"], json!("6.2in"));
    }

    #[test]
    fn test_missing_features_is_empty() {
        let product: Product = serde_json::from_value(json!({ "name": "Bare" })).unwrap();
        assert!(product.features.is_empty());
    }
}
