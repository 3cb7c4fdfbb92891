use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Human readable explanation of a feature name.
pub struct Definition {
    /// The feature being defined, e.g. `Refresh Rate`.
    #[serde(default)]
    pub feature: String,
    /// The definition text.
    pub definition: String,
}

/// Definitions of one category, keyed by feature name.
///
/// Serializes as `{ "<feature>": { "feature": ..., "definition": ... } }`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Definitions(HashMap<String, Definition>);

impl Definitions {
    pub fn get(&self, feature: &str) -> Option<&Definition> {
        self.0.get(feature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Definition> for Definitions {
    fn from_iter<I: IntoIterator<Item = Definition>>(iter: I) -> Self {
        Definitions(
            iter.into_iter()
                .map(|definition| (definition.feature.clone(), definition))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_shape() {
        let definitions: Definitions = serde_json::from_value(json!({
            "OIS": { "definition": "Optical image stabilisation" }
        }))
        .unwrap();
        assert_eq!(
            definitions.get("OIS").map(|d| d.definition.as_str()),
            Some("Optical image stabilisation")
        );
        assert!(definitions.get("EIS").is_none());
    }
}
