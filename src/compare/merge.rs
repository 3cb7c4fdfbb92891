use std::collections::HashSet;

use serde::Serialize;

use crate::product::{Definition, Definitions, FeatureMap, FeatureValue, Product};

/// Text shown for a feature that is missing or falsy on one side.
pub const MISSING: &str = "No";

/// Header levels allowed beneath a section: feature, then sub-feature.
const MAX_HEADER_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Label of a comparison row, with the definition of the feature if known.
pub struct Label {
    pub text: String,
    pub definition: Option<Definition>,
}

impl Label {
    fn new(text: &str, definitions: &Definitions) -> Self {
        Self {
            text: text.to_string(),
            definition: definitions.get(text).cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// One row of a merged comparison.
pub enum Row {
    /// A top-level feature category such as `Camera`.
    Section { title: String },
    /// A nested feature group. `depth` is 0 directly under a section.
    SubSection { label: Label, depth: usize },
    /// A concrete value pair.
    Leaf {
        label: Label,
        value1: String,
        value2: String,
    },
}

/// Merges the feature trees of two products into comparison rows.
///
/// Categories, features and sub-features appear in first-seen order, walking
/// `product1` before `product2`. Values that are absent or falsy read as
/// [`MISSING`]. Numeric sub-keys are skipped, and nesting below a
/// sub-feature is not expanded.
pub fn merge(
    category: &str,
    product1: &Product,
    product2: &Product,
    definitions: &Definitions,
) -> Vec<Row> {
    tracing::debug!(
        category,
        product1 = %product1.name,
        product2 = %product2.name,
        "merging feature trees"
    );

    let mut rows = Vec::new();
    for section in union_keys(Some(&product1.features), Some(&product2.features), false) {
        rows.push(Row::Section {
            title: section.to_string(),
        });

        let left = product1.features.get(section).and_then(FeatureValue::as_map);
        let right = product2.features.get(section).and_then(FeatureValue::as_map);
        merge_level(&mut rows, left, right, 0, definitions);
    }
    rows
}

fn merge_level(
    rows: &mut Vec<Row>,
    left: Option<&FeatureMap>,
    right: Option<&FeatureMap>,
    depth: usize,
    definitions: &Definitions,
) {
    for name in union_keys(left, right, depth > 0) {
        let value1 = present(left, name);
        let value2 = present(right, name);
        let nested = value1.is_some_and(FeatureValue::is_nested)
            || value2.is_some_and(FeatureValue::is_nested);

        if nested && depth < MAX_HEADER_DEPTH {
            let sub1 = value1.and_then(FeatureValue::as_map);
            let sub2 = value2.and_then(FeatureValue::as_map);
            if union_keys(sub1, sub2, true).is_empty() {
                continue;
            }
            rows.push(Row::SubSection {
                label: Label::new(name, definitions),
                depth,
            });
            merge_level(rows, sub1, sub2, depth + 1, definitions);
            continue;
        }

        if value1.is_some_and(FeatureValue::is_nested) && value2.is_some_and(FeatureValue::is_nested)
        {
            continue;
        }

        rows.push(Row::Leaf {
            label: Label::new(name, definitions),
            value1: display(value1),
            value2: display(value2),
        });
    }
}

/// The value under `name`, unless it is missing or falsy.
fn present<'a>(map: Option<&'a FeatureMap>, name: &str) -> Option<&'a FeatureValue> {
    map.and_then(|map| map.get(name))
        .filter(|value| value.is_truthy())
}

fn display(value: Option<&FeatureValue>) -> String {
    match value {
        Some(FeatureValue::Scalar(scalar)) => scalar.to_string(),
        Some(FeatureValue::Nested(_)) | None => MISSING.to_string(),
    }
}

fn union_keys<'a>(
    left: Option<&'a FeatureMap>,
    right: Option<&'a FeatureMap>,
    skip_integers: bool,
) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    left.into_iter()
        .chain(right)
        .flat_map(FeatureMap::keys)
        .filter(|key| !(skip_integers && is_numeric_key(key)))
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Whether `key` reads as a number, the way array indices and numbered
/// entries do: `"0"`, `"-1"`, `"+2"`, `"1.5"`, `"1e3"`, `"0x1f"`. Blank keys
/// count as numeric too.
fn is_numeric_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return true;
    }

    let unsigned = key.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" {
        return key.len() - unsigned.len() <= 1;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = key.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).is_ok();
        }
    }

    // f64 parsing also accepts "inf" and "nan", which are not numbers here
    !key.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E'))
        && key.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn product(name: &str, features: Value) -> Product {
        serde_json::from_value(json!({ "name": name, "features": features })).unwrap()
    }

    fn leaf(label: &str, value1: &str, value2: &str) -> Row {
        Row::Leaf {
            label: Label {
                text: label.into(),
                definition: None,
            },
            value1: value1.into(),
            value2: value2.into(),
        }
    }

    fn section(title: &str) -> Row {
        Row::Section {
            title: title.into(),
        }
    }

    fn sub(label: &str, depth: usize) -> Row {
        Row::SubSection {
            label: Label {
                text: label.into(),
                definition: None,
            },
            depth,
        }
    }

    #[test]
    fn test_disjoint_categories() {
        let p1 = product("A", json!({ "Camera": { "Zoom": "10x" } }));
        let p2 = product("B", json!({ "Battery": { "Capacity": "5000mAh" } }));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(
            rows,
            vec![
                section("Camera"),
                leaf("Zoom", "10x", "No"),
                section("Battery"),
                leaf("Capacity", "No", "5000mAh"),
            ]
        );
    }

    #[test]
    fn test_first_seen_order() {
        let p1 = product("A", json!({ "Display": { "Size": "6.1", "Type": "OLED" } }));
        let p2 = product(
            "B",
            json!({ "Audio": { "Jack": true }, "Display": { "Refresh": 120, "Size": "6.7" } }),
        );

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(
            rows,
            vec![
                section("Display"),
                leaf("Size", "6.1", "6.7"),
                leaf("Type", "OLED", "No"),
                leaf("Refresh", "No", "120"),
                section("Audio"),
                leaf("Jack", "No", "true"),
            ]
        );
    }

    #[test]
    fn test_falsy_values_read_no() {
        let p1 = product("A", json!({ "General": { "Slots": 0, "Notch": "", "NFC": false } }));
        let p2 = product("B", json!({ "General": { "Slots": 2, "Notch": null, "NFC": true } }));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(
            rows,
            vec![
                section("General"),
                leaf("Slots", "No", "2"),
                leaf("Notch", "No", "No"),
                leaf("NFC", "No", "true"),
            ]
        );
    }

    #[test]
    fn test_nested_features() {
        let p1 = product(
            "A",
            json!({ "Camera": { "Rear": { "Main": "50MP", "Telephoto": { "Resolution": "12MP" } } } }),
        );
        let p2 = product("B", json!({ "Camera": { "Rear": { "Main": "48MP" } } }));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(
            rows,
            vec![
                section("Camera"),
                sub("Rear", 0),
                leaf("Main", "50MP", "48MP"),
                sub("Telephoto", 1),
                leaf("Resolution", "12MP", "No"),
            ]
        );
    }

    #[test]
    fn test_integer_keys_are_skipped() {
        let p1 = product("A", json!({ "Build": { "Colors": ["Red", "Blue", "Green"] } }));
        let p2 = product("B", json!({ "Build": { "Colors": { "0": "Black" } } }));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(rows, vec![section("Build")]);
    }

    #[test]
    fn test_mixed_shapes() {
        let p1 = product("A", json!({ "Build": { "Material": "Glass" } }));
        let p2 = product(
            "B",
            json!({ "Build": { "Material": { "Front": "Glass", "Back": "Plastic" } } }),
        );

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(
            rows,
            vec![
                section("Build"),
                sub("Material", 0),
                leaf("Front", "No", "Glass"),
                leaf("Back", "No", "Plastic"),
            ]
        );
    }

    #[test]
    fn test_fourth_level_is_not_expanded() {
        let p1 = product(
            "A",
            json!({ "Camera": { "Rear": { "Tele": { "Sensor": { "Size": "1/2in" }, "MP": 12 } } } }),
        );
        let p2 = product(
            "B",
            json!({ "Camera": { "Rear": { "Tele": { "Sensor": "Sony", "MP": 10 } } } }),
        );

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(
            rows,
            vec![
                section("Camera"),
                sub("Rear", 0),
                sub("Tele", 1),
                leaf("Sensor", "No", "Sony"),
                leaf("MP", "12", "10"),
            ]
        );
        assert!(!rows.iter().any(|row| matches!(
            row,
            Row::Leaf { label, .. } if label.text == "Size"
        )));
    }

    #[test]
    fn test_both_nested_at_leaf_level_is_dropped() {
        let p1 = product("A", json!({ "C": { "F": { "S": { "Deep": { "X": 1 } } } } }));
        let p2 = product("B", json!({ "C": { "F": { "S": { "Deep": { "Y": 2 } } } } }));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(rows, vec![section("C"), sub("F", 0), sub("S", 1)]);
    }

    #[test]
    fn test_definitions_attach_to_labels() {
        let definitions: Definitions = [Definition {
            feature: "Rear".into(),
            definition: "Cameras on the back".into(),
        }]
        .into_iter()
        .collect();
        let p1 = product("A", json!({ "Camera": { "Rear": { "Main": "50MP" } } }));
        let p2 = product("B", json!({}));

        let rows = merge("Phones", &p1, &p2, &definitions);
        match &rows[1] {
            Row::SubSection { label, .. } => assert_eq!(
                label.definition.as_ref().map(|d| d.definition.as_str()),
                Some("Cameras on the back")
            ),
            other => panic!("unexpected row {other:?}"),
        }
        assert_eq!(rows[2], leaf("Main", "50MP", "No"));
    }

    #[test]
    fn test_scalar_category_has_no_features() {
        let p1 = product("A", json!({ "Warranty": "1 year" }));
        let p2 = product("B", json!({}));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(rows, vec![section("Warranty")]);
    }

    #[test]
    fn test_integer_feature_names_under_sections_are_kept() {
        let p1 = product("A", json!({ "Ports": { "2": "USB-C" } }));
        let p2 = product("B", json!({ "Ports": { "2": "Lightning" } }));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(rows, vec![section("Ports"), leaf("2", "USB-C", "Lightning")]);
    }

    #[test]
    fn test_signed_and_blank_sub_keys_are_skipped() {
        let p1 = product(
            "A",
            json!({ "C": { "F": { "-1": "neg", "+2": "plus", "": "empty", "x": "y" } } }),
        );
        let p2 = product("B", json!({ "C": { "F": { "1.5": "half", " 3 ": "padded" } } }));

        let rows = merge("Phones", &p1, &p2, &Definitions::default());
        assert_eq!(
            rows,
            vec![section("C"), sub("F", 0), leaf("x", "y", "No")]
        );
    }

    #[test]
    fn test_numeric_key_detection() {
        for key in ["0", "-1", "+2", "1.5", "1e3", "0x1f", "Infinity", "-Infinity", "", "  "] {
            assert!(is_numeric_key(key), "{key:?} should be numeric");
        }
        for key in ["x", "inf", "NaN", "5G", "1-2", "e", "0xZ", "+-1"] {
            assert!(!is_numeric_key(key), "{key:?} should not be numeric");
        }
    }
}
