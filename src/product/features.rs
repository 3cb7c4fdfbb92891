use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A single leaf value of a feature tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Free-form text such as `"AMOLED"` or `"Yes"`.
    Text(String),
    /// Any JSON number. Integral values display without a fraction.
    Number(Number),
    /// A boolean flag.
    Bool(bool),
    /// An explicit `null`.
    Null,
}

impl Scalar {
    /// Whether the value counts as present in a comparison.
    ///
    /// Empty text, zero, `false` and `null` are all treated as missing.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Text(text) => !text.is_empty(),
            Scalar::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
            Scalar::Bool(flag) => *flag,
            Scalar::Null => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(text) => f.write_str(text),
            Scalar::Number(number) => match number.as_f64() {
                Some(n) if number.is_f64() => write!(f, "{n}"),
                _ => write!(f, "{number}"),
            },
            Scalar::Bool(flag) => write!(f, "{flag}"),
            Scalar::Null => f.write_str("null"),
        }
    }
}

/// A value inside a product's feature tree.
///
/// Either a plain scalar, or a nested mapping of sub-feature names to more
/// values. JSON arrays decode as nested mappings keyed by their index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FeatureValue {
    Scalar(Scalar),
    Nested(FeatureMap),
}

impl FeatureValue {
    /// The nested mapping, if this value has one.
    pub fn as_map(&self) -> Option<&FeatureMap> {
        match self {
            FeatureValue::Nested(map) => Some(map),
            FeatureValue::Scalar(_) => None,
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, FeatureValue::Nested(_))
    }

    /// Nested values are always truthy, scalars follow [`Scalar::is_truthy`].
    pub fn is_truthy(&self) -> bool {
        match self {
            FeatureValue::Nested(_) => true,
            FeatureValue::Scalar(scalar) => scalar.is_truthy(),
        }
    }
}

impl From<Value> for FeatureValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FeatureValue::Scalar(Scalar::Null),
            Value::Bool(flag) => FeatureValue::Scalar(Scalar::Bool(flag)),
            Value::Number(number) => FeatureValue::Scalar(Scalar::Number(number)),
            Value::String(text) => FeatureValue::Scalar(Scalar::Text(text)),
            nested @ (Value::Array(_) | Value::Object(_)) => {
                FeatureValue::Nested(FeatureMap::from(nested))
            }
        }
    }
}

impl From<FeatureValue> for Value {
    fn from(value: FeatureValue) -> Self {
        match value {
            FeatureValue::Scalar(Scalar::Null) => Value::Null,
            FeatureValue::Scalar(Scalar::Bool(flag)) => Value::Bool(flag),
            FeatureValue::Scalar(Scalar::Number(number)) => Value::Number(number),
            FeatureValue::Scalar(Scalar::Text(text)) => Value::String(text),
            FeatureValue::Nested(map) => map.into(),
        }
    }
}

/// An ordered mapping from feature name to [`FeatureValue`].
///
/// Keeps the order in which names appear in the source document, which is
/// the order comparison rows are emitted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct FeatureMap(Vec<(String, FeatureValue)>);

impl FeatureMap {
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Objects keep their keys, arrays are keyed by index, anything else is empty.
impl From<Value> for FeatureMap {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(object) => FeatureMap(
                object
                    .into_iter()
                    .map(|(key, value)| (key, FeatureValue::from(value)))
                    .collect(),
            ),
            Value::Array(items) => FeatureMap(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, value)| (index.to_string(), FeatureValue::from(value)))
                    .collect(),
            ),
            _ => FeatureMap::default(),
        }
    }
}

impl From<FeatureMap> for Value {
    fn from(map: FeatureMap) -> Self {
        Value::Object(
            map.0
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect::<Map<String, Value>>(),
        )
    }
}

/// Truthiness of a raw JSON value, matching [`FeatureValue::is_truthy`].
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Array(_) | Value::Object(_) => true,
        scalar => FeatureValue::from(scalar.clone()).is_truthy(),
    }
}
