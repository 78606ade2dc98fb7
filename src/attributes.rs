//! Scalar attributes.
//!
//! Collection nodes carry user metadata as a JSON object in their `zarr.json` document.
//! Only scalar string and numeric attributes take part in merging, so they are represented with the immutable [`AttributeSet`].
//! Other JSON values (booleans, arrays, objects, null) are skipped with a warning when a collection is read.

use std::collections::BTreeMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::array::DataType;

/// A scalar attribute value.
///
/// Also used as an element value when reading or updating individual array elements.
#[derive(Clone, Debug, PartialEq, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl core::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value}"),
        }
    }
}

impl AttributeValue {
    /// Convert a JSON value to an attribute value.
    ///
    /// Returns [`None`] for non-scalar values and booleans.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(string) => Some(Self::String(string.clone())),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Float)),
            _ => None,
        }
    }

    /// Convert to a JSON value.
    ///
    /// Non-finite floats have no JSON number representation and are written as `"NaN"`, `"Infinity"` or `"-Infinity"`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(value) => (*value).into(),
            Self::Float(value) => serde_json::Number::from_f64(*value).map_or_else(
                || non_finite_string(*value).into(),
                serde_json::Value::Number,
            ),
            Self::String(value) => value.clone().into(),
        }
    }

    /// The data type an array of this value would have.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Integer(_) => DataType::Int64,
            Self::Float(_) => DataType::Float64,
            Self::String(_) => DataType::String,
        }
    }

    /// Returns the value as a float, if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::String(_) => None,
        }
    }

    /// Returns the value as an integer, if it is an integer or an integral float within range.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(value) => float_to_i64_exact(*value),
            Self::String(_) => None,
        }
    }

    /// Convert the value to `data_type`.
    ///
    /// Numeric strings parse to numbers and numbers format to strings.
    /// A float converts to an integer only if it is integral.
    /// Returns [`None`] if the value cannot be represented.
    #[must_use]
    pub fn cast(&self, data_type: DataType) -> Option<Self> {
        match (self, data_type) {
            (Self::String(value), DataType::Int64) => value.trim().parse().ok().map(Self::Integer),
            (Self::String(value), DataType::Float64) => value.trim().parse().ok().map(Self::Float),
            (value, DataType::Int64) => value.as_i64().map(Self::Integer),
            (value, DataType::Float64) => value.as_f64().map(Self::Float),
            (value, DataType::String) => Some(Self::String(value.to_string())),
        }
    }

    /// Returns the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Integer(_) | Self::Float(_) => None,
        }
    }
}

/// Convert a float to an integer if it is integral and in range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn float_to_i64_exact(value: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

pub(crate) fn non_finite_string(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// An immutable set of scalar attributes, keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<String, AttributeValue>);

impl AttributeSet {
    /// Create an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an attribute set from a JSON object, skipping non-scalar values.
    ///
    /// Returns the attribute set and the keys which were skipped.
    #[must_use]
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> (Self, Vec<String>) {
        let mut attributes = BTreeMap::new();
        let mut skipped = Vec::new();
        for (key, value) in map {
            if let Some(value) = AttributeValue::from_json(value) {
                attributes.insert(key.clone(), value);
            } else {
                skipped.push(key.clone());
            }
        }
        (Self(attributes), skipped)
    }

    /// Convert to a JSON object.
    #[must_use]
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }

    /// Return a new attribute set with `key` set to `value`.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let mut attributes = self.0.clone();
        attributes.insert(key.into(), value.into());
        Self(attributes)
    }

    /// Return a new attribute set with the entries of `other` added, replacing existing keys.
    #[must_use]
    pub fn merged_with(&self, other: &Self) -> Self {
        let mut attributes = self.0.clone();
        attributes.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(attributes)
    }

    /// Returns the value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the attribute keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_set_from_json() {
        let json: serde_json::Value = serde_json::json!({
            "name": "sample 1",
            "count": 4,
            "ratio": 0.5,
            "flag": true,
            "list": [1, 2],
        });
        let (attributes, skipped) = AttributeSet::from_json_map(json.as_object().unwrap());
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes.get("name"), Some(&"sample 1".into()));
        assert_eq!(attributes.get("count"), Some(&AttributeValue::Integer(4)));
        assert_eq!(attributes.get("ratio"), Some(&AttributeValue::Float(0.5)));
        assert_eq!(skipped, vec!["flag".to_string(), "list".to_string()]);
        assert_eq!(attributes.to_json_map()["count"], 4);
    }

    #[test]
    fn attribute_set_is_immutable() {
        let attributes = AttributeSet::from_iter([("a", 1i64)]);
        let updated = attributes.with("b", 2.5);
        assert_eq!(attributes.len(), 1);
        assert_eq!(updated.len(), 2);
        assert_eq!(
            updated.keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn attribute_value_conversions() {
        assert_eq!(AttributeValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(AttributeValue::Float(3.5).as_i64(), None);
        assert_eq!(AttributeValue::Integer(2).as_f64(), Some(2.0));
        assert_eq!(AttributeValue::from("x").as_f64(), None);
        assert_eq!(AttributeValue::Float(f64::NAN).to_json(), "NaN");
        assert_eq!(float_to_i64_exact(9.3e18), None);
        assert_eq!(
            AttributeValue::from(" 12 ").cast(DataType::Int64),
            Some(AttributeValue::Integer(12))
        );
        assert_eq!(
            AttributeValue::from("1e3").cast(DataType::Float64),
            Some(AttributeValue::Float(1000.0))
        );
        assert_eq!(AttributeValue::from("abc").cast(DataType::Float64), None);
        assert_eq!(AttributeValue::Float(2.5).cast(DataType::Int64), None);
        assert_eq!(
            AttributeValue::Integer(7).cast(DataType::String),
            Some(AttributeValue::from("7"))
        );
    }
}
