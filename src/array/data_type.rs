//! Collection data types.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#data-types>.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A data type.
///
/// Collections hold signed 64-bit integers, 64-bit floats and variable-length UTF-8 strings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    #[display("int64")]
    Int64,
    /// `float64` IEEE 754 double-precision floating point.
    #[display("float64")]
    Float64,
    /// `string` A variable-length UTF-8 encoded string.
    #[display("string")]
    String,
}

impl DataType {
    /// Returns the size in bytes of a fixed-size data type, or [`None`] if the data type has a variable size.
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Int64 | Self::Float64 => Some(8),
            Self::String => None,
        }
    }

    /// Returns true if the data type is numeric.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// The fill value written to new array metadata.
    #[must_use]
    pub fn default_fill_value(&self) -> serde_json::Value {
        match self {
            Self::Int64 => 0.into(),
            Self::Float64 => 0.0.into(),
            Self::String => "".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_serde() {
        assert_eq!(serde_json::to_string(&DataType::Int64).unwrap(), r#""int64""#);
        assert_eq!(
            serde_json::from_str::<DataType>(r#""float64""#).unwrap(),
            DataType::Float64
        );
        assert_eq!(
            serde_json::from_str::<DataType>(r#""string""#).unwrap(),
            DataType::String
        );
        assert!(serde_json::from_str::<DataType>(r#""uint8""#).is_err());
        assert_eq!(DataType::Float64.to_string(), "float64");
    }
}
