//! Collection node metadata.
//!
//! Collections are stored as a subset of the Zarr V3 hierarchy format.
//! Every node has a `zarr.json` document, which is either [`GroupMetadata`] or [`ArrayMetadata`].
//!
//! The [`Metadata`] structure represents the extension points of array metadata (chunk grid, chunk key encoding, codecs), which are structured as JSON with a name and optional configuration, or just a string representing the name.

use serde::{ser::SerializeMap, Deserialize, Serialize};
use thiserror::Error;

use crate::array::{ArrayShape, DataType};

/// The configuration of a [`Metadata`] entry.
pub type MetadataConfiguration = serde_json::Map<String, serde_json::Value>;

/// Metadata with a name and optional configuration.
///
/// Can be deserialised from a JSON string or name/configuration map.
/// For example:
/// ```json
/// "bytes"
/// ```
/// or
/// ```json
/// {
///     "name": "bytes",
///     "configuration": {
///       "endian": "little"
///     }
/// }
/// ```
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Metadata {
    name: String,
    configuration: Option<MetadataConfiguration>,
}

impl core::fmt::Display for Metadata {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(configuration) = &self.configuration {
            write!(f, "{} {:?}", self.name, configuration)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl serde::Serialize for Metadata {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if let Some(configuration) = &self.configuration {
            let mut s = s.serialize_map(Some(2))?;
            s.serialize_entry("name", &self.name)?;
            s.serialize_entry("configuration", configuration)?;
            s.end()
        } else {
            let mut s = s.serialize_map(Some(1))?;
            s.serialize_entry("name", &self.name)?;
            s.end()
        }
    }
}

impl<'de> serde::Deserialize<'de> for Metadata {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct MetadataNameConfiguration {
            name: String,
            #[serde(default)]
            configuration: Option<MetadataConfiguration>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MetadataIntermediate {
            Name(String),
            NameConfiguration(MetadataNameConfiguration),
        }

        let metadata = MetadataIntermediate::deserialize(d)?;
        match metadata {
            MetadataIntermediate::Name(name) => Ok(Self {
                name,
                configuration: None,
            }),
            MetadataIntermediate::NameConfiguration(metadata) => Ok(Self {
                name: metadata.name,
                configuration: metadata.configuration,
            }),
        }
    }
}

impl Metadata {
    /// Create metadata from `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            configuration: None,
        }
    }

    /// Create metadata from `name` and `configuration`.
    #[must_use]
    pub fn new_with_configuration(name: &str, configuration: MetadataConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration: Some(configuration),
        }
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration, if any.
    #[must_use]
    pub const fn configuration(&self) -> Option<&MetadataConfiguration> {
        self.configuration.as_ref()
    }

    /// Returns a configuration value by `key`, if present.
    #[must_use]
    pub fn configuration_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.configuration.as_ref().and_then(|c| c.get(key))
    }
}

/// Invalid or unsupported node metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Invalid zarr format.
    #[error("invalid zarr format {0}, expected 3")]
    InvalidZarrFormat(u64),
    /// Invalid node type.
    #[error("invalid node type {0}, expected {1}")]
    InvalidNodeType(String, &'static str),
    /// An unsupported extension point (chunk grid, chunk key encoding, codec).
    #[error("unsupported {0} {1}")]
    Unsupported(&'static str, String),
    /// The chunk grid splits the array into more than one chunk.
    #[error("chunk shape {chunk_shape:?} does not cover array shape {shape:?}")]
    MultipleChunks {
        /// The array shape.
        shape: ArrayShape,
        /// The chunk shape.
        chunk_shape: ArrayShape,
    },
    /// An invalid fill value for the data type.
    #[error("invalid fill value {0} for data type {1}")]
    InvalidFillValue(serde_json::Value, DataType),
}

/// The chunk key separator of the `default` chunk key encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkKeySeparator {
    /// `/`
    Slash,
    /// `.`
    Dot,
}

impl ChunkKeySeparator {
    /// The separator as a character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Slash => '/',
            Self::Dot => '.',
        }
    }
}

/// Byte order of the `bytes` codec.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Little endian.
    Little,
    /// Big endian.
    Big,
}

/// The array to bytes codec of an array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkCodec {
    /// The `bytes` codec, for fixed size data types.
    Bytes(Endianness),
    /// The `vlen-utf8` codec, for the `string` data type.
    VlenUtf8,
}

/// Collection array metadata.
///
/// A subset of Zarr V3 array metadata where the whole array is held in a single chunk.
/// An example `JSON` document:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "array",
///     "shape": [3, 2],
///     "data_type": "float64",
///     "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [3, 2]}},
///     "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
///     "fill_value": 0.0,
///     "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}],
///     "attributes": {"units": "cm^-1"}
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadata {
    /// Must be `3`.
    pub zarr_format: u64,
    /// Must be `array`.
    pub node_type: String,
    /// The array shape.
    pub shape: ArrayShape,
    /// The data type.
    pub data_type: DataType,
    /// The chunk grid.
    pub chunk_grid: Metadata,
    /// The chunk key encoding.
    pub chunk_key_encoding: Metadata,
    /// The fill value.
    pub fill_value: serde_json::Value,
    /// The codec chain.
    pub codecs: Vec<Metadata>,
    /// Optional user defined attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// An optional list of dimension names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_names: Option<Vec<Option<String>>>,
}

impl ArrayMetadata {
    /// Create metadata for an array with `shape` and `data_type` stored in a single chunk.
    #[must_use]
    pub fn new(shape: ArrayShape, data_type: DataType) -> Self {
        let chunk_shape: ArrayShape = shape.iter().map(|&size| size.max(1)).collect();
        let mut chunk_grid = MetadataConfiguration::new();
        chunk_grid.insert("chunk_shape".to_string(), chunk_shape.into());
        let mut chunk_key_encoding = MetadataConfiguration::new();
        chunk_key_encoding.insert("separator".to_string(), "/".into());
        let codec = match data_type {
            DataType::Int64 | DataType::Float64 => {
                let mut configuration = MetadataConfiguration::new();
                configuration.insert("endian".to_string(), "little".into());
                Metadata::new_with_configuration("bytes", configuration)
            }
            DataType::String => Metadata::new("vlen-utf8"),
        };
        Self {
            zarr_format: 3,
            node_type: "array".to_string(),
            shape,
            fill_value: data_type.default_fill_value(),
            data_type,
            chunk_grid: Metadata::new_with_configuration("regular", chunk_grid),
            chunk_key_encoding: Metadata::new_with_configuration("default", chunk_key_encoding),
            codecs: vec![codec],
            attributes: serde_json::Map::default(),
            dimension_names: None,
        }
    }

    /// Validate the format and node type, and check the array is stored as a single chunk.
    ///
    /// # Errors
    /// Returns [`MetadataError`] if the metadata is invalid or uses unsupported features.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.zarr_format != 3 {
            return Err(MetadataError::InvalidZarrFormat(self.zarr_format));
        }
        if self.node_type != "array" {
            return Err(MetadataError::InvalidNodeType(
                self.node_type.clone(),
                "array",
            ));
        }
        self.chunk_shape()?;
        self.chunk_key_separator()?;
        self.chunk_codec()?;
        Ok(())
    }

    /// Returns the chunk shape of the `regular` chunk grid.
    ///
    /// # Errors
    /// Returns [`MetadataError`] if the chunk grid is unsupported or it does not cover the array with a single chunk.
    pub fn chunk_shape(&self) -> Result<ArrayShape, MetadataError> {
        if self.chunk_grid.name() != "regular" {
            return Err(MetadataError::Unsupported(
                "chunk grid",
                self.chunk_grid.to_string(),
            ));
        }
        let chunk_shape: ArrayShape = self
            .chunk_grid
            .configuration_value("chunk_shape")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .ok_or_else(|| {
                MetadataError::Unsupported("chunk grid", self.chunk_grid.to_string())
            })?;
        let single_chunk = chunk_shape.len() == self.shape.len()
            && std::iter::zip(&chunk_shape, &self.shape).all(|(chunk, size)| chunk >= size);
        if single_chunk {
            Ok(chunk_shape)
        } else {
            Err(MetadataError::MultipleChunks {
                shape: self.shape.clone(),
                chunk_shape,
            })
        }
    }

    /// Returns the separator of the `default` chunk key encoding.
    ///
    /// # Errors
    /// Returns [`MetadataError`] if the chunk key encoding is unsupported.
    pub fn chunk_key_separator(&self) -> Result<ChunkKeySeparator, MetadataError> {
        let unsupported =
            || MetadataError::Unsupported("chunk key encoding", self.chunk_key_encoding.to_string());
        if self.chunk_key_encoding.name() != "default" {
            return Err(unsupported());
        }
        match self
            .chunk_key_encoding
            .configuration_value("separator")
            .and_then(serde_json::Value::as_str)
        {
            None | Some("/") => Ok(ChunkKeySeparator::Slash),
            Some(".") => Ok(ChunkKeySeparator::Dot),
            Some(_) => Err(unsupported()),
        }
    }

    /// Returns the array to bytes codec.
    ///
    /// Only a single array to bytes codec is supported, and it must suit the data type.
    ///
    /// # Errors
    /// Returns [`MetadataError`] if the codec chain is unsupported.
    pub fn chunk_codec(&self) -> Result<ChunkCodec, MetadataError> {
        let [codec] = self.codecs.as_slice() else {
            return Err(MetadataError::Unsupported(
                "codec chain",
                self.codecs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
            ));
        };
        match (codec.name(), self.data_type) {
            ("bytes", DataType::Int64 | DataType::Float64) => {
                match codec.configuration_value("endian").and_then(serde_json::Value::as_str) {
                    None | Some("little") => Ok(ChunkCodec::Bytes(Endianness::Little)),
                    Some("big") => Ok(ChunkCodec::Bytes(Endianness::Big)),
                    Some(_) => Err(MetadataError::Unsupported("codec", codec.to_string())),
                }
            }
            ("vlen-utf8", DataType::String) => Ok(ChunkCodec::VlenUtf8),
            _ => Err(MetadataError::Unsupported("codec", codec.to_string())),
        }
    }
}

/// Collection group metadata.
///
/// An example `JSON` document:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "group",
///     "attributes": {
///         "name": "sample 12",
///         "base_sample_id": 12
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct GroupMetadata {
    /// Must be `3`.
    pub zarr_format: u64,
    /// Must be `group`.
    pub node_type: String,
    /// Optional user metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Default for GroupMetadata {
    fn default() -> Self {
        Self::new(serde_json::Map::default())
    }
}

impl GroupMetadata {
    /// Create group metadata with `attributes`.
    #[must_use]
    pub fn new(attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            zarr_format: 3,
            node_type: "group".to_string(),
            attributes,
        }
    }

    /// Validate the format and node type.
    ///
    /// # Errors
    /// Returns [`MetadataError`] if the metadata is invalid.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.zarr_format != 3 {
            Err(MetadataError::InvalidZarrFormat(self.zarr_format))
        } else if self.node_type != "group" {
            Err(MetadataError::InvalidNodeType(
                self.node_type.clone(),
                "group",
            ))
        } else {
            Ok(())
        }
    }
}
