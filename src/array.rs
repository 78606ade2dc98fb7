//! Collection arrays.
//!
//! An array is a node in a collection hierarchy holding numeric or string elements and optional attributes.
//! Arrays are stored as Zarr V3 arrays with a single chunk, see [`ArrayMetadata`].
//!
//! [`Array::open`] reads an array from a store, and [`Array::store`] writes one.
//! A missing chunk decodes to the fill value.

mod array_data;
pub mod codec;
pub mod data_type;

pub use self::{
    array_data::{ArrayData, ArrayElementError, ArrayShapeError},
    codec::ChunkCodecError,
    data_type::DataType,
};

use thiserror::Error;

use crate::{
    attributes::AttributeValue,
    metadata::{ArrayMetadata, MetadataError},
    node::{NodeMetadata, NodePath},
    storage::{
        data_key, meta_key, Bytes, ReadableStorageTraits, StorageError, WritableStorageTraits,
    },
};

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// An array error.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Invalid or unsupported metadata.
    #[error(transparent)]
    MetadataError(#[from] MetadataError),
    /// A chunk encoding or decoding error.
    #[error("chunk of array {0}: {1}")]
    ChunkCodecError(NodePath, ChunkCodecError),
    /// There is no array at the path.
    #[error("array not found at {0}")]
    NotFound(NodePath),
    /// The array shape does not fit in memory.
    #[error("array shape {0:?} is too large")]
    ShapeTooLarge(ArrayShape),
}

/// A collection array.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    data: ArrayData,
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl From<ArrayData> for Array {
    fn from(data: ArrayData) -> Self {
        Self::new(data)
    }
}

impl Array {
    /// Create an array holding `data` with no attributes.
    #[must_use]
    pub fn new(data: ArrayData) -> Self {
        Self {
            data,
            attributes: serde_json::Map::default(),
        }
    }

    /// Set the array attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Returns the array data.
    #[must_use]
    pub const fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Returns a mutable reference to the array data.
    pub fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.data
    }

    /// Consume the array and return its data.
    #[must_use]
    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Returns the array attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Returns the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Returns the shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Replace the data, keeping the attributes.
    #[must_use]
    pub fn map_data(self, f: impl FnOnce(ArrayData) -> ArrayData) -> Self {
        Self {
            data: f(self.data),
            attributes: self.attributes,
        }
    }

    /// Create the metadata describing this array.
    #[must_use]
    pub fn metadata(&self) -> ArrayMetadata {
        let shape = self.shape().iter().map(|&size| size as u64).collect();
        let mut metadata = ArrayMetadata::new(shape, self.data_type());
        metadata.attributes.clone_from(&self.attributes);
        metadata
    }

    /// Read the array at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if there is no array at `path`, the metadata is invalid, or the chunk cannot be decoded.
    pub fn open<TStorage: ?Sized + ReadableStorageTraits>(
        storage: &TStorage,
        path: &NodePath,
    ) -> Result<Self, ArrayError> {
        let key = meta_key(path);
        let metadata = storage
            .get(&key)?
            .ok_or_else(|| ArrayError::NotFound(path.clone()))?;
        let metadata: NodeMetadata = serde_json::from_slice(&metadata)
            .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?;
        match metadata {
            NodeMetadata::Array(metadata) => Self::open_with_metadata(storage, path, metadata),
            NodeMetadata::Group(_) => Err(ArrayError::NotFound(path.clone())),
        }
    }

    /// Read the array at `path` with existing `metadata`.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if the metadata is invalid or the chunk cannot be decoded.
    pub fn open_with_metadata<TStorage: ?Sized + ReadableStorageTraits>(
        storage: &TStorage,
        path: &NodePath,
        metadata: ArrayMetadata,
    ) -> Result<Self, ArrayError> {
        metadata.validate()?;
        let shape = metadata
            .shape
            .iter()
            .map(|&size| usize::try_from(size))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ArrayError::ShapeTooLarge(metadata.shape.clone()))?;
        let codec = metadata.chunk_codec()?;
        let chunk_indices = vec![0; shape.len()];
        let key = data_key(path, &chunk_indices, metadata.chunk_key_separator()?);
        let data = if let Some(bytes) = storage.get(&key)? {
            codec::decode_chunk(&bytes, codec, metadata.data_type, &shape)
                .map_err(|err| ArrayError::ChunkCodecError(path.clone(), err))?
        } else {
            let fill_value = codec::fill_value_from_json(&metadata.fill_value, metadata.data_type)
                .ok_or_else(|| {
                    MetadataError::InvalidFillValue(metadata.fill_value.clone(), metadata.data_type)
                })?;
            ArrayData::new_filled(metadata.data_type, &shape, &fill_value).map_err(|_| {
                MetadataError::InvalidFillValue(metadata.fill_value.clone(), metadata.data_type)
            })?
        };
        Ok(Self {
            data,
            attributes: metadata.attributes,
        })
    }

    /// Write the array metadata and chunk at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayError`] if there is an underlying store error or the chunk cannot be encoded.
    pub fn store<TStorage: ?Sized + WritableStorageTraits>(
        &self,
        storage: &TStorage,
        path: &NodePath,
    ) -> Result<(), ArrayError> {
        let metadata = self.metadata();
        let codec = metadata.chunk_codec()?;
        let separator = metadata.chunk_key_separator()?;
        let json = serde_json::to_vec_pretty(&NodeMetadata::Array(metadata))
            .map_err(|err| StorageError::InvalidMetadata(meta_key(path), err.to_string()))?;
        storage.set(&meta_key(path), Bytes::from(json))?;
        let chunk = codec::encode_chunk(&self.data, codec)
            .map_err(|err| ArrayError::ChunkCodecError(path.clone(), err))?;
        let chunk_indices = vec![0; self.shape().len()];
        storage.set(&data_key(path, &chunk_indices, separator), Bytes::from(chunk))?;
        Ok(())
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    /// Returns [`ArrayElementError`] if `index` is out of bounds.
    pub fn element(&self, index: &[usize]) -> Result<AttributeValue, ArrayElementError> {
        self.data.element(index)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn array_store_open() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        let path = NodePath::new("/group/Y")?;
        let mut attributes = serde_json::Map::new();
        attributes.insert("units".to_string(), "cm^-1".into());
        let array = Array::new(ArrayData::from(array![[1.0, 2.0], [3.0, 4.0]]))
            .with_attributes(attributes);
        array.store(&store, &path)?;
        assert!(store.get(&"group/Y/c/0/0".try_into()?)?.is_some());
        let opened = Array::open(&store, &path)?;
        assert_eq!(opened, array);
        assert!(matches!(
            Array::open(&store, &NodePath::new("/group/X")?),
            Err(ArrayError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn array_missing_chunk_is_fill_value() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        let path = NodePath::new("/x")?;
        let mut metadata = ArrayMetadata::new(vec![2, 1], DataType::Float64);
        metadata.fill_value = "NaN".into();
        store.set(
            &meta_key(&path),
            Bytes::from(serde_json::to_vec(&metadata)?),
        )?;
        let array = Array::open(&store, &path)?;
        assert_eq!(array.shape(), &[2, 1]);
        assert!(array.data().to_f64_vec().unwrap().iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn array_string_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        let path = NodePath::new("/base_sample_name")?;
        let array = Array::new(ArrayData::from(array![
            ["sample a".to_string()],
            ["sample b".to_string()]
        ]));
        array.store(&store, &path)?;
        assert_eq!(Array::open(&store, &path)?, array);
        Ok(())
    }
}
