//! Collections.
//!
//! A [`Collection`] is a hierarchy of named arrays with scalar attributes on its root group.
//! Collections are read into memory from a store, manipulated, and written back.
//!
//! Besides reading and writing, this module provides the tools used to inspect and edit single collections:
//!  - [`Collection::array_infos`] and [`CollectionInfo`] summarise the contents of a collection,
//!  - [`Collection::approximate_dims`] estimates the table dimensions of a collection,
//!  - [`Collection::validate_update`] and [`Collection::update_element`] edit single elements,
//!  - [`Collection::add_column`] adds an empty column, and
//!  - [`Collection::update_attributes`] and [`Collection::create_empty`] manage root attributes.

mod collection_info;

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

pub use collection_info::{ArrayInfo, CollectionInfo};
use thiserror::Error;

use crate::{
    array::{Array, ArrayData, ArrayElementError, DataType},
    attributes::{AttributeSet, AttributeValue},
    node::{Group, Node, NodeError, NodeName, NodeNameError, NodePath},
    storage::{
        meta_key,
        store::{FilesystemStore, FilesystemStoreCreateError},
        ListableStorageTraits, ReadableStorageTraits, StorageError, StorePrefix,
        WritableStorageTraits,
    },
};

/// A collection error.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A node error.
    #[error(transparent)]
    NodeError(#[from] NodeError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A filesystem store could not be created.
    #[error(transparent)]
    FilesystemStoreCreateError(#[from] FilesystemStoreCreateError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid node name.
    #[error(transparent)]
    NodeNameError(#[from] NodeNameError),
    /// There is no collection at the location.
    #[error("no collection at {0}")]
    NotACollection(String),
    /// There is no array at the path.
    #[error("array not found at {0}")]
    ArrayNotFound(NodePath),
    /// A node already exists at the path.
    #[error("a node already exists at {0}")]
    NodeExists(NodePath),
    /// The array is not a row or column vector.
    #[error("array {0} with shape {1:?} is not a vector")]
    NotAVector(NodePath, Vec<usize>),
    /// The value cannot be converted to the array data type.
    #[error("value {0} cannot be converted to {1}")]
    InvalidValue(AttributeValue, DataType),
    /// Invalid element access.
    #[error(transparent)]
    ArrayElementError(#[from] ArrayElementError),
}

/// An in-memory collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    root: Group,
    location: Option<PathBuf>,
}

impl From<Group> for Collection {
    fn from(root: Group) -> Self {
        Self::new(root)
    }
}

impl Collection {
    /// Create a collection with `root`, without a location.
    #[must_use]
    pub fn new(root: Group) -> Self {
        Self {
            root,
            location: None,
        }
    }

    /// Create an empty collection with root `attributes`.
    #[must_use]
    pub fn with_attributes(attributes: &AttributeSet) -> Self {
        Self::new(Group::new(attributes.to_json_map()))
    }

    /// Set the location of the collection.
    ///
    /// The base name of the location identifies the collection when it is merged.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Read a collection from `storage`.
    ///
    /// # Errors
    /// Returns [`CollectionError::NotACollection`] if the store has no root group metadata, or a [`CollectionError`] if the collection cannot be read.
    pub fn open<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits>(
        storage: &TStorage,
    ) -> Result<Self, CollectionError> {
        let root_path = NodePath::root();
        if storage.get(&meta_key(&root_path))?.is_none() {
            return Err(CollectionError::NotACollection("store root".to_string()));
        }
        match Node::open(storage, &root_path)? {
            Node::Group(root) => {
                let (_, skipped) = AttributeSet::from_json_map(root.attributes());
                if !skipped.is_empty() {
                    log::warn!("skipping non-scalar root attributes {skipped:?}");
                }
                Ok(Self::new(root))
            }
            Node::Array(_) => Err(CollectionError::NotACollection(
                "store root is an array".to_string(),
            )),
        }
    }

    /// Read the collection stored in the directory `location`.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if `location` does not hold a collection or it cannot be read.
    pub fn open_path(location: impl AsRef<Path>) -> Result<Self, CollectionError> {
        let location = location.as_ref();
        if !location.is_dir() {
            return Err(CollectionError::NotACollection(
                location.display().to_string(),
            ));
        }
        let store = FilesystemStore::new(location)?.sorted();
        let collection = Self::open(&store).map_err(|err| match err {
            CollectionError::NotACollection(_) => {
                CollectionError::NotACollection(location.display().to_string())
            }
            err => err,
        })?;
        log::debug!("opened collection {}", location.display());
        Ok(collection.with_location(location))
    }

    /// Write the collection to `storage`, replacing any existing contents.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if there is an underlying store error.
    pub fn store<TStorage: ?Sized + WritableStorageTraits>(
        &self,
        storage: &TStorage,
    ) -> Result<(), CollectionError> {
        storage.erase_prefix(&StorePrefix::root())?;
        Node::Group(self.root.clone()).store(storage, &NodePath::root())?;
        Ok(())
    }

    /// Write the collection to the directory `location`, replacing any existing contents.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if the collection cannot be written.
    pub fn write_path(&self, location: impl AsRef<Path>) -> Result<(), CollectionError> {
        let store = FilesystemStore::new(location.as_ref())?;
        self.store(&store)
    }

    /// Write the collection back to its location.
    ///
    /// # Errors
    /// Returns [`CollectionError::NotACollection`] if the collection has no location, or a [`CollectionError`] if it cannot be written.
    pub fn save(&self) -> Result<(), CollectionError> {
        let location = self
            .location
            .as_ref()
            .ok_or_else(|| CollectionError::NotACollection("collection without location".into()))?;
        self.write_path(location)
    }

    /// Returns the location the collection was opened from, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Returns the base name of the location without its extension, if any.
    #[must_use]
    pub fn file_stem(&self) -> Option<&str> {
        self.location
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(std::ffi::OsStr::to_str)
    }

    /// Returns the root group.
    #[must_use]
    pub const fn root(&self) -> &Group {
        &self.root
    }

    /// Returns the scalar root attributes.
    #[must_use]
    pub fn attributes(&self) -> AttributeSet {
        AttributeSet::from_json_map(self.root.attributes()).0
    }

    /// Returns the raw root attributes, including non-scalar values.
    #[must_use]
    pub const fn raw_attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        self.root.attributes()
    }

    /// Replace the raw root attributes.
    pub fn set_raw_attributes(&mut self, attributes: serde_json::Map<String, serde_json::Value>) {
        self.root.set_attributes(attributes);
    }

    /// Returns the array at `path`.
    #[must_use]
    pub fn array(&self, path: &NodePath) -> Option<&Array> {
        match self.root.get(path)? {
            Node::Array(array) => Some(array),
            Node::Group(_) => None,
        }
    }

    /// Returns a mutable reference to the array at `path`.
    pub fn array_mut(&mut self, path: &NodePath) -> Option<&mut Array> {
        match self.root.get_mut(path)? {
            Node::Array(array) => Some(array),
            Node::Group(_) => None,
        }
    }

    /// Returns true if there is a node at `path`.
    #[must_use]
    pub fn contains(&self, path: &NodePath) -> bool {
        self.root.get(path).is_some()
    }

    /// Insert `array` at `path`, creating intermediate groups and replacing any existing node.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if `path` is the root or passes through an array.
    pub fn insert_array(&mut self, path: &NodePath, array: Array) -> Result<(), CollectionError> {
        self.root.insert_at(path, Node::Array(array))?;
        Ok(())
    }

    /// Returns the paths of all arrays in the collection.
    ///
    /// Groups are traversed but never included.
    #[must_use]
    pub fn array_paths(&self) -> BTreeSet<NodePath> {
        let mut paths = BTreeSet::new();
        self.root.visit_arrays(|path, _| {
            paths.insert(path);
        });
        paths
    }

    /// Returns a description of every array in the collection.
    #[must_use]
    pub fn array_infos(&self) -> Vec<ArrayInfo> {
        let mut infos = Vec::new();
        self.root
            .visit_arrays(|path, array| infos.push(ArrayInfo::new(&path, array)));
        infos
    }

    /// Returns `(rows, cols)`, the largest row and column counts of the arrays at the root of the collection.
    ///
    /// A 1-D array has a single column. Returns `(0, 0)` if there are no arrays at the root.
    #[must_use]
    pub fn approximate_dims(&self) -> (usize, usize) {
        self.root
            .children()
            .filter_map(|(_, node)| match node {
                Node::Array(array) => Some(array_dims(array.shape())),
                Node::Group(_) => None,
            })
            .reduce(|(rows, cols), (r, c)| (rows.max(r), cols.max(c)))
            .unwrap_or((0, 0))
    }

    /// Check that `value` can be written to element `(i, j)` of the array at `path`.
    ///
    /// `j` is ignored for 1-D arrays. Returns the current value of the element.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if there is no array at `path`, `value` cannot be converted to its data type, or the index is out of range.
    pub fn validate_update(
        &self,
        path: &NodePath,
        i: usize,
        j: usize,
        value: &AttributeValue,
    ) -> Result<AttributeValue, CollectionError> {
        let array = self
            .array(path)
            .ok_or_else(|| CollectionError::ArrayNotFound(path.clone()))?;
        value
            .cast(array.data_type())
            .ok_or_else(|| CollectionError::InvalidValue(value.clone(), array.data_type()))?;
        Ok(array.element(&element_index(array.shape(), i, j))?)
    }

    /// Set element `(i, j)` of the array at `path` to `value`.
    ///
    /// `j` is ignored for 1-D arrays.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] under the conditions of [`Collection::validate_update`].
    pub fn update_element(
        &mut self,
        path: &NodePath,
        i: usize,
        j: usize,
        value: &AttributeValue,
    ) -> Result<(), CollectionError> {
        self.validate_update(path, i, j, value)?;
        let array = self
            .array_mut(path)
            .ok_or_else(|| CollectionError::ArrayNotFound(path.clone()))?;
        let data_type = array.data_type();
        let value = value
            .cast(data_type)
            .ok_or_else(|| CollectionError::InvalidValue(value.clone(), data_type))?;
        let index = element_index(array.shape(), i, j);
        array.data_mut().set_element(&index, &value)?;
        Ok(())
    }

    /// Add an empty column array `name` at the root with one element per row.
    ///
    /// The row count is taken from [`Collection::approximate_dims`], and elements hold the default fill value of `data_type`.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if `name` is not a valid node name or a node named `name` already exists.
    pub fn add_column(&mut self, name: &str, data_type: DataType) -> Result<(), CollectionError> {
        let name = NodeName::new(name)?;
        let path = NodePath::root().join(&name);
        if self.contains(&path) {
            return Err(CollectionError::NodeExists(path));
        }
        let (rows, _) = self.approximate_dims();
        let fill_value = match data_type {
            DataType::Int64 => AttributeValue::Integer(0),
            DataType::Float64 => AttributeValue::Float(0.0),
            DataType::String => AttributeValue::String(String::new()),
        };
        let data = ArrayData::new_filled(data_type, &[rows, 1], &fill_value)?;
        self.root.insert(name, Node::Array(Array::new(data)));
        Ok(())
    }

    /// Update the root attributes with `attributes`, replacing existing keys.
    pub fn update_attributes(&mut self, attributes: &serde_json::Map<String, serde_json::Value>) {
        let mut updated = self.root.attributes().clone();
        updated.extend(attributes.iter().map(|(key, value)| (key.clone(), value.clone())));
        self.root.set_attributes(updated);
    }

    /// Create an empty collection with root `attributes` in the directory `location`, and return its info.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if the collection cannot be written.
    pub fn create_empty(
        location: impl AsRef<Path>,
        attributes: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<CollectionInfo, CollectionError> {
        let location = location.as_ref();
        let collection = Self::new(Group::new(attributes.clone())).with_location(location);
        collection.write_path(location)?;
        CollectionInfo::new(&collection)
    }

    /// Returns the array at `path`, flattened to 1-D if it is a row or column vector.
    ///
    /// # Errors
    /// Returns a [`CollectionError`] if there is no array at `path` or it is not a vector.
    pub fn vector(&self, path: &NodePath) -> Result<ArrayData, CollectionError> {
        let array = self
            .array(path)
            .ok_or_else(|| CollectionError::ArrayNotFound(path.clone()))?;
        if array.data().is_vector() {
            Ok(array.data().flattened())
        } else {
            Err(CollectionError::NotAVector(
                path.clone(),
                array.shape().to_vec(),
            ))
        }
    }
}

/// Returns `(rows, cols)` of an array with `shape`.
fn array_dims(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (0, 0),
        [rows] => (*rows, 1),
        [rows, cols, ..] => (*rows, *cols),
    }
}

fn element_index(shape: &[usize], i: usize, j: usize) -> Vec<usize> {
    if shape.len() == 1 {
        vec![i]
    } else {
        vec![i, j]
    }
}
