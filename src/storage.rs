//! Collection storage.
//!
//! A [store] holds the keys and values of a collection: one `zarr.json` metadata document per node and one chunk per array.
//! This module defines the abstract store interfaces and the functions mapping node paths to store keys.

mod storage_sync;
pub mod store;
mod store_key;
mod store_prefix;

use thiserror::Error;

use crate::{metadata::ChunkKeySeparator, node::NodePath, node::NodePathError};

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub use self::storage_sync::{ListableStorageTraits, ReadableStorageTraits, WritableStorageTraits};

/// The type for bytes used in store set and get methods.
pub type Bytes = bytes::Bytes;

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is [`None`] if the key is not available.
pub type MaybeBytes = Option<Bytes>;

/// [`StoreKeys`] and [`StorePrefixes`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the keys.
    #[must_use]
    pub const fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub const fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error parsing the metadata for a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// An invalid node path.
    #[error("invalid node path {0}")]
    NodePathError(#[from] NodePathError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Return the metadata key (`zarr.json`) given a node path.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    let path = path.as_str();
    let key = match path.strip_prefix('/').unwrap_or(path) {
        "" => "zarr.json".to_string(),
        path => format!("{path}/zarr.json"),
    };
    StoreKey::new_unchecked(key)
}

/// Return the key of the chunk at `chunk_grid_indices` for the array at `path`.
///
/// Uses the `default` chunk key encoding, e.g. `c/0/0` with a `/` separator or `c.0.0` with a `.` separator.
#[must_use]
pub fn data_key(
    path: &NodePath,
    chunk_grid_indices: &[u64],
    separator: ChunkKeySeparator,
) -> StoreKey {
    let mut chunk_key = "c".to_string();
    for index in chunk_grid_indices {
        chunk_key.push(separator.as_char());
        chunk_key.push_str(&index.to_string());
    }
    let path = path.as_str();
    let key = match path.strip_prefix('/').unwrap_or(path) {
        "" => chunk_key,
        path => format!("{path}/{chunk_key}"),
    };
    StoreKey::new_unchecked(key)
}
