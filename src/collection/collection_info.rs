use std::time::UNIX_EPOCH;

use serde::Serialize;
use walkdir::WalkDir;

use crate::{array::Array, array::DataType, node::NodePath};

use super::{array_dims, Collection, CollectionError};

/// A description of an array in a collection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrayInfo {
    /// The array path.
    pub path: String,
    /// The number of rows.
    pub rows: usize,
    /// The number of columns, `1` for a 1-D array.
    pub cols: usize,
    /// The data type.
    pub dtype: DataType,
    /// The array attributes.
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ArrayInfo {
    /// Describe `array` at `path`.
    #[must_use]
    pub fn new(path: &NodePath, array: &Array) -> Self {
        let (rows, cols) = array_dims(array.shape());
        Self {
            path: path.to_string(),
            rows,
            cols,
            dtype: array.data_type(),
            attributes: array.attributes().clone(),
        }
    }
}

/// A summary of a collection.
///
/// Serializes to a flat JSON object of the root attributes alongside the summary fields, e.g.
/// ```json
/// {
///     "name": "sample 12",
///     "date_modified": 1700000000,
///     "max_row_count": 1,
///     "max_col_count": 1024,
///     "arrays": [{"path": "/Y", "rows": 1, "cols": 1024, "dtype": "float64", "attributes": {}}]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectionInfo {
    /// The root attributes.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// The most recent modification time of the collection location, in seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<u64>,
    /// The largest row count of the root arrays.
    pub max_row_count: usize,
    /// The largest column count of the root arrays.
    pub max_col_count: usize,
    /// The arrays in the collection.
    pub arrays: Vec<ArrayInfo>,
}

impl CollectionInfo {
    /// Summarise `collection`.
    ///
    /// The modification time is read from the collection location, if it has one.
    ///
    /// # Errors
    /// Returns [`CollectionError::IOError`] if the modification time of the location cannot be read.
    pub fn new(collection: &Collection) -> Result<Self, CollectionError> {
        let date_modified = match collection.location() {
            Some(location) => {
                let mut latest = None;
                for entry in WalkDir::new(location) {
                    let modified = entry
                        .map_err(std::io::Error::from)?
                        .metadata()
                        .map_err(std::io::Error::from)?
                        .modified()?;
                    latest = latest.max(Some(modified));
                }
                latest
                    .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                    .map(|duration| duration.as_secs())
            }
            None => None,
        };
        let (max_row_count, max_col_count) = collection.approximate_dims();
        Ok(Self {
            attributes: collection.raw_attributes().clone(),
            date_modified,
            max_row_count,
            max_col_count,
            arrays: collection.array_infos(),
        })
    }
}
