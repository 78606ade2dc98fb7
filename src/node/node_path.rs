use derive_more::Display;
use thiserror::Error;

use crate::storage::StorePrefix;

use super::NodeName;

/// A collection hierarchy node path.
///
/// Paths are absolute, e.g. `/`, `/Y` or `/group/array`.
/// See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#path>
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`()].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// Create a node path from a user supplied name, prepending `/` if it is missing.
    ///
    /// Attribute keys and option values are commonly written without the leading `/` (e.g. `base_sample_id`).
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError`] if the resulting path is not valid.
    pub fn from_name_or_path(path: &str) -> Result<Self, NodePathError> {
        if path.starts_with('/') {
            Self::new(path)
        } else {
            Self::new(&format!("/{path}"))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extracts a string slice containing the node path `String`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Indicates if the path is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the node names along the path, excluding the root.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|name| !name.is_empty())
    }

    /// Returns the name of the node at this path (empty for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        self.components().last().unwrap_or_default()
    }

    /// Returns the parent path, or [`None`] for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(index) => Some(Self(self.0[..index].to_string())),
        }
    }

    /// Returns the path of the child `name` below this path.
    #[must_use]
    pub fn join(&self, name: &NodeName) -> Self {
        if self.is_root() {
            Self(format!("/{}", name.as_str()))
        } else {
            Self(format!("{}/{}", self.0, name.as_str()))
        }
    }

    /// Validates a path according to the following rules from the specification:
    /// - A path always starts with `/`, and
    /// - a non-root path cannot end with `/`, because node names must be non-empty and cannot contain `/`.
    ///
    /// Additionally, it checks that there are no empty nodes (i.e. a `//` substring).
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path.eq("/") || (path.starts_with('/') && !path.ends_with('/') && !path.contains("//"))
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl TryFrom<&StorePrefix> for NodePath {
    type Error = NodePathError;

    fn try_from(prefix: &StorePrefix) -> Result<Self, Self::Error> {
        let prefix = prefix.as_str();
        let path = "/".to_string() + prefix.strip_suffix('/').unwrap_or(prefix);
        Self::new(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert_eq!(NodePath::new("/a/b").unwrap().to_string(), "/a/b");
        assert!(NodePath::new("/a/b/").is_err());
        assert_eq!(
            NodePath::new("/a/b/").unwrap_err().to_string(),
            "invalid node path /a/b/"
        );
        assert!(NodePath::new("/a//b").is_err());
        assert!(NodePath::new("a").is_err());
    }

    #[test]
    fn node_path_from_name() {
        assert_eq!(
            NodePath::from_name_or_path("base_sample_id").unwrap().as_str(),
            "/base_sample_id"
        );
        assert_eq!(NodePath::from_name_or_path("/Y").unwrap().as_str(), "/Y");
        assert!(NodePath::from_name_or_path("a/").is_err());
    }

    #[test]
    fn node_path_parent_join() {
        let path = NodePath::new("/a/b").unwrap();
        assert_eq!(path.parent(), Some(NodePath::new("/a").unwrap()));
        assert_eq!(
            NodePath::new("/a").unwrap().parent(),
            Some(NodePath::root())
        );
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(path.name(), "b");
        assert_eq!(
            NodePath::root().join(&NodeName::new("x").unwrap()).as_str(),
            "/x"
        );
        assert_eq!(
            path.join(&NodeName::new("c").unwrap()).as_str(),
            "/a/b/c"
        );
        assert_eq!(path.components().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn node_path_from_prefix() {
        let prefix = StorePrefix::new("a/b/").unwrap();
        assert_eq!(NodePath::try_from(&prefix).unwrap().as_str(), "/a/b");
        assert!(NodePath::try_from(&StorePrefix::root()).unwrap().is_root());
    }
}
