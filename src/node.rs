//! Collection hierarchy nodes.
//!
//! A node is either an [`Array`] or a [`Group`] of child nodes.
//! Each node has a `zarr.json` metadata document at its [`NodePath`], see [`meta_key`].
//!
//! A collection is read into memory as a tree of nodes with [`Node::open`] and written out with [`Node::store`].

mod node_metadata;
mod node_name;
mod node_path;

use std::collections::BTreeMap;

pub use node_metadata::NodeMetadata;
pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};
use thiserror::Error;

use crate::{
    array::{Array, ArrayError},
    metadata::{GroupMetadata, MetadataError},
    storage::{
        meta_key, Bytes, ListableStorageTraits, ReadableStorageTraits, StorageError, StorePrefix,
        WritableStorageTraits,
    },
};

/// A node error.
#[derive(Debug, Error)]
pub enum NodeError {
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// An invalid node name.
    #[error(transparent)]
    NodeNameError(#[from] NodeNameError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An array error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    /// Invalid node metadata.
    #[error(transparent)]
    MetadataError(#[from] MetadataError),
    /// There is no node at the path.
    #[error("node not found at {0}")]
    NotFound(NodePath),
    /// A node on the path is an array, so it cannot have children.
    #[error("node {0} is an array, not a group")]
    NotAGroup(NodePath),
}

/// A collection hierarchy node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// An array.
    Array(Array),
    /// A group.
    Group(Group),
}

/// A group of named child nodes with attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    attributes: serde_json::Map<String, serde_json::Value>,
    children: BTreeMap<NodeName, Node>,
}

impl From<Array> for Node {
    fn from(array: Array) -> Self {
        Self::Array(array)
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

impl Group {
    /// Create an empty group with `attributes`.
    #[must_use]
    pub fn new(attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            attributes,
            children: BTreeMap::new(),
        }
    }

    /// Returns the group attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Replace the group attributes.
    pub fn set_attributes(&mut self, attributes: serde_json::Map<String, serde_json::Value>) {
        self.attributes = attributes;
    }

    /// Returns the children in name order.
    pub fn children(&self) -> impl Iterator<Item = (&NodeName, &Node)> {
        self.children.iter()
    }

    /// Returns the child `name`.
    #[must_use]
    pub fn child(&self, name: &NodeName) -> Option<&Node> {
        self.children.get(name)
    }

    /// Insert a child node, returning any node it replaced.
    pub fn insert(&mut self, name: NodeName, node: Node) -> Option<Node> {
        self.children.insert(name, node)
    }

    /// Returns the node at `path` relative to this group.
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        let mut components = path.components();
        let first = components.next()?;
        let mut node = self.children.get(&NodeName::new(first).ok()?)?;
        for name in components {
            let Node::Group(group) = node else {
                return None;
            };
            node = group.children.get(&NodeName::new(name).ok()?)?;
        }
        Some(node)
    }

    /// Returns a mutable reference to the node at `path` relative to this group.
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut components = path.components();
        let first = components.next()?;
        let mut node = self.children.get_mut(&NodeName::new(first).ok()?)?;
        for name in components {
            let Node::Group(group) = node else {
                return None;
            };
            node = group.children.get_mut(&NodeName::new(name).ok()?)?;
        }
        Some(node)
    }

    /// Insert `node` at `path` relative to this group, creating intermediate groups as required.
    ///
    /// # Errors
    /// Returns [`NodeError::NotAGroup`] if a node on the path is an array, or [`NodeError::NotFound`] if `path` is the root.
    pub fn insert_at(&mut self, path: &NodePath, node: Node) -> Result<Option<Node>, NodeError> {
        let names = path
            .components()
            .map(NodeName::new)
            .collect::<Result<Vec<_>, _>>()?;
        let Some((name, parents)) = names.split_last() else {
            return Err(NodeError::NotFound(path.clone()));
        };
        let mut group = self;
        let mut group_path = NodePath::root();
        for parent in parents {
            group_path = group_path.join(parent);
            let child = group
                .children
                .entry(parent.clone())
                .or_insert_with(|| Node::Group(Self::default()));
            group = match child {
                Node::Group(group) => group,
                Node::Array(_) => return Err(NodeError::NotAGroup(group_path)),
            };
        }
        Ok(group.insert(name.clone(), node))
    }

    /// Visit every array below this group in path order.
    pub fn visit_arrays<'a>(&'a self, mut f: impl FnMut(NodePath, &'a Array)) {
        fn visit<'a>(group: &'a Group, path: &NodePath, f: &mut impl FnMut(NodePath, &'a Array)) {
            for (name, child) in &group.children {
                let child_path = path.join(name);
                match child {
                    Node::Array(array) => f(child_path, array),
                    Node::Group(group) => visit(group, &child_path, f),
                }
            }
        }
        visit(self, &NodePath::root(), &mut f);
    }
}

impl Node {
    /// Read the node at `path` and all of its descendants.
    ///
    /// A directory without a metadata document is read as an implicit group with no attributes.
    ///
    /// # Errors
    /// Returns [`NodeError`] if the metadata is invalid, an array cannot be read, or there is an underlying store error.
    pub fn open<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits>(
        storage: &TStorage,
        path: &NodePath,
    ) -> Result<Self, NodeError> {
        let key = meta_key(path);
        let metadata: NodeMetadata = match storage.get(&key)? {
            Some(metadata) => serde_json::from_slice(&metadata)
                .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?,
            None => NodeMetadata::Group(GroupMetadata::default()),
        };
        match metadata {
            NodeMetadata::Array(metadata) => Ok(Self::Array(Array::open_with_metadata(
                storage, path, metadata,
            )?)),
            NodeMetadata::Group(metadata) => {
                metadata.validate()?;
                let mut group = Group::new(metadata.attributes);
                let prefix = StorePrefix::try_from(path).map_err(StorageError::from)?;
                for child_prefix in storage.list_dir(&prefix)?.prefixes() {
                    let child_path = NodePath::try_from(child_prefix)?;
                    let name = NodeName::new(child_path.name())?;
                    group.insert(name, Self::open(storage, &child_path)?);
                }
                Ok(Self::Group(group))
            }
        }
    }

    /// Write the node at `path` and all of its descendants.
    ///
    /// # Errors
    /// Returns [`NodeError`] if there is an underlying store error or an array cannot be encoded.
    pub fn store<TStorage: ?Sized + WritableStorageTraits>(
        &self,
        storage: &TStorage,
        path: &NodePath,
    ) -> Result<(), NodeError> {
        match self {
            Self::Array(array) => array.store(storage, path)?,
            Self::Group(group) => {
                let metadata = NodeMetadata::Group(GroupMetadata::new(group.attributes.clone()));
                let json = serde_json::to_vec_pretty(&metadata)
                    .map_err(|err| StorageError::InvalidMetadata(meta_key(path), err.to_string()))?;
                storage.set(&meta_key(path), Bytes::from(json))?;
                for (name, child) in &group.children {
                    child.store(storage, &path.join(name))?;
                }
            }
        }
        Ok(())
    }

    /// Returns a string representation of the hierarchy below this node.
    ///
    /// Arrays are listed with their shape and data type.
    #[must_use]
    pub fn hierarchy_tree(&self) -> String {
        fn print_node(name: &str, string: &mut String, node: &Node) {
            match node {
                Node::Array(array) => {
                    string.push_str(&format!("{} {:?} {}", name, array.shape(), array.data_type()));
                }
                Node::Group(_) => string.push_str(name),
            }
            string.push('\n');
        }

        fn update_tree(string: &mut String, group: &Group, depth: usize) {
            for (name, child) in group.children() {
                string.push_str(&" ".repeat(depth * 2));
                print_node(name.as_str(), string, child);
                if let Node::Group(group) = child {
                    update_tree(string, group, depth + 1);
                }
            }
        }

        let mut string = String::default();
        print_node("/", &mut string, self);
        if let Self::Group(group) = self {
            update_tree(&mut string, group, 1);
        }
        string
    }
}
