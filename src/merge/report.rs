use std::collections::BTreeSet;

use thiserror::Error;

use crate::{array::DataType, attributes::AttributeValue, node::NodePath};

use super::MergePlan;

/// A recoverable problem encountered during a merge.
///
/// The affected path or attribute is left out of the output and the merge continues.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MergeIssue {
    /// An input array could not be converted to the data type of the reference array.
    #[error("{path}: input {index} has data type {found}, which cannot be converted to {reference}")]
    DataTypeMismatch {
        /// The array path.
        path: NodePath,
        /// The input index.
        index: usize,
        /// The data type of the reference array.
        reference: DataType,
        /// The data type of the input array.
        found: DataType,
    },
    /// Input arrays could not be concatenated.
    #[error("{path}: input arrays cannot be concatenated: {reason}")]
    ShapeMismatch {
        /// The array path.
        path: NodePath,
        /// The reason.
        reason: String,
    },
    /// An alignment target is not numeric.
    #[error("{path}: data type {data_type} cannot be interpolated")]
    NotInterpolable {
        /// The array path.
        path: NodePath,
        /// The data type.
        data_type: DataType,
    },
    /// An attribute value could not be converted to the data type of the reference value.
    #[error("attribute {key}: value {value} of input {index} cannot be converted to {data_type}")]
    AttributeCoercion {
        /// The attribute key.
        key: String,
        /// The input index.
        index: usize,
        /// The value.
        value: AttributeValue,
        /// The data type of the reference value.
        data_type: DataType,
    },
    /// An attribute key cannot be written as an array.
    #[error("attribute {key}: {reason}")]
    AttributeKey {
        /// The attribute key.
        key: String,
        /// The reason.
        reason: String,
    },
    /// A file identifier could not be parsed from the location of an input.
    #[error("input {index}: cannot parse a file identifier from {location:?}")]
    FileId {
        /// The input index.
        index: usize,
        /// The base name of the input location.
        location: Option<String>,
    },
    /// An input has no label attribute.
    #[error("input {index}: missing label attribute {attribute}")]
    MissingLabel {
        /// The input index.
        index: usize,
        /// The label attribute.
        attribute: String,
    },
    /// An array was not reordered by the sort pass.
    #[error("{path}: not sorted: {reason}")]
    SortSkipped {
        /// The array path.
        path: NodePath,
        /// The reason.
        reason: String,
    },
}

/// The outcome of a merge.
///
/// Holds the classification of every input path and the recoverable issues encountered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeReport {
    reserved_paths: BTreeSet<NodePath>,
    alignment_paths: BTreeSet<NodePath>,
    merge_paths: BTreeSet<NodePath>,
    excluded_paths: BTreeSet<NodePath>,
    merged_attributes: BTreeSet<String>,
    sort_permutation: Option<Vec<usize>>,
    issues: Vec<MergeIssue>,
}

impl MergeReport {
    pub(super) fn new(plan: &MergePlan) -> Self {
        Self {
            reserved_paths: plan.reserved_paths.clone(),
            alignment_paths: plan.alignment_paths.clone(),
            merge_paths: plan.merge_paths.clone(),
            excluded_paths: plan.excluded_paths.clone(),
            merged_attributes: BTreeSet::new(),
            sort_permutation: None,
            issues: Vec::new(),
        }
    }

    /// Record an issue and log it.
    pub(super) fn push_issue(&mut self, issue: MergeIssue) {
        log::warn!("{issue}");
        self.issues.push(issue);
    }

    /// Move `path` from the alignment or merge paths to the excluded paths.
    pub(super) fn exclude(&mut self, path: &NodePath) {
        self.alignment_paths.remove(path);
        self.merge_paths.remove(path);
        self.excluded_paths.insert(path.clone());
    }

    pub(super) fn add_merged_attribute(&mut self, key: &str) {
        self.merged_attributes.insert(key.to_string());
    }

    pub(super) fn set_sort_permutation(&mut self, permutation: Vec<usize>) {
        self.sort_permutation = Some(permutation);
    }

    /// Paths copied verbatim from the reference collection.
    #[must_use]
    pub const fn reserved_paths(&self) -> &BTreeSet<NodePath> {
        &self.reserved_paths
    }

    /// Paths resampled onto the common grid and concatenated.
    #[must_use]
    pub const fn alignment_paths(&self) -> &BTreeSet<NodePath> {
        &self.alignment_paths
    }

    /// Paths concatenated directly.
    #[must_use]
    pub const fn merge_paths(&self) -> &BTreeSet<NodePath> {
        &self.merge_paths
    }

    /// Input paths which are not in the output.
    #[must_use]
    pub const fn excluded_paths(&self) -> &BTreeSet<NodePath> {
        &self.excluded_paths
    }

    /// Attribute keys written as arrays.
    #[must_use]
    pub const fn merged_attributes(&self) -> &BTreeSet<String> {
        &self.merged_attributes
    }

    /// The permutation applied by the sort pass, if any.
    ///
    /// Element `i` is the input index of the `i`th record of the output.
    #[must_use]
    pub fn sort_permutation(&self) -> Option<&[usize]> {
        self.sort_permutation.as_deref()
    }

    /// The recoverable issues encountered, in order.
    #[must_use]
    pub fn issues(&self) -> &[MergeIssue] {
        &self.issues
    }
}
