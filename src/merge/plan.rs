use std::collections::BTreeSet;

use crate::{collection::Collection, node::NodePath};

use super::{interpolate::axis_values, shape_check::paths_agree, MergeError, MergeOptions, Orientation};

/// Attribute keys which describe a single file and are never merged.
pub const EXCLUDED_ATTRIBUTES: [&str; 6] = [
    "name",
    "description",
    "createdBy",
    "owner",
    "allPermissions",
    "groupPermissions",
];

/// The classification of every input path and attribute.
///
/// Every array path of every input falls into exactly one of the reserved, alignment, merge, or excluded sets, except the alignment axis.
/// The axis is written as the common grid if there is anything to align, and excluded otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct MergePlan {
    /// The index of the reference collection.
    pub reference_index: usize,
    /// The orientation.
    pub orientation: Orientation,
    /// The alignment axis.
    pub axis: Option<NodePath>,
    /// Paths copied verbatim from the reference collection.
    pub reserved_paths: BTreeSet<NodePath>,
    /// Paths resampled onto the common grid and concatenated.
    pub alignment_paths: BTreeSet<NodePath>,
    /// Paths concatenated directly.
    pub merge_paths: BTreeSet<NodePath>,
    /// Paths left out of the output.
    pub excluded_paths: BTreeSet<NodePath>,
    /// Root attribute keys to write as arrays.
    pub attribute_keys: BTreeSet<String>,
}

impl MergePlan {
    /// Classify the paths and attributes of `collections`.
    ///
    /// # Errors
    /// Returns a [`MergeError`] if there are no collections, the reference index is out of range, an option path is invalid, or the alignment axis is missing or unusable in any collection.
    pub fn new(collections: &[Collection], options: &MergeOptions) -> Result<Self, MergeError> {
        if collections.is_empty() {
            return Err(MergeError::NoInputs);
        }
        let reference_index = options.reference_index();
        let reference = collections
            .get(reference_index)
            .ok_or(MergeError::InvalidReferenceIndex {
                index: reference_index,
                count: collections.len(),
            })?;
        let orientation = options.orientation();
        let agreement_axis = orientation.agreement_axis();

        let all_paths: BTreeSet<NodePath> = collections
            .iter()
            .flat_map(Collection::array_paths)
            .collect();
        let common_paths: BTreeSet<NodePath> = all_paths
            .iter()
            .filter(|path| collections.iter().all(|collection| collection.array(path).is_some()))
            .cloned()
            .collect();

        let requested_reserved = options
            .reserved_paths()
            .iter()
            .map(|path| NodePath::from_name_or_path(path))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let axis = options
            .align_at()
            .map(NodePath::from_name_or_path)
            .transpose()?;
        let reserved_paths: BTreeSet<NodePath> = requested_reserved
            .iter()
            .filter(|path| reference.array(path).is_some() && axis.as_ref() != Some(*path))
            .cloned()
            .collect();
        let alignment_paths = match &axis {
            Some(axis) => {
                let axis_lengths: Vec<usize> = axis_values(collections, axis)?
                    .iter()
                    .map(Vec::len)
                    .collect();
                common_paths
                    .iter()
                    .filter(|path| *path != axis && !reserved_paths.contains(*path))
                    .filter(|path| {
                        collections.iter().zip(&axis_lengths).all(|(collection, &length)| {
                            collection
                                .array(path)
                                .and_then(|array| array.data().to_2d(agreement_axis).ok())
                                .and_then(|data| data.size_along(agreement_axis))
                                == Some(length)
                        })
                    })
                    .cloned()
                    .collect()
            }
            None => BTreeSet::new(),
        };

        let merge_paths: BTreeSet<NodePath> = common_paths
            .iter()
            .filter(|path| {
                !reserved_paths.contains(*path)
                    && !alignment_paths.contains(*path)
                    && axis.as_ref() != Some(*path)
            })
            .filter(|path| {
                collections.iter().all(|collection| {
                    paths_agree(reference, collection, path, agreement_axis)
                        && canonical_size(reference, path, orientation)
                            == canonical_size(collection, path, orientation)
                })
            })
            .cloned()
            .collect();

        let excluded_paths: BTreeSet<NodePath> = all_paths
            .iter()
            .filter(|path| {
                !reserved_paths.contains(*path)
                    && !alignment_paths.contains(*path)
                    && !merge_paths.contains(*path)
                    && (axis.as_ref() != Some(*path) || alignment_paths.is_empty())
            })
            .cloned()
            .collect();

        let attribute_keys = if options.merge_attributes() {
            common_attribute_keys(collections, &requested_reserved)
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            reference_index,
            orientation,
            axis,
            reserved_paths,
            alignment_paths,
            merge_paths,
            excluded_paths,
            attribute_keys,
        })
    }

    /// Returns the reference collection.
    #[must_use]
    pub fn reference<'a>(&self, collections: &'a [Collection]) -> &'a Collection {
        &collections[self.reference_index]
    }
}

/// The size along the agreement axis of the array at `path` once canonicalised to 2-D for concatenation.
fn canonical_size(collection: &Collection, path: &NodePath, orientation: Orientation) -> Option<usize> {
    collection
        .array(path)?
        .data()
        .to_2d(orientation.concat_axis())
        .ok()?
        .size_along(orientation.agreement_axis())
}

/// Root attribute keys present in every collection, less the per-file keys and any reserved names.
fn common_attribute_keys(
    collections: &[Collection],
    reserved: &BTreeSet<NodePath>,
) -> BTreeSet<String> {
    let mut attribute_sets = collections.iter().map(Collection::attributes);
    let Some(first) = attribute_sets.next() else {
        return BTreeSet::new();
    };
    let mut keys: BTreeSet<String> = first.keys().map(str::to_string).collect();
    for attributes in attribute_sets {
        keys.retain(|key| attributes.contains_key(key));
    }
    keys.retain(|key| {
        !EXCLUDED_ATTRIBUTES.contains(&key.as_str())
            && !NodePath::from_name_or_path(key).is_ok_and(|path| reserved.contains(&path))
    });
    keys
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::{
        array::{Array, ArrayData},
        attributes::{AttributeSet, AttributeValue},
        merge::MergeOptionsBuilder,
    };

    use super::*;

    fn insert(collection: &mut Collection, path: &str, data: ArrayData) {
        collection
            .insert_array(&NodePath::new(path).unwrap(), Array::new(data))
            .unwrap();
    }

    fn paths(paths: &[&str]) -> BTreeSet<NodePath> {
        paths.iter().map(|path| NodePath::new(path).unwrap()).collect()
    }

    fn collections() -> Vec<Collection> {
        (0..2)
            .map(|i| {
                let attributes = AttributeSet::from_iter([
                    ("name", AttributeValue::from(format!("sample {i}"))),
                    ("temperature", AttributeValue::Float(20.0)),
                    ("units", AttributeValue::from("nm")),
                ]);
                let mut collection = Collection::with_attributes(&attributes);
                insert(&mut collection, "/x", ArrayData::from(array![[0.0, 1.0, 2.0 + f64::from(i)]]));
                insert(&mut collection, "/Y", ArrayData::from(array![[1.0, 2.0, 3.0]]));
                insert(&mut collection, "/meta/label", ArrayData::from(array![["a".to_string()]]));
                insert(&mut collection, "/units", ArrayData::from(array![["nm".to_string()]]));
                if i == 1 {
                    insert(&mut collection, "/extra", ArrayData::from(array![[1i64]]));
                    insert(&mut collection, "/meta/label", ArrayData::from(array![["a".to_string(), "b".to_string()]]));
                }
                collection
            })
            .collect()
    }

    #[test]
    fn merge_plan_classification() {
        let collections = collections();
        let options = MergeOptionsBuilder::new()
            .align_at("x")
            .reserved_paths(vec!["/units".to_string(), "/absent".to_string()])
            .merge_attributes(true)
            .build();
        let plan = MergePlan::new(&collections, &options).unwrap();
        assert_eq!(plan.axis, Some(NodePath::new("/x").unwrap()));
        assert_eq!(plan.reserved_paths, paths(&["/units"]));
        assert_eq!(plan.alignment_paths, paths(&["/Y"]));
        assert!(plan.merge_paths.is_empty());
        assert_eq!(plan.excluded_paths, paths(&["/extra", "/meta/label"]));
        assert_eq!(
            plan.attribute_keys,
            BTreeSet::from(["temperature".to_string()])
        );
    }

    #[test]
    fn merge_plan_reserved_axis() {
        let collections = collections();
        let options = MergeOptionsBuilder::new()
            .align_at("/x")
            .reserved_paths(vec!["/x".to_string(), "/units".to_string()])
            .build();
        let plan = MergePlan::new(&collections, &options).unwrap();
        assert_eq!(plan.reserved_paths, paths(&["/units"]));
        assert_eq!(plan.alignment_paths, paths(&["/Y"]));
        assert!(!plan.excluded_paths.contains(&NodePath::new("/x").unwrap()));
    }

    #[test]
    fn merge_plan_without_axis() {
        let collections = collections();
        let plan = MergePlan::new(&collections, &MergeOptions::default()).unwrap();
        assert!(plan.alignment_paths.is_empty());
        assert!(plan.reserved_paths.is_empty());
        assert_eq!(plan.merge_paths, paths(&["/Y", "/units", "/x"]));
        assert_eq!(plan.excluded_paths, paths(&["/extra", "/meta/label"]));
        assert!(plan.attribute_keys.is_empty());
    }

    #[test]
    fn merge_plan_errors() {
        let collections = collections();
        assert!(matches!(
            MergePlan::new(&[], &MergeOptions::default()),
            Err(MergeError::NoInputs)
        ));
        let options = MergeOptionsBuilder::new().reference_index(2).build();
        assert!(matches!(
            MergePlan::new(&collections, &options),
            Err(MergeError::InvalidReferenceIndex { index: 2, count: 2 })
        ));
        let options = MergeOptionsBuilder::new().align_at("/missing").build();
        assert!(matches!(
            MergePlan::new(&collections, &options),
            Err(MergeError::Interpolation(_))
        ));
        let options = MergeOptionsBuilder::new().align_at("/meta/label").build();
        assert!(matches!(
            MergePlan::new(&collections, &options),
            Err(MergeError::Interpolation(_))
        ));
    }
}
