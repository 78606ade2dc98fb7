use std::cmp::Ordering;

use itertools::Itertools;
use ndarray::{ArrayD, IxDyn};

use crate::{
    array::{Array, ArrayData, DataType},
    attributes::{float_to_i64_exact, AttributeValue},
    collection::Collection,
    config::global_config,
    node::{NodeName, NodePath},
};

use super::{MergeError, MergeIssue, MergePlan, MergeReport, Orientation};

/// Write the file identifier and label columns, and one array per common root attribute, to `output`.
///
/// Returns the paths of the written arrays.
pub(super) fn consolidate_attributes(
    collections: &[Collection],
    plan: &MergePlan,
    output: &mut Collection,
    report: &mut MergeReport,
) -> Result<Vec<NodePath>, MergeError> {
    let (file_id_path, file_label_path, label_attribute) = {
        let config = global_config();
        (
            NodePath::from_name_or_path(config.file_id_path())?,
            NodePath::from_name_or_path(config.file_label_path())?,
            config.label_attribute().to_string(),
        )
    };
    let shape = plan.orientation.record_shape(collections.len());
    let mut written = Vec::new();

    let file_ids = collections
        .iter()
        .enumerate()
        .map(|(index, collection)| {
            let file_id = collection
                .file_stem()
                .and_then(|stem| stem.trim().parse::<i64>().ok());
            if file_id.is_none() {
                report.push_issue(MergeIssue::FileId {
                    index,
                    location: collection.file_stem().map(str::to_string),
                });
            }
            file_id
        })
        .collect::<Vec<_>>();
    if let Some(file_ids) = file_ids.into_iter().collect::<Option<Vec<_>>>() {
        let data = ArrayData::Int64(ArrayD::from_shape_vec(IxDyn(&shape), file_ids)?);
        output.insert_array(&file_id_path, Array::new(data))?;
        written.push(file_id_path);
    }

    let labels = collections
        .iter()
        .enumerate()
        .map(|(index, collection)| {
            if let Some(label) = collection.attributes().get(&label_attribute) {
                label.to_string()
            } else {
                report.push_issue(MergeIssue::MissingLabel {
                    index,
                    attribute: label_attribute.clone(),
                });
                String::new()
            }
        })
        .collect::<Vec<_>>();
    let data = ArrayData::String(ArrayD::from_shape_vec(IxDyn(&shape), labels)?);
    output.insert_array(&file_label_path, Array::new(data))?;
    written.push(file_label_path);

    let attribute_sets = collections
        .iter()
        .map(Collection::attributes)
        .collect::<Vec<_>>();
    let reference = &attribute_sets[plan.reference_index];
    for key in &plan.attribute_keys {
        let path = match NodeName::new(key) {
            Ok(name) if !name.is_root() => NodePath::root().join(&name),
            _ => {
                report.push_issue(MergeIssue::AttributeKey {
                    key: key.clone(),
                    reason: "not a valid array name".to_string(),
                });
                continue;
            }
        };
        if output.contains(&path) {
            report.push_issue(MergeIssue::AttributeKey {
                key: key.clone(),
                reason: format!("{path} is already in the output"),
            });
            continue;
        }
        let Some(data_type) = reference.get(key).map(AttributeValue::data_type) else {
            continue;
        };
        let values = attribute_sets
            .iter()
            .enumerate()
            .map(|(index, attributes)| {
                let value = attributes.get(key)?;
                let coerced = coerce(value, data_type);
                if coerced.is_none() {
                    report.push_issue(MergeIssue::AttributeCoercion {
                        key: key.clone(),
                        index,
                        value: value.clone(),
                        data_type,
                    });
                }
                coerced
            })
            .collect::<Option<Vec<_>>>();
        let Some(values) = values else {
            continue;
        };
        let data = ArrayData::new_filled(data_type, &shape, &values[0])?;
        let data = values
            .iter()
            .enumerate()
            .try_fold(data, |mut data, (i, value)| {
                data.set_element(&record_index(plan.orientation, i), value)?;
                Ok::<_, MergeError>(data)
            })?;
        output.insert_array(&path, Array::new(data))?;
        report.add_merged_attribute(key);
        written.push(path);
    }
    Ok(written)
}

/// Convert an attribute value to the data type of the reference value.
///
/// Integers widen to floats, and integral floats narrow to integers. Strings and numbers never mix.
fn coerce(value: &AttributeValue, data_type: DataType) -> Option<AttributeValue> {
    match (value, data_type) {
        (AttributeValue::Integer(_), DataType::Int64)
        | (AttributeValue::Float(_), DataType::Float64)
        | (AttributeValue::String(_), DataType::String) => Some(value.clone()),
        (AttributeValue::Integer(_), DataType::Float64) => value.as_f64().map(AttributeValue::Float),
        (AttributeValue::Float(float), DataType::Int64) => {
            float_to_i64_exact(*float).map(AttributeValue::Integer)
        }
        _ => None,
    }
}

const fn record_index(orientation: Orientation, i: usize) -> [usize; 2] {
    match orientation {
        Orientation::Vertical => [i, 0],
        Orientation::Horizontal => [0, i],
    }
}

/// Reorder records by the values of `sort_key`.
///
/// The stable ascending permutation of `sort_key` is applied along the concatenation axis to every array in `targets`.
/// Returns the permutation.
///
/// # Errors
/// Returns [`MergeError::SortKeyMissing`] if there is no array at `sort_key`, or [`MergeError::SortKeyLength`] if it does not have one element per record.
pub(super) fn sort_records(
    output: &mut Collection,
    sort_key: &NodePath,
    records: usize,
    orientation: Orientation,
    targets: &[NodePath],
    report: &mut MergeReport,
) -> Result<Vec<usize>, MergeError> {
    let key = output
        .array(sort_key)
        .ok_or_else(|| MergeError::SortKeyMissing(sort_key.clone()))?
        .data()
        .clone();
    if key.len() != records {
        return Err(MergeError::SortKeyLength {
            path: sort_key.clone(),
            expected: records,
            got: key.len(),
        });
    }
    let permutation = match &key {
        ArrayData::Int64(values) => stable_argsort(&values.iter().collect_vec(), |a, b| a.cmp(b)),
        ArrayData::Float64(values) => {
            stable_argsort(&values.iter().collect_vec(), |a, b| a.total_cmp(b))
        }
        ArrayData::String(values) => stable_argsort(&values.iter().collect_vec(), |a, b| a.cmp(b)),
    };
    log::debug!("sorting {} records by {sort_key}", permutation.len());

    let concat_axis = orientation.concat_axis();
    for path in targets.iter().unique() {
        let Some(array) = output.array_mut(path) else {
            report.push_issue(MergeIssue::SortSkipped {
                path: path.clone(),
                reason: "not in the output".to_string(),
            });
            continue;
        };
        let permuted = array.data().permuted(concat_axis, &permutation);
        match permuted {
            Ok(permuted) => *array.data_mut() = permuted,
            Err(err) => report.push_issue(MergeIssue::SortSkipped {
                path: path.clone(),
                reason: err.to_string(),
            }),
        }
    }
    Ok(permutation)
}

fn stable_argsort<T>(values: &[T], compare: impl Fn(&T, &T) -> Ordering) -> Vec<usize> {
    (0..values.len())
        .sorted_by(|&a, &b| compare(&values[a], &values[b]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_attribute_values() {
        assert_eq!(
            coerce(&AttributeValue::Integer(2), DataType::Float64),
            Some(AttributeValue::Float(2.0))
        );
        assert_eq!(
            coerce(&AttributeValue::Float(2.0), DataType::Int64),
            Some(AttributeValue::Integer(2))
        );
        assert_eq!(coerce(&AttributeValue::Float(2.5), DataType::Int64), None);
        assert_eq!(coerce(&AttributeValue::from("2"), DataType::Int64), None);
        assert_eq!(coerce(&AttributeValue::Integer(2), DataType::String), None);
    }

    #[test]
    fn stable_argsort_ties() {
        assert_eq!(
            stable_argsort(&[3.0, 1.0, 3.0, 2.0], f64::total_cmp),
            vec![1, 3, 0, 2]
        );
        assert_eq!(
            stable_argsort(&["b", "a", "b"], Ord::cmp),
            vec![1, 0, 2]
        );
    }
}
