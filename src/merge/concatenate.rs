use crate::{
    array::{Array, ArrayData},
    collection::Collection,
    node::NodePath,
};

use super::{
    interpolate::{axis_values, grid_over, resample_over, InterpolationError},
    MergeError, MergeIssue, MergePlan, MergeReport,
};

/// Write the reserved, alignment, and merge paths of `plan` to `output`.
///
/// Returns the paths of written arrays to which every input contributed exactly one record.
pub(super) fn concatenate_paths(
    collections: &[Collection],
    plan: &MergePlan,
    output: &mut Collection,
    report: &mut MergeReport,
) -> Result<Vec<NodePath>, MergeError> {
    let reference = plan.reference(collections);
    for path in &plan.reserved_paths {
        if let Some(array) = reference.array(path) {
            output.insert_array(path, array.clone())?;
        }
    }

    let mut single_record_paths = Vec::new();
    if let Some(axis) = &plan.axis {
        single_record_paths.extend(align_paths(collections, plan, axis, output, report)?);
    }

    let concat_axis = plan.orientation.concat_axis();
    for path in &plan.merge_paths {
        let Some(reference_array) = reference.array(path) else {
            continue;
        };
        let data_type = reference_array.data_type();
        let mut parts = Vec::with_capacity(collections.len());
        for (index, collection) in collections.iter().enumerate() {
            let Some(data) = collection.array(path).map(Array::data) else {
                continue;
            };
            let part = data.to_2d(concat_axis).ok().and_then(|part| part.cast(data_type));
            if let Some(part) = part {
                parts.push(part);
            } else {
                report.push_issue(MergeIssue::DataTypeMismatch {
                    path: path.clone(),
                    index,
                    reference: data_type,
                    found: data.data_type(),
                });
                break;
            }
        }
        if parts.len() != collections.len() {
            report.exclude(path);
            continue;
        }
        match ArrayData::concatenate(concat_axis, &parts) {
            Ok(merged) => {
                if is_single_record(&parts, concat_axis) {
                    single_record_paths.push(path.clone());
                }
                output.insert_array(
                    path,
                    Array::new(merged).with_attributes(reference_array.attributes().clone()),
                )?;
            }
            Err(err) => {
                report.push_issue(MergeIssue::ShapeMismatch {
                    path: path.clone(),
                    reason: err.to_string(),
                });
                report.exclude(path);
            }
        }
    }
    Ok(single_record_paths)
}

/// Resample the alignment paths onto the common grid, concatenate them, and write the grid at `axis`.
fn align_paths(
    collections: &[Collection],
    plan: &MergePlan,
    axis: &NodePath,
    output: &mut Collection,
    report: &mut MergeReport,
) -> Result<Vec<NodePath>, MergeError> {
    let Some(first_target) = plan.alignment_paths.first() else {
        return Ok(Vec::new());
    };
    let reference = plan.reference(collections);
    let orientation = plan.orientation;
    let axes = axis_values(collections, axis)?;
    let grid = grid_over(&axes, axis, first_target)?;
    log::debug!(
        "aligning {} arrays onto {} points of {axis}",
        plan.alignment_paths.len(),
        grid.len()
    );

    let mut single_record_paths = Vec::new();
    for path in &plan.alignment_paths {
        let parts = match resample_over(collections, &axes, path, orientation, &grid) {
            Ok(parts) => parts
                .into_iter()
                .map(ArrayData::Float64)
                .collect::<Vec<_>>(),
            Err(InterpolationError::NonNumericTarget(_, data_type)) => {
                report.push_issue(MergeIssue::NotInterpolable {
                    path: path.clone(),
                    data_type,
                });
                report.exclude(path);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let merged = ArrayData::concatenate(orientation.concat_axis(), &parts)
            .map_err(|err| MergeError::Concatenate(path.clone(), err))?;
        if is_single_record(&parts, orientation.concat_axis()) {
            single_record_paths.push(path.clone());
        }
        let attributes = reference
            .array(path)
            .map(|array| array.attributes().clone())
            .unwrap_or_default();
        output.insert_array(path, Array::new(merged).with_attributes(attributes))?;
    }

    if report.alignment_paths().is_empty() {
        report.exclude(axis);
    } else {
        let points = grid.len();
        let grid = ArrayData::Float64(
            grid.into_shape_with_order(orientation.grid_shape(points))
                .map_err(|err| MergeError::Concatenate(axis.clone(), err.into()))?
                .into_dyn(),
        );
        let attributes = reference
            .array(axis)
            .map(|array| array.attributes().clone())
            .unwrap_or_default();
        output.insert_array(axis, Array::new(grid).with_attributes(attributes))?;
    }
    Ok(single_record_paths)
}

/// Returns true if every part holds exactly one record along `concat_axis`.
fn is_single_record(parts: &[ArrayData], concat_axis: usize) -> bool {
    parts.iter().all(|part| part.size_along(concat_axis) == Some(1))
}
