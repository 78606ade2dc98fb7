//! Merging collections.
//!
//! [`merge_collections`] combines several collections with a shared layout into one, and [`merge`] does the same for collections on disk.
//!
//! Every array path of the inputs is classified by a [`MergePlan`]:
//! - **reserved** paths listed in [`MergeOptions::reserved_paths`] are copied verbatim from the reference collection,
//! - **alignment** paths have one element per point of the alignment axis along the agreement axis, and are linearly resampled onto a common grid before concatenation,
//! - **merge** paths are present in every input with matching sizes along the agreement axis, and are concatenated directly, and
//! - everything else is **excluded** and listed in the [`MergeReport`].
//!
//! The [`Orientation`] determines the concatenation axis.
//! A vertical merge stacks records as rows (axis 0), a horizontal merge stacks them as columns (axis 1).
//! Bare vectors of length `n` are stacked as a column `(n, 1)` in a vertical merge and as a row `(1, n)` in a horizontal merge,
//! so a vertical merge of vectors gives one column with the elements of every input in turn.
//!
//! If [`MergeOptions::merge_attributes`] is set, the file identifier, the label, and each root attribute common to all inputs become arrays with one element per record.
//! Records are then sorted by [`MergeOptions::sort_by`].
//!
//! Problems confined to a single path or attribute are recoverable: the path or attribute is left out of the output and a [`MergeIssue`] is added to the report.
//! Anything else fails the merge with a [`MergeError`], and [`merge`] leaves no output behind.

mod concatenate;
mod consolidate;
mod interpolate;
mod options;
mod plan;
mod report;
mod shape_check;

use std::path::Path;

use thiserror::Error;

use crate::{
    array::ArrayShapeError,
    collection::{Collection, CollectionError},
    node::{NodePath, NodePathError},
};

pub use interpolate::{
    axis_values, common_grid, compute_range, resample, InterpolationError, LinearInterpolator,
};
pub use options::{MergeOptions, MergeOptionsBuilder, Orientation};
pub use plan::{MergePlan, EXCLUDED_ATTRIBUTES};
pub use report::{MergeIssue, MergeReport};
pub use shape_check::paths_agree;

/// A merge error.
#[derive(Debug, Error)]
pub enum MergeError {
    /// There are no inputs.
    #[error("no inputs to merge")]
    NoInputs,
    /// The reference index is out of range.
    #[error("reference index {index} is out of range for {count} inputs")]
    InvalidReferenceIndex {
        /// The reference index.
        index: usize,
        /// The number of inputs.
        count: usize,
    },
    /// A path in the options is invalid.
    #[error(transparent)]
    InvalidPath(#[from] NodePathError),
    /// Alignment failed.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    /// Arrays which should be compatible could not be concatenated.
    #[error("cannot concatenate {0}: {1}")]
    Concatenate(NodePath, ArrayShapeError),
    /// The sort key is not in the output.
    #[error("sort key {0} is not in the output")]
    SortKeyMissing(NodePath),
    /// The sort key does not have one element per record.
    #[error("sort key {path} has {got} elements, expected {expected}")]
    SortKeyLength {
        /// The sort key path.
        path: NodePath,
        /// The number of records.
        expected: usize,
        /// The number of elements.
        got: usize,
    },
    /// An ndarray shape error.
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
    /// An element error.
    #[error(transparent)]
    ArrayElementError(#[from] crate::array::ArrayElementError),
    /// A collection error.
    #[error(transparent)]
    CollectionError(#[from] CollectionError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Merge `collections` in memory.
///
/// Returns the merged collection, which has no location, and a report of the merge.
///
/// # Errors
/// Returns a [`MergeError`] if the merge fails. See the [module documentation](self).
pub fn merge_collections(
    collections: &[Collection],
    options: &MergeOptions,
) -> Result<(Collection, MergeReport), MergeError> {
    let plan = MergePlan::new(collections, options)?;
    log::debug!(
        "merging {} collections {}: {} reserved, {} alignment, {} merge, {} excluded paths",
        collections.len(),
        plan.orientation,
        plan.reserved_paths.len(),
        plan.alignment_paths.len(),
        plan.merge_paths.len(),
        plan.excluded_paths.len()
    );
    let mut report = MergeReport::new(&plan);
    let mut output = Collection::default();

    let mut sort_targets = concatenate::concatenate_paths(collections, &plan, &mut output, &mut report)?;

    if options.merge_attributes() {
        sort_targets.extend(consolidate::consolidate_attributes(
            collections,
            &plan,
            &mut output,
            &mut report,
        )?);
        if let Some(sort_by) = options.sort_by() {
            let sort_key = NodePath::from_name_or_path(sort_by)?;
            let permutation = consolidate::sort_records(
                &mut output,
                &sort_key,
                collections.len(),
                plan.orientation,
                &sort_targets,
                &mut report,
            )?;
            report.set_sort_permutation(permutation);
        }
    } else {
        output.set_raw_attributes(plan.reference(collections).raw_attributes().clone());
    }
    Ok((output, report))
}

/// Merge the collections at `inputs` and write the result to `output`.
///
/// The merged collection is written to a temporary directory beside `output`, which is then moved into place.
/// Any existing node at `output` is replaced.
/// If the merge fails, `output` is left as it was.
///
/// # Errors
/// Returns a [`MergeError`] if an input cannot be read, the merge fails, or the output cannot be written.
pub fn merge<P: AsRef<Path>>(
    inputs: &[P],
    output: impl AsRef<Path>,
    options: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    let collections = inputs
        .iter()
        .map(Collection::open_path)
        .collect::<Result<Vec<_>, _>>()?;
    let (merged, report) = merge_collections(&collections, options)?;
    write_replacing(&merged, output.as_ref())?;
    log::debug!("merged {} collections into {}", collections.len(), output.as_ref().display());
    Ok(report)
}

/// Write `collection` to `location` via a temporary directory in the same parent directory.
fn write_replacing(collection: &Collection, location: &Path) -> Result<(), MergeError> {
    let parent = match location.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".merge-")
        .tempdir_in(parent)?;
    let staged = staging.path().join("collection");
    collection.write_path(&staged)?;

    if location.exists() {
        let previous = staging.path().join("previous");
        std::fs::rename(location, &previous)?;
        if let Err(err) = std::fs::rename(&staged, location) {
            std::fs::rename(&previous, location)?;
            return Err(err.into());
        }
    } else {
        std::fs::rename(&staged, location)?;
    }
    staging.close()?;
    Ok(())
}
