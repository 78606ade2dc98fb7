//! Linear resampling onto a common grid.
//!
//! Alignment brings arrays sampled at different axis values (e.g. spectra over slightly different wavelengths) onto one grid.
//! The grid spans the intersection of the axis ranges of every collection, with as many points as the shortest axis.
//! Values outside the range of an axis take the value at the nearest end.

use itertools::Itertools;
use ndarray::{Array1, ArrayD, Axis};
use thiserror::Error;

use crate::{array::DataType, collection::Collection, node::NodePath};

use super::Orientation;

/// An alignment error.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InterpolationError {
    /// The axis is missing from a collection.
    #[error("alignment axis {0} is missing from input {1}")]
    MissingAxis(NodePath, usize),
    /// The axis is not numeric.
    #[error("alignment axis {0} has non-numeric data type {1}")]
    NonNumericAxis(NodePath, DataType),
    /// The axis is not a row or column vector.
    #[error("alignment axis {0} with shape {1:?} is not a vector")]
    NotAVector(NodePath, Vec<usize>),
    /// The axis has no elements.
    #[error("alignment axis {0} of input {1} is empty")]
    EmptyAxis(NodePath, usize),
    /// The axis ranges of the collections do not overlap.
    #[error("alignment axis {axis} ranges do not intersect for {target}: {min_bound} > {max_bound}")]
    EmptyIntersection {
        /// The axis path.
        axis: NodePath,
        /// The first target being aligned.
        target: NodePath,
        /// The largest axis minimum.
        min_bound: f64,
        /// The smallest axis maximum.
        max_bound: f64,
    },
    /// The target is not numeric.
    #[error("{0} has non-numeric data type {1}")]
    NonNumericTarget(NodePath, DataType),
    /// The target is missing from a collection.
    #[error("{0} is missing from input {1}")]
    MissingTarget(NodePath, usize),
    /// The target does not have one value per axis point along the agreement axis.
    #[error("{path} of input {index} has shape {shape:?}, expected {expected} elements along the agreement axis")]
    LengthMismatch {
        /// The target path.
        path: NodePath,
        /// The input index.
        index: usize,
        /// The target shape.
        shape: Vec<usize>,
        /// The number of axis points.
        expected: usize,
    },
}

/// A piecewise linear interpolant through a set of points.
///
/// Points are sorted by `x`. Of several points with the same `x`, the first supplied is kept.
/// Points with a NaN `x` are ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearInterpolator {
    /// Create an interpolant through the points `(xs[i], ys[i])`.
    ///
    /// Returns [`None`] if `xs` and `ys` differ in length or there are no usable points.
    #[must_use]
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() {
            return None;
        }
        let order = sorted_order(xs);
        Some(Self::from_order(xs, ys, &order)).filter(|interpolator| !interpolator.xs.is_empty())
    }

    fn from_order(xs: &[f64], ys: &[f64], order: &[usize]) -> Self {
        let (xs, ys) = order
            .iter()
            .map(|&i| (xs[i], ys[i]))
            .dedup_by(|a, b| a.0 == b.0)
            .unzip();
        Self { xs, ys }
    }

    /// Evaluate the interpolant at `x`.
    ///
    /// `x` is clamped to the range of the interpolant.
    /// Evaluating at one of the original `x` values returns its `y` value exactly.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        let (Some(&first), Some(&last)) = (self.xs.first(), self.xs.last()) else {
            return f64::NAN;
        };
        let x = x.clamp(first, last);
        let upper = self.xs.partition_point(|&xi| xi <= x);
        if upper == 0 {
            return self.ys[0];
        }
        if upper == self.xs.len() {
            return self.ys[upper - 1];
        }
        let (x0, x1) = (self.xs[upper - 1], self.xs[upper]);
        let (y0, y1) = (self.ys[upper - 1], self.ys[upper]);
        y0 + (x - x0) / (x1 - x0) * (y1 - y0)
    }
}

/// Indices of the non-NaN elements of `xs` in stable ascending order.
fn sorted_order(xs: &[f64]) -> Vec<usize> {
    (0..xs.len())
        .filter(|&i| !xs[i].is_nan())
        .sorted_by(|&a, &b| xs[a].total_cmp(&xs[b]))
        .collect()
}

/// Read the alignment axis of each collection as a flat vector of floats.
///
/// # Errors
/// Returns an [`InterpolationError`] if the axis is missing, not numeric, not a vector, or empty in any collection.
pub fn axis_values(
    collections: &[Collection],
    axis: &NodePath,
) -> Result<Vec<Vec<f64>>, InterpolationError> {
    collections
        .iter()
        .enumerate()
        .map(|(index, collection)| {
            let array = collection
                .array(axis)
                .ok_or_else(|| InterpolationError::MissingAxis(axis.clone(), index))?;
            let data = array.data();
            if !data.data_type().is_numeric() {
                return Err(InterpolationError::NonNumericAxis(
                    axis.clone(),
                    data.data_type(),
                ));
            }
            if !data.is_vector() {
                return Err(InterpolationError::NotAVector(
                    axis.clone(),
                    data.shape().to_vec(),
                ));
            }
            match data.to_f64_vec() {
                Some(values) if !values.is_empty() => Ok(values),
                Some(_) => Err(InterpolationError::EmptyAxis(axis.clone(), index)),
                None => Err(InterpolationError::NonNumericAxis(
                    axis.clone(),
                    data.data_type(),
                )),
            }
        })
        .collect()
}

/// Returns the intersection of the axis ranges of `collections`, `(max of minima, min of maxima)`.
///
/// The bounds are returned as found. The intersection is empty if the first exceeds the second.
///
/// # Errors
/// Returns an [`InterpolationError`] if the axis is unusable in any collection, see [`axis_values`].
pub fn compute_range(
    collections: &[Collection],
    axis: &NodePath,
) -> Result<(f64, f64), InterpolationError> {
    Ok(range_of(&axis_values(collections, axis)?))
}

fn range_of(axes: &[Vec<f64>]) -> (f64, f64) {
    axes.iter().fold(
        (f64::NEG_INFINITY, f64::INFINITY),
        |(min_bound, max_bound), values| {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (min_bound.max(min), max_bound.min(max))
        },
    )
}

/// Returns the common grid of `collections` over `axis`.
///
/// The grid is evenly spaced over the intersection of the axis ranges, with as many points as the shortest axis.
///
/// # Errors
/// Returns [`InterpolationError::EmptyIntersection`] naming `axis` and `target` if the axis ranges do not overlap,
/// or another [`InterpolationError`] if the axis is unusable in any collection.
pub fn common_grid(
    collections: &[Collection],
    axis: &NodePath,
    target: &NodePath,
) -> Result<Array1<f64>, InterpolationError> {
    grid_over(&axis_values(collections, axis)?, axis, target)
}

pub(super) fn grid_over(
    axes: &[Vec<f64>],
    axis: &NodePath,
    target: &NodePath,
) -> Result<Array1<f64>, InterpolationError> {
    let (min_bound, max_bound) = range_of(axes);
    let points = axes.iter().map(Vec::len).min().unwrap_or(0);
    if min_bound > max_bound || min_bound.is_nan() || max_bound.is_nan() {
        return Err(InterpolationError::EmptyIntersection {
            axis: axis.clone(),
            target: target.clone(),
            min_bound,
            max_bound,
        });
    }
    // Rounding in linspace can step just past the upper bound
    Ok(Array1::linspace(min_bound, max_bound, points).mapv_into(|x| x.clamp(min_bound, max_bound)))
}

/// Resample `target` of every collection onto `grid`, using `axis` as the independent variable.
///
/// The target is canonicalised to 2-D with vectors lying along the agreement axis, and each lane along the agreement axis is interpolated independently.
/// The result for each collection is a `float64` array with `grid.len()` elements along the agreement axis.
///
/// # Errors
/// Returns [`InterpolationError::NonNumericTarget`] if the target is not numeric in any collection,
/// [`InterpolationError::LengthMismatch`] if it does not have one element per axis point,
/// or another [`InterpolationError`] if the axis is unusable.
pub fn resample(
    collections: &[Collection],
    axis: &NodePath,
    target: &NodePath,
    orientation: Orientation,
    grid: &Array1<f64>,
) -> Result<Vec<ArrayD<f64>>, InterpolationError> {
    resample_over(collections, &axis_values(collections, axis)?, target, orientation, grid)
}

pub(super) fn resample_over(
    collections: &[Collection],
    axes: &[Vec<f64>],
    target: &NodePath,
    orientation: Orientation,
    grid: &Array1<f64>,
) -> Result<Vec<ArrayD<f64>>, InterpolationError> {
    let agreement_axis = orientation.agreement_axis();
    collections
        .iter()
        .zip(axes)
        .enumerate()
        .map(|(index, (collection, xs))| {
            let values = canonical_target(collection, index, target, agreement_axis, xs.len())?;
            let mut shape = values.shape().to_vec();
            shape[agreement_axis] = grid.len();
            let mut resampled = ArrayD::<f64>::zeros(shape);
            let order = sorted_order(xs);
            for (lane, mut resampled_lane) in values
                .lanes(Axis(agreement_axis))
                .into_iter()
                .zip(resampled.lanes_mut(Axis(agreement_axis)))
            {
                let ys = lane.to_vec();
                let interpolator = LinearInterpolator::from_order(xs, &ys, &order);
                for (y, &x) in resampled_lane.iter_mut().zip(grid) {
                    *y = interpolator.evaluate(x);
                }
            }
            Ok(resampled)
        })
        .collect()
}

/// Returns the target as a 2-D float array, with a vector target lying along the agreement axis.
fn canonical_target(
    collection: &Collection,
    index: usize,
    target: &NodePath,
    agreement_axis: usize,
    expected: usize,
) -> Result<ArrayD<f64>, InterpolationError> {
    let data = collection
        .array(target)
        .ok_or_else(|| InterpolationError::MissingTarget(target.clone(), index))?
        .data();
    let length_mismatch = || InterpolationError::LengthMismatch {
        path: target.clone(),
        index,
        shape: data.shape().to_vec(),
        expected,
    };
    let values = data
        .to_2d(agreement_axis)
        .map_err(|_| length_mismatch())?
        .to_f64_array()
        .ok_or_else(|| InterpolationError::NonNumericTarget(target.clone(), data.data_type()))?;
    if values.len_of(Axis(agreement_axis)) == expected {
        Ok(values)
    } else {
        Err(length_mismatch())
    }
}
