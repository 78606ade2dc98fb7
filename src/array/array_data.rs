use ndarray::{Array2, ArrayD, Axis, IxDyn};
use thiserror::Error;

use crate::attributes::{float_to_i64_exact, AttributeValue};

use super::DataType;

/// The elements of an array, tagged by data type.
///
/// The shape is carried by the underlying [`ndarray::ArrayD`].
/// Collections hold 1 or 2 dimensional arrays in practice, but any dimensionality round trips through storage.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    /// `int64` elements.
    Int64(ArrayD<i64>),
    /// `float64` elements.
    Float64(ArrayD<f64>),
    /// `string` elements.
    String(ArrayD<String>),
}

/// An array shape or dimensionality error.
#[derive(Debug, Error)]
pub enum ArrayShapeError {
    /// The arrays have different data types.
    #[error("incompatible data types {0} and {1}")]
    IncompatibleDataType(DataType, DataType),
    /// The shapes cannot be combined along the axis.
    #[error("incompatible shapes {0:?} along axis {1}")]
    IncompatibleShapes(Vec<Vec<usize>>, usize),
    /// The array is not one or two dimensional.
    #[error("expected a 1 or 2 dimensional array, got shape {0:?}")]
    UnsupportedDimensionality(Vec<usize>),
    /// Nothing to concatenate.
    #[error("no arrays to concatenate")]
    Empty,
    /// An ndarray shape error.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Invalid element access or assignment.
#[derive(Debug, Error)]
pub enum ArrayElementError {
    /// The index is out of bounds.
    #[error("index {index:?} is out of bounds for shape {shape:?}")]
    OutOfBounds {
        /// The index.
        index: Vec<usize>,
        /// The array shape.
        shape: Vec<usize>,
    },
    /// The value cannot be represented in the array data type.
    #[error("value {0} cannot be represented as {1}")]
    IncompatibleValue(AttributeValue, DataType),
}

macro_rules! map_array_data {
    ($data:expr, $array:ident => $body:expr) => {
        match $data {
            ArrayData::Int64($array) => ArrayData::Int64($body),
            ArrayData::Float64($array) => ArrayData::Float64($body),
            ArrayData::String($array) => ArrayData::String($body),
        }
    };
}

macro_rules! with_array_data {
    ($data:expr, $array:ident => $body:expr) => {
        match $data {
            ArrayData::Int64($array) => $body,
            ArrayData::Float64($array) => $body,
            ArrayData::String($array) => $body,
        }
    };
}

impl ArrayData {
    /// Create array data filled with `fill_value`.
    ///
    /// # Errors
    /// Returns [`ArrayElementError::IncompatibleValue`] if `fill_value` cannot be represented as `data_type`.
    pub fn new_filled(
        data_type: DataType,
        shape: &[usize],
        fill_value: &AttributeValue,
    ) -> Result<Self, ArrayElementError> {
        let incompatible = || ArrayElementError::IncompatibleValue(fill_value.clone(), data_type);
        Ok(match data_type {
            DataType::Int64 => Self::Int64(ArrayD::from_elem(
                IxDyn(shape),
                fill_value.as_i64().ok_or_else(incompatible)?,
            )),
            DataType::Float64 => Self::Float64(ArrayD::from_elem(
                IxDyn(shape),
                fill_value.as_f64().ok_or_else(incompatible)?,
            )),
            DataType::String => Self::String(ArrayD::from_elem(
                IxDyn(shape),
                fill_value.as_str().ok_or_else(incompatible)?.to_string(),
            )),
        })
    }

    /// Returns the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::String(_) => DataType::String,
        }
    }

    /// Returns the shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        with_array_data!(self, array => array.shape())
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Returns true if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the size along `axis`, or [`None`] if the array has fewer dimensions.
    #[must_use]
    pub fn size_along(&self, axis: usize) -> Option<usize> {
        self.shape().get(axis).copied()
    }

    /// Returns true if the array is 1-D, or 2-D with at most one non-unit dimension.
    #[must_use]
    pub fn is_vector(&self) -> bool {
        match self.shape() {
            [_] => true,
            [rows, cols] => *rows == 1 || *cols == 1,
            _ => false,
        }
    }

    /// Returns the elements in logical (row major) order as floats, or [`None`] for strings.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Self::Int64(array) => Some(array.iter().map(|&value| value as f64).collect()),
            Self::Float64(array) => Some(array.iter().copied().collect()),
            Self::String(_) => None,
        }
    }

    /// Returns the array converted to floats, or [`None`] for strings.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64_array(&self) -> Option<ArrayD<f64>> {
        match self {
            Self::Int64(array) => Some(array.mapv(|value| value as f64)),
            Self::Float64(array) => Some(array.clone()),
            Self::String(_) => None,
        }
    }

    /// Returns the elements flattened into a 1-D array in logical order.
    #[must_use]
    pub fn flattened(&self) -> Self {
        map_array_data!(self, array => ndarray::Array1::from_iter(array.iter().cloned()).into_dyn())
    }

    /// Convert to two dimensions.
    ///
    /// A 2-D array is returned unchanged.
    /// A 1-D array of length `n` becomes a single column `(n, 1)` if `vector_axis` is `0`, or a single row `(1, n)` otherwise.
    ///
    /// # Errors
    /// Returns [`ArrayShapeError::UnsupportedDimensionality`] if the array is not 1 or 2 dimensional.
    pub fn to_2d(&self, vector_axis: usize) -> Result<Self, ArrayShapeError> {
        let shape = match self.shape() {
            [rows, cols] => [*rows, *cols],
            [len] if vector_axis == 0 => [*len, 1],
            [len] => [1, *len],
            shape => return Err(ArrayShapeError::UnsupportedDimensionality(shape.to_vec())),
        };
        Ok(map_array_data!(self, array => {
            array
                .to_shape(IxDyn(&shape))
                .map_err(ArrayShapeError::from)?
                .to_owned()
        }))
    }

    /// Concatenate arrays of the same data type along `axis`.
    ///
    /// # Errors
    /// Returns [`ArrayShapeError`] if `arrays` is empty, the data types differ, or the shapes are incompatible.
    pub fn concatenate(axis: usize, arrays: &[Self]) -> Result<Self, ArrayShapeError> {
        let first = arrays.first().ok_or(ArrayShapeError::Empty)?;
        let incompatible_shapes = || {
            ArrayShapeError::IncompatibleShapes(
                arrays.iter().map(|array| array.shape().to_vec()).collect(),
                axis,
            )
        };
        macro_rules! concatenate_variant {
            ($variant:ident) => {{
                let views = arrays
                    .iter()
                    .map(|array| match array {
                        Self::$variant(array) => Ok(array.view()),
                        other => Err(ArrayShapeError::IncompatibleDataType(
                            first.data_type(),
                            other.data_type(),
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::$variant(
                    ndarray::concatenate(Axis(axis), &views).map_err(|_| incompatible_shapes())?,
                )
            }};
        }
        Ok(match first {
            Self::Int64(_) => concatenate_variant!(Int64),
            Self::Float64(_) => concatenate_variant!(Float64),
            Self::String(_) => concatenate_variant!(String),
        })
    }

    /// Reorder the array along `axis` so that element `i` is taken from `indices[i]`.
    ///
    /// # Errors
    /// Returns [`ArrayShapeError::IncompatibleShapes`] if the array does not have `axis` or its length along `axis` differs from the number of indices.
    pub fn permuted(&self, axis: usize, indices: &[usize]) -> Result<Self, ArrayShapeError> {
        if self.size_along(axis) != Some(indices.len()) {
            return Err(ArrayShapeError::IncompatibleShapes(
                vec![self.shape().to_vec()],
                axis,
            ));
        }
        Ok(map_array_data!(self, array => array.select(Axis(axis), indices)))
    }

    /// Cast to `data_type`.
    ///
    /// `int64` always widens to `float64`. `float64` narrows to `int64` only if every element is integral and in range.
    /// Returns [`None`] if the cast is not possible.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cast(&self, data_type: DataType) -> Option<Self> {
        match (self, data_type) {
            (Self::Int64(_), DataType::Int64)
            | (Self::Float64(_), DataType::Float64)
            | (Self::String(_), DataType::String) => Some(self.clone()),
            (Self::Int64(array), DataType::Float64) => {
                Some(Self::Float64(array.mapv(|value| value as f64)))
            }
            (Self::Float64(array), DataType::Int64) => {
                let values = array
                    .iter()
                    .map(|&value| float_to_i64_exact(value))
                    .collect::<Option<Vec<_>>>()?;
                ArrayD::from_shape_vec(array.raw_dim(), values)
                    .ok()
                    .map(Self::Int64)
            }
            _ => None,
        }
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    /// Returns [`ArrayElementError::OutOfBounds`] if `index` is out of bounds.
    pub fn element(&self, index: &[usize]) -> Result<AttributeValue, ArrayElementError> {
        let out_of_bounds = || ArrayElementError::OutOfBounds {
            index: index.to_vec(),
            shape: self.shape().to_vec(),
        };
        match self {
            Self::Int64(array) => array
                .get(IxDyn(index))
                .map(|&value| AttributeValue::Integer(value)),
            Self::Float64(array) => array
                .get(IxDyn(index))
                .map(|&value| AttributeValue::Float(value)),
            Self::String(array) => array
                .get(IxDyn(index))
                .map(|value| AttributeValue::String(value.clone())),
        }
        .ok_or_else(out_of_bounds)
    }

    /// Set the element at `index` to `value`.
    ///
    /// Integers are accepted by `float64` arrays and integral floats by `int64` arrays.
    ///
    /// # Errors
    /// Returns [`ArrayElementError`] if `index` is out of bounds or `value` cannot be represented in the data type.
    pub fn set_element(
        &mut self,
        index: &[usize],
        value: &AttributeValue,
    ) -> Result<(), ArrayElementError> {
        let data_type = self.data_type();
        let incompatible = || ArrayElementError::IncompatibleValue(value.clone(), data_type);
        let out_of_bounds = ArrayElementError::OutOfBounds {
            index: index.to_vec(),
            shape: self.shape().to_vec(),
        };
        match self {
            Self::Int64(array) => {
                let value = value.as_i64().ok_or_else(incompatible)?;
                *array.get_mut(IxDyn(index)).ok_or(out_of_bounds)? = value;
            }
            Self::Float64(array) => {
                let value = value.as_f64().ok_or_else(incompatible)?;
                *array.get_mut(IxDyn(index)).ok_or(out_of_bounds)? = value;
            }
            Self::String(array) => {
                let value = value.as_str().ok_or_else(incompatible)?;
                *array.get_mut(IxDyn(index)).ok_or(out_of_bounds)? = value.to_string();
            }
        }
        Ok(())
    }
}

impl From<Array2<i64>> for ArrayData {
    fn from(array: Array2<i64>) -> Self {
        Self::Int64(array.into_dyn())
    }
}

impl From<Array2<f64>> for ArrayData {
    fn from(array: Array2<f64>) -> Self {
        Self::Float64(array.into_dyn())
    }
}

impl From<Array2<String>> for ArrayData {
    fn from(array: Array2<String>) -> Self {
        Self::String(array.into_dyn())
    }
}

impl From<ArrayD<i64>> for ArrayData {
    fn from(array: ArrayD<i64>) -> Self {
        Self::Int64(array)
    }
}

impl From<ArrayD<f64>> for ArrayData {
    fn from(array: ArrayD<f64>) -> Self {
        Self::Float64(array)
    }
}

impl From<ArrayD<String>> for ArrayData {
    fn from(array: ArrayD<String>) -> Self {
        Self::String(array)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn array_data_to_2d() {
        let data = ArrayData::from(array![1i64, 2, 3].into_dyn());
        assert_eq!(data.to_2d(0).unwrap().shape(), &[3, 1]);
        assert_eq!(data.to_2d(1).unwrap().shape(), &[1, 3]);
        let data = ArrayData::from(array![[1.0, 2.0]]);
        assert_eq!(data.to_2d(0).unwrap(), data);
        let data = ArrayData::from(ArrayD::<f64>::zeros(IxDyn(&[1, 1, 1])));
        assert!(data.to_2d(0).is_err());
    }

    #[test]
    fn array_data_concatenate() {
        let a = ArrayData::from(array![[1i64, 2], [3, 4]]);
        let b = ArrayData::from(array![[5i64, 6]]);
        let out = ArrayData::concatenate(0, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(out, ArrayData::from(array![[1i64, 2], [3, 4], [5, 6]]));
        assert!(ArrayData::concatenate(1, &[a.clone(), b]).is_err());
        let c = ArrayData::from(array![[1.0, 2.0]]);
        assert!(matches!(
            ArrayData::concatenate(0, &[a, c]),
            Err(ArrayShapeError::IncompatibleDataType(
                DataType::Int64,
                DataType::Float64
            ))
        ));
        assert!(matches!(
            ArrayData::concatenate(0, &[]),
            Err(ArrayShapeError::Empty)
        ));
    }

    #[test]
    fn array_data_permuted() {
        let data = ArrayData::from(array![[30i64], [10], [20]]);
        let sorted = data.permuted(0, &[1, 2, 0]).unwrap();
        assert_eq!(sorted, ArrayData::from(array![[10i64], [20], [30]]));
        assert!(data.permuted(1, &[1, 2, 0]).is_err());
    }

    #[test]
    fn array_data_cast() {
        let data = ArrayData::from(array![[1.0, 2.0]]);
        assert_eq!(
            data.cast(DataType::Int64),
            Some(ArrayData::from(array![[1i64, 2]]))
        );
        let data = ArrayData::from(array![[1.5]]);
        assert_eq!(data.cast(DataType::Int64), None);
        assert_eq!(data.cast(DataType::String), None);
        let data = ArrayData::from(array![[7i64]]);
        assert_eq!(
            data.cast(DataType::Float64),
            Some(ArrayData::from(array![[7.0]]))
        );
    }

    #[test]
    fn array_data_elements() {
        let mut data = ArrayData::from(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(data.element(&[1, 0]).unwrap(), AttributeValue::Float(3.0));
        assert!(data.element(&[2, 0]).is_err());
        data.set_element(&[0, 1], &AttributeValue::Integer(9)).unwrap();
        assert_eq!(data.element(&[0, 1]).unwrap(), AttributeValue::Float(9.0));
        assert!(matches!(
            data.set_element(&[0, 0], &"x".into()),
            Err(ArrayElementError::IncompatibleValue(..))
        ));
        assert!(matches!(
            data.set_element(&[5, 0], &AttributeValue::Float(1.0)),
            Err(ArrayElementError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn array_data_vector() {
        assert!(ArrayData::from(array![[1i64, 2, 3]]).is_vector());
        assert!(ArrayData::from(array![[1i64], [2]]).is_vector());
        assert!(!ArrayData::from(array![[1i64, 2], [3, 4]]).is_vector());
        assert_eq!(
            ArrayData::from(array![[1i64], [2]]).flattened().shape(),
            &[2]
        );
    }
}
