//! Chunk encoding and decoding.
//!
//! Arrays are stored in a single chunk encoded with one array to bytes codec:
//!  - `bytes`: fixed size elements in C order with a configurable byte order, and
//!  - `vlen-utf8`: a little endian `u32` element count, then each element as a little endian `u32` byte length followed by UTF-8 bytes.

use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

use crate::{
    attributes::AttributeValue,
    metadata::{ChunkCodec, Endianness},
};

use super::{ArrayData, DataType};

/// A chunk encoding or decoding error.
#[derive(Debug, Error)]
pub enum ChunkCodecError {
    /// The chunk has an unexpected length.
    #[error("expected a chunk of {expected} bytes, got {got}")]
    UnexpectedLength {
        /// The expected length in bytes.
        expected: usize,
        /// The actual length in bytes.
        got: usize,
    },
    /// The encoded element count does not match the array shape.
    #[error("expected {expected} elements, got {got}")]
    UnexpectedElementCount {
        /// The number of elements in the array.
        expected: usize,
        /// The number of encoded elements.
        got: usize,
    },
    /// A variable length string chunk ended early.
    #[error("variable length string chunk is truncated")]
    Truncated,
    /// A string is not valid UTF-8.
    #[error(transparent)]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// The codec does not suit the data type.
    #[error("codec {0:?} cannot encode data type {1}")]
    UnsupportedDataType(ChunkCodec, DataType),
    /// An element is too long to be encoded.
    #[error("element of {0} bytes is too long")]
    ElementTooLong(usize),
    /// An ndarray shape error.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Encode array data to chunk bytes.
///
/// # Errors
/// Returns [`ChunkCodecError`] if `codec` does not suit the data type.
pub fn encode_chunk(data: &ArrayData, codec: ChunkCodec) -> Result<Vec<u8>, ChunkCodecError> {
    match (data, codec) {
        (ArrayData::Int64(array), ChunkCodec::Bytes(endianness)) => {
            let words: Vec<u64> = array
                .iter()
                .map(|&value| to_endianness(u64::from_ne_bytes(value.to_ne_bytes()), endianness))
                .collect();
            Ok(bytemuck::cast_slice(&words).to_vec())
        }
        (ArrayData::Float64(array), ChunkCodec::Bytes(endianness)) => {
            let words: Vec<u64> = array
                .iter()
                .map(|&value| to_endianness(value.to_bits(), endianness))
                .collect();
            Ok(bytemuck::cast_slice(&words).to_vec())
        }
        (ArrayData::String(array), ChunkCodec::VlenUtf8) => {
            let mut bytes = Vec::with_capacity(
                4 + array.iter().map(|element| 4 + element.len()).sum::<usize>(),
            );
            let count = u32::try_from(array.len())
                .map_err(|_| ChunkCodecError::ElementTooLong(array.len()))?;
            bytes.extend_from_slice(&count.to_le_bytes());
            for element in array {
                let len = u32::try_from(element.len())
                    .map_err(|_| ChunkCodecError::ElementTooLong(element.len()))?;
                bytes.extend_from_slice(&len.to_le_bytes());
                bytes.extend_from_slice(element.as_bytes());
            }
            Ok(bytes)
        }
        (data, codec) => Err(ChunkCodecError::UnsupportedDataType(codec, data.data_type())),
    }
}

/// Decode chunk bytes to array data with `shape`.
///
/// # Errors
/// Returns [`ChunkCodecError`] if the bytes are not a valid encoding of an array with `data_type` and `shape`.
pub fn decode_chunk(
    bytes: &[u8],
    codec: ChunkCodec,
    data_type: DataType,
    shape: &[usize],
) -> Result<ArrayData, ChunkCodecError> {
    let overflow = || ChunkCodecError::UnexpectedLength {
        expected: usize::MAX,
        got: bytes.len(),
    };
    let num_elements = shape
        .iter()
        .try_fold(1usize, |count, &size| count.checked_mul(size))
        .ok_or_else(overflow)?;
    match (data_type, codec) {
        (DataType::Int64 | DataType::Float64, ChunkCodec::Bytes(endianness)) => {
            let expected = num_elements.checked_mul(8).ok_or_else(overflow)?;
            if bytes.len() != expected {
                return Err(ChunkCodecError::UnexpectedLength {
                    expected,
                    got: bytes.len(),
                });
            }
            let words = bytemuck::pod_collect_to_vec::<u8, u64>(bytes)
                .into_iter()
                .map(|word| from_endianness(word, endianness));
            Ok(if data_type == DataType::Int64 {
                ArrayData::Int64(ArrayD::from_shape_vec(
                    IxDyn(shape),
                    words.map(|word| i64::from_ne_bytes(word.to_ne_bytes())).collect(),
                )?)
            } else {
                ArrayData::Float64(ArrayD::from_shape_vec(
                    IxDyn(shape),
                    words.map(f64::from_bits).collect(),
                )?)
            })
        }
        (DataType::String, ChunkCodec::VlenUtf8) => {
            let mut reader = VlenReader(bytes);
            let count = reader.read_u32()? as usize;
            if count != num_elements {
                return Err(ChunkCodecError::UnexpectedElementCount {
                    expected: num_elements,
                    got: count,
                });
            }
            let elements = (0..count)
                .map(|_| {
                    let len = reader.read_u32()? as usize;
                    Ok(String::from_utf8(reader.read(len)?.to_vec())?)
                })
                .collect::<Result<Vec<_>, ChunkCodecError>>()?;
            if !reader.0.is_empty() {
                return Err(ChunkCodecError::UnexpectedLength {
                    expected: bytes.len() - reader.0.len(),
                    got: bytes.len(),
                });
            }
            Ok(ArrayData::String(ArrayD::from_shape_vec(
                IxDyn(shape),
                elements,
            )?))
        }
        (data_type, codec) => Err(ChunkCodecError::UnsupportedDataType(codec, data_type)),
    }
}

struct VlenReader<'a>(&'a [u8]);

impl<'a> VlenReader<'a> {
    fn read(&mut self, len: usize) -> Result<&'a [u8], ChunkCodecError> {
        if self.0.len() < len {
            return Err(ChunkCodecError::Truncated);
        }
        let (head, tail) = self.0.split_at(len);
        self.0 = tail;
        Ok(head)
    }

    fn read_u32(&mut self) -> Result<u32, ChunkCodecError> {
        let bytes: [u8; 4] = self
            .read(4)?
            .try_into()
            .map_err(|_| ChunkCodecError::Truncated)?;
        Ok(u32::from_le_bytes(bytes))
    }
}

fn to_endianness(word: u64, endianness: Endianness) -> u64 {
    match endianness {
        Endianness::Little => word.to_le(),
        Endianness::Big => word.to_be(),
    }
}

fn from_endianness(word: u64, endianness: Endianness) -> u64 {
    match endianness {
        Endianness::Little => u64::from_le(word),
        Endianness::Big => u64::from_be(word),
    }
}

/// Parse a fill value from array metadata.
///
/// Float fill values may be written as `"NaN"`, `"Infinity"` or `"-Infinity"`.
/// Returns [`None`] if the fill value is not valid for `data_type`.
#[must_use]
pub fn fill_value_from_json(value: &serde_json::Value, data_type: DataType) -> Option<AttributeValue> {
    match (data_type, value) {
        (DataType::Int64, serde_json::Value::Number(number)) => {
            number.as_i64().map(AttributeValue::Integer)
        }
        (DataType::Float64, serde_json::Value::Number(number)) => {
            number.as_f64().map(AttributeValue::Float)
        }
        (DataType::Float64, serde_json::Value::String(string)) => match string.as_str() {
            "NaN" => Some(AttributeValue::Float(f64::NAN)),
            "Infinity" => Some(AttributeValue::Float(f64::INFINITY)),
            "-Infinity" => Some(AttributeValue::Float(f64::NEG_INFINITY)),
            _ => None,
        },
        (DataType::String, serde_json::Value::String(string)) => {
            Some(AttributeValue::String(string.clone()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn codec_bytes() {
        let data = ArrayData::from(array![[1i64, -2], [3, 4]]);
        let encoded = encode_chunk(&data, ChunkCodec::Bytes(Endianness::Little)).unwrap();
        assert_eq!(encoded.len(), 32);
        assert_eq!(&encoded[8..16], &(-2i64).to_le_bytes());
        let decoded = decode_chunk(
            &encoded,
            ChunkCodec::Bytes(Endianness::Little),
            DataType::Int64,
            &[2, 2],
        )
        .unwrap();
        assert_eq!(decoded, data);
        assert!(matches!(
            decode_chunk(
                &encoded[..24],
                ChunkCodec::Bytes(Endianness::Little),
                DataType::Int64,
                &[2, 2]
            ),
            Err(ChunkCodecError::UnexpectedLength {
                expected: 32,
                got: 24
            })
        ));
    }

    #[test]
    fn codec_shape_overflow() {
        for shape in [[usize::MAX, 2], [usize::MAX / 4, 1]] {
            assert!(matches!(
                decode_chunk(
                    &[0; 16],
                    ChunkCodec::Bytes(Endianness::Little),
                    DataType::Float64,
                    &shape
                ),
                Err(ChunkCodecError::UnexpectedLength {
                    expected: usize::MAX,
                    got: 16
                })
            ));
        }
        assert!(matches!(
            decode_chunk(&[0; 4], ChunkCodec::VlenUtf8, DataType::String, &[usize::MAX, 2]),
            Err(ChunkCodecError::UnexpectedLength { .. })
        ));
    }

    #[test]
    fn codec_bytes_big_endian() {
        let bytes: Vec<u8> = [1.5f64, -0.25]
            .iter()
            .flat_map(|value| value.to_be_bytes())
            .collect();
        let decoded = decode_chunk(
            &bytes,
            ChunkCodec::Bytes(Endianness::Big),
            DataType::Float64,
            &[2],
        )
        .unwrap();
        assert_eq!(decoded, ArrayData::from(array![1.5, -0.25].into_dyn()));
        let encoded = encode_chunk(&decoded, ChunkCodec::Bytes(Endianness::Big)).unwrap();
        assert_eq!(encoded, bytes);
    }

    #[test]
    fn codec_vlen_utf8() {
        let data = ArrayData::from(array![["a".to_string()], ["bcd".to_string()]]);
        let encoded = encode_chunk(&data, ChunkCodec::VlenUtf8).unwrap();
        assert_eq!(
            encoded,
            [
                &2u32.to_le_bytes()[..],
                &1u32.to_le_bytes(),
                b"a",
                &3u32.to_le_bytes(),
                b"bcd"
            ]
            .concat()
        );
        let decoded = decode_chunk(&encoded, ChunkCodec::VlenUtf8, DataType::String, &[2, 1]).unwrap();
        assert_eq!(decoded, data);
        assert!(matches!(
            decode_chunk(&encoded[..10], ChunkCodec::VlenUtf8, DataType::String, &[2, 1]),
            Err(ChunkCodecError::Truncated)
        ));
        assert!(matches!(
            decode_chunk(&encoded, ChunkCodec::VlenUtf8, DataType::String, &[3, 1]),
            Err(ChunkCodecError::UnexpectedElementCount { .. })
        ));
    }

    #[test]
    fn codec_unsupported() {
        let data = ArrayData::from(array![[1.0]]);
        assert!(encode_chunk(&data, ChunkCodec::VlenUtf8).is_err());
    }

    #[test]
    fn fill_value_json() {
        assert_eq!(
            fill_value_from_json(&"NaN".into(), DataType::Float64)
                .and_then(|value| value.as_f64())
                .map(f64::is_nan),
            Some(true)
        );
        assert_eq!(
            fill_value_from_json(&0.into(), DataType::Int64),
            Some(AttributeValue::Integer(0))
        );
        assert_eq!(fill_value_from_json(&0.5.into(), DataType::Int64), None);
        assert_eq!(fill_value_from_json(&"".into(), DataType::Int64), None);
    }
}
