//! One-dimensional array values nested inside byte-array items
//!
//! Layout, relative to the start of the item payload:
//!
//! ```text
//! +---------+------+-------------+-----------+-----------+
//! | len i32 | ndim | data_offset | ptyp i16  | ltyp i16  |   16 bytes
//! +---------+------+-------------+-----------+-----------+
//! | dims[ndim] i32 | lower_bounds[ndim] i32              |
//! | null bitmap, present only when data_offset != 0      |
//! | padding to an 8-byte boundary                        |
//! | element data, NULL elements not stored               |
//! +------------------------------------------------------+
//! ```
//!
//! A set bitmap bit means the element is present.

use std::fmt;

use super::cursor::ByteCursor;
use super::errors::{XrgError, XrgResult};
use super::types::{align, LogicalType, PhysicalType};
use super::value::{decode_fixed, decode_variable, encode_fixed, encode_variable, Nesting, Value};

/// Size of the fixed array header
pub const ARRAY_HEADER_SIZE: usize = 16;

/// A decoded 1-D array. NULL elements are `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    /// Element physical type
    pub ptyp: PhysicalType,
    /// Element logical type
    pub ltyp: LogicalType,
    pub precision: i16,
    pub scale: i16,
    /// Dimension sizes; empty for a zero-dimension array
    pub dims: Vec<i32>,
    pub lower_bounds: Vec<i32>,
    pub values: Vec<Value>,
}

impl ArrayValue {
    /// Builds a 1-D array with lower bound 1.
    pub fn new(ptyp: PhysicalType, ltyp: LogicalType, values: Vec<Value>) -> Self {
        Self {
            ptyp,
            ltyp,
            precision: 0,
            scale: 0,
            dims: vec![values.len() as i32],
            lower_bounds: vec![1],
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_nulls(&self) -> bool {
        self.values.iter().any(Value::is_null)
    }
}

impl fmt::Display for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

fn header_overhead(ndim: usize, bitmap_len: usize) -> usize {
    align(8, ARRAY_HEADER_SIZE + 2 * 4 * ndim + bitmap_len)
}

/// Decodes the array stored in one byte-array item payload.
///
/// `precision` and `scale` come from the enclosing vector and apply to
/// decimal elements.
pub fn decode_array(buf: &[u8], precision: i16, scale: i16) -> XrgResult<ArrayValue> {
    let mut cursor = ByteCursor::new(buf);
    let _total_len = cursor.read_i32()?;
    let ndim = cursor.read_i32()?;
    let data_offset = cursor.read_i32()?;
    let ptyp_code = cursor.read_i16()?;
    let ltyp_code = cursor.read_i16()?;

    let ptyp = PhysicalType::from_i16(ptyp_code).ok_or_else(|| {
        XrgError::unsupported_type(format!("array element physical type {}", ptyp_code))
    })?;
    let ltyp = LogicalType::from_i16(ltyp_code).ok_or_else(|| {
        XrgError::unsupported_type(format!("array element logical type {}", ltyp_code))
    })?;

    let mut array = ArrayValue {
        ptyp,
        ltyp,
        precision,
        scale,
        dims: Vec::new(),
        lower_bounds: Vec::new(),
        values: Vec::new(),
    };

    if ndim == 0 {
        return Ok(array);
    }
    if ndim != 1 {
        return Err(XrgError::not_one_dim(ndim));
    }

    let nitems = cursor.read_i32()?;
    let lower_bound = cursor.read_i32()?;
    if nitems < 0 {
        return Err(XrgError::corruption(format!(
            "negative array dimension {}",
            nitems
        )));
    }
    let nitems = nitems as usize;
    array.dims.push(nitems as i32);
    array.lower_bounds.push(lower_bound);

    let bitmap = if data_offset != 0 {
        Some(cursor.take((nitems + 7) / 8)?)
    } else {
        None
    };
    cursor.seek(header_overhead(1, bitmap.map_or(0, |b| b.len())))?;

    array.values.reserve(nitems.min(cursor.remaining()));
    for i in 0..nitems {
        let present = bitmap.map_or(true, |b| b[i / 8] & (1 << (i % 8)) != 0);
        if !present {
            array.values.push(Value::Null);
            continue;
        }
        let value = match ptyp.fixed_width() {
            Some(_) => decode_fixed(&mut cursor, ptyp, ltyp, precision, scale)?,
            None => {
                let bytes = cursor.read_var()?;
                decode_variable(bytes, ltyp, precision, scale, Nesting::Element)?
            }
        };
        array.values.push(value);
    }

    Ok(array)
}

/// Encodes an array with the same layout `decode_array` reads.
pub fn encode_array(array: &ArrayValue) -> XrgResult<Vec<u8>> {
    if array.dims.is_empty() {
        if !array.values.is_empty() {
            return Err(XrgError::corruption("zero-dimension array with elements"));
        }
        let mut out = Vec::with_capacity(ARRAY_HEADER_SIZE);
        out.extend_from_slice(&(ARRAY_HEADER_SIZE as i32).to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&array.ptyp.as_i16().to_le_bytes());
        out.extend_from_slice(&array.ltyp.as_i16().to_le_bytes());
        return Ok(out);
    }
    if array.dims.len() != 1 {
        return Err(XrgError::not_one_dim(array.dims.len() as i32));
    }

    let nitems = array.values.len();
    let has_nulls = array.has_nulls();
    let bitmap_len = if has_nulls { (nitems + 7) / 8 } else { 0 };
    let data_start = header_overhead(1, bitmap_len);

    let mut data = Vec::new();
    let mut bitmap = vec![0u8; bitmap_len];
    for (i, value) in array.values.iter().enumerate() {
        if value.is_null() {
            continue;
        }
        if has_nulls {
            bitmap[i / 8] |= 1 << (i % 8);
        }
        match array.ptyp.fixed_width() {
            Some(_) => encode_fixed(&mut data, array.ptyp, value)?,
            None => {
                if let Value::Array(_) = value {
                    return Err(XrgError::nested_array());
                }
                encode_variable(&mut data, value)?
            }
        }
    }

    let total = data_start + data.len();
    let data_offset = if has_nulls { data_start as i32 } else { 0 };
    let lower_bound = array.lower_bounds.first().copied().unwrap_or(1);

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as i32).to_le_bytes());
    out.extend_from_slice(&1i32.to_le_bytes());
    out.extend_from_slice(&data_offset.to_le_bytes());
    out.extend_from_slice(&array.ptyp.as_i16().to_le_bytes());
    out.extend_from_slice(&array.ltyp.as_i16().to_le_bytes());
    out.extend_from_slice(&(nitems as i32).to_le_bytes());
    out.extend_from_slice(&lower_bound.to_le_bytes());
    out.extend_from_slice(&bitmap);
    out.resize(data_start, 0);
    out.extend_from_slice(&data);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(ndim: i32, data_offset: i32, ptyp: PhysicalType, ltyp: LogicalType) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&ndim.to_le_bytes());
        buf.extend_from_slice(&data_offset.to_le_bytes());
        buf.extend_from_slice(&ptyp.as_i16().to_le_bytes());
        buf.extend_from_slice(&ltyp.as_i16().to_le_bytes());
        buf
    }

    #[test]
    fn test_int32_array_with_null_bitmap() {
        // 16 header + 8 dims/lbs + 1 bitmap byte -> data at 32
        let mut buf = header(1, 32, PhysicalType::Int32, LogicalType::None);
        buf.extend_from_slice(&3i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.push(0b101);
        buf.resize(32, 0);
        buf.extend_from_slice(&10i32.to_le_bytes());
        buf.extend_from_slice(&30i32.to_le_bytes());

        let array = decode_array(&buf, 0, 0).unwrap();
        assert_eq!(
            array.values,
            vec![Value::Int32(10), Value::Null, Value::Int32(30)]
        );
        assert_eq!(array.dims, vec![3]);
        assert_eq!(array.lower_bounds, vec![1]);
    }

    #[test]
    fn test_array_without_bitmap() {
        // 16 + 8 = 24, already aligned
        let mut buf = header(1, 0, PhysicalType::Int64, LogicalType::None);
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&7i64.to_le_bytes());
        buf.extend_from_slice(&(-8i64).to_le_bytes());

        let array = decode_array(&buf, 0, 0).unwrap();
        assert_eq!(array.values, vec![Value::Int64(7), Value::Int64(-8)]);
        assert!(!array.has_nulls());
    }

    #[test]
    fn test_string_array() {
        let mut buf = header(1, 0, PhysicalType::ByteArray, LogicalType::String);
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        for s in ["ab", "xyz"] {
            buf.extend_from_slice(&(s.len() as i32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }

        let array = decode_array(&buf, 0, 0).unwrap();
        assert_eq!(
            array.values,
            vec![Value::String("ab".into()), Value::String("xyz".into())]
        );
        assert_eq!(array.to_string(), "[ab, xyz]");
    }

    #[test]
    fn test_zero_dimensions_is_empty() {
        let buf = header(0, 0, PhysicalType::Int32, LogicalType::None);
        let array = decode_array(&buf, 0, 0).unwrap();
        assert!(array.is_empty());
        assert!(array.dims.is_empty());
    }

    #[test]
    fn test_two_dimensions_rejected() {
        let mut buf = header(2, 0, PhysicalType::Int32, LogicalType::None);
        buf.extend_from_slice(&[0u8; 16]);
        let err = decode_array(&buf, 0, 0).unwrap_err();
        assert_eq!(err.message(), "array is not 1-D");
    }

    #[test]
    fn test_nested_array_element_rejected() {
        let mut buf = header(1, 0, PhysicalType::ByteArray, LogicalType::Array);
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&16i32.to_le_bytes());
        buf.extend_from_slice(&header(0, 0, PhysicalType::Int32, LogicalType::None));
        let err = decode_array(&buf, 0, 0).unwrap_err();
        assert_eq!(err.message(), "array is not 1-D");
    }

    #[test]
    fn test_truncated_elements() {
        let mut buf = header(1, 0, PhysicalType::Int32, LogicalType::None);
        buf.extend_from_slice(&4i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        assert!(decode_array(&buf, 0, 0).is_err());
    }

    #[test]
    fn test_unknown_element_type() {
        let mut buf = header(1, 0, PhysicalType::Int32, LogicalType::None);
        buf[12..14].copy_from_slice(&42i16.to_le_bytes());
        assert!(decode_array(&buf, 0, 0).is_err());
    }

    #[test]
    fn test_encoded_layout_matches_decoder() {
        let array = ArrayValue::new(
            PhysicalType::Int32,
            LogicalType::None,
            vec![Value::Int32(1), Value::Null, Value::Int32(3), Value::Null],
        );
        let bytes = encode_array(&array).unwrap();
        // header, dims, one bitmap byte, padded to 32, two stored elements
        assert_eq!(bytes.len(), 32 + 8);
        assert_eq!(bytes[24], 0b0101);
        assert_eq!(decode_array(&bytes, 0, 0).unwrap(), array);
    }
}
