//! Typed column values and the per-type item codec
//!
//! One `Value` case per physical/logical pairing. Array elements reuse
//! the same cases; the decoder never produces an `Array` inside an array.

use std::fmt;

use super::array::{decode_array, encode_array, ArrayValue};
use super::cursor::ByteCursor;
use super::errors::{XrgError, XrgResult};
use super::int128::{i128_from_words, words_from_i128};
use super::types::{LogicalType, PhysicalType};
use super::vector::VectorHeader;

/// Interval stored in an int128 slot: microseconds, days, months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub usec: i64,
    pub day: i32,
    pub mon: i32,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mon {} day {} usec", self.mon, self.day, self.usec)
    }
}

/// Fixed-point number: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub unscaled: i128,
    pub precision: i16,
    pub scale: i16,
}

impl Decimal {
    pub fn new(unscaled: i128, precision: i16, scale: i16) -> Self {
        Self {
            unscaled,
            precision,
            scale,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale <= 0 {
            return write!(f, "{}", self.unscaled);
        }
        let scale = self.scale as usize;
        let digits = self.unscaled.unsigned_abs().to_string();
        let sign = if self.unscaled < 0 { "-" } else { "" };
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        } else {
            write!(f, "{}0.{:0>width$}", sign, digits, width = scale)
        }
    }
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL- or INVALID-flagged item
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    /// int32 with logical type date
    Date(i32),
    /// int64 with logical type time
    Time(i64),
    /// int64 with logical type timestamp
    Timestamp(i64),
    Interval(Interval),
    String(String),
    /// Byte array without a string or array interpretation
    Bytes(Vec<u8>),
    Array(ArrayValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the case, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Int128(_) => "int128",
            Value::Float32(_) => "float",
            Value::Float64(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::Interval(_) => "interval",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytea",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Int128(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::Interval(iv) => write!(f, "{}", iv),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(bytes) => {
                write!(f, "\\x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Value::Array(array) => write!(f, "{}", array),
        }
    }
}

/// Where a variable-width item sits; arrays are only legal at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Nesting {
    Column,
    Element,
}

/// Reads one fixed-width value of `ptyp` at the cursor.
pub(crate) fn decode_fixed(
    cursor: &mut ByteCursor<'_>,
    ptyp: PhysicalType,
    ltyp: LogicalType,
    precision: i16,
    scale: i16,
) -> XrgResult<Value> {
    let decimal = |unscaled: i128| Value::Decimal(Decimal::new(unscaled, precision, scale));
    let value = match ptyp {
        PhysicalType::Int8 => Value::Int8(cursor.read_i8()?),
        PhysicalType::Int16 => {
            let v = cursor.read_i16()?;
            match ltyp {
                LogicalType::Decimal => decimal(v as i128),
                _ => Value::Int16(v),
            }
        }
        PhysicalType::Int32 => {
            let v = cursor.read_i32()?;
            match ltyp {
                LogicalType::Decimal => decimal(v as i128),
                LogicalType::Date => Value::Date(v),
                _ => Value::Int32(v),
            }
        }
        PhysicalType::Int64 => {
            let v = cursor.read_i64()?;
            match ltyp {
                LogicalType::Decimal => decimal(v as i128),
                LogicalType::Time => Value::Time(v),
                LogicalType::Timestamp => Value::Timestamp(v),
                _ => Value::Int64(v),
            }
        }
        PhysicalType::Int128 => {
            if ltyp == LogicalType::Interval {
                let usec = cursor.read_i64()?;
                let day = cursor.read_i32()?;
                let mon = cursor.read_i32()?;
                Value::Interval(Interval { usec, day, mon })
            } else {
                let lo = cursor.read_u64()?;
                let hi = cursor.read_u64()?;
                let v = i128_from_words(lo, hi);
                match ltyp {
                    LogicalType::Decimal => decimal(v),
                    _ => Value::Int128(v),
                }
            }
        }
        PhysicalType::Fp32 => Value::Float32(cursor.read_f32()?),
        PhysicalType::Fp64 => Value::Float64(cursor.read_f64()?),
        PhysicalType::ByteArray => {
            return Err(XrgError::unsupported_type(
                "byte array read as a fixed-width value",
            ))
        }
    };
    Ok(value)
}

/// Interprets the payload of one `{length, bytes}` item.
pub(crate) fn decode_variable(
    bytes: &[u8],
    ltyp: LogicalType,
    precision: i16,
    scale: i16,
    nesting: Nesting,
) -> XrgResult<Value> {
    match ltyp {
        LogicalType::String => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_owned()))
            .map_err(|e| XrgError::corruption(format!("string item is not valid UTF-8: {}", e))),
        LogicalType::Array => match nesting {
            Nesting::Column => decode_array(bytes, precision, scale).map(Value::Array),
            Nesting::Element => Err(XrgError::nested_array()),
        },
        _ => Ok(Value::Bytes(bytes.to_vec())),
    }
}

/// Decodes the column item at the cursor and moves past it.
pub(crate) fn decode_item(cursor: &mut ByteCursor<'_>, header: &VectorHeader) -> XrgResult<Value> {
    match header.ptyp.fixed_width() {
        Some(_) => {
            let start = cursor.position();
            let value = decode_fixed(
                cursor,
                header.ptyp,
                header.ltyp,
                header.precision,
                header.scale,
            )?;
            cursor.seek(start + header.item_width())?;
            Ok(value)
        }
        None => {
            let bytes = cursor.read_var()?;
            decode_variable(
                bytes,
                header.ltyp,
                header.precision,
                header.scale,
                Nesting::Column,
            )
        }
    }
}

/// Moves past the column item at the cursor without decoding it.
pub(crate) fn skip_item(cursor: &mut ByteCursor<'_>, header: &VectorHeader) -> XrgResult<()> {
    match header.ptyp.fixed_width() {
        Some(_) => cursor.skip(header.item_width()),
        None => cursor.read_var().map(|_| ()),
    }
}

fn narrow<T: TryFrom<i128>>(unscaled: i128, ptyp: PhysicalType) -> XrgResult<T> {
    T::try_from(unscaled).map_err(|_| {
        XrgError::unsupported_type(format!("decimal {} does not fit {}", unscaled, ptyp))
    })
}

/// Appends the natural-width encoding of `value` as `ptyp`.
pub(crate) fn encode_fixed(out: &mut Vec<u8>, ptyp: PhysicalType, value: &Value) -> XrgResult<()> {
    match (ptyp, value) {
        (_, Value::Null) => {
            let width = ptyp.fixed_width().ok_or_else(|| {
                XrgError::unsupported_type("byte array written as a fixed-width value")
            })?;
            out.resize(out.len() + width, 0);
        }
        (PhysicalType::Int8, Value::Int8(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::Int16, Value::Int16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::Int16, Value::Decimal(d)) => {
            out.extend_from_slice(&narrow::<i16>(d.unscaled, ptyp)?.to_le_bytes())
        }
        (PhysicalType::Int32, Value::Int32(v)) | (PhysicalType::Int32, Value::Date(v)) => {
            out.extend_from_slice(&v.to_le_bytes())
        }
        (PhysicalType::Int32, Value::Decimal(d)) => {
            out.extend_from_slice(&narrow::<i32>(d.unscaled, ptyp)?.to_le_bytes())
        }
        (PhysicalType::Int64, Value::Int64(v))
        | (PhysicalType::Int64, Value::Time(v))
        | (PhysicalType::Int64, Value::Timestamp(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::Int64, Value::Decimal(d)) => {
            out.extend_from_slice(&narrow::<i64>(d.unscaled, ptyp)?.to_le_bytes())
        }
        (PhysicalType::Int128, Value::Int128(v)) => push_words(out, *v),
        (PhysicalType::Int128, Value::Decimal(d)) => push_words(out, d.unscaled),
        (PhysicalType::Int128, Value::Interval(iv)) => {
            out.extend_from_slice(&iv.usec.to_le_bytes());
            out.extend_from_slice(&iv.day.to_le_bytes());
            out.extend_from_slice(&iv.mon.to_le_bytes());
        }
        (PhysicalType::Fp32, Value::Float32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (PhysicalType::Fp64, Value::Float64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (ptyp, value) => {
            return Err(XrgError::unsupported_type(format!(
                "cannot encode {} as {}",
                value.type_name(),
                ptyp
            )))
        }
    }
    Ok(())
}

fn push_words(out: &mut Vec<u8>, value: i128) {
    let (lo, hi) = words_from_i128(value);
    out.extend_from_slice(&lo.to_le_bytes());
    out.extend_from_slice(&hi.to_le_bytes());
}

/// Appends `value` as a `{int32 length, bytes}` item.
pub(crate) fn encode_variable(out: &mut Vec<u8>, value: &Value) -> XrgResult<()> {
    let payload = match value {
        Value::Null => Vec::new(),
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Bytes(bytes) => bytes.clone(),
        Value::Array(array) => encode_array(array)?,
        other => {
            return Err(XrgError::unsupported_type(format!(
                "cannot encode {} as a byte array",
                other.type_name()
            )))
        }
    };
    let len = i32::try_from(payload.len())
        .map_err(|_| XrgError::corruption("variable-width item exceeds 2 GiB"))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}
