//! XRG type codes, flag bits and the schema type table

use std::fmt;

/// Item is null
pub const FLAG_NULL: u8 = 1 << 0;
/// Item is invalid; rows carrying it are skipped by the iterator
pub const FLAG_INVALID: u8 = 1 << 1;
/// Item raised an exception upstream
pub const FLAG_EXCEPTION: u8 = 1 << 2;

/// Schema type names accepted in a request, scalar then array form
pub const SUPPORTED_TYPES: [&str; 24] = [
    "int8", "int16", "int32", "int64", "float", "double", "decimal", "string", "interval", "time",
    "date", "timestamp", "int8[]", "int16[]", "int32[]", "int64[]", "float[]", "double[]",
    "decimal[]", "string[]", "interval[]", "time[]", "date[]", "timestamp[]",
];

/// Returns true if `name` is one of the supported schema type names.
pub fn is_supported_type(name: &str) -> bool {
    SUPPORTED_TYPES.contains(&name)
}

/// Binary storage representation of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum PhysicalType {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Int128 = 5,
    Fp32 = 6,
    Fp64 = 7,
    ByteArray = 8,
}

impl PhysicalType {
    /// Convert from the wire code. Code 0 (unknown) and anything above
    /// the table return None.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(PhysicalType::Int8),
            2 => Some(PhysicalType::Int16),
            3 => Some(PhysicalType::Int32),
            4 => Some(PhysicalType::Int64),
            5 => Some(PhysicalType::Int128),
            6 => Some(PhysicalType::Fp32),
            7 => Some(PhysicalType::Fp64),
            8 => Some(PhysicalType::ByteArray),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// Natural width in bytes, None for the variable-width byte array.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            PhysicalType::Int8 => Some(1),
            PhysicalType::Int16 => Some(2),
            PhysicalType::Int32 | PhysicalType::Fp32 => Some(4),
            PhysicalType::Int64 | PhysicalType::Fp64 => Some(8),
            PhysicalType::Int128 => Some(16),
            PhysicalType::ByteArray => None,
        }
    }

    pub fn is_variable_width(self) -> bool {
        self.fixed_width().is_none()
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhysicalType::Int8 => "int8",
            PhysicalType::Int16 => "int16",
            PhysicalType::Int32 => "int32",
            PhysicalType::Int64 => "int64",
            PhysicalType::Int128 => "int128",
            PhysicalType::Fp32 => "fp32",
            PhysicalType::Fp64 => "fp64",
            PhysicalType::ByteArray => "bytea",
        };
        write!(f, "{}", name)
    }
}

/// Semantic interpretation layered on a physical type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum LogicalType {
    /// Code 0; servers may leave it unset, treated like `None`
    Unknown = 0,
    None = 1,
    String = 2,
    Decimal = 3,
    Interval = 4,
    Time = 5,
    Date = 6,
    Timestamp = 7,
    Array = 8,
}

impl LogicalType {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(LogicalType::Unknown),
            1 => Some(LogicalType::None),
            2 => Some(LogicalType::String),
            3 => Some(LogicalType::Decimal),
            4 => Some(LogicalType::Interval),
            5 => Some(LogicalType::Time),
            6 => Some(LogicalType::Date),
            7 => Some(LogicalType::Timestamp),
            8 => Some(LogicalType::Array),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::Unknown => "unknown",
            LogicalType::None => "none",
            LogicalType::String => "string",
            LogicalType::Decimal => "decimal",
            LogicalType::Interval => "interval",
            LogicalType::Time => "time",
            LogicalType::Date => "date",
            LogicalType::Timestamp => "timestamp",
            LogicalType::Array => "array",
        };
        write!(f, "{}", name)
    }
}

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
pub fn align(alignment: usize, value: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}
