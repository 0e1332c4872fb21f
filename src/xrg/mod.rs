//! XRG1 columnar vector codec
//!
//! Query results travel as vectors: one binary block per output column,
//! carrying a 48-byte little-endian header, an optionally LZ4-compressed
//! data region and one flag byte per item. A page is one vector per
//! column, all with the same item count, and is read row by row through
//! a [`RowIterator`].
//!
//! # Guarantees
//!
//! - Every read is bounds-checked; malformed input is an error, never a panic
//! - Decompressed data must match the declared length exactly
//! - Arrays are one-dimensional and never nest
//! - Rows flagged INVALID on any column are never returned

mod array;
mod container;
mod cursor;
mod errors;
mod int128;
mod iterator;
mod types;
mod value;
mod vector;

pub use array::{decode_array, encode_array, ArrayValue, ARRAY_HEADER_SIZE};
pub use container::{read_container, read_container_file, ContainerWriter, FOOTER_SIZE};
pub use cursor::ByteCursor;
pub use errors::{Severity, XrgError, XrgErrorCode, XrgResult};
pub use int128::{i128_from_words, is_negative_words, words_from_i128};
pub use iterator::{Row, RowIterator};
pub use types::{
    align, is_supported_type, LogicalType, PhysicalType, FLAG_EXCEPTION, FLAG_INVALID,
    FLAG_NULL, SUPPORTED_TYPES,
};
pub use value::{Decimal, Interval, Value};
pub use vector::{Vector, VectorBuilder, VectorHeader, HEADER_SIZE, MAGIC};
