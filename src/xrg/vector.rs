//! XRG vector blocks
//!
//! A vector is one column's worth of a page:
//!
//! ```text
//! +----------------------+---------------------------+------------------+
//! | header (48 bytes LE) | data (compressed_len)     | flags (nitem)    |
//! +----------------------+---------------------------+------------------+
//! ```
//!
//! Header fields, little-endian:
//! - magic `XRG1` (4)
//! - ptyp, ltyp, field index, item size, scale, precision (i16 each)
//! - uncompressed length, compressed length, null count, item count (i32 each)
//! - reserved i32, 4 bytes padding, reserved i64
//!
//! The data region is an LZ4 block when the two lengths differ.

use super::cursor::ByteCursor;
use super::errors::{XrgError, XrgResult};
use super::types::{LogicalType, PhysicalType, FLAG_NULL};
use super::value::{encode_fixed, encode_variable, Value};

/// Size of the fixed vector header
pub const HEADER_SIZE: usize = 48;

/// Magic tag opening every vector and closing every container footer
pub const MAGIC: &[u8; 4] = b"XRG1";

/// Upper bound on LZ4 block expansion: one input byte never yields more than 255 output bytes
const LZ4_MAX_RATIO: usize = 255;

/// Decoded vector header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorHeader {
    pub ptyp: PhysicalType,
    pub ltyp: LogicalType,
    pub field_index: i16,
    /// Positive width for fixed-width columns, negative for byte arrays
    pub item_size: i16,
    pub scale: i16,
    pub precision: i16,
    pub uncompressed_len: i32,
    pub compressed_len: i32,
    pub null_count: i32,
    pub item_count: i32,
}

impl VectorHeader {
    /// Parses and checks the 48-byte header at the start of `buf`.
    pub fn decode(buf: &[u8]) -> XrgResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(XrgError::truncated("vector header", HEADER_SIZE, buf.len()));
        }
        let mut cursor = ByteCursor::new(&buf[..HEADER_SIZE]);
        let magic = cursor.take(4)?;
        if magic != MAGIC {
            return Err(XrgError::bad_magic(magic));
        }

        let ptyp_code = cursor.read_i16()?;
        let ltyp_code = cursor.read_i16()?;
        let ptyp = PhysicalType::from_i16(ptyp_code).ok_or_else(|| {
            XrgError::unsupported_type(format!("unknown physical type {}", ptyp_code))
        })?;
        let ltyp = LogicalType::from_i16(ltyp_code).ok_or_else(|| {
            XrgError::unsupported_type(format!("unknown logical type {}", ltyp_code))
        })?;

        let header = Self {
            ptyp,
            ltyp,
            field_index: cursor.read_i16()?,
            item_size: cursor.read_i16()?,
            scale: cursor.read_i16()?,
            precision: cursor.read_i16()?,
            uncompressed_len: cursor.read_i32()?,
            compressed_len: cursor.read_i32()?,
            null_count: cursor.read_i32()?,
            item_count: cursor.read_i32()?,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> XrgResult<()> {
        if self.uncompressed_len < 0 || self.compressed_len < 0 || self.item_count < 0 {
            return Err(XrgError::corruption(format!(
                "negative vector length (nbyte {}, zbyte {}, nitem {})",
                self.uncompressed_len, self.compressed_len, self.item_count
            )));
        }
        match self.ptyp.fixed_width() {
            None if self.item_size >= 0 => Err(XrgError::corruption(format!(
                "byte array column with item size {}",
                self.item_size
            ))),
            Some(width) if (self.item_size as i32) < width as i32 => {
                Err(XrgError::corruption(format!(
                    "{} column with item size {}",
                    self.ptyp, self.item_size
                )))
            }
            _ => Ok(()),
        }
    }

    /// Writes the header in wire layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(MAGIC);
        out[4..6].copy_from_slice(&self.ptyp.as_i16().to_le_bytes());
        out[6..8].copy_from_slice(&self.ltyp.as_i16().to_le_bytes());
        out[8..10].copy_from_slice(&self.field_index.to_le_bytes());
        out[10..12].copy_from_slice(&self.item_size.to_le_bytes());
        out[12..14].copy_from_slice(&self.scale.to_le_bytes());
        out[14..16].copy_from_slice(&self.precision.to_le_bytes());
        out[16..20].copy_from_slice(&self.uncompressed_len.to_le_bytes());
        out[20..24].copy_from_slice(&self.compressed_len.to_le_bytes());
        out[24..28].copy_from_slice(&self.null_count.to_le_bytes());
        out[28..32].copy_from_slice(&self.item_count.to_le_bytes());
        out
    }

    pub fn is_variable_width(&self) -> bool {
        self.ptyp.is_variable_width()
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed_len != self.uncompressed_len
    }

    /// Cursor step for fixed-width items. Zero for byte arrays.
    pub fn item_width(&self) -> usize {
        if self.item_size > 0 {
            self.item_size as usize
        } else {
            0
        }
    }

    /// Bytes the encoded vector occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.compressed_len as usize + self.item_count as usize
    }
}

/// One column block: header, uncompressed data and one flag byte per item.
///
/// Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vector {
    header: VectorHeader,
    data: Vec<u8>,
    flags: Vec<u8>,
}

impl Vector {
    /// Decodes a vector from the start of `buf`. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns `KITE_XRG_CORRUPTION` if:
    /// - the magic tag is wrong
    /// - declared lengths run past the buffer
    /// - decompression fails or yields a size other than the declared one
    /// - a fixed-width data region is too short for its item count
    pub fn decode(buf: &[u8]) -> XrgResult<Self> {
        let header = VectorHeader::decode(buf)?;
        let needed = header.encoded_len();
        if needed > buf.len() {
            return Err(XrgError::truncated("vector body", needed, buf.len()));
        }

        let zbyte = header.compressed_len as usize;
        let nbyte = header.uncompressed_len as usize;
        let nitem = header.item_count as usize;
        let region = &buf[HEADER_SIZE..HEADER_SIZE + zbyte];

        let data = if header.is_compressed() {
            if nbyte > zbyte.saturating_mul(LZ4_MAX_RATIO) {
                return Err(XrgError::decompress_failed(
                    nbyte,
                    format!("{} compressed bytes cannot expand to {}", zbyte, nbyte),
                ));
            }
            let mut data = vec![0u8; nbyte];
            let written = lz4_flex::block::decompress_into(region, &mut data).map_err(|e| {
                XrgError::decompress_failed(nbyte, format!("lz4 decompress failed: {}", e))
            })?;
            if written != nbyte {
                return Err(XrgError::decompress_failed(
                    nbyte,
                    format!("lz4 decompress returned {} bytes", written),
                ));
            }
            data
        } else {
            region.to_vec()
        };

        if let Some(width) = header.ptyp.fixed_width() {
            let step = header.item_width().max(width);
            if nitem.saturating_mul(step) > data.len() {
                return Err(XrgError::truncated(
                    "fixed-width data",
                    nitem.saturating_mul(step),
                    data.len(),
                ));
            }
        }

        let flags_start = HEADER_SIZE + zbyte;
        let flags = buf[flags_start..flags_start + nitem].to_vec();

        Ok(Self {
            header,
            data,
            flags,
        })
    }

    /// Encodes the vector. With `compress`, the data region is an LZ4
    /// block unless that would not save space.
    pub fn encode(&self, compress: bool) -> Vec<u8> {
        let mut header = self.header;
        let compressed = if compress {
            let block = lz4_flex::block::compress(&self.data);
            if block.len() < self.data.len() {
                Some(block)
            } else {
                None
            }
        } else {
            None
        };
        let region = compressed.as_deref().unwrap_or(&self.data);
        header.uncompressed_len = self.data.len() as i32;
        header.compressed_len = region.len() as i32;

        let mut out = Vec::with_capacity(HEADER_SIZE + region.len() + self.flags.len());
        out.extend_from_slice(&header.encode());
        out.extend_from_slice(region);
        out.extend_from_slice(&self.flags);
        out
    }

    pub fn header(&self) -> &VectorHeader {
        &self.header
    }

    /// Uncompressed data region
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn flags(&self) -> &[u8] {
        &self.flags
    }

    pub fn item_count(&self) -> usize {
        self.flags.len()
    }
}

/// Assembles a vector item by item.
///
/// ```ignore
/// let mut builder = VectorBuilder::new(PhysicalType::Int32, LogicalType::None);
/// builder.push(&Value::Int32(7))?;
/// builder.push(&Value::Null)?;
/// let vector = builder.finish()?;
/// ```
#[derive(Debug, Clone)]
pub struct VectorBuilder {
    ptyp: PhysicalType,
    ltyp: LogicalType,
    field_index: i16,
    precision: i16,
    scale: i16,
    data: Vec<u8>,
    flags: Vec<u8>,
    null_count: i32,
}

impl VectorBuilder {
    pub fn new(ptyp: PhysicalType, ltyp: LogicalType) -> Self {
        Self {
            ptyp,
            ltyp,
            field_index: 0,
            precision: 0,
            scale: 0,
            data: Vec::new(),
            flags: Vec::new(),
            null_count: 0,
        }
    }

    pub fn field_index(mut self, index: i16) -> Self {
        self.field_index = index;
        self
    }

    /// Sets decimal precision and scale.
    pub fn decimal(mut self, precision: i16, scale: i16) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Appends a value; `Value::Null` is stored with the NULL flag.
    pub fn push(&mut self, value: &Value) -> XrgResult<()> {
        let flag = if value.is_null() { FLAG_NULL } else { 0 };
        self.push_flagged(value, flag)
    }

    /// Appends a value with an explicit flag byte.
    pub fn push_flagged(&mut self, value: &Value, flag: u8) -> XrgResult<()> {
        match self.ptyp.fixed_width() {
            Some(_) => encode_fixed(&mut self.data, self.ptyp, value)?,
            None => encode_variable(&mut self.data, value)?,
        }
        if flag & FLAG_NULL != 0 {
            self.null_count += 1;
        }
        self.flags.push(flag);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn finish(self) -> XrgResult<Vector> {
        let too_large = || XrgError::corruption("vector exceeds the i32 size limits");
        let item_size = match self.ptyp.fixed_width() {
            Some(width) => width as i16,
            None => -1,
        };
        let nbyte = i32::try_from(self.data.len()).map_err(|_| too_large())?;
        let nitem = i32::try_from(self.flags.len()).map_err(|_| too_large())?;
        let header = VectorHeader {
            ptyp: self.ptyp,
            ltyp: self.ltyp,
            field_index: self.field_index,
            item_size,
            scale: self.scale,
            precision: self.precision,
            uncompressed_len: nbyte,
            compressed_len: nbyte,
            null_count: self.null_count,
            item_count: nitem,
        };
        Ok(Vector {
            header,
            data: self.data,
            flags: self.flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int32_vector(values: &[Option<i32>]) -> Vector {
        let mut builder = VectorBuilder::new(PhysicalType::Int32, LogicalType::None);
        for v in values {
            let value = v.map(Value::Int32).unwrap_or(Value::Null);
            builder.push(&value).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn test_header_layout() {
        let vector = int32_vector(&[Some(1), None]);
        let bytes = vector.encode(false);
        assert_eq!(&bytes[0..4], b"XRG1");
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), 3);
        assert_eq!(i16::from_le_bytes([bytes[10], bytes[11]]), 4);
        assert_eq!(i32::from_le_bytes(bytes[24..28].try_into().unwrap()), 1);
        assert_eq!(i32::from_le_bytes(bytes[28..32].try_into().unwrap()), 2);
        assert_eq!(bytes.len(), HEADER_SIZE + 8 + 2);
    }

    #[test]
    fn test_decode_encoded() {
        let vector = int32_vector(&[Some(1), Some(2), None, Some(4), Some(5)]);
        let decoded = Vector::decode(&vector.encode(false)).unwrap();
        assert_eq!(decoded, vector);
        assert_eq!(decoded.flags(), &[0, 0, FLAG_NULL, 0, 0]);
        assert_eq!(decoded.header().null_count, 1);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = int32_vector(&[Some(1)]).encode(false);
        bytes[0] = b'Y';
        let err = Vector::decode(&bytes).unwrap_err();
        assert_eq!(err.message(), "bad magic");
    }

    #[test]
    fn test_truncated_body() {
        let bytes = int32_vector(&[Some(1), Some(2)]).encode(false);
        assert!(Vector::decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(Vector::decode(&bytes[..20]).is_err());
    }

    #[test]
    fn test_unknown_physical_type() {
        let mut bytes = int32_vector(&[Some(1)]).encode(false);
        bytes[4..6].copy_from_slice(&0i16.to_le_bytes());
        assert!(Vector::decode(&bytes).is_err());
    }

    #[test]
    fn test_compressed_round_trip() {
        let values: Vec<Option<i32>> = (0..1000).map(|i| Some(i % 4)).collect();
        let vector = int32_vector(&values);
        let bytes = vector.encode(true);
        assert!(bytes.len() < vector.encode(false).len());
        let decoded = Vector::decode(&bytes).unwrap();
        assert!(decoded.header().is_compressed());
        assert_eq!(decoded.header().uncompressed_len, 4000);
        assert_eq!(decoded.data(), vector.data());
    }

    #[test]
    fn test_incompressible_data_stored_raw() {
        let vector = int32_vector(&[Some(0x1234_5678)]);
        let bytes = vector.encode(true);
        let header = VectorHeader::decode(&bytes).unwrap();
        assert!(!header.is_compressed());
    }

    #[test]
    fn test_decompressed_size_mismatch() {
        let values: Vec<Option<i32>> = (0..1000).map(|_| Some(9)).collect();
        let mut bytes = int32_vector(&values).encode(true);
        // claim one more uncompressed byte than the block holds
        bytes[16..20].copy_from_slice(&4001i32.to_le_bytes());
        assert!(Vector::decode(&bytes).is_err());
    }

    #[test]
    fn test_impossible_expansion_rejected_before_inflate() {
        let values: Vec<Option<i32>> = (0..1000).map(|_| Some(9)).collect();
        let mut bytes = int32_vector(&values).encode(true);
        bytes[16..20].copy_from_slice(&i32::MAX.to_le_bytes());
        let err = Vector::decode(&bytes).unwrap_err();
        assert_eq!(err.code(), crate::xrg::XrgErrorCode::KiteXrgCorruption);
        assert!(err.message().contains("cannot expand"));
    }

    #[test]
    fn test_byte_array_requires_negative_item_size() {
        let mut builder = VectorBuilder::new(PhysicalType::ByteArray, LogicalType::String);
        builder.push(&Value::String("a".into())).unwrap();
        let mut bytes = builder.finish().unwrap().encode(false);
        bytes[10..12].copy_from_slice(&4i16.to_le_bytes());
        assert!(Vector::decode(&bytes).is_err());
    }

    #[test]
    fn test_fixed_data_shorter_than_items() {
        let mut bytes = int32_vector(&[Some(1), Some(2)]).encode(false);
        // three items declared, eight data bytes present
        bytes[28..32].copy_from_slice(&3i32.to_le_bytes());
        bytes.push(0);
        assert!(Vector::decode(&bytes).is_err());
    }
}
