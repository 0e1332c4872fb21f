//! Packed vector containers
//!
//! Several encoded vectors followed by an offset table and footer:
//!
//! ```text
//! +-----------+-----------+-----+------------------+-------------+-------+
//! | vector 0  | vector 1  | ... | offsets (u64 LE) | count (i32) | XRG1  |
//! +-----------+-----------+-----+------------------+-------------+-------+
//! ```
//!
//! Offsets are absolute positions of each vector inside the buffer.

use std::fs;
use std::path::Path;

use super::errors::{XrgError, XrgResult};
use super::vector::{Vector, MAGIC};

/// Size of the `{count, magic}` footer
pub const FOOTER_SIZE: usize = 8;

const OFFSET_SIZE: usize = 8;

/// Decodes every vector referenced by the footer of `buf`, in offset-table order.
pub fn read_container(buf: &[u8]) -> XrgResult<Vec<Vector>> {
    if buf.len() < FOOTER_SIZE {
        return Err(XrgError::truncated("container footer", FOOTER_SIZE, buf.len()));
    }
    let footer = &buf[buf.len() - FOOTER_SIZE..];
    let count = i32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    if &footer[4..8] != MAGIC {
        return Err(XrgError::bad_magic(&footer[4..8]));
    }
    if count < 0 {
        return Err(XrgError::corruption(format!(
            "negative container vector count {}",
            count
        )));
    }

    let count = count as usize;
    let table_len = count.saturating_mul(OFFSET_SIZE);
    let body_len = buf.len() - FOOTER_SIZE;
    if table_len > body_len {
        return Err(XrgError::truncated("container offset table", table_len, body_len));
    }
    let table_start = body_len - table_len;

    buf[table_start..body_len]
        .chunks_exact(OFFSET_SIZE)
        .map(|chunk| {
            let mut raw = [0u8; OFFSET_SIZE];
            raw.copy_from_slice(chunk);
            let offset = u64::from_le_bytes(raw);
            let offset = usize::try_from(offset)
                .ok()
                .filter(|o| *o < table_start)
                .ok_or_else(|| {
                    XrgError::corruption(format!("vector offset {} outside container", offset))
                })?;
            Vector::decode(&buf[offset..table_start])
        })
        .collect()
}

/// Reads and decodes a container file.
pub fn read_container_file(path: impl AsRef<Path>) -> XrgResult<Vec<Vector>> {
    let path = path.as_ref();
    let buf = fs::read(path)
        .map_err(|e| XrgError::io(format!("failed to read {}", path.display()), e))?;
    read_container(&buf)
}

/// Builds a container buffer.
#[derive(Debug, Default)]
pub struct ContainerWriter {
    buf: Vec<u8>,
    offsets: Vec<u64>,
    compress: bool,
}

impl ContainerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress vector data regions on push.
    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn push(&mut self, vector: &Vector) {
        self.offsets.push(self.buf.len() as u64);
        self.buf.extend_from_slice(&vector.encode(self.compress));
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Appends the offset table and footer and returns the buffer.
    pub fn finish(mut self) -> XrgResult<Vec<u8>> {
        let count = i32::try_from(self.offsets.len())
            .map_err(|_| XrgError::corruption("too many vectors for one container"))?;
        for offset in &self.offsets {
            self.buf.extend_from_slice(&offset.to_le_bytes());
        }
        self.buf.extend_from_slice(&count.to_le_bytes());
        self.buf.extend_from_slice(MAGIC);
        Ok(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrg::types::{LogicalType, PhysicalType};
    use crate::xrg::value::Value;
    use crate::xrg::vector::VectorBuilder;

    fn column(values: &[i64]) -> Vector {
        let mut builder = VectorBuilder::new(PhysicalType::Int64, LogicalType::None);
        for v in values {
            builder.push(&Value::Int64(*v)).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let a = column(&[1, 2, 3]);
        let b = column(&[4, 5, 6]);
        let mut writer = ContainerWriter::new();
        writer.push(&a);
        writer.push(&b);
        let buf = writer.finish().unwrap();

        assert_eq!(&buf[buf.len() - 4..], b"XRG1");
        let vectors = read_container(&buf).unwrap();
        assert_eq!(vectors, vec![a, b]);
    }

    #[test]
    fn test_empty_container() {
        let buf = ContainerWriter::new().finish().unwrap();
        assert_eq!(buf.len(), FOOTER_SIZE);
        assert!(read_container(&buf).unwrap().is_empty());
    }

    #[test]
    fn test_bad_footer_magic() {
        let mut writer = ContainerWriter::new();
        writer.push(&column(&[1]));
        let mut buf = writer.finish().unwrap();
        let last = buf.len() - 1;
        buf[last] = b'2';
        assert!(read_container(&buf).is_err());
    }

    #[test]
    fn test_count_larger_than_buffer() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&5i32.to_le_bytes());
        buf.extend_from_slice(b"XRG1");
        assert!(read_container(&buf).is_err());
    }

    #[test]
    fn test_offset_out_of_range() {
        let mut writer = ContainerWriter::new();
        writer.push(&column(&[1]));
        let mut buf = writer.finish().unwrap();
        let table = buf.len() - FOOTER_SIZE - 8;
        buf[table..table + 8].copy_from_slice(&9999u64.to_le_bytes());
        assert!(read_container(&buf).is_err());
    }
}
