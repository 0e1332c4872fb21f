//! Bounds-checked little-endian reads over a byte buffer
//!
//! Every read advances the cursor and is checked against the remaining
//! length, so a malformed buffer surfaces as `KITE_XRG_CORRUPTION`
//! instead of reading out of bounds.

use super::errors::{XrgError, XrgResult};

/// Forward-only reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Creates a cursor positioned at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> XrgResult<Self> {
        let mut cursor = Self::new(buf);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Moves to an absolute position. The end of the buffer is a valid position.
    pub fn seek(&mut self, pos: usize) -> XrgResult<()> {
        if pos > self.buf.len() {
            return Err(XrgError::truncated("seek", pos, self.buf.len()));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> XrgResult<()> {
        self.take(n).map(|_| ())
    }

    /// Returns the next `n` bytes and advances past them.
    pub fn take(&mut self, n: usize) -> XrgResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(XrgError::truncated("item", n, self.remaining()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> XrgResult<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> XrgResult<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> XrgResult<i8> {
        Ok(i8::from_le_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> XrgResult<i16> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> XrgResult<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> XrgResult<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> XrgResult<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> XrgResult<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> XrgResult<f64> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    /// Reads a `{int32 length, length bytes}` block.
    pub fn read_var(&mut self) -> XrgResult<&'a [u8]> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(XrgError::corruption(format!(
                "negative variable-width length {}",
                len
            )));
        }
        self.take(len as usize)
    }
}
