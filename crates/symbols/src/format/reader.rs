//! Bounds-checked little-endian reader
//!
//! Every structure in PE images and metadata is little-endian except the
//! ECMA-335 compressed integers used inside blobs, which are big-endian
//! with a 1, 2 or 4 byte length prefix in the high bits:
//!
//! ```text
//! 0bbbbbbb                             -> 7 bits
//! 10bbbbbb bbbbbbbb                    -> 14 bits
//! 110bbbbb bbbbbbbb bbbbbbbb bbbbbbbb  -> 29 bits
//! ```

use crate::error::{SymbolError, SymbolResult};
use byteorder::{ByteOrder, LittleEndian};

/// Cursor over a byte slice
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> ByteReader<'a> {
    /// Create a reader at offset 0; `context` names the structure in errors
    pub fn new(data: &'a [u8], context: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            context,
        }
    }

    /// Create a reader positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize, context: &'static str) -> SymbolResult<Self> {
        if offset > data.len() {
            return Err(SymbolError::Truncated { context, offset });
        }
        Ok(Self {
            data,
            pos: offset,
            context,
        })
    }

    /// Current offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when nothing is left
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset
    pub fn seek(&mut self, offset: usize) -> SymbolResult<()> {
        if offset > self.data.len() {
            return Err(self.truncated());
        }
        self.pos = offset;
        Ok(())
    }

    /// Skip `n` bytes
    pub fn skip(&mut self, n: usize) -> SymbolResult<()> {
        self.bytes(n).map(|_| ())
    }

    /// Advance to the next multiple of `alignment` (relative to the slice start)
    pub fn align(&mut self, alignment: usize) -> SymbolResult<()> {
        let rem = self.pos % alignment;
        if rem != 0 {
            self.skip(alignment - rem)?;
        }
        Ok(())
    }

    /// Read `n` raw bytes
    pub fn bytes(&mut self, n: usize) -> SymbolResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| self.truncated())?;
        if end > self.data.len() {
            return Err(self.truncated());
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read one byte
    pub fn u8(&mut self) -> SymbolResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    /// Read a little-endian u16
    pub fn u16(&mut self) -> SymbolResult<u16> {
        Ok(LittleEndian::read_u16(self.bytes(2)?))
    }

    /// Read a little-endian u32
    pub fn u32(&mut self) -> SymbolResult<u32> {
        Ok(LittleEndian::read_u32(self.bytes(4)?))
    }

    /// Read a little-endian u64
    pub fn u64(&mut self) -> SymbolResult<u64> {
        Ok(LittleEndian::read_u64(self.bytes(8)?))
    }

    /// Read an index column of `width` bytes (2 or 4)
    pub fn index(&mut self, width: usize) -> SymbolResult<u32> {
        match width {
            2 => self.u16().map(u32::from),
            4 => self.u32(),
            other => Err(SymbolError::malformed(format!(
                "{}: invalid index width {}",
                self.context, other
            ))),
        }
    }

    /// Read a NUL-terminated UTF-8 string, consuming the terminator
    pub fn cstr(&mut self) -> SymbolResult<&'a str> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.truncated())?;
        let s = std::str::from_utf8(&rest[..len]).map_err(|e| {
            SymbolError::malformed(format!("{}: invalid UTF-8 at {}: {}", self.context, self.pos, e))
        })?;
        self.pos += len + 1;
        Ok(s)
    }

    /// Read an ECMA-335 compressed unsigned integer
    pub fn compressed_u32(&mut self) -> SymbolResult<u32> {
        self.compressed_with_width().map(|(value, _)| value)
    }

    /// Read an ECMA-335 compressed signed integer
    ///
    /// The value is stored rotated left by one bit so that the sign sits in
    /// bit 0, within the 7, 14 or 29 bit width chosen by the prefix.
    pub fn compressed_i32(&mut self) -> SymbolResult<i32> {
        let (raw, bits) = self.compressed_with_width()?;
        let magnitude = (raw >> 1) as i32;
        if raw & 1 == 0 {
            Ok(magnitude)
        } else {
            Ok(magnitude - (1i32 << (bits - 1)))
        }
    }

    fn compressed_with_width(&mut self) -> SymbolResult<(u32, u32)> {
        let start = self.pos;
        let b0 = u32::from(self.u8()?);
        if b0 & 0x80 == 0 {
            return Ok((b0, 7));
        }
        if b0 & 0xC0 == 0x80 {
            let b1 = u32::from(self.u8()?);
            return Ok((((b0 & 0x3F) << 8) | b1, 14));
        }
        if b0 & 0xE0 == 0xC0 {
            let rest = self.bytes(3)?;
            let value = ((b0 & 0x1F) << 24)
                | (u32::from(rest[0]) << 16)
                | (u32::from(rest[1]) << 8)
                | u32::from(rest[2]);
            return Ok((value, 29));
        }
        Err(SymbolError::malformed(format!(
            "{}: invalid compressed integer prefix 0x{:02X} at {}",
            self.context, b0, start
        )))
    }

    fn truncated(&self) -> SymbolError {
        SymbolError::Truncated {
            context: self.context,
            offset: self.pos,
        }
    }
}
