//! Fixed-layout binary records
//!
//! The watch describes most of its structured payloads as packed C
//! structs: integers are big-endian on the wire regardless of host
//! order, strings are fixed-width UTF-8 fields padded with NULs, and
//! application identifiers are opaque 16-byte values.
//!
//! [`RecordReader`] is a byte cursor with typed accessors for those
//! field shapes; record types implement [`DecodeRecord`] to state their
//! packed size and field order explicitly. Outbound variable-length
//! strings use a 1-byte length prefix (see [`put_pascal_str`]).

use uuid::Uuid;

use crate::error::{LinkError, Result};

/// A record decodable from a fixed-size packed layout.
pub trait DecodeRecord: Sized {
    /// Packed size of the record in bytes.
    const SIZE: usize;

    /// Decode the record from a cursor positioned at its first byte.
    fn decode(reader: &mut RecordReader<'_>) -> Result<Self>;
}

/// Decode a record from the leading bytes of a buffer.
///
/// Fails if fewer than `R::SIZE` bytes are available; trailing bytes
/// are ignored.
pub fn decode_record<R: DecodeRecord>(bytes: &[u8]) -> Result<R> {
    if bytes.len() < R::SIZE {
        return Err(LinkError::Record(format!(
            "record truncated: expected {} bytes, got {}",
            R::SIZE,
            bytes.len()
        )));
    }
    let mut reader = RecordReader::new(bytes);
    R::decode(&mut reader)
}

/// Cursor over a packed binary record.
pub struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes remaining after the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Take the next `n` raw bytes.
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(LinkError::Record(format!(
                "record truncated: needed {} bytes at offset {}, {} available",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a fixed-width string field of `width` bytes.
    ///
    /// The field is UTF-8, NUL-padded; content past the first NUL is
    /// discarded. Invalid UTF-8 decodes lossily rather than failing the
    /// whole record (device firmware has shipped stray bytes here).
    pub fn read_fixed_str(&mut self, width: usize) -> Result<String> {
        let raw = self.take(width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// Read an opaque 16-byte identifier.
    pub fn read_uuid(&mut self) -> Result<Uuid> {
        let raw = self.take(16)?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(raw);
        Ok(Uuid::from_bytes(bytes))
    }
}

/// Append a length-prefixed string to an outbound payload.
///
/// Format: 1-byte length + UTF-8 bytes. Strings longer than 255 bytes
/// are truncated on a character boundary.
pub fn put_pascal_str(out: &mut Vec<u8>, value: &str) {
    let mut end = value.len().min(255);
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    let bytes = &value.as_bytes()[..end];
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
}
