//! Primitive reader/writer helpers for the fixed-width, big-endian wire
//! format (spec §6). Every other module in this crate is built out of
//! these.

use aeon_types::CodecError;

/// A cursor over a borrowed byte slice that tracks how much has been
/// consumed, so callers can report exactly how many bytes a parsed value
/// occupied (needed for self-delimiting sequences inside a block body).
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32_be(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64_be(&mut self) -> Result<u64, CodecError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let b = self.take(N)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(b);
        Ok(arr)
    }

    /// Reads a `u32`-length-prefixed variable-length byte field.
    pub fn read_lp_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32_be()?;
        if len as usize > self.remaining() {
            return Err(CodecError::LengthOutOfBounds(len));
        }
        Ok(self.take(len as usize)?.to_vec())
    }
}

/// Appends a `u32` length prefix (big-endian) followed by `data`.
pub fn write_lp_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}
