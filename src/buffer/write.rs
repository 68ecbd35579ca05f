//! Encoder side of the wire format
//!
//! Forwarded traffic is never re-encoded. Encoding is only needed to build
//! packets, and every `write_*` here mirrors a `read_*` on
//! [`ReadBuffer`](super::ReadBuffer).

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::length;
use crate::error::{Error, Result};

/// Values this long or shorter fit behind a single CLR length byte
const MAX_DIRECT_CLR: usize = 253;

/// Growable output buffer with an optional size ceiling
#[derive(Debug)]
pub struct WriteBuffer {
    data: BytesMut,
    limit: Option<usize>,
    big_chunks: bool,
}

impl WriteBuffer {
    /// Empty buffer sized for a typical packet
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    /// Empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            limit: None,
            big_chunks: false,
        }
    }

    /// Refuse writes that would grow the buffer past `limit` bytes
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Chunk lengths inside long CLR values are written as UB4s
    pub fn with_big_chunks(mut self, big_chunks: bool) -> Self {
        self.big_chunks = big_chunks;
        self
    }

    /// Bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing was written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Finish into shared bytes
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    /// Finish into a vector
    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Room for `n` more bytes, or the overflow
    fn room(&mut self, n: usize) -> Result<&mut BytesMut> {
        match self.limit {
            Some(limit) if self.data.len() + n > limit => Err(Error::BufferOverflow {
                needed: n,
                available: limit.saturating_sub(self.data.len()),
            }),
            _ => Ok(&mut self.data),
        }
    }

    /// One raw byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.room(1)?.put_u8(value);
        Ok(())
    }

    /// Raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.room(bytes.len())?.put_slice(bytes);
        Ok(())
    }

    /// `n` zero bytes
    pub fn write_zeros(&mut self, n: usize) -> Result<()> {
        self.room(n)?.put_bytes(0, n);
        Ok(())
    }

    /// Fixed-width big-endian u16
    pub fn write_u16_be(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Fixed-width little-endian u16
    pub fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Fixed-width big-endian u32
    pub fn write_u32_be(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Compressed UB2
    pub fn write_ub2(&mut self, value: u16) -> Result<()> {
        self.write_packed(u64::from(value), false)
    }

    /// Compressed UB4
    pub fn write_ub4(&mut self, value: u32) -> Result<()> {
        self.write_packed(u64::from(value), false)
    }

    /// Compressed UB8
    pub fn write_ub8(&mut self, value: u64) -> Result<()> {
        self.write_packed(value, false)
    }

    /// Signed form: the high bit of the length byte marks a negative value
    pub fn write_sb8(&mut self, value: i64) -> Result<()> {
        self.write_packed(value.unsigned_abs(), value < 0)
    }

    fn write_packed(&mut self, magnitude: u64, negative: bool) -> Result<()> {
        let raw = magnitude.to_be_bytes();
        let significant = &raw[magnitude.leading_zeros() as usize / 8..];
        let prefix = significant.len() as u8 | if negative { 0x80 } else { 0 };
        self.write_u8(prefix)?;
        self.write_bytes(significant)
    }

    /// CLR value. Anything past 253 bytes goes out as length-prefixed
    /// chunks after a 0xFE marker, closed by an empty chunk.
    pub fn write_clr(&mut self, data: &[u8]) -> Result<()> {
        if data.len() <= MAX_DIRECT_CLR {
            return self.write_u8_prefixed(data);
        }
        self.write_u8(length::LONG_INDICATOR)?;
        let chunk_size = if self.big_chunks { 32767 } else { 255 };
        for chunk in data.chunks(chunk_size).chain(std::iter::once(&[][..])) {
            match self.big_chunks {
                true => self.write_ub4(chunk.len() as u32)?,
                false => self.write_u8(chunk.len() as u8)?,
            }
            self.write_bytes(chunk)?;
        }
        Ok(())
    }

    /// Compressed length, then the CLR value unless it is empty
    pub fn write_dlc(&mut self, data: &[u8]) -> Result<()> {
        self.write_ub4(data.len() as u32)?;
        match data.is_empty() {
            true => Ok(()),
            false => self.write_clr(data),
        }
    }

    /// Key and value as DLCs, then the pair's flag code
    pub fn write_key_value(&mut self, key: &[u8], value: &[u8], code: u32) -> Result<()> {
        self.write_dlc(key)?;
        self.write_dlc(value)?;
        self.write_ub4(code)
    }

    /// Bytes followed by a NUL
    pub fn write_null_terminated(&mut self, data: &[u8]) -> Result<()> {
        self.write_bytes(data)?;
        self.write_u8(0)
    }

    /// Single length byte followed by the bytes
    pub fn write_u8_prefixed(&mut self, data: &[u8]) -> Result<()> {
        self.write_u8(data.len() as u8)?;
        self.write_bytes(data)
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for WriteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ReadBuffer;

    fn written(f: impl FnOnce(&mut WriteBuffer) -> Result<()>) -> Vec<u8> {
        let mut buf = WriteBuffer::new();
        f(&mut buf).unwrap();
        buf.into_vec()
    }

    #[test]
    fn test_packed_integers_drop_leading_zeros() {
        assert_eq!(written(|b| b.write_ub4(0)), [0x00]);
        assert_eq!(written(|b| b.write_ub2(0x0102)), [0x02, 0x01, 0x02]);
        assert_eq!(written(|b| b.write_ub4(0x010203)), [0x03, 0x01, 0x02, 0x03]);
        assert_eq!(
            written(|b| b.write_ub8(u64::MAX)),
            [0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(written(|b| b.write_sb8(-258)), [0x82, 0x01, 0x02]);
    }

    #[test]
    fn test_clr_switches_to_chunks_past_253_bytes() {
        assert_eq!(written(|b| b.write_clr(&[])), [0x00]);
        assert_eq!(written(|b| b.write_clr(&[0x41; 253]))[0], 253);

        let out = written(|b| b.write_clr(&[0x41; 254]));
        assert_eq!(&out[..2], &[0xFE, 254]);
        assert_eq!(out.len(), 2 + 254 + 1);
        assert_eq!(out.last(), Some(&0));
    }

    #[test]
    fn test_empty_dlc_is_only_a_length() {
        assert_eq!(written(|b| b.write_dlc(&[])), [0x00]);
        assert_eq!(written(|b| b.write_dlc(b"AB")), [0x01, 0x02, 0x02, b'A', b'B']);
    }

    #[test]
    fn test_limit_rejects_overflowing_write() {
        let mut buf = WriteBuffer::with_capacity(4).with_limit(3);
        buf.write_u16_be(1).unwrap();
        assert!(matches!(
            buf.write_u16_be(2),
            Err(Error::BufferOverflow { needed: 2, available: 1 })
        ));
        buf.write_u8(3).unwrap();
        assert_eq!(buf.as_slice(), &[0x00, 0x01, 0x03]);
    }

    #[test]
    fn test_big_chunk_clr_reads_back() {
        let data = vec![0x5Au8; 40000];
        let mut buf = WriteBuffer::new().with_big_chunks(true);
        buf.write_clr(&data).unwrap();
        let mut read = ReadBuffer::from_vec(buf.into_vec()).with_big_chunks(true);
        assert_eq!(read.read_clr().unwrap().len(), 40000);
        assert_eq!(read.remaining(), 0);
    }
}
