//! Decoder side of the wire format
//!
//! [`ReadBuffer`] is a cursor over one message's bytes. Every read is bounds
//! checked, and running off the end yields [`Error::BufferUnderflow`], which
//! the response decoder treats as "wait for the next packet".

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::constants::length;
use crate::error::{Error, Result};

/// Entry of a session or authentication dictionary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KeyValue {
    /// Key bytes
    #[serde(serialize_with = "crate::record::text_or_hex")]
    pub key: Bytes,
    /// Value bytes
    #[serde(serialize_with = "crate::record::text_or_hex")]
    pub value: Bytes,
    /// Flag code trailing the pair
    pub code: u32,
}

impl KeyValue {
    /// Key as lossy UTF-8
    pub fn key_str(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }

    /// Value as lossy UTF-8
    pub fn value_str(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// Bounds-checked cursor over message bytes
#[derive(Debug, Clone)]
pub struct ReadBuffer {
    data: Bytes,
    pos: usize,
    /// Chunk lengths inside long CLR values are UB4s instead of single bytes
    big_chunks: bool,
}

impl ReadBuffer {
    /// Cursor at the start of `data`
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            pos: 0,
            big_chunks: false,
        }
    }

    /// Cursor over a copy of `data`
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Cursor owning `data`
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self::new(Bytes::from(data))
    }

    /// Select the CLR chunk length encoding
    pub fn with_big_chunks(mut self, big_chunks: bool) -> Self {
        self.big_chunks = big_chunks;
        self
    }

    /// Offset of the next unread byte
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length, read bytes included
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying message is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unread byte count
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether at least `n` bytes are unread
    #[inline]
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Move the cursor to `pos`, used to rewind after a short read
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::BufferUnderflow {
                needed: pos,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Consume the next `n` bytes as a borrowed slice
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.remaining();
        if available < n {
            return Err(Error::BufferUnderflow { needed: n, available });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    /// Consume the next `N` bytes as an array
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Advance past `n` bytes
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Next byte, left unread
    pub fn peek_u8(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or(Error::BufferUnderflow {
            needed: 1,
            available: 0,
        })
    }

    /// Everything after the cursor
    pub fn read_rest(&mut self) -> Bytes {
        let rest = self.data.slice(self.pos..);
        self.pos = self.data.len();
        rest
    }

    /// One raw byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    /// The next `n` bytes without copying
    pub fn read_bytes_owned(&mut self, n: usize) -> Result<Bytes> {
        let start = self.pos;
        self.skip(n)?;
        Ok(self.data.slice(start..self.pos))
    }

    /// Fixed-width big-endian u16
    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.take_array().map(u16::from_be_bytes)
    }

    /// Fixed-width little-endian u16
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.take_array().map(u16::from_le_bytes)
    }

    /// Fixed-width big-endian u32
    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.take_array().map(u32::from_be_bytes)
    }

    /// Length byte, with the sign in its high bit, then that many magnitude
    /// bytes in big-endian order. `width` bounds the byte count.
    fn read_packed(&mut self, width: u8) -> Result<(u64, bool)> {
        let prefix = self.read_u8()?;
        let len = prefix & 0x7F;
        if len > width {
            return Err(Error::InvalidLengthIndicator(prefix));
        }
        let magnitude = self
            .take(len as usize)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        Ok((magnitude, prefix & 0x80 != 0))
    }

    fn read_signed(&mut self, width: u8) -> Result<i64> {
        let (magnitude, negative) = self.read_packed(width)?;
        let value = magnitude as i64;
        Ok(if negative { value.wrapping_neg() } else { value })
    }

    /// Compressed UB2
    pub fn read_ub2(&mut self) -> Result<u16> {
        Ok(self.read_packed(2)?.0 as u16)
    }

    /// Compressed UB4
    pub fn read_ub4(&mut self) -> Result<u32> {
        Ok(self.read_packed(4)?.0 as u32)
    }

    /// Compressed UB8
    pub fn read_ub8(&mut self) -> Result<u64> {
        Ok(self.read_packed(8)?.0)
    }

    /// Compressed SB2
    pub fn read_sb2(&mut self) -> Result<i16> {
        Ok(self.read_signed(2)? as i16)
    }

    /// Compressed SB4
    pub fn read_sb4(&mut self) -> Result<i32> {
        Ok(self.read_signed(4)? as i32)
    }

    /// Compressed SB8
    pub fn read_sb8(&mut self) -> Result<i64> {
        self.read_signed(8)
    }

    /// Skip a compressed UB2
    pub fn skip_ub2(&mut self) -> Result<()> {
        self.read_packed(2).map(|_| ())
    }

    /// Skip a compressed UB4
    pub fn skip_ub4(&mut self) -> Result<()> {
        self.read_packed(4).map(|_| ())
    }

    /// Skip a compressed UB8
    pub fn skip_ub8(&mut self) -> Result<()> {
        self.read_packed(8).map(|_| ())
    }

    /// CLR value.
    ///
    /// `0x00` and `0xFF` are empty. `0xFE` opens a run of length-prefixed
    /// chunks ending with an empty one; the prefixes are single bytes, or
    /// UB4s once big chunks are negotiated. Any other byte is the length of
    /// the bytes that follow.
    pub fn read_clr(&mut self) -> Result<Bytes> {
        match self.read_u8()? {
            0 | length::NULL_INDICATOR => Ok(Bytes::new()),
            length::LONG_INDICATOR => {
                let mut joined = BytesMut::new();
                loop {
                    let chunk_len = match self.big_chunks {
                        true => self.read_ub4()? as usize,
                        false => self.read_u8()? as usize,
                    };
                    if chunk_len == 0 {
                        return Ok(joined.freeze());
                    }
                    joined.extend_from_slice(self.take(chunk_len)?);
                }
            }
            n => self.read_bytes_owned(n as usize),
        }
    }

    /// UB4 length, then a CLR value cut to that length. A zero length has
    /// no CLR after it.
    pub fn read_dlc(&mut self) -> Result<Bytes> {
        let declared = self.read_ub4()? as usize;
        if declared == 0 {
            return Ok(Bytes::new());
        }
        let mut value = self.read_clr()?;
        value.truncate(declared);
        Ok(value)
    }

    /// Skip a DLC
    pub fn skip_dlc(&mut self) -> Result<()> {
        self.read_dlc().map(|_| ())
    }

    /// CLR value as text of at most `len` bytes
    pub fn read_str(&mut self, len: usize) -> Result<String> {
        let mut raw = self.read_clr()?;
        raw.truncate(len);
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Key DLC, value DLC, UB4 code
    pub fn read_key_value(&mut self) -> Result<KeyValue> {
        Ok(KeyValue {
            key: self.read_dlc()?,
            value: self.read_dlc()?,
            code: self.read_ub4()?,
        })
    }

    /// `count` consecutive key/value pairs
    pub fn read_key_values(&mut self, count: usize) -> Result<Vec<KeyValue>> {
        (0..count).map(|_| self.read_key_value()).collect()
    }

    /// Bytes up to a NUL or the end; the NUL is consumed
    pub fn read_null_terminated(&mut self) -> Result<Bytes> {
        let unread = &self.data[self.pos..];
        let (end, skip) = match unread.iter().position(|&b| b == 0) {
            Some(at) => (at, at + 1),
            None => (unread.len(), unread.len()),
        };
        let value = self.data.slice(self.pos..self.pos + end);
        self.pos += skip;
        Ok(value)
    }

    /// [`read_null_terminated`](Self::read_null_terminated) as lossy UTF-8
    pub fn read_null_terminated_string(&mut self) -> Result<String> {
        let raw = self.read_null_terminated()?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Single length byte followed by the bytes
    pub fn read_u8_prefixed(&mut self) -> Result<Bytes> {
        let len = self.read_u8()? as usize;
        self.read_bytes_owned(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &[u8]) -> ReadBuffer {
        ReadBuffer::from_slice(data)
    }

    #[test]
    fn test_running_off_the_end_is_underflow() {
        let mut buf = reader(&[0x42, 0x00]);
        assert_eq!(buf.read_u8().unwrap(), 0x42);
        assert!(matches!(
            buf.read_u16_be(),
            Err(Error::BufferUnderflow { needed: 2, available: 1 })
        ));
        assert_eq!(buf.position(), 1);
        assert!(buf.read_u8().is_ok());
        assert!(buf.read_u8().unwrap_err().is_truncated());
    }

    #[test]
    fn test_fixed_width_byte_orders() {
        let mut buf = reader(&[0x69, 0x03, 0x03, 0x69, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(buf.read_u16_le().unwrap(), 873);
        assert_eq!(buf.read_u16_be().unwrap(), 873);
        assert_eq!(buf.read_u32_be().unwrap(), 0x10000);
    }

    #[test]
    fn test_packed_unsigned() {
        let mut buf = reader(&[0x00, 0x02, 0x01, 0x02, 0x03, 0x01, 0x02, 0x03]);
        assert_eq!(buf.read_ub2().unwrap(), 0);
        assert_eq!(buf.read_ub4().unwrap(), 0x0102);
        assert_eq!(buf.read_ub4().unwrap(), 0x010203);
    }

    #[test]
    fn test_packed_too_wide_for_type() {
        let mut buf = reader(&[0x03, 0x01, 0x02, 0x03]);
        assert!(matches!(buf.read_ub2(), Err(Error::InvalidLengthIndicator(3))));
    }

    #[test]
    fn test_packed_negative() {
        let mut buf = reader(&[0x82, 0x01, 0x02, 0x81, 0x05]);
        assert_eq!(buf.read_sb4().unwrap(), -258);
        assert_eq!(buf.read_sb8().unwrap(), -5);
    }

    #[test]
    fn test_clr_forms() {
        let mut buf = reader(&[0x00, 0xFF, 0x02, b'h', b'i', 0xFE, 0x02, b'a', b'b', 0x01, b'c', 0x00]);
        assert!(buf.read_clr().unwrap().is_empty());
        assert!(buf.read_clr().unwrap().is_empty());
        assert_eq!(&buf.read_clr().unwrap()[..], b"hi");
        assert_eq!(&buf.read_clr().unwrap()[..], b"abc");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_clr_big_chunk_prefixes() {
        let mut buf = reader(&[0xFE, 0x01, 0x02, b'a', b'b', 0x00]).with_big_chunks(true);
        assert_eq!(&buf.read_clr().unwrap()[..], b"ab");
    }

    #[test]
    fn test_dlc_cut_to_declared_length() {
        let mut buf = reader(&[0x01, 0x02, 0x03, b'x', b'y', b'z', 0x00, 0x07]);
        assert_eq!(&buf.read_dlc().unwrap()[..], b"xy");
        assert!(buf.read_dlc().unwrap().is_empty());
        assert_eq!(buf.read_u8().unwrap(), 0x07);
    }

    #[test]
    fn test_key_value_with_code() {
        let mut buf = reader(&[
            0x01, 0x01, 0x01, b'K', //
            0x01, 0x02, 0x02, b'v', b'1', //
            0x01, 0xA3,
        ]);
        let kv = buf.read_key_value().unwrap();
        assert_eq!(kv.key_str(), "K");
        assert_eq!(kv.value_str(), "v1");
        assert_eq!(kv.code, 163);
    }

    #[test]
    fn test_null_terminated_runs() {
        let mut buf = reader(b"abc\0def");
        assert_eq!(buf.read_null_terminated_string().unwrap(), "abc");
        assert_eq!(buf.read_null_terminated_string().unwrap(), "def");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_str_cut_to_length() {
        let mut buf = reader(&[0x05, b'h', b'e', b'l', b'l', b'o']);
        assert_eq!(buf.read_str(4).unwrap(), "hell");
    }
}
