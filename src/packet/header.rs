//! TNS packet header
//!
//! Every packet starts with 8 bytes:
//!
//! ```text
//! small SDU:  | length u16 | checksum u16 | type | flags | header checksum u16 |
//! large SDU:  |        length u32         | type | flags | header checksum u16 |
//! ```
//!
//! Which form is on the wire depends on the version the ACCEPT settled on;
//! CONNECT, ACCEPT and everything before the handshake ends use the small
//! form. Checksums are kept as read so a header writes back byte for byte.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{PacketType, PACKET_HEADER_SIZE};
use crate::error::{Error, Result};

/// Decoded packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketHeader {
    /// Declared packet length, header included
    pub length: u32,
    /// Packet checksum, always 0 in the large SDU form
    pub packet_checksum: u16,
    /// Packet type
    pub packet_type: PacketType,
    /// Packet flags
    pub flags: u8,
    /// Header checksum
    pub header_checksum: u16,
}

impl PacketHeader {
    /// Header of a `length` byte packet with no flags
    pub fn new(packet_type: PacketType, length: u32) -> Self {
        Self {
            length,
            packet_checksum: 0,
            packet_type,
            flags: 0,
            header_checksum: 0,
        }
    }

    /// Decode the first 8 bytes of `data`
    pub fn parse(data: &[u8], large_sdu: bool) -> Result<Self> {
        let Some(raw) = data.get(..PACKET_HEADER_SIZE) else {
            return Err(Error::PacketTooShort {
                expected: PACKET_HEADER_SIZE,
                actual: data.len(),
            });
        };
        let mut buf = ReadBuffer::from_slice(raw);
        let (length, packet_checksum) = match large_sdu {
            true => (buf.read_u32_be()?, 0),
            false => (u32::from(buf.read_u16_be()?), buf.read_u16_be()?),
        };
        Ok(Self {
            length,
            packet_checksum,
            packet_type: PacketType::try_from(buf.read_u8()?)?,
            flags: buf.read_u8()?,
            header_checksum: buf.read_u16_be()?,
        })
    }

    /// Encode in the given length form
    pub fn write(&self, buf: &mut WriteBuffer, large_sdu: bool) -> Result<()> {
        if large_sdu {
            buf.write_u32_be(self.length)?;
        } else {
            buf.write_u16_be(self.length as u16)?;
            buf.write_u16_be(self.packet_checksum)?;
        }
        buf.write_u8(self.packet_type as u8)?;
        buf.write_u8(self.flags)?;
        buf.write_u16_be(self.header_checksum)
    }

    /// Bytes after the header
    pub fn payload_length(&self) -> usize {
        (self.length as usize).saturating_sub(PACKET_HEADER_SIZE)
    }

    /// Whether `flag` is set
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// Declared length of the packet starting at `data`, `None` until the
/// length field is complete
pub fn peek_length(data: &[u8], large_sdu: bool) -> Option<usize> {
    match large_sdu {
        true => data.get(..4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize),
        false => data.get(..2).map(|b| u16::from_be_bytes([b[0], b[1]]) as usize),
    }
}

/// Assembles a packet around a payload; the length is filled in by
/// [`build`](PacketBuilder::build)
#[derive(Debug)]
pub struct PacketBuilder {
    header: PacketHeader,
    payload: WriteBuffer,
    large_sdu: bool,
}

impl PacketBuilder {
    /// Start a packet of the given type
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            header: PacketHeader::new(packet_type, 0),
            payload: WriteBuffer::new(),
            large_sdu: false,
        }
    }

    /// Use the 4-byte length form
    pub fn large_sdu(mut self, large_sdu: bool) -> Self {
        self.large_sdu = large_sdu;
        self
    }

    /// Write CLR values with big chunks
    pub fn big_chunks(mut self, big_chunks: bool) -> Self {
        self.payload = WriteBuffer::new().with_big_chunks(big_chunks);
        self
    }

    /// Set the header flags
    pub fn flags(mut self, flags: u8) -> Self {
        self.header.flags = flags;
        self
    }

    /// Payload written so far
    pub fn payload(&mut self) -> &mut WriteBuffer {
        &mut self.payload
    }

    /// Header followed by the payload
    pub fn build(mut self) -> Result<Bytes> {
        let total = PACKET_HEADER_SIZE + self.payload.len();
        self.header.length = total as u32;
        let mut out = WriteBuffer::with_capacity(total);
        self.header.write(&mut out, self.large_sdu)?;
        out.write_bytes(self.payload.as_slice())?;
        Ok(out.freeze())
    }
}
