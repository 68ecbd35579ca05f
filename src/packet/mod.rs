//! TNS packet encoding/decoding
//!
//! This module handles the TNS packet layer: the 8-byte packet header, the
//! reassembly of transport reads into whole packets, and the [`Packet`]
//! value every decoder works from.

mod framer;
mod header;

pub use framer::{cut_chunks, Framer};
pub use header::{peek_length, PacketBuilder, PacketHeader};

use bytes::{Bytes, BytesMut};

use crate::buffer::ReadBuffer;
use crate::constants::{PacketType, DATA_MESSAGE_OFFSET, PACKET_HEADER_SIZE};
use crate::error::Result;

/// A complete TNS packet with header and payload
#[derive(Debug, Clone)]
pub struct Packet {
    /// The packet header
    pub header: PacketHeader,
    /// The transport reads the packet was assembled from, in order
    pub chunks: Vec<Bytes>,
    /// The whole packet, header included
    data: Bytes,
}

impl Packet {
    /// Assemble a packet from consecutive transport reads
    pub fn from_chunks(chunks: Vec<Bytes>, large_sdu: bool) -> Result<Self> {
        let data = match chunks.as_slice() {
            [single] => single.clone(),
            _ => {
                let mut joined = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
                for chunk in &chunks {
                    joined.extend_from_slice(chunk);
                }
                joined.freeze()
            }
        };
        let header = PacketHeader::parse(&data, large_sdu)?;
        Ok(Self { header, chunks, data })
    }

    /// Create a packet from raw bytes
    pub fn from_bytes(data: Bytes, large_sdu: bool) -> Result<Self> {
        Self::from_chunks(vec![data], large_sdu)
    }

    /// Get the packet type
    pub fn packet_type(&self) -> PacketType {
        self.header.packet_type
    }

    /// The whole packet, header included
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Everything after the 8-byte header
    pub fn payload(&self) -> Bytes {
        self.data.slice(PACKET_HEADER_SIZE.min(self.data.len())..)
    }

    /// Get the total packet size
    pub fn total_size(&self) -> usize {
        self.data.len()
    }

    /// A reader over the whole packet, positioned at the first payload byte
    pub fn reader(&self, big_chunks: bool) -> ReadBuffer {
        let mut buf = ReadBuffer::new(self.data.clone()).with_big_chunks(big_chunks);
        // header length is checked on construction
        let _ = buf.set_position(PACKET_HEADER_SIZE);
        buf
    }

    /// Data flags of a DATA packet
    pub fn data_flags(&self) -> Option<u16> {
        if self.header.packet_type != PacketType::Data {
            return None;
        }
        let raw = self.data.get(PACKET_HEADER_SIZE..PACKET_HEADER_SIZE + 2)?;
        Some(u16::from_be_bytes([raw[0], raw[1]]))
    }

    /// TTC message code of a DATA packet
    pub fn message_code(&self) -> Option<u8> {
        if self.header.packet_type != PacketType::Data {
            return None;
        }
        self.data.get(DATA_MESSAGE_OFFSET).copied()
    }

    /// Check if this is a DATA packet
    pub fn is_data(&self) -> bool {
        self.header.packet_type == PacketType::Data
    }
}
