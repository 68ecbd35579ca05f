//! CONNECT message
//!
//! The first packet a client sends. It proposes protocol versions and data
//! unit sizes and carries the connect descriptor.
//!
//! Packet structure (offsets from the start of the packet):
//! ```text
//! Offset | Size | Description
//! -------+------+------------------
//!      8 |    2 | Protocol version desired
//!     10 |    2 | Protocol version minimum
//!     12 |    2 | Service options
//!     14 |    2 | SDU size (16-bit)
//!     16 |    2 | TDU size (16-bit)
//!     18 |    2 | Protocol characteristics
//!     20 |    2 | Line turnaround
//!     22 |    2 | Value of 1 in hardware byte order
//!     24 |    2 | Connect data length
//!     26 |    2 | Connect data offset
//!     32 |    1 | Connect flags 0
//!     33 |    1 | Connect flags 1
//!     58 |    4 | SDU size (32-bit)
//!     62 |    4 | TDU size (32-bit)
//!     66 |    4 | Connect flags 1 (when data offset > 70)
//!     70 |    4 | Connect flags 2 (when data offset > 70)
//! ```
//!
//! A connect descriptor longer than 230 bytes does not fit in the CONNECT
//! packet and follows in a DATA packet of its own.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::constants::connection;
use crate::error::Result;
use crate::packet::Packet;
use crate::session::{ConnectContext, Session};

/// Parsed CONNECT message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectMessage {
    /// Highest protocol version the client speaks
    pub version: u16,
    /// Lowest protocol version the client accepts
    pub min_version: u16,
    /// Global service options
    pub service_options: u16,
    /// SDU size, 16-bit field
    pub sdu16: u16,
    /// TDU size, 16-bit field
    pub tdu16: u16,
    /// Protocol characteristics
    pub protocol_characteristics: u16,
    /// Line turnaround value
    pub line_turnaround: u16,
    /// The value 1 in the client's byte order
    pub our_one: u16,
    /// Declared connect data length
    pub connect_data_length: u16,
    /// Offset of the connect data in the packet
    pub connect_data_offset: u16,
    /// Connect flags 0
    pub flags0: u8,
    /// Connect flags 1
    pub flags1: u8,
    /// SDU size, 32-bit field
    pub sdu: u32,
    /// TDU size, 32-bit field
    pub tdu: u32,
    /// Extended connect flags 1
    pub connect_flags1: u32,
    /// Extended connect flags 2
    pub connect_flags2: u32,
    /// Connect descriptor, absent when it follows in a DATA packet
    pub connect_data: Option<String>,
}

impl ConnectMessage {
    /// Parse a CONNECT packet and record the proposal in the session.
    ///
    /// Returns the message and whether the connect data overflows into the
    /// next packet.
    pub fn parse(packet: &Packet, session: &mut Session) -> Result<(Self, bool)> {
        let data = packet.data();
        let mut buf = ReadBuffer::new(data.clone());
        buf.set_position(8)?;
        let version = buf.read_u16_be()?;
        let min_version = buf.read_u16_be()?;
        let service_options = buf.read_u16_be()?;
        let sdu16 = buf.read_u16_be()?;
        let tdu16 = buf.read_u16_be()?;
        let protocol_characteristics = buf.read_u16_be()?;
        let line_turnaround = buf.read_u16_be()?;
        let our_one = buf.read_u16_be()?;
        let connect_data_length = buf.read_u16_be()?;
        let connect_data_offset = buf.read_u16_be()?;

        buf.set_position(32)?;
        let flags0 = buf.read_u8()?;
        let flags1 = buf.read_u8()?;

        // very old clients stop before the 32-bit sizes
        let (sdu, tdu) = if data.len() >= 66 {
            buf.set_position(58)?;
            (buf.read_u32_be()?, buf.read_u32_be()?)
        } else {
            (sdu16 as u32, tdu16 as u32)
        };

        let (connect_flags1, connect_flags2) = if connect_data_offset > connection::CONNECT_FLAGS_OFFSET {
            buf.set_position(66)?;
            (buf.read_u32_be()?, buf.read_u32_be()?)
        } else {
            (0, 0)
        };

        let overflow = connect_data_length > connection::MAX_CONNECT_DATA;
        let connect_data = if overflow {
            None
        } else {
            let start = (connect_data_offset as usize).min(data.len());
            Some(String::from_utf8_lossy(&data[start..]).into_owned())
        };

        let msg = Self {
            version,
            min_version,
            service_options,
            sdu16,
            tdu16,
            protocol_characteristics,
            line_turnaround,
            our_one,
            connect_data_length,
            connect_data_offset,
            flags0,
            flags1,
            sdu,
            tdu,
            connect_flags1,
            connect_flags2,
            connect_data,
        };

        session.connect = Some(ConnectContext {
            version,
            min_version,
            service_options,
            sdu,
            tdu,
        });
        if connect_flags2 == connection::SUPPORT_OOB {
            session.support_oob = true;
        }
        tracing::trace!(version, min_version, sdu, overflow, "connect");
        Ok((msg, overflow))
    }
}

/// Connect descriptor that did not fit in the CONNECT packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionData {
    /// Connect descriptor text
    pub connect_data: String,
}

impl ConnectionData {
    /// Parse the DATA packet following an oversized CONNECT
    pub fn parse(packet: &Packet) -> Self {
        let payload: Bytes = packet.data().slice(10.min(packet.data().len())..);
        Self {
            connect_data: String::from_utf8_lossy(&payload).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect_packet(descriptor: &[u8], declared_len: u16, oob: bool) -> Packet {
        let offset = 74u16;
        let mut data = vec![0u8; offset as usize];
        data[4] = 1; // CONNECT
        data[8..10].copy_from_slice(&319u16.to_be_bytes());
        data[10..12].copy_from_slice(&300u16.to_be_bytes());
        data[14..16].copy_from_slice(&8192u16.to_be_bytes());
        data[16..18].copy_from_slice(&65535u16.to_be_bytes());
        data[22..24].copy_from_slice(&1u16.to_be_bytes());
        data[24..26].copy_from_slice(&declared_len.to_be_bytes());
        data[26..28].copy_from_slice(&offset.to_be_bytes());
        data[32] = 0x41;
        data[33] = 0x41;
        data[58..62].copy_from_slice(&2_097_152u32.to_be_bytes());
        data[62..66].copy_from_slice(&2_097_152u32.to_be_bytes());
        if oob {
            data[70..74].copy_from_slice(&1u32.to_be_bytes());
        }
        data.extend_from_slice(descriptor);
        let len = data.len() as u16;
        data[0..2].copy_from_slice(&len.to_be_bytes());
        Packet::from_bytes(Bytes::from(data), false).unwrap()
    }

    #[test]
    fn test_parse_connect() {
        let descriptor = "(DESCRIPTION=(CONNECT_DATA=(SERVICE_NAME=FREEPDB1)))";
        let packet = connect_packet(descriptor.as_bytes(), descriptor.len() as u16, true);
        let mut session = Session::new();
        let (msg, overflow) = ConnectMessage::parse(&packet, &mut session).unwrap();

        assert!(!overflow);
        assert_eq!(msg.version, 319);
        assert_eq!(msg.min_version, 300);
        assert_eq!(msg.sdu16, 8192);
        assert_eq!(msg.sdu, 2_097_152);
        assert_eq!(msg.connect_flags2, 1);
        assert_eq!(msg.connect_data.as_deref(), Some(descriptor));
        assert!(session.support_oob);
        assert_eq!(session.connect.as_ref().map(|c| c.min_version), Some(300));
    }

    #[test]
    fn test_long_descriptor_overflows() {
        let packet = connect_packet(b"", 400, false);
        let mut session = Session::new();
        let (msg, overflow) = ConnectMessage::parse(&packet, &mut session).unwrap();
        assert!(overflow);
        assert_eq!(msg.connect_data, None);
        assert!(!session.support_oob);
    }

    #[test]
    fn test_connection_data() {
        let mut data = vec![0x00, 0x10, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(b"(ADDR)");
        let packet = Packet::from_bytes(Bytes::from(data), false).unwrap();
        assert_eq!(ConnectionData::parse(&packet).connect_data, "(ADDR)");
    }
}
