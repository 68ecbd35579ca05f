//! ACCEPT message
//!
//! The ACCEPT packet is sent by the server in response to a CONNECT packet
//! when the connection is accepted. It fixes the protocol version for the
//! rest of the connection, and with it the width of the packet length
//! field.
//!
//! Packet structure (offsets from the start of the packet):
//! ```text
//! Offset | Size | Description
//! -------+------+------------------
//!      8 |    2 | Protocol version
//!     10 |    2 | Service options
//!     12 |    2 | SDU size (16-bit)
//!     14 |    2 | TDU size (16-bit)
//!     16 |    2 | Hardware byte order
//!     18 |    2 | Data length (accept data)
//!     20 |    2 | Data offset
//!     22 |    1 | Connect flags 0
//!     23 |    1 | Connect flags 1
//!     28 |    2 | Reconnect address offset
//!     30 |    2 | Reconnect address length
//!     32 |    4 | SDU size (32-bit, if version >= 315)
//!     36 |    4 | TDU size (32-bit, if version >= 315)
//! ```

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::constants::{packet_flags, version};
use crate::error::Result;
use crate::packet::Packet;
use crate::session::Session;

/// Parsed ACCEPT message from server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptMessage {
    /// Negotiated protocol version
    pub version: u16,
    /// Service options from server
    pub service_options: u16,
    /// SDU size, 16-bit field
    pub sdu16: u16,
    /// TDU size, 16-bit field
    pub tdu16: u16,
    /// Hardware byte order marker
    pub histone: u16,
    /// Accept data length
    pub data_length: u16,
    /// Accept data offset
    pub data_offset: u16,
    /// Connect flags 0
    pub flags0: u8,
    /// Connect flags 1
    pub flags1: u8,
    /// Effective SDU size
    pub sdu: u32,
    /// Effective TDU size
    pub tdu: u32,
    /// Address to reconnect to, if the server named one
    pub reconnect_address: Option<String>,
    /// Accept data
    #[serde(serialize_with = "crate::record::as_hex")]
    pub accept_data: Bytes,
    /// Session id, when the SID packet flag is set
    #[serde(serialize_with = "crate::record::as_hex")]
    pub sid: Bytes,
}

impl AcceptMessage {
    /// Parse an ACCEPT packet and complete the handshake in the session
    pub fn parse(packet: &Packet, session: &mut Session) -> Result<Self> {
        let data = packet.data();
        let mut buf = ReadBuffer::new(data.clone());
        buf.set_position(8)?;

        let version = buf.read_u16_be()?;
        let service_options = buf.read_u16_be()?;
        let sdu16 = buf.read_u16_be()?;
        let tdu16 = buf.read_u16_be()?;
        let histone = buf.read_u16_be()?;
        let data_length = buf.read_u16_be()?;
        let data_offset = buf.read_u16_be()?;
        let flags0 = buf.read_u8()?;
        let flags1 = buf.read_u8()?;

        buf.set_position(28)?;
        let reconnect_start = buf.read_u16_be()? as usize;
        let reconnect_length = buf.read_u16_be()? as usize;

        let (sdu, tdu) = if version >= version::MIN_LARGE_SDU {
            (buf.read_u32_be()?, buf.read_u32_be()?)
        } else {
            (sdu16 as u32, tdu16 as u32)
        };

        let reconnect_address = (reconnect_start != 0 && reconnect_length != 0)
            .then(|| data.get(reconnect_start..reconnect_start + reconnect_length))
            .flatten()
            .map(|raw| String::from_utf8_lossy(raw).into_owned());

        let start = (data_offset as usize).min(data.len());
        let accept_data = data.slice(start..);

        let sid = if packet.header.has_flag(packet_flags::SID) {
            let end = (start + data_length as usize).min(data.len());
            data.slice(end..)
        } else {
            Bytes::new()
        };

        session.version = version;
        session.sdu = sdu;
        session.tdu = tdu;
        session.handshake_complete = true;
        tracing::debug!(version, sdu, tdu, "handshake accepted");

        Ok(Self {
            version,
            service_options,
            sdu16,
            tdu16,
            histone,
            data_length,
            data_offset,
            flags0,
            flags1,
            sdu,
            tdu,
            reconnect_address,
            accept_data,
            sid,
        })
    }
}
