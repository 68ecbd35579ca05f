//! Data types negotiation message
//!
//! The client sends its compile-time and runtime capabilities together
//! with the list of data types it handles and the wire representation it
//! wants for each; the server answers with the list it accepts. Once the
//! answer is in, the effective TTC version is fixed for the connection.
//!
//! Request (offsets from the start of the packet):
//! ```text
//!     10 |    1 | Message type (2)
//!     11 |    2 | Character set id (little endian)
//!     13 |    2 | National character set id (little endian)
//!     15 |    1 | Encoding flags
//!     16 |    n | Compile-time caps, length byte first
//!      - |    n | Runtime caps, length byte first
//!      - |   11 | Client time zone (when runtime caps announce it)
//!      - |    4 | Client time zone version (when compile caps announce it)
//!      - |    2 | National character set id (little endian)
//!      - |    n | Data type entries, terminated by a zero type
//! ```
//!
//! Each entry is a data type, a conversion type, and when the conversion
//! type is not zero a representation and a reserved field. Entries are
//! single bytes, or 2-byte big endian values when the compile caps say so.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::error::Result;
use crate::packet::Packet;
use crate::session::Session;

/// Offset of the first field after the message type
const BODY_OFFSET: usize = 11;
/// Length of the client time zone block
const TIMEZONE_LENGTH: usize = 11;

/// One negotiated data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataTypeEntry {
    /// Data type code
    pub data_type: u16,
    /// Type the value is converted to on the wire, zero for none
    pub conv_data_type: u16,
    /// Wire representation
    pub representation: u16,
}

/// Client side of data types negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTypesRequest {
    /// Client character set id
    pub charset_id: u16,
    /// Client national character set id
    pub ncharset_id: u16,
    /// Encoding flags
    pub flags: u8,
    /// Client time zone file version
    pub tz_version: Option<u32>,
    /// Requested data types
    pub data_types: Vec<DataTypeEntry>,
}

impl DataTypesRequest {
    /// Parse the client's data types message and record its capabilities
    pub fn parse(packet: &Packet, session: &mut Session) -> Result<Self> {
        let mut buf = packet.reader(false);
        buf.set_position(BODY_OFFSET)?;
        let charset_id = buf.read_u16_le()?;
        let ncharset_id = buf.read_u16_le()?;
        let flags = buf.read_u8()?;
        let compile_caps = buf.read_u8_prefixed()?;
        let runtime_caps = buf.read_u8_prefixed()?;

        let caps = &mut session.caps;
        caps.apply_client_data_types(compile_caps, runtime_caps);

        let mut tz_version = None;
        if caps.has_timezone() {
            buf.skip(TIMEZONE_LENGTH)?;
            if caps.has_tz_version() {
                tz_version = Some(buf.read_u32_be()?);
            }
        }
        caps.client_tz_version = tz_version;
        // national character set id again
        buf.skip(2)?;

        let data_types = read_entries(&mut buf, caps)?;
        Ok(Self {
            charset_id,
            ncharset_id,
            flags,
            tz_version,
            data_types,
        })
    }
}

/// Server side of data types negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTypesResponse {
    /// Server time zone file version
    pub tz_version: Option<u32>,
    /// Accepted data types
    pub data_types: Vec<DataTypeEntry>,
}

impl DataTypesResponse {
    /// Parse the server's data types message and settle the TTC version
    pub fn parse(packet: &Packet, session: &mut Session) -> Result<Self> {
        let mut buf = packet.reader(false);
        buf.set_position(BODY_OFFSET)?;
        let caps = &mut session.caps;

        let mut tz_version = None;
        if caps.has_timezone() {
            buf.skip(TIMEZONE_LENGTH)?;
            if caps.has_tz_version() {
                tz_version = Some(buf.read_u32_be()?);
            }
        }
        caps.server_tz_version = tz_version;

        let data_types = read_entries(&mut buf, caps)?;
        caps.finish_data_types();
        Ok(Self {
            tz_version,
            data_types,
        })
    }
}

fn read_entries(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Vec<DataTypeEntry>> {
    let wide = caps.ub2_data_types();
    let read = |buf: &mut ReadBuffer| -> Result<u16> {
        if wide {
            buf.read_u16_be()
        } else {
            buf.read_u8().map(u16::from)
        }
    };

    let mut entries = Vec::new();
    loop {
        let data_type = read(buf)?;
        if data_type == 0 {
            break;
        }
        let conv_data_type = read(buf)?;
        let mut entry = DataTypeEntry {
            data_type,
            conv_data_type,
            representation: 0,
        };
        if conv_data_type != 0 {
            entry.representation = read(buf)?;
            read(buf)?;
        }
        entries.push(entry);
    }
    Ok(entries)
}
