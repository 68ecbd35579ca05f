//! Protocol negotiation message
//!
//! The first TTC exchange after ACCEPT. The client names the protocol
//! versions it speaks and its driver; the server answers with its banner,
//! character sets and its compile-time and runtime capabilities.
//!
//! Request (offsets from the start of the packet):
//! ```text
//!     10 |    1 | Message type (1)
//!     11 |    1 | Protocol version
//!     12 |    n | Supported versions, zero terminated
//!      - |    n | Driver name, zero terminated
//! ```
//!
//! Response:
//! ```text
//!     10 |    1 | Message type (1)
//!     11 |    1 | Protocol version
//!     12 |    n | Supported versions, zero terminated
//!      - |    n | Server banner, zero terminated
//!      - |    2 | Character set id (little endian)
//!      - |    1 | Server flags
//!      - |    2 | Character set element count (little endian), 5 bytes each
//!      - |    2 | FDO length (big endian), then the FDO bytes
//!      - |    n | Compile-time caps, length byte first
//!      - |    n | Runtime caps, length byte first
//! ```

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::error::Result;
use crate::packet::Packet;
use crate::session::Session;

/// Offset of the protocol version byte
const VERSION_OFFSET: usize = 11;

/// Client side of protocol negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolRequest {
    /// Highest protocol version
    pub version: u8,
    /// All supported protocol versions
    #[serde(serialize_with = "crate::record::as_hex")]
    pub versions: Bytes,
    /// Driver name
    pub driver_name: String,
}

impl ProtocolRequest {
    /// Parse the client's protocol message
    pub fn parse(packet: &Packet) -> Result<Self> {
        let mut buf = packet.reader(false);
        buf.set_position(VERSION_OFFSET)?;
        let version = buf.read_u8()?;
        let versions = buf.read_null_terminated()?;
        let driver_name = buf.read_null_terminated_string()?;
        Ok(Self {
            version,
            versions,
            driver_name,
        })
    }
}

/// Server side of protocol negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolResponse {
    /// Protocol version
    pub version: u8,
    /// Supported protocol versions
    #[serde(serialize_with = "crate::record::as_hex")]
    pub versions: Bytes,
    /// Server banner
    pub banner: String,
    /// Database character set id
    pub charset_id: u16,
    /// Server flags
    pub flags: u8,
    /// Number of character set elements skipped
    pub charset_elements: u16,
    /// FDO array
    #[serde(serialize_with = "crate::record::as_hex")]
    pub fdo: Bytes,
    /// Server compile-time capabilities
    #[serde(serialize_with = "crate::record::as_hex")]
    pub compile_caps: Bytes,
    /// Server runtime capabilities
    #[serde(serialize_with = "crate::record::as_hex")]
    pub runtime_caps: Bytes,
    /// National character set id read from the FDO
    pub ncharset_id: Option<u16>,
}

impl ProtocolResponse {
    /// Parse the server's protocol message and record its capabilities
    pub fn parse(packet: &Packet, session: &mut Session) -> Result<Self> {
        let mut buf = packet.reader(false);
        buf.set_position(VERSION_OFFSET)?;
        let version = buf.read_u8()?;
        let versions = buf.read_null_terminated()?;
        let banner = buf.read_null_terminated_string()?;
        let charset_id = buf.read_u16_le()?;
        let flags = buf.read_u8()?;
        let charset_elements = buf.read_u16_le()?;
        buf.skip(charset_elements as usize * 5)?;

        let fdo_length = buf.read_u16_be()? as usize;
        let fdo = buf.read_bytes_owned(fdo_length)?;
        let compile_caps = buf.read_u8_prefixed()?;
        let runtime_caps = buf.read_u8_prefixed()?;
        let ncharset_id = ncharset_from_fdo(&fdo);

        let caps = &mut session.caps;
        caps.apply_server_protocol(compile_caps.clone(), runtime_caps.clone());
        caps.charset_id = charset_id;
        if let Some(id) = ncharset_id {
            caps.ncharset_id = id;
        }
        tracing::debug!(charset_id, ?ncharset_id, banner = %banner, "protocol negotiated");

        Ok(Self {
            version,
            versions,
            banner,
            charset_id,
            flags,
            charset_elements,
            fdo,
            compile_caps,
            runtime_caps,
            ncharset_id,
        })
    }
}

/// The national character set sits 3 bytes past the two variable FDO
/// sections whose lengths are at offsets 5 and 6
fn ncharset_from_fdo(fdo: &[u8]) -> Option<u16> {
    let skip = 6 + *fdo.get(5)? as usize + *fdo.get(6)? as usize;
    let mut buf = ReadBuffer::from_slice(fdo.get(skip + 3..skip + 5)?);
    buf.read_u16_be().ok()
}
