//! MARKER and CONTROL packets
//!
//! Markers implement in-band breaks: a client interrupting a long call
//! sends BREAK, and both sides then exchange RESET markers before normal
//! traffic resumes. Control packets carry out-of-band notifications.
//!
//! ```text
//! MARKER                         CONTROL
//! Offset | Size | Description    Offset | Size | Description
//!      8 |    1 | Marker type        8 |    2 | Control type
//!      9 |    1 | Reserved          14 |    4 | Error code (inband only)
//!     10 |    1 | Marker data
//! ```

use serde::Serialize;

use crate::constants::{control_type, marker_type};
use crate::error::{OraError, Result};
use crate::packet::Packet;
use crate::session::Session;

/// Marker data of a BREAK that ends the break sequence
const MARKER_DATA_RESET: u8 = 2;

/// Parsed MARKER packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerMessage {
    /// BREAK, RESET or INTERRUPT
    pub marker_type: u8,
    /// Marker data byte
    pub data: u8,
}

impl MarkerMessage {
    /// Parse a MARKER packet
    pub fn parse(packet: &Packet) -> Result<Self> {
        let mut buf = packet.reader(false);
        let marker_type = buf.read_u8()?;
        buf.skip(1)?;
        let data = buf.read_u8()?;
        Ok(Self { marker_type, data })
    }

    /// Whether more packets of the same exchange follow
    pub fn expects_more(&self) -> bool {
        (self.marker_type == marker_type::BREAK && self.data != MARKER_DATA_RESET)
            || self.marker_type == marker_type::RESET
    }
}

/// Parsed CONTROL packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlMessage {
    /// Control type
    pub control_type: u16,
    /// Error reported by an inband notification
    pub error: Option<OraError>,
}

impl ControlMessage {
    /// Parse a CONTROL packet.
    ///
    /// Anything but an inband notification turns out-of-band breaks off
    /// for the session.
    pub fn parse(packet: &Packet, session: &mut Session) -> Result<Self> {
        let mut buf = packet.reader(false);
        let control_type = buf.read_u16_be()?;
        let error = if control_type == control_type::INBAND_NOTIFICATION {
            buf.set_position(14)?;
            Some(OraError::from_code(buf.read_u32_be()?))
        } else {
            session.support_oob = false;
            None
        };
        Ok(Self { control_type, error })
    }
}
