//! Database version response
//!
//! Answer to the GET-DB-VERSION function: the server banner and the
//! release packed into one 32-bit number.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::constants::DATA_MESSAGE_OFFSET;
use crate::error::Result;

/// Decoded version response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DbVersion {
    /// Declared banner length
    pub length: u16,
    /// Server banner
    pub banner: String,
    /// Packed release number
    pub number: u32,
    /// Release as dotted text
    pub release: String,
}

impl DbVersion {
    /// Parse a version response from a DATA payload
    pub fn parse(buf: &mut ReadBuffer) -> Result<Self> {
        buf.set_position(DATA_MESSAGE_OFFSET + 1)?;
        let length = buf.read_ub2()?;
        let banner = buf.read_str(length as usize)?;
        let number = buf.read_ub4()?;
        Ok(Self {
            length,
            banner,
            number,
            release: release_text(number),
        })
    }
}

/// Unpack `major.minor.update.patch.port` from the packed number
pub fn release_text(number: u32) -> String {
    format!(
        "{}.{}.{}.{}.{}",
        number >> 24,
        (number >> 20) & 0x0F,
        (number >> 12) & 0xFF,
        (number >> 8) & 0x0F,
        number & 0xFF
    )
}
