//! REDIRECT message
//!
//! The listener answers a CONNECT with REDIRECT when the client has to
//! reconnect elsewhere, typically to a dispatcher or another instance.
//!
//! Packet structure (offsets from the start of the packet):
//! ```text
//! Offset | Size | Description
//! -------+------+------------------
//!      8 |    2 | Data length
//!     10 |    n | Redirect address, optionally NUL + redirect data
//! ```
//!
//! A REDIRECT packet with no room for the data is followed by a DATA
//! packet carrying it from offset 10.

use serde::Serialize;

use crate::constants::packet_flags;
use crate::error::Result;
use crate::packet::Packet;

/// Offset of the redirect text in both packet forms
const REDIRECT_DATA_OFFSET: usize = 10;

/// Parsed REDIRECT message, or the DATA packet continuing one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedirectMessage {
    /// Declared data length, zero for the DATA continuation
    pub data_length: u16,
    /// Address to connect to
    pub address: String,
    /// Redirect data following the address, starting at the NUL
    pub data: String,
}

impl RedirectMessage {
    /// Parse a REDIRECT packet.
    ///
    /// Returns the message and whether the text follows in a DATA packet.
    pub fn parse(packet: &Packet) -> Result<(Self, bool)> {
        let mut buf = packet.reader(false);
        let data_length = buf.read_u16_be()?;
        if packet.header.length as usize <= REDIRECT_DATA_OFFSET {
            let msg = Self {
                data_length,
                ..Default::default()
            };
            return Ok((msg, true));
        }
        let text = buf.read_bytes_owned(data_length as usize)?;
        let (address, data) = split_redirect(&text, packet.header.flags);
        Ok((
            Self {
                data_length,
                address,
                data,
            },
            false,
        ))
    }

    /// Parse the DATA packet that carries the text of a short REDIRECT
    pub fn parse_data(packet: &Packet) -> Self {
        let all = packet.data();
        let text = all.get(REDIRECT_DATA_OFFSET..).unwrap_or_default();
        let (address, data) = split_redirect(text, packet.header.flags);
        Self {
            data_length: 0,
            address,
            data,
        }
    }
}

/// Split address and data at the first NUL when the packet flags say
/// redirect data is present
fn split_redirect(text: &[u8], flags: u8) -> (String, String) {
    let text = String::from_utf8_lossy(text);
    match text.find('\0') {
        Some(nul) if flags & packet_flags::REDIRECT_DATA != 0 && nul > 0 => {
            (text[..nul].to_string(), text[nul..].to_string())
        }
        _ => (text.into_owned(), String::new()),
    }
}
