//! REFUSE message
//!
//! The REFUSE packet is sent by the listener when it refuses a connection.
//! This can happen for various reasons such as invalid service name,
//! invalid SID, or listener configuration issues.
//!
//! Packet structure (offsets from the start of the packet):
//! ```text
//! Offset | Size | Description
//! -------+------+------------------
//!      8 |    1 | User reason
//!      9 |    1 | System reason
//!     10 |    2 | Data length
//!     12 |    n | Data (error text)
//! ```
//!
//! The data typically contains Oracle error information in the format
//! `(DESCRIPTION=(ERR=12514)(VSNNUM=...)...)`, or for some listeners
//! `(ERROR=(CODE=12505)(EMFI=4))`.

use serde::Serialize;

use crate::constants::error_code;
use crate::error::{OraError, Result};
use crate::packet::Packet;

/// Parsed REFUSE message from server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefuseMessage {
    /// User level reason
    pub user_reason: u8,
    /// System level reason
    pub system_reason: u8,
    /// Declared data length
    pub data_length: u16,
    /// Refusal text
    pub data: String,
    /// Error code extracted from the text
    pub error: OraError,
}

impl RefuseMessage {
    /// Parse a REFUSE packet
    pub fn parse(packet: &Packet) -> Result<Self> {
        let mut buf = packet.reader(false);
        let user_reason = buf.read_u8()?;
        let system_reason = buf.read_u8()?;
        let data_length = buf.read_u16_be()?;

        let data = if buf.has_remaining(data_length as usize) {
            let raw = buf.read_bytes_owned(data_length as usize)?;
            String::from_utf8_lossy(&raw).into_owned()
        } else {
            String::new()
        };

        let error = extract_error(&data);
        tracing::trace!(code = error.code, "connection refused");
        Ok(Self {
            user_reason,
            system_reason,
            data_length,
            data,
            error,
        })
    }
}

/// Find the error code in a refusal text.
///
/// `(ERROR=...(CODE=n)...)` takes precedence over `(ERR=n)`. Text with
/// neither yields ORA-12564.
pub fn extract_error(data: &str) -> OraError {
    let upper = data.to_uppercase();
    match error_block_code(&upper).or_else(|| err_code(&upper)) {
        Some(code) => OraError::from_code(code),
        None => OraError::from_code(error_code::CONNECTION_REFUSED),
    }
}

/// `(ERR=n)` with optional blanks around the parts
fn err_code(text: &str) -> Option<u32> {
    open_parens(text).find_map(|rest| {
        let rest = rest.trim_start().strip_prefix("ERR")?;
        let rest = rest.trim_start().strip_prefix('=')?.trim_start();
        let (digits, rest) = split_digits(rest);
        rest.trim_start().strip_prefix(')')?;
        digits.parse().ok()
    })
}

/// `CODE=n` inside an `(ERROR=...)` block
fn error_block_code(text: &str) -> Option<u32> {
    let block = open_parens(text).find_map(|rest| {
        let rest = rest.trim_start().strip_prefix("ERROR")?;
        let rest = rest.trim_start().strip_prefix('=')?;
        let end = rest
            .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '=' | '(' | ')')))
            .unwrap_or(rest.len());
        (end > 0).then(|| &rest[..end])
    })?;

    let mut search = block;
    while let Some(pos) = search.find("CODE") {
        let rest = &search[pos + 4..];
        if let Some(value) = rest.strip_prefix('=') {
            let (digits, _) = split_digits(value);
            if let Ok(code) = digits.parse() {
                return Some(code);
            }
        }
        search = rest;
    }
    None
}

/// Text following each `(`
fn open_parens(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices('(').map(move |(pos, _)| &text[pos + 1..])
}

fn split_digits(text: &str) -> (&str, &str) {
    let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    text.split_at(end)
}
