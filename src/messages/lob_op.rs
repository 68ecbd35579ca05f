//! LOB-OP function payload
//!
//! One function code covers every LOB operation (read, write, length,
//! temporary LOB management, BFILE calls); the operation id inside the
//! payload says which. Offsets and the optional size move from UB4 to UB8
//! fields once the TTC version reaches 3.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::constants::{lob_op, ttc_version};
use crate::error::Result;

/// Decoded LOB-OP payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LobOp {
    /// Operation code
    pub operation: u32,
    /// Symbolic operation name
    pub operation_name: Option<&'static str>,
    /// Source locator
    #[serde(serialize_with = "crate::record::as_hex")]
    pub source_locator: Bytes,
    /// Destination locator
    #[serde(serialize_with = "crate::record::as_hex")]
    pub dest_locator: Bytes,
    /// Source offset
    pub source_offset: u64,
    /// Destination offset
    pub dest_offset: u64,
    /// Character set id, when sent
    pub charset_id: Option<u16>,
    /// Amount or size, when sent
    pub size: Option<u64>,
    /// Null-to-empty conversion flag
    pub null_o2u: bool,
    /// Snapshot SCN words
    pub scn: Vec<u32>,
}

impl LobOp {
    /// Parse a LOB-OP body starting right after the function header
    pub fn parse(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Self> {
        let wide = caps.ttc_at_least(ttc_version::V3);
        let mut op = LobOp::default();

        buf.skip(1)?;
        let source_length = buf.read_ub4()? as usize;
        buf.skip(1)?;
        let dest_length = buf.read_ub4()? as usize;
        if wide {
            buf.skip(2)?;
        } else {
            op.source_offset = buf.read_ub4()? as u64;
            op.dest_offset = buf.read_ub4()? as u64;
        }
        let has_charset = buf.read_u8()? == 1;
        let mut send_size = !wide && buf.peek_u8()? == 1;
        buf.skip(1)?;
        op.null_o2u = buf.read_u8()? == 1;
        op.operation = buf.read_ub4()?;
        op.operation_name = lob_op::name(op.operation);
        buf.skip(1)?;
        let scn_length = buf.read_ub4()?;
        if wide {
            op.source_offset = buf.read_ub8()?;
            op.dest_offset = buf.read_ub8()?;
            send_size = buf.read_u8()? == 1;
        }
        if caps.ttc_at_least(ttc_version::V4) {
            buf.skip(1)?;
        }

        op.source_locator = buf.read_bytes_owned(source_length)?;
        op.dest_locator = buf.read_bytes_owned(dest_length)?;
        if has_charset {
            op.charset_id = Some(buf.read_ub2()?);
        }
        if !wide && send_size {
            op.size = Some(buf.read_ub4()? as u64);
        }
        for _ in 0..scn_length {
            op.scn.push(buf.read_ub4()?);
        }
        if wide && send_size {
            op.size = Some(buf.read_ub8()?);
        }
        tracing::trace!(operation = op.operation, size = ?op.size, "lob operation");
        Ok(op)
    }
}
