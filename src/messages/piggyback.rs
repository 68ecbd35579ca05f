//! Client piggyback functions
//!
//! A client bundles small housekeeping calls in front of its next real
//! function: closing cursors it no longer needs, freeing temporary LOBs,
//! switching the current schema or pushing end-to-end tracing attributes.
//! Each piggyback starts with message code 17, its function code and a
//! sequence number, exactly like a function call header.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::constants::FunctionCode;
use crate::error::{Error, Result};
use crate::session::Session;

/// Decoded client piggyback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum ClientPiggyback {
    /// Switch the current schema
    SetSchema {
        /// Schema name
        schema: String,
    },
    /// Close cursors
    CloseCursors {
        /// Cursor ids closed
        cursor_ids: Vec<u32>,
    },
    /// Free temporary LOBs
    CloseTempLobs {
        /// Total locator bytes to close
        lob_size: u32,
        /// LOB operation code
        opcode: u32,
        /// Raw locators of the LOBs being freed
        #[serde(serialize_with = "crate::record::text_or_hex")]
        locators: Bytes,
    },
    /// Set end-to-end tracing attributes
    EndToEnd(EndToEndAttributes),
}

/// One piggyback with its header fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Piggyback {
    /// Function code
    pub code: u8,
    /// Sequence number
    pub sequence: u8,
    /// Decoded body
    pub body: ClientPiggyback,
}

impl Piggyback {
    /// Read one piggyback, positioned after its message code.
    ///
    /// Closing cursors also drops them from the session's cursor table.
    pub fn parse(buf: &mut ReadBuffer, session: &mut Session) -> Result<Self> {
        let code = buf.read_u8()?;
        let sequence = buf.read_u8()?;
        let body = match FunctionCode::try_from(code)? {
            FunctionCode::SetSchema => {
                buf.skip(1)?;
                buf.skip_ub4()?;
                ClientPiggyback::SetSchema {
                    schema: String::from_utf8_lossy(&buf.read_u8_prefixed()?).into_owned(),
                }
            }
            FunctionCode::CloseCursors => {
                buf.skip(1)?;
                let count = buf.read_ub4()?;
                let mut cursor_ids = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let cursor_id = buf.read_ub4()?;
                    session.cursors.remove(cursor_id);
                    cursor_ids.push(cursor_id);
                }
                ClientPiggyback::CloseCursors { cursor_ids }
            }
            FunctionCode::LobOp => read_close_temp_lobs(buf)?,
            FunctionCode::SetEndToEndAttr => ClientPiggyback::EndToEnd(EndToEndAttributes::parse(buf)?),
            other => {
                return Err(Error::Protocol(format!(
                    "function {:?} cannot be sent as a piggyback",
                    other
                )))
            }
        };
        tracing::trace!(code, sequence, "client piggyback");
        Ok(Self { code, sequence, body })
    }
}

/// Fixed fields, then `lob_size` bytes of locators
fn read_close_temp_lobs(buf: &mut ReadBuffer) -> Result<ClientPiggyback> {
    buf.skip(1)?;
    let lob_size = buf.read_ub4()?;
    buf.skip(1)?;
    for _ in 0..3 {
        buf.skip_ub4()?;
    }
    buf.skip(3)?;
    let opcode = buf.read_ub4()?;
    buf.skip(3)?;
    buf.skip_ub4()?;
    buf.skip_ub8()?;
    buf.skip_ub8()?;
    buf.skip(2)?;
    buf.skip_ub4()?;
    buf.skip(1)?;
    buf.skip_ub4()?;
    buf.skip(1)?;
    buf.skip_ub4()?;
    let locators = buf.read_bytes_owned(lob_size as usize)?;
    Ok(ClientPiggyback::CloseTempLobs {
        lob_size,
        opcode,
        locators,
    })
}

/// End-to-end attributes the client changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndToEndAttributes {
    /// Attribute flags
    pub flags: u32,
    /// Client identifier
    pub client_identifier: Attribute,
    /// Module
    pub module: Attribute,
    /// Action
    pub action: Attribute,
    /// Client info
    pub client_info: Attribute,
    /// Database operation
    pub dbop: Attribute,
}

/// One end-to-end attribute slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// The client changed this attribute
    pub modified: bool,
    /// A new value is sent (otherwise it was cleared)
    pub present: bool,
    /// New value
    #[serde(serialize_with = "crate::record::text_or_hex")]
    pub value: Bytes,
}

impl Attribute {
    fn read_slot(buf: &mut ReadBuffer) -> Result<Self> {
        let mut attr = Attribute::default();
        if buf.peek_u8()? == 1 {
            attr.modified = true;
            buf.skip(1)?;
            attr.present = buf.read_ub4()? != 0;
            buf.skip(1)?;
        } else {
            buf.skip(1)?;
            buf.skip_ub4()?;
        }
        Ok(attr)
    }

    fn read_value(&mut self, buf: &mut ReadBuffer) -> Result<()> {
        if self.modified && self.present {
            self.value = buf.read_u8_prefixed()?;
        }
        Ok(())
    }

    /// Value as text
    pub fn as_text(&self) -> Option<String> {
        (self.modified && self.present).then(|| String::from_utf8_lossy(&self.value).into_owned())
    }
}

fn skip_unused_slot(buf: &mut ReadBuffer) -> Result<()> {
    buf.skip(1)?;
    buf.skip_ub4()
}

impl EndToEndAttributes {
    /// Read the attribute slots, then the values of the changed ones
    pub fn parse(buf: &mut ReadBuffer) -> Result<Self> {
        buf.skip(2)?;
        let flags = buf.read_ub4()?;
        let mut attrs = EndToEndAttributes {
            flags,
            client_identifier: Attribute::read_slot(buf)?,
            module: Attribute::read_slot(buf)?,
            action: Attribute::read_slot(buf)?,
            ..Default::default()
        };
        skip_unused_slot(buf)?;
        skip_unused_slot(buf)?;
        attrs.client_info = Attribute::read_slot(buf)?;
        skip_unused_slot(buf)?;
        skip_unused_slot(buf)?;
        attrs.dbop = Attribute::read_slot(buf)?;

        attrs.client_identifier.read_value(buf)?;
        attrs.module.read_value(buf)?;
        attrs.action.read_value(buf)?;
        attrs.client_info.read_value(buf)?;
        attrs.dbop.read_value(buf)?;
        Ok(attrs)
    }
}
