//! ROWID and UROWID decoding
//!
//! A physical ROWID is four numbers: the data object number (RBA), the
//! relative file number (partition), the block number and the slot within
//! the block. Its display form is 18 characters of a base-64 alphabet,
//! 6 + 3 + 6 + 3 for the four fields.
//!
//! A UROWID arrives as raw bytes. When the first byte is 1 it wraps a
//! physical ROWID; anything else is a logical (index-organized table)
//! row address, displayed as `*` followed by a base-64 rendering of the
//! bytes.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::error::{Error, Result};

/// Base-64 alphabet of the display form
const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Characters standing for the leading index byte of a logical UROWID
const LOGICAL_INDEX_CHARS: &[u8; 5] = b"A*-()";

/// Length of the display form
pub const ROWID_LENGTH: usize = 18;

/// A physical row address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RowId {
    /// Data object number
    pub rba: u32,
    /// Relative file number
    pub partition_id: u16,
    /// Block number within the file
    pub block_num: u32,
    /// Row slot within the block
    pub slot_num: u16,
}

impl RowId {
    /// Create a row address from its four fields
    pub fn new(rba: u32, partition_id: u16, block_num: u32, slot_num: u16) -> Self {
        Self { rba, partition_id, block_num, slot_num }
    }

    /// Read the compressed ROWID form used in column values and summaries.
    ///
    /// Returns `None` when the marker byte is zero or every field is zero.
    pub fn read(buf: &mut ReadBuffer) -> Result<Option<Self>> {
        if buf.read_u8()? == 0 {
            return Ok(None);
        }
        let rba = buf.read_ub4()?;
        let partition_id = buf.read_ub2()?;
        let filler = buf.read_u8()?;
        let block_num = buf.read_ub4()?;
        let slot_num = buf.read_ub2()?;
        let rowid = Self::new(rba, partition_id, block_num, slot_num);
        if filler == 0 && rowid == Self::default() {
            return Ok(None);
        }
        Ok(Some(rowid))
    }

    /// Parse the 18-character display form
    pub fn parse(text: &str) -> Result<Self> {
        let raw = text.as_bytes();
        if raw.len() != ROWID_LENGTH {
            return Err(Error::Conversion(format!(
                "ROWID must be {} characters, got {}",
                ROWID_LENGTH,
                raw.len()
            )));
        }
        Ok(Self {
            rba: decode_base64(&raw[0..6])? as u32,
            partition_id: decode_base64(&raw[6..9])? as u16,
            block_num: decode_base64(&raw[9..15])? as u32,
            slot_num: decode_base64(&raw[15..18])? as u16,
        })
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = Vec::with_capacity(ROWID_LENGTH);
        encode_base64(&mut out, self.rba as u64, 6);
        encode_base64(&mut out, self.partition_id as u64, 3);
        encode_base64(&mut out, self.block_num as u64, 6);
        encode_base64(&mut out, self.slot_num as u64, 3);
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

/// Append `width` alphabet characters for the low bits of `value`
fn encode_base64(out: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        out.push(BASE64_ALPHABET[((value >> (6 * i)) & 0x3F) as usize]);
    }
}

fn decode_base64(chars: &[u8]) -> Result<u64> {
    chars.iter().try_fold(0u64, |acc, &c| {
        let index = BASE64_ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or_else(|| Error::Conversion(format!("invalid ROWID character {:?}", char::from(c))))?;
        Ok((acc << 6) | index as u64)
    })
}

/// A universal row address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum URowId {
    /// Wraps a physical address
    Physical(RowId),
    /// Logical address of an index-organized table row
    Logical(#[serde(serialize_with = "crate::record::as_hex")] bytes::Bytes),
}

impl URowId {
    /// Read the UROWID column form: a UB4 length, then the raw bytes as CLR
    pub fn read(buf: &mut ReadBuffer) -> Result<Option<Self>> {
        if buf.read_ub4()? == 0 {
            return Ok(None);
        }
        let raw = buf.read_clr()?;
        Self::from_bytes(&raw).map(Some)
    }

    /// Classify raw UROWID bytes
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        match raw.first().copied() {
            None => Err(Error::Conversion("empty UROWID".to_string())),
            Some(1) => {
                if raw.len() < 13 {
                    return Err(Error::Conversion(format!(
                        "physical UROWID needs 13 bytes, got {}",
                        raw.len()
                    )));
                }
                Ok(URowId::Physical(RowId {
                    rba: u32::from_be_bytes([raw[1], raw[2], raw[3], raw[4]]),
                    partition_id: u16::from_be_bytes([raw[5], raw[6]]),
                    block_num: u32::from_be_bytes([raw[7], raw[8], raw[9], raw[10]]),
                    slot_num: u16::from_be_bytes([raw[11], raw[12]]),
                }))
            }
            Some(_) => Ok(URowId::Logical(bytes::Bytes::copy_from_slice(raw))),
        }
    }
}

impl std::fmt::Display for URowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // restricted form when there is no data object number
            URowId::Physical(rowid) if rowid.rba == 0 => write!(
                f,
                "{:08X}.{:04X}.{:04X}",
                rowid.block_num, rowid.slot_num, rowid.partition_id
            ),
            URowId::Physical(rowid) => std::fmt::Display::fmt(rowid, f),
            URowId::Logical(raw) => f.write_str(&logical_text(raw)),
        }
    }
}

/// Render a logical UROWID: `*`, the index character, then base-64 groups
fn logical_text(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(2 + raw.len() * 4 / 3 + 3);
    out.push(b'*');
    let index = raw[0] as usize;
    out.push(LOGICAL_INDEX_CHARS[index.saturating_sub(1).min(LOGICAL_INDEX_CHARS.len() - 1)]);
    for group in raw[1..].chunks(3) {
        let b0 = group[0];
        out.push(BASE64_ALPHABET[(b0 >> 2) as usize]);
        match *group {
            [_] => out.push(BASE64_ALPHABET[((b0 & 0x03) << 4) as usize]),
            [_, b1] => {
                out.push(BASE64_ALPHABET[((b0 & 0x03) << 4 | b1 >> 4) as usize]);
                out.push(BASE64_ALPHABET[((b1 & 0x0F) << 2) as usize]);
            }
            [_, b1, b2, ..] => {
                out.push(BASE64_ALPHABET[((b0 & 0x03) << 4 | b1 >> 4) as usize]);
                out.push(BASE64_ALPHABET[((b1 & 0x0F) << 2 | b2 >> 6) as usize]);
                out.push(BASE64_ALPHABET[(b2 & 0x3F) as usize]);
            }
            [] => {}
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
