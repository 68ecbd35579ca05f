//! LOB and BFILE locators
//!
//! LOB columns normally carry only a locator, an opaque handle the client
//! later uses in LOB operations. When the client asked for prefetch, the
//! column also carries the LOB length, chunk size and the first part of
//! the data.

use bytes::Bytes;
use serde::Serialize;

use crate::constants::OracleType;

/// Prefetched LOB content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LobData {
    /// CLOB / NCLOB content
    Text(String),
    /// BLOB content
    Binary(#[serde(serialize_with = "crate::record::as_hex")] Bytes),
}

/// A LOB value as seen on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobLocator {
    /// CLOB, BLOB or BFILE
    pub oracle_type: OracleType,
    /// Opaque locator bytes
    #[serde(serialize_with = "crate::record::as_hex")]
    pub locator: Bytes,
    /// Character set of CLOB data
    pub charset_id: u16,
    /// Total LOB length, when prefetched
    pub size: Option<u64>,
    /// Server chunk size, when prefetched
    pub chunk_size: Option<u32>,
    /// Prefetched content
    pub data: Option<LobData>,
}

impl LobLocator {
    /// A locator without prefetched content
    pub fn new(oracle_type: OracleType, locator: Bytes, charset_id: u16) -> Self {
        Self {
            oracle_type,
            locator,
            charset_id,
            size: None,
            chunk_size: None,
            data: None,
        }
    }

    /// Check if this is a BFILE locator
    pub fn is_bfile(&self) -> bool {
        self.oracle_type == OracleType::Bfile
    }

    /// Directory alias and file name of a BFILE locator.
    ///
    /// After a 16-byte fixed header the locator holds a 2-byte length and
    /// the directory alias, then a 2-byte length and the file name.
    pub fn file_name(&self) -> Option<(String, String)> {
        const FIXED_HEADER: usize = 16;
        if !self.is_bfile() {
            return None;
        }
        let rest = self.locator.get(FIXED_HEADER..)?;
        let (dir, rest) = length_prefixed(rest)?;
        let (file, _) = length_prefixed(rest)?;
        Some((
            String::from_utf8_lossy(dir).into_owned(),
            String::from_utf8_lossy(file).into_owned(),
        ))
    }
}

fn length_prefixed(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let len = u16::from_be_bytes([*data.first()?, *data.get(1)?]) as usize;
    let body = data.get(2..2 + len)?;
    Some((body, &data[2 + len..]))
}
