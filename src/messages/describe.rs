//! Describe info message
//!
//! Column metadata of a result set. The same body appears in three
//! places: the DESCRIBE message of a response, every implicit result set,
//! and every REF CURSOR value.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::constants::ttc_version;
use crate::error::Result;
use crate::statement::ColumnInfo;

/// Decoded describe info
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescribeInfo {
    /// Largest row size
    pub max_row_size: u32,
    /// Result columns in select-list order
    pub columns: Vec<ColumnInfo>,
}

impl DescribeInfo {
    /// Read a DESCRIBE message, positioned after the message code
    pub fn parse(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Self> {
        let size = buf.read_u8()? as usize;
        buf.skip(size)?;
        Self::read_body(buf, caps)
    }

    /// Read the column list and the version gated trailer
    pub fn read_body(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Self> {
        let max_row_size = buf.read_ub4()?;
        let column_count = buf.read_ub4()? as usize;
        let mut columns = Vec::with_capacity(column_count);
        if column_count > 0 {
            buf.skip(1)?;
            for _ in 0..column_count {
                columns.push(ColumnInfo::read_describe(buf, caps)?);
            }
        }

        buf.skip_dlc()?;
        if caps.ttc_at_least(ttc_version::V3) {
            buf.skip_ub4()?;
            buf.skip_ub4()?;
        }
        if caps.ttc_at_least(ttc_version::V4) {
            buf.skip_ub4()?;
            buf.skip_ub4()?;
        }
        if caps.ttc_at_least(ttc_version::V5) {
            buf.skip_dlc()?;
        }
        Ok(Self { max_row_size, columns })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::buffer::WriteBuffer;
    use crate::constants::OracleType;

    /// One column descriptor as the server writes it, TTC version 6
    pub(crate) fn write_column(buf: &mut WriteBuffer, name: &str, data_type: OracleType, max_len: u32) {
        buf.write_u8(data_type as u8).unwrap();
        buf.write_u8(0).unwrap(); // flag
        buf.write_u8(0).unwrap(); // precision
        if data_type == OracleType::Number {
            buf.write_ub2(0).unwrap(); // signed scale
        } else {
            buf.write_u8(0).unwrap();
        }
        buf.write_ub4(max_len).unwrap();
        buf.write_ub4(0).unwrap(); // max array elements
        buf.write_ub4(0).unwrap(); // cont flag
        buf.write_dlc(&[]).unwrap(); // toid
        buf.write_ub2(0).unwrap(); // version
        buf.write_ub2(873).unwrap(); // charset
        buf.write_u8(1).unwrap(); // charset form
        buf.write_ub4(max_len).unwrap();
        buf.write_u8(1).unwrap(); // nullable
        buf.write_u8(0).unwrap();
        buf.write_dlc(name.as_bytes()).unwrap();
        buf.write_dlc(&[]).unwrap(); // schema
        buf.write_dlc(&[]).unwrap(); // type name
        buf.write_ub2(0).unwrap(); // ttc >= 3
        buf.write_ub4(0).unwrap(); // ttc >= 6
    }

    /// Describe body (no size prefix) for TTC version 6
    pub(crate) fn write_describe_body(buf: &mut WriteBuffer, columns: &[(&str, OracleType, u32)]) {
        buf.write_ub4(64).unwrap();
        buf.write_ub4(columns.len() as u32).unwrap();
        if !columns.is_empty() {
            buf.write_u8(0).unwrap();
        }
        for (name, data_type, max_len) in columns {
            write_column(buf, name, *data_type, *max_len);
        }
        buf.write_dlc(&[]).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_dlc(&[]).unwrap();
    }

    #[test]
    fn test_describe_two_columns() {
        let mut caps = Capabilities::new();
        caps.ttc_version = 6;
        let mut buf = WriteBuffer::new();
        buf.write_u8(2).unwrap();
        buf.write_zeros(2).unwrap();
        write_describe_body(
            &mut buf,
            &[("ID", OracleType::Number, 22), ("NAME", OracleType::Char, 30)],
        );

        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        let info = DescribeInfo::parse(&mut reader, &caps).unwrap();
        assert_eq!(info.max_row_size, 64);
        let names: Vec<&str> = info.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "NAME"]);
        assert!(info.columns.iter().all(|c| c.get_data_from_server));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_describe_without_columns() {
        let caps = Capabilities::new();
        let mut buf = WriteBuffer::new();
        buf.write_u8(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_dlc(&[]).unwrap();

        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        let info = DescribeInfo::parse(&mut reader, &caps).unwrap();
        assert!(info.columns.is_empty());
        assert_eq!(reader.remaining(), 0);
    }
}
