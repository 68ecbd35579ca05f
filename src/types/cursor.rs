//! REF CURSOR values
//!
//! A REF CURSOR column or output bind carries a complete describe of the
//! cursor's result set followed by the new cursor id, so the decoder can
//! later follow FETCH calls against it like any other statement.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::constants::OracleType;
use crate::error::Result;
use crate::messages::DescribeInfo;
use crate::statement::{ColumnInfo, Statement, StatementKind};

/// A cursor opened by the server and handed out as a value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefCursor {
    /// Server cursor id
    pub cursor_id: u32,
    /// Largest row size
    pub max_row_size: u32,
    /// Result columns
    pub columns: Vec<ColumnInfo>,
    /// A CLOB or BLOB column is selected
    pub has_lob: bool,
    /// A LONG or LONG RAW column is selected
    pub has_long: bool,
}

impl RefCursor {
    /// Read the describe and cursor id of a REF CURSOR value
    pub fn load(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Self> {
        buf.skip(1)?;
        let describe = DescribeInfo::read_body(buf, caps)?;
        let cursor_id = buf.read_ub4()?;
        Ok(Self::from_describe(cursor_id, describe))
    }

    /// A cursor for a describe the server sent with its id
    pub fn from_describe(cursor_id: u32, describe: DescribeInfo) -> Self {
        let has_lob = describe
            .columns
            .iter()
            .any(|c| c.is(OracleType::Clob) || c.is(OracleType::Blob));
        let has_long = describe
            .columns
            .iter()
            .any(|c| c.is(OracleType::Long) || c.is(OracleType::LongRaw));
        Self {
            cursor_id,
            max_row_size: describe.max_row_size,
            columns: describe.columns,
            has_lob,
            has_long,
        }
    }

    /// A query statement for the cursor table
    pub fn to_statement(&self) -> Statement {
        let mut stmt = Statement {
            cursor_id: self.cursor_id,
            kind: StatementKind::Query,
            array_bind_count: 1,
            ..Default::default()
        };
        stmt.set_columns(self.columns.clone());
        stmt.data_set.max_row_size = self.max_row_size;
        stmt
    }
}
