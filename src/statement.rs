//! Statement model
//!
//! A [`Statement`] mirrors one server cursor as the proxy reconstructs it
//! from the traffic: the SQL text from EXECUTE, the bind and column
//! descriptors, and the rows the server streamed back. Statements outlive a
//! single exchange through the session's cursor table, so a later FETCH or
//! re-execute can be decoded with the column layout an earlier describe
//! established.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::constants::{ttc_version, BindDirection, OracleType};
use crate::error::Result;
use crate::row::{Row, Value};
use crate::types::decode_text;

/// Statement kind inferred from the SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StatementKind {
    /// SELECT or WITH
    Query,
    /// INSERT, UPDATE, DELETE or MERGE
    Dml,
    /// Anonymous PL/SQL block
    PlSql,
    /// Anything else (DDL, ALTER SESSION, CALL, ...)
    #[default]
    Other,
}

/// A bind parameter or result column descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnInfo {
    /// Column or bind name
    pub name: String,
    /// Type name, upper-cased (for object types)
    pub type_name: String,
    /// Wire data type code
    pub data_type: u8,
    /// Bind direction
    pub direction: BindDirection,
    /// Descriptor flags
    pub flag: u8,
    /// Numeric precision
    pub precision: u8,
    /// Numeric scale, 0xFF when unconstrained
    pub scale: u8,
    /// Maximum length in bytes
    pub max_len: u32,
    /// Maximum length in characters
    pub max_char_len: u32,
    /// Array bind element count
    pub max_array_elems: u32,
    /// Continuation flags
    pub cont_flag: u64,
    /// Type OID of an object type
    #[serde(serialize_with = "crate::record::as_hex")]
    pub toid: Bytes,
    /// Type version
    pub version: u16,
    /// Character set id
    pub charset_id: u16,
    /// Character set form
    pub charset_form: u8,
    /// Collation id
    pub oaccollid: u32,
    /// NULL allowed
    pub nullable: bool,
    /// Column is an XMLTYPE
    pub is_xml_type: bool,
    /// The next row data message carries a value for this column
    pub get_data_from_server: bool,
    /// Raw value bytes as last sent
    #[serde(serialize_with = "crate::record::as_hex")]
    pub raw: Bytes,
    /// Decoded value
    pub value: Value,
}

impl ColumnInfo {
    /// Known type for the data type code
    pub fn oracle_type(&self) -> Option<OracleType> {
        OracleType::from_code(self.data_type)
    }

    /// Whether the type code is `ty`
    pub fn is(&self, ty: OracleType) -> bool {
        self.data_type == ty as u8
    }

    /// Whether the descriptor names an object type
    pub fn is_object(&self) -> bool {
        !self.toid.is_empty()
    }

    /// Read a column descriptor from a describe message
    pub fn read_describe(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Self> {
        let mut col = ColumnInfo {
            get_data_from_server: true,
            ..Default::default()
        };
        col.data_type = buf.read_u8()?;
        col.flag = buf.read_u8()?;
        col.precision = buf.read_u8()?;

        let signed_scale = col.oracle_type().map_or(false, OracleType::has_signed_scale);
        if signed_scale {
            let scale = buf.read_sb2()?;
            if scale == -127 {
                col.precision = (col.precision as f64 * 0.30103).ceil() as u8;
                col.scale = 0xFF;
            } else {
                col.scale = scale as u8;
            }
        } else {
            col.scale = buf.read_u8()?;
        }
        if col.is(OracleType::Number) && col.precision == 0 && (col.scale == 0 || col.scale == 0xFF) {
            col.precision = 38;
            col.scale = 0xFF;
        }

        col.max_len = buf.read_ub4()?;
        col.max_len = match col.oracle_type() {
            Some(OracleType::Rowid) => 128,
            Some(OracleType::Date) => 7,
            Some(OracleType::IbFloat) => 4,
            Some(OracleType::IbDouble) => 8,
            Some(OracleType::TimestampTzDty) => 13,
            Some(
                OracleType::IntervalYmDty
                | OracleType::IntervalDsDty
                | OracleType::IntervalYm
                | OracleType::IntervalDs,
            ) => 11,
            _ => col.max_len,
        };

        col.max_array_elems = buf.read_ub4()?;
        col.cont_flag = if caps.ttc_at_least(ttc_version::V10) {
            buf.read_ub8()?
        } else {
            buf.read_ub4()? as u64
        };
        col.toid = buf.read_dlc()?;
        col.version = buf.read_ub2()?;
        col.charset_id = buf.read_ub2()?;
        col.charset_form = buf.read_u8()?;
        col.max_char_len = buf.read_ub4()?;
        if caps.ttc_at_least(ttc_version::V8) {
            col.oaccollid = buf.read_ub4()?;
        }
        col.nullable = buf.read_u8()? > 0;
        buf.skip(1)?;
        col.name = decode_text(&buf.read_dlc()?, caps.charset_id);
        buf.skip_dlc()?;
        col.type_name = decode_text(&buf.read_dlc()?, caps.charset_id).to_uppercase();
        if col.type_name == "XMLTYPE" {
            col.data_type = OracleType::XmlType as u8;
            col.is_xml_type = true;
        }

        if caps.ttc_at_least(ttc_version::V3) {
            buf.skip_ub2()?;
        }
        if caps.ttc_at_least(ttc_version::V6) {
            buf.skip_ub4()?;
        }
        Ok(col)
    }

    /// Read a bind descriptor from an EXECUTE request
    pub fn read_bind(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Self> {
        let mut col = ColumnInfo::default();
        col.data_type = buf.read_u8()?;
        col.flag = buf.read_u8()?;
        col.precision = buf.read_u8()?;
        col.scale = buf.read_u8()?;
        col.max_len = buf.read_ub4()?;
        col.max_array_elems = buf.read_ub4()?;
        col.cont_flag = if caps.ttc_at_least(ttc_version::V10) {
            buf.read_ub8()?
        } else {
            buf.read_ub4()? as u64
        };
        if buf.peek_u8()? != 0 {
            buf.skip_ub4()?;
            col.toid = buf.read_clr()?;
        } else {
            buf.skip(1)?;
        }
        col.version = buf.read_ub2()?;
        col.charset_id = buf.read_ub2()?;
        col.charset_form = buf.read_u8()?;
        col.max_char_len = buf.read_ub4()?;
        if caps.ttc_at_least(ttc_version::V8) {
            col.oaccollid = buf.read_ub4()?;
        }
        Ok(col)
    }
}

/// Rows of one result as they accumulate across fetches
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataSet {
    /// Column count announced by the server
    pub column_count: usize,
    /// Rows the server said it is sending
    pub row_count: u32,
    /// Largest row size from the describe
    pub max_row_size: u32,
    /// Columns with the per-row presence flags
    pub columns: Vec<ColumnInfo>,
    /// Last column presence bit vector
    #[serde(serialize_with = "crate::record::as_hex")]
    pub bit_vector: Bytes,
    /// Rows decoded so far
    pub rows: Vec<Row>,
}

impl DataSet {
    /// Raise the column count; a result never loses columns
    pub fn grow_column_count(&mut self, count: usize) {
        if count > self.column_count {
            self.column_count = count;
        }
    }

    /// Mark which columns the next row data message carries.
    ///
    /// Bit `i` of byte `x` covers column `x * 8 + i`. An empty vector means
    /// every column is sent.
    pub fn set_bit_vector(&mut self, bit_vector: Bytes) {
        if bit_vector.is_empty() {
            self.columns.iter_mut().for_each(|c| c.get_data_from_server = true);
        } else {
            for (x, byte) in bit_vector.iter().enumerate() {
                for i in 0..8 {
                    let index = x * 8 + i;
                    if index >= self.column_count {
                        break;
                    }
                    if let Some(col) = self.columns.get_mut(index) {
                        col.get_data_from_server = byte & (1 << i) != 0;
                    }
                }
            }
        }
        self.bit_vector = bit_vector;
    }
}

/// A server cursor as reconstructed by the proxy
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statement {
    /// Server cursor id, 0 until the server assigns one
    pub cursor_id: u32,
    /// SQL text
    pub sql: String,
    /// Inferred kind
    pub kind: StatementKind,
    /// INSERT and MERGE may run with array binds
    pub bulk_exec: bool,
    /// The SQL has a RETURNING ... INTO clause
    pub has_return_clause: bool,
    /// A LONG or LONG RAW column is selected
    pub has_long: bool,
    /// A CLOB or BLOB column or bind is involved
    pub has_lob: bool,
    /// The server has more rows to fetch
    pub has_more_rows: bool,
    /// The last EXECUTE carried the SQL text
    pub parse: bool,
    /// Some bind is an output
    pub contains_output: bool,
    /// The server asked to stop compressing rows
    pub disable_compression: bool,
    /// Rows requested per fetch
    pub rows_to_fetch: u32,
    /// Rows in an array bind
    pub array_bind_count: u32,
    /// Snapshot SCN reported after execution
    pub scn: [u32; 2],
    /// Query id reported after execution
    pub query_id: u64,
    /// Bind descriptors
    pub params: Vec<ColumnInfo>,
    /// Column descriptors
    pub columns: Vec<ColumnInfo>,
    /// Accumulated result
    pub data_set: DataSet,
}

impl Statement {
    /// Create a statement and classify its SQL text
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let upper = sql.to_uppercase();
        let head = strip_leading_comments(&upper);
        let head = head.strip_prefix('(').unwrap_or(head);

        let (kind, bulk_exec) = if head.starts_with("SELECT") || head.starts_with("WITH") {
            (StatementKind::Query, false)
        } else if head.starts_with("INSERT") || head.starts_with("MERGE") {
            (StatementKind::Dml, true)
        } else if head.starts_with("UPDATE") || head.starts_with("DELETE") {
            (StatementKind::Dml, false)
        } else if head.starts_with("DECLARE") || head.starts_with("BEGIN") {
            (StatementKind::PlSql, false)
        } else {
            (StatementKind::Other, false)
        };
        let has_return_clause = kind != StatementKind::PlSql && has_returning_into(head);

        Self {
            sql,
            kind,
            bulk_exec,
            has_return_clause,
            parse: true,
            ..Default::default()
        }
    }

    /// Whether this is a query
    pub fn is_query(&self) -> bool {
        self.kind == StatementKind::Query
    }

    /// Whether this is a PL/SQL block
    pub fn is_plsql(&self) -> bool {
        self.kind == StatementKind::PlSql
    }

    /// Whether this is DML
    pub fn is_dml(&self) -> bool {
        self.kind == StatementKind::Dml
    }

    /// Record describe information and refresh the LOB/LONG flags
    pub fn set_columns(&mut self, columns: Vec<ColumnInfo>) {
        self.has_lob |= columns
            .iter()
            .any(|c| c.is(OracleType::Clob) || c.is(OracleType::Blob));
        self.has_long |= columns
            .iter()
            .any(|c| c.is(OracleType::Long) || c.is(OracleType::LongRaw));
        self.data_set.columns = columns.clone();
        self.data_set.grow_column_count(columns.len());
        self.columns = columns;
    }
}

/// Skip whitespace, `--` line comments and `/* */` block comments
fn strip_leading_comments(mut text: &str) -> &str {
    loop {
        text = text.trim_start();
        if let Some(rest) = text.strip_prefix("--") {
            match rest.find('\n') {
                Some(end) => text = &rest[end + 1..],
                None => return text,
            }
        } else if let Some(rest) = text.strip_prefix("/*") {
            match rest.find("*/") {
                Some(end) => text = &rest[end + 2..],
                None => return text,
            }
        } else {
            return text;
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether the byte at `start` begins the whole word `word`
fn word_at(text: &[u8], start: usize, word: &[u8]) -> bool {
    let end = start + word.len();
    text.get(start..end) == Some(word)
        && (start == 0 || !is_word_byte(text[start - 1]))
        && text.get(end).map_or(true, |&b| !is_word_byte(b))
}

/// Match `RETURNING expr[, expr...] INTO` on upper-cased SQL
fn has_returning_into(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(offset) = text[from..].find("RETURNING") {
        let start = from + offset;
        from = start + 1;
        if word_at(bytes, start, b"RETURNING") && returning_list_then_into(bytes, start + 9) {
            return true;
        }
    }
    false
}

fn returning_list_then_into(text: &[u8], mut pos: usize) -> bool {
    let skip_ws = |pos: &mut usize| {
        let begin = *pos;
        while text.get(*pos).map_or(false, |b| b.is_ascii_whitespace()) {
            *pos += 1;
        }
        *pos - begin
    };

    if skip_ws(&mut pos) == 0 {
        return false;
    }
    loop {
        let word_start = pos;
        while text.get(pos).map_or(false, |&b| is_word_byte(b)) {
            pos += 1;
        }
        if pos == word_start {
            return false;
        }
        let gap = skip_ws(&mut pos);
        if text.get(pos) == Some(&b',') {
            pos += 1;
            skip_ws(&mut pos);
            continue;
        }
        return gap > 0 && word_at(text, pos, b"INTO");
    }
}
