//! EXECUTE and RE-EXECUTE function payloads
//!
//! EXECUTE opens or reuses a cursor. On a fresh parse it carries the SQL
//! text; it then describes every bind (or, with the define flag, every
//! result column) and ends with the bind values, one row per bulk
//! iteration.
//!
//! Body layout after the function header:
//! ```text
//! UB4  execute options
//! UB2  cursor id (0 for a new cursor)
//!  1   pointer to SQL text, followed by UB4 SQL length when set
//!      ...  reserved fields
//! UB4  rows to fetch
//! UB4  LOB prefetch length
//! UB2  number of binds
//!  1   define flag
//! UB2  number of defined columns
//!      ...  TTC version gated fields, array bind count from v7
//! CLR  SQL text (parse only)
//! 13 x UB4 al8i4 options
//!      bind or define descriptors
//!      bind values
//! ```
//!
//! RE-EXECUTE and RE-EXECUTE-AND-FETCH name an existing cursor and only
//! send new bind values, decoded with the descriptors the cursor was
//! opened with.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::constants::{ttc_version, BindDirection, OracleType, PARAM_FLAG_NO_VALUE};
use crate::error::Result;
use crate::row::{value_from_raw, Row, Value};
use crate::session::Session;
use crate::statement::{ColumnInfo, Statement};

/// Number of al8i4 option words
const AL8I4_LENGTH: usize = 13;

/// Decoded EXECUTE payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Execute {
    /// Execute options bit set
    pub options: u32,
    /// Cursor id sent by the client
    pub cursor_id: u32,
    /// The SQL text is included
    pub parse: bool,
    /// Column defines follow instead of binds
    pub define: bool,
    /// Rows to prefetch
    pub rows_to_fetch: u32,
    /// LOB prefetch length
    pub lob_prefetch: u32,
    /// Bind count
    pub param_count: u16,
    /// Defined column count
    pub column_count: u16,
    /// Rows of an array bind
    pub array_bind_count: u32,
    /// al8i4 option words
    pub al8i4: Vec<u32>,
    /// Statement as the server will see it
    pub statement: Statement,
    /// Bind values, one row per bulk iteration
    pub bind_rows: Vec<Row>,
}

impl Execute {
    /// Parse an EXECUTE body starting right after the function header
    pub fn parse(buf: &mut ReadBuffer, session: &Session) -> Result<Self> {
        let caps = &session.caps;
        let options = buf.read_ub4()?;
        let cursor_id = buf.read_ub2()? as u32;
        buf.skip(1)?;
        let parse = buf.peek_u8()? != 0;
        if parse {
            buf.skip_ub4()?;
        } else {
            buf.skip(1)?;
        }
        buf.skip(1)?;
        buf.skip_ub2()?;
        buf.skip(3)?;
        let rows_to_fetch = buf.read_ub4()?;
        let lob_prefetch = buf.read_ub4()?;
        buf.skip(1)?;
        let param_count = buf.read_ub2()?;
        buf.skip(5)?;
        let define = buf.read_u8()? != 0;
        let column_count = buf.read_ub2()?;

        let mut array_bind_count = 0;
        if caps.ttc_at_least(ttc_version::V4) {
            buf.skip(3)?;
        }
        if caps.ttc_at_least(ttc_version::V5) {
            buf.skip(5)?;
        }
        if caps.ttc_at_least(ttc_version::V7) {
            buf.skip(1)?;
            array_bind_count = buf.read_ub4()?;
            buf.skip(1)?;
        }
        if caps.ttc_at_least(ttc_version::V8) {
            buf.skip(5)?;
        }
        if caps.ttc_at_least(ttc_version::V9) {
            buf.skip(2)?;
        }

        let sql = if parse {
            Some(String::from_utf8_lossy(&buf.read_clr()?).into_owned())
        } else {
            None
        };
        let al8i4 = (0..AL8I4_LENGTH)
            .map(|_| buf.read_ub4())
            .collect::<Result<Vec<_>>>()?;

        let mut descriptors = Vec::new();
        let count = if define { column_count } else { param_count };
        for _ in 0..count {
            descriptors.push(ColumnInfo::read_bind(buf, caps)?);
        }

        let mut statement = match sql {
            Some(sql) => Statement::new(sql),
            // an open cursor executed again without its text
            None => session
                .cursors
                .get(cursor_id)
                .map(|open| Statement::new(open.sql.clone()))
                .unwrap_or_default(),
        };
        statement.cursor_id = cursor_id;
        statement.rows_to_fetch = rows_to_fetch;
        statement.array_bind_count = array_bind_count;
        if define {
            // defined columns are all sent until a bit vector says otherwise
            for col in descriptors.iter_mut() {
                col.get_data_from_server = true;
            }
            statement.columns = descriptors;
        } else {
            statement.has_lob |= descriptors
                .iter()
                .any(|p| p.is(OracleType::Clob) || p.is(OracleType::Blob));
            statement.params = descriptors;
        }

        let bind_rows = read_bind_rows(buf, &mut statement, caps)?;
        tracing::trace!(
            cursor_id,
            parse,
            binds = statement.params.len(),
            rows = bind_rows.len(),
            "execute"
        );

        Ok(Self {
            options,
            cursor_id,
            parse,
            define,
            rows_to_fetch,
            lob_prefetch,
            param_count,
            column_count,
            array_bind_count,
            al8i4,
            statement,
            bind_rows,
        })
    }
}

/// Decoded RE-EXECUTE or RE-EXECUTE-AND-FETCH payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reexecute {
    /// Cursor executed again
    pub cursor_id: u32,
    /// Iteration count
    pub count: u16,
    /// Execute options
    pub options: u16,
    /// Execute flags
    pub exec_flags: u16,
    /// The open statement, when the cursor is known
    pub statement: Option<Statement>,
    /// Bind values, one row per bulk iteration
    pub bind_rows: Vec<Row>,
}

impl Reexecute {
    /// Parse a RE-EXECUTE body starting right after the function header
    pub fn parse(buf: &mut ReadBuffer, session: &Session) -> Result<Self> {
        let cursor_id = buf.read_ub2()? as u32;
        let count = buf.read_ub2()?;
        let options = buf.read_ub2()?;
        let exec_flags = buf.read_ub2()?;

        let mut statement = session.cursors.get(cursor_id).cloned();
        let bind_rows = match statement.as_mut() {
            Some(stmt) => read_bind_rows(buf, stmt, &session.caps)?,
            None => {
                tracing::warn!(cursor_id, "re-execute of an unknown cursor");
                Vec::new()
            }
        };
        Ok(Self {
            cursor_id,
            count,
            options,
            exec_flags,
            statement,
            bind_rows,
        })
    }
}

/// Read the bind values of a request, once per array bind row.
///
/// The values of the last row are also stored on the statement's
/// parameters.
pub fn read_bind_rows(buf: &mut ReadBuffer, stmt: &mut Statement, caps: &Capabilities) -> Result<Vec<Row>> {
    if stmt.params.is_empty() {
        return Ok(Vec::new());
    }
    let iterations = stmt.array_bind_count.max(1);
    let mut rows = Vec::with_capacity(iterations as usize);
    for _ in 0..iterations {
        rows.push(read_bind_row(buf, stmt, caps)?);
    }
    Ok(rows)
}

fn read_bind_row(buf: &mut ReadBuffer, stmt: &mut Statement, caps: &Capabilities) -> Result<Row> {
    // row data message code
    buf.skip(1)?;
    let parse = stmt.parse;
    let plsql = stmt.is_plsql();

    let mut values = Vec::with_capacity(stmt.params.len());
    for par in stmt.params.iter_mut() {
        match read_bind_raw(buf, par, parse, plsql)? {
            Some(raw) => {
                par.value = value_from_raw(par, &raw, caps);
                par.raw = raw;
                values.push(par.value.clone());
            }
            None => values.push(Value::Null),
        }
    }
    Ok(Row::new(values))
}

/// Raw bytes of one bind value, `None` when the client sends none
fn read_bind_raw(buf: &mut ReadBuffer, par: &ColumnInfo, parse: bool, plsql: bool) -> Result<Option<Bytes>> {
    if par.flag == PARAM_FLAG_NO_VALUE {
        return Ok(None);
    }
    if !parse && par.direction == BindDirection::Output && !plsql {
        return Ok(None);
    }
    if par.is(OracleType::RefCursor) {
        buf.skip(2)?;
        return Ok(None);
    }
    if par.direction == BindDirection::Input && par.oracle_type().map_or(false, OracleType::is_lob) {
        buf.skip_ub2()?;
        return buf.read_clr().map(Some);
    }
    if par.is_object() {
        buf.skip(4)?;
        buf.skip_ub4()?;
        buf.skip(2)?;
        return buf.read_clr().map(Some);
    }
    if par.max_array_elems > 0 {
        return Ok(None);
    }
    buf.read_clr().map(Some)
}
