//! FETCH function payload
//!
//! Asks for the next batch of rows of an open cursor. The request only
//! names the cursor and the batch size; the column layout needed to decode
//! the rows comes from the statement the cursor table holds.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::error::Result;
use crate::session::Session;
use crate::statement::Statement;

/// Decoded FETCH payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetch {
    /// Cursor to fetch from
    pub cursor_id: u32,
    /// Rows requested
    pub rows_to_fetch: u32,
    /// The open statement, when the cursor is known
    pub statement: Option<Statement>,
}

impl Fetch {
    /// Parse a FETCH body starting right after the function header
    pub fn parse(buf: &mut ReadBuffer, session: &Session) -> Result<Self> {
        let cursor_id = buf.read_ub2()? as u32;
        let rows_to_fetch = buf.read_ub4()?;
        let statement = session.cursors.get(cursor_id).cloned();
        if statement.is_none() {
            tracing::warn!(cursor_id, "fetch from an unknown cursor");
        }
        Ok(Self {
            cursor_id,
            rows_to_fetch,
            statement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_known_cursor() {
        let mut session = Session::new();
        let mut stmt = Statement::new("SELECT a FROM t");
        stmt.cursor_id = 3;
        session.cursors.insert(stmt);

        let mut buf = ReadBuffer::from_slice(&[0x01, 0x03, 0x01, 0x64]);
        let fetch = Fetch::parse(&mut buf, &session).unwrap();
        assert_eq!(fetch.cursor_id, 3);
        assert_eq!(fetch.rows_to_fetch, 100);
        assert_eq!(fetch.statement.map(|s| s.sql), Some("SELECT a FROM t".to_string()));
    }

    #[test]
    fn test_fetch_unknown_cursor() {
        let session = Session::new();
        let mut buf = ReadBuffer::from_slice(&[0x01, 0x09, 0x01, 0x0A]);
        let fetch = Fetch::parse(&mut buf, &session).unwrap();
        assert!(fetch.statement.is_none());
    }
}
