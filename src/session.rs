//! Per-connection protocol state
//!
//! A [`Session`] is created for every proxied connection and threaded
//! through every decoder call. It holds what the handshake and the
//! negotiation messages established, plus the table of server cursors the
//! client currently has open. Nothing in here is shared between connections.

use indexmap::IndexMap;
use serde::Serialize;

use crate::capabilities::Capabilities;
use crate::constants::version;
use crate::messages::Summary;
use crate::statement::Statement;

/// Parameters the client proposed in its CONNECT packet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectContext {
    /// Highest protocol version the client speaks
    pub version: u16,
    /// Lowest protocol version the client accepts
    pub min_version: u16,
    /// Global service options
    pub service_options: u16,
    /// Session data unit proposed by the client
    pub sdu: u32,
    /// Transport data unit proposed by the client
    pub tdu: u32,
}

/// State of one proxied connection
#[derive(Debug, Default)]
pub struct Session {
    /// CONNECT parameters, once seen
    pub connect: Option<ConnectContext>,
    /// Protocol version agreed in ACCEPT
    pub version: u16,
    /// ACCEPT has been seen
    pub handshake_complete: bool,
    /// Out-of-band breaks are in use
    pub support_oob: bool,
    /// Agreed session data unit
    pub sdu: u32,
    /// Agreed transport data unit
    pub tdu: u32,
    /// Negotiated capabilities
    pub caps: Capabilities,
    /// Session time zone reported by the server
    pub time_zone: Option<String>,
    /// Summary of the last completed call
    pub summary: Option<Summary>,
    /// Open server cursors
    pub cursors: CursorTable,
}

impl Session {
    /// Create a session for a fresh connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether packet lengths are 4 bytes wide
    pub fn large_sdu(&self) -> bool {
        self.version >= version::MIN_LARGE_SDU
    }

    /// Whether CLR chunk lengths are compressed UB4 values
    pub fn big_chunks(&self) -> bool {
        self.caps.big_clr_chunks
    }
}

/// Statements keyed by their server cursor id
#[derive(Debug, Clone, Default)]
pub struct CursorTable {
    entries: IndexMap<u32, Statement>,
}

impl CursorTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an open cursor
    pub fn get(&self, cursor_id: u32) -> Option<&Statement> {
        self.entries.get(&cursor_id)
    }

    /// Store a statement under its cursor id, replacing whatever was there
    pub fn insert(&mut self, stmt: Statement) {
        let cursor_id = stmt.cursor_id;
        if self.entries.insert(cursor_id, stmt).is_some() {
            tracing::debug!(cursor_id, "cursor replaced");
        } else {
            tracing::debug!(cursor_id, open = self.entries.len(), "cursor opened");
        }
    }

    /// Store a statement that the server moved to a new cursor id
    pub fn replace(&mut self, old_id: u32, stmt: Statement) {
        if old_id != stmt.cursor_id {
            self.entries.shift_remove(&old_id);
        }
        self.insert(stmt);
    }

    /// Forget a cursor the client closed
    pub fn remove(&mut self, cursor_id: u32) -> Option<Statement> {
        let removed = self.entries.shift_remove(&cursor_id);
        if removed.is_some() {
            tracing::debug!(cursor_id, "cursor closed");
        }
        removed
    }

    /// Number of open cursors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no cursor is open
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Open cursor ids in the order they were first seen
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(cursor_id: u32, sql: &str) -> Statement {
        let mut stmt = Statement::new(sql);
        stmt.cursor_id = cursor_id;
        stmt
    }

    #[test]
    fn test_large_sdu_threshold() {
        let mut session = Session::new();
        session.version = 314;
        assert!(!session.large_sdu());
        session.version = 315;
        assert!(session.large_sdu());
    }

    #[test]
    fn test_cursor_table_lifecycle() {
        let mut table = CursorTable::new();
        table.insert(stmt(3, "SELECT 1 FROM DUAL"));
        table.insert(stmt(5, "SELECT 2 FROM DUAL"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(3).map(|s| s.sql.as_str()), Some("SELECT 1 FROM DUAL"));

        assert!(table.remove(3).is_some());
        assert!(table.remove(3).is_none());
        assert_eq!(table.ids().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_cursor_ids_stay_unique() {
        let mut table = CursorTable::new();
        table.insert(stmt(7, "SELECT 1 FROM DUAL"));
        table.replace(7, stmt(9, "SELECT 1 FROM DUAL"));
        assert!(table.get(7).is_none());
        assert!(table.get(9).is_some());

        table.insert(stmt(9, "SELECT 3 FROM DUAL"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(9).map(|s| s.sql.as_str()), Some("SELECT 3 FROM DUAL"));
    }
}
