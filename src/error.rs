//! Error types for the protocol decoder and proxy
//!
//! Two kinds of failure are kept apart here. [`Error`] is a fault of the
//! decoder or the transport and always ends the proxied connection.
//! [`OraError`] is a database-level error the server reported; it travels
//! inside the decoded message stream as data.

use std::io;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::constants::PacketType;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for decoding and proxying
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Invalid packet type received
    #[error("invalid packet type: {0}")]
    InvalidPacketType(u8),

    /// Packet type the decoder does not handle
    #[error("unsupported Message type {0:?}")]
    UnsupportedPacket(PacketType),

    /// Invalid TTC message type received
    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    /// Invalid TTC function code received
    #[error("invalid function code: {0}")]
    InvalidFunctionCode(u8),

    /// Message code that is not valid at this point of a response
    #[error("message code error: received code {0}")]
    UnexpectedMessageCode(u8),

    /// Packet too short to contain valid header
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    /// General protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    // =========================================================================
    // Buffer Errors
    // =========================================================================
    /// Buffer underflow - the packet ended before the field did
    #[error("buffer underflow: need {needed} bytes but only {available} available")]
    BufferUnderflow { needed: usize, available: usize },

    /// Buffer overflow - not enough space to write
    #[error("buffer overflow: need {needed} bytes but only {available} available")]
    BufferOverflow { needed: usize, available: usize },

    /// Invalid length indicator
    #[error("invalid length indicator: {0}")]
    InvalidLengthIndicator(u8),

    /// A column or bind value that does not decode as its declared type
    #[error("data conversion error: {0}")]
    Conversion(String),

    // =========================================================================
    // Connection Errors
    // =========================================================================
    /// Peer closed the connection
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// Upstream connect timeout
    #[error("connection timeout after {0:?}")]
    ConnectionTimeout(Duration),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record serialization failure
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if the packet ended before a field could be read
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::BufferUnderflow { .. })
    }

    /// Check if this is a transport-level error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed | Error::ConnectionTimeout(_) | Error::Io(_)
        )
    }
}

/// A database error code with its human readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OraError {
    /// Error number
    pub code: u32,
    /// Message text
    pub message: String,
}

impl OraError {
    /// Build an error from a code using the fixed message map
    pub fn from_code(code: u32) -> Self {
        Self {
            code,
            message: ora_message(code),
        }
    }

    /// Build an error carrying a server supplied message
    pub fn with_message(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Translate an error code into its message.
///
/// Codes outside the map render as `ORA-<code>`.
pub fn ora_message(code: u32) -> String {
    let text = match code {
        1 => "ORA-00001: Unique constraint violation",
        900 => "ORA-00900: Invalid SQL statement",
        901 => "ORA-00901: Invalid CREATE command",
        902 => "ORA-00902: Invalid data type",
        903 => "ORA-00903: Invalid table name",
        904 => "ORA-00904: Invalid identifier",
        905 => "ORA-00905: Misspelled keyword",
        906 => "ORA-00906: Missing left parenthesis",
        907 => "ORA-00907: Missing right parenthesis",
        1403 => "ORA-01403: no data found",
        3135 => "ORA-03135: connection lost contact",
        12506 => "ORA-12506: TNS:listener rejected connection based on service ACL filtering",
        12514 => {
            "ORA-12514: TNS:listener does not currently know of service requested in connect descriptor"
        }
        12564 => "ORA-12564: TNS connection refused",
        12572 => "ORA-12572: TNS:packet reader failure",
        12573 => "ORA-12573: TNS:packet parser failure",
        12631 => "ORA-12631: Username retrieval failed",
        _ => return format!("ORA-{}", code),
    };
    text.to_string()
}
