//! Authentication function payloads
//!
//! Both authentication phases send the same request layout: an optional
//! user name and a dictionary of session keys (AUTH_TERMINAL,
//! AUTH_PROGRAM_NM, AUTH_SESSKEY, AUTH_PASSWORD and so on). The server
//! answers each phase with its own dictionary inside a response stream,
//! see [`read_auth_parameters`].
//!
//! Request body after the function header:
//! ```text
//!  1   user present
//! UB4  user length
//! UB4  authentication mode
//!  1   pointer
//! UB4  number of key/value pairs
//!  2   pointers
//!  n   user name, length byte first (when present)
//!      key/value pairs
//! ```

use serde::Serialize;

use crate::buffer::{KeyValue, ReadBuffer};
use crate::constants::{auth_mode, DataKind};
use crate::error::Result;

/// Decoded authentication request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// The user name is included
    pub has_user: bool,
    /// Declared user name length
    pub user_length: u32,
    /// Authentication mode bit set
    pub auth_mode: u32,
    /// Number of key/value pairs
    pub pair_count: u32,
    /// User name
    pub user: Option<String>,
    /// Session keys
    pub pairs: Vec<KeyValue>,
}

impl AuthRequest {
    /// Parse an authentication body starting right after the function header
    pub fn parse(buf: &mut ReadBuffer) -> Result<Self> {
        let has_user = buf.read_u8()? == 1;
        let user_length = buf.read_ub4()?;
        let auth_mode = buf.read_ub4()?;
        buf.skip(1)?;
        let pair_count = buf.read_ub4()?;
        buf.skip(2)?;
        let user = if has_user {
            Some(String::from_utf8_lossy(&buf.read_u8_prefixed()?).into_owned())
        } else {
            None
        };
        let pairs = buf.read_key_values(pair_count as usize)?;
        tracing::trace!(user = ?user, auth_mode, pairs = pairs.len(), "auth request");
        Ok(Self {
            has_user,
            user_length,
            auth_mode,
            pair_count,
            user,
            pairs,
        })
    }

    /// Look up a session key
    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        self.pairs.iter().find(|kv| kv.key.as_ref() == key.as_bytes())
    }

    /// Whether the client asked for an administrative privilege
    pub fn is_privileged(&self) -> bool {
        const PRIVILEGES: u32 = auth_mode::SYSDBA
            | auth_mode::SYSOPER
            | auth_mode::SYSASM
            | auth_mode::SYSBKP
            | auth_mode::SYSDGD
            | auth_mode::SYSKMT
            | auth_mode::SYSRAC;
        self.auth_mode & PRIVILEGES != 0
    }
}

/// Read the server's dictionary from a PARAMETER message of an
/// authentication response. Phase one counts entries with a UB4, phase
/// two with a UB2.
pub fn read_auth_parameters(buf: &mut ReadBuffer, kind: DataKind) -> Result<Vec<KeyValue>> {
    let count = match kind {
        DataKind::AuthPhaseTwo => buf.read_ub2()? as usize,
        _ => buf.read_ub4()? as usize,
    };
    buf.read_key_values(count)
}
