//! Server side piggyback messages
//!
//! The server attaches these to a response to push session state to the
//! client: changed NLS settings, the transaction id for application
//! continuity, the shadow process id and similar. They can appear between
//! any two messages of a response stream.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::{KeyValue, ReadBuffer};
use crate::constants::server_piggyback;
use crate::error::Result;

/// Decoded server piggyback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum ServerPiggyback {
    /// Query result cache invalidation
    QueryCacheInvalidation,
    /// Server process id
    OsPid {
        /// Process id bytes
        #[serde(serialize_with = "crate::record::text_or_hex")]
        pid: Bytes,
    },
    /// Trace event
    TraceEvent,
    /// Session state returned after a call
    SessionReturn {
        /// NLS and session properties
        properties: Vec<KeyValue>,
        /// Flags
        flags: u32,
        /// Session id
        session_id: u32,
        /// Session serial number
        serial_num: u16,
    },
    /// Session state synchronisation
    Sync {
        /// Synchronised properties
        properties: Vec<KeyValue>,
        /// Flags
        flags: u32,
    },
    /// Logical transaction id
    Ltxid {
        /// Transaction id bytes
        #[serde(serialize_with = "crate::record::as_hex")]
        ltxid: Bytes,
    },
    /// Application continuity replay context
    ReplayContext {
        /// Flags
        flags: u32,
        /// Error code
        error_code: u32,
        /// Queue flag
        queue: u8,
        /// Replay context bytes
        #[serde(serialize_with = "crate::record::as_hex")]
        context: Bytes,
    },
    /// Extended sync
    ExtSync {
        /// Data type count
        count: u16,
        /// Data type length
        length: u8,
    },
    /// Operation code this decoder does not know
    Unknown {
        /// Operation code
        code: u8,
    },
}

impl ServerPiggyback {
    /// Read a server piggyback, positioned after the message code
    pub fn parse(buf: &mut ReadBuffer) -> Result<Self> {
        let code = buf.read_u8()?;
        let piggyback = match code {
            server_piggyback::QUERY_CACHE_INVALIDATION => ServerPiggyback::QueryCacheInvalidation,
            server_piggyback::TRACE_EVENT => ServerPiggyback::TraceEvent,
            server_piggyback::OS_PID_MTS => {
                let length = buf.read_ub2()? as usize;
                buf.skip(1)?;
                ServerPiggyback::OsPid {
                    pid: buf.read_bytes_owned(length)?,
                }
            }
            server_piggyback::SESS_RET => {
                buf.skip_ub2()?;
                buf.skip(1)?;
                let count = buf.read_ub2()? as usize;
                let properties = buf.read_key_values(count)?;
                ServerPiggyback::SessionReturn {
                    properties,
                    flags: buf.read_ub4()?,
                    session_id: buf.read_ub4()?,
                    serial_num: buf.read_ub2()?,
                }
            }
            server_piggyback::SYNC => {
                buf.skip_ub2()?;
                buf.skip(1)?;
                let count = buf.read_ub4()? as usize;
                buf.skip(1)?;
                let properties = buf.read_key_values(count)?;
                ServerPiggyback::Sync {
                    properties,
                    flags: buf.read_ub4()?,
                }
            }
            server_piggyback::LTXID => {
                buf.skip_ub4()?;
                ServerPiggyback::Ltxid {
                    ltxid: buf.read_clr()?,
                }
            }
            server_piggyback::AC_REPLAY_CONTEXT => {
                buf.skip_ub2()?;
                buf.skip(1)?;
                let flags = buf.read_ub4()?;
                let error_code = buf.read_ub4()?;
                let queue = buf.read_u8()?;
                buf.skip_ub4()?;
                ServerPiggyback::ReplayContext {
                    flags,
                    error_code,
                    queue,
                    context: buf.read_clr()?,
                }
            }
            server_piggyback::EXT_SYNC => ServerPiggyback::ExtSync {
                count: buf.read_ub2()?,
                length: buf.read_u8()?,
            },
            code => {
                tracing::warn!(code, "unknown server piggyback");
                ServerPiggyback::Unknown { code }
            }
        };
        Ok(piggyback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::WriteBuffer;

    #[test]
    fn test_session_return() {
        let mut buf = WriteBuffer::new();
        buf.write_u8(server_piggyback::SESS_RET).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub2(1).unwrap();
        buf.write_key_value(b"NLS_LANGUAGE", b"AMERICAN", 0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub4(271).unwrap();
        buf.write_ub2(4021).unwrap();

        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        match ServerPiggyback::parse(&mut reader).unwrap() {
            ServerPiggyback::SessionReturn {
                properties,
                session_id,
                serial_num,
                ..
            } => {
                assert_eq!(properties[0].key_str(), "NLS_LANGUAGE");
                assert_eq!(properties[0].value_str(), "AMERICAN");
                assert_eq!(session_id, 271);
                assert_eq!(serial_num, 4021);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_os_pid_and_ltxid() {
        let mut buf = WriteBuffer::new();
        buf.write_u8(server_piggyback::OS_PID_MTS).unwrap();
        buf.write_ub2(4).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_bytes(b"1234").unwrap();
        buf.write_u8(server_piggyback::LTXID).unwrap();
        buf.write_ub4(3).unwrap();
        buf.write_clr(&[1, 2, 3]).unwrap();

        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        assert_eq!(
            ServerPiggyback::parse(&mut reader).unwrap(),
            ServerPiggyback::OsPid {
                pid: Bytes::from_static(b"1234")
            }
        );
        assert_eq!(
            ServerPiggyback::parse(&mut reader).unwrap(),
            ServerPiggyback::Ltxid {
                ltxid: Bytes::from_static(&[1, 2, 3])
            }
        );
    }

    #[test]
    fn test_unknown_code() {
        let mut reader = ReadBuffer::from_slice(&[0x42]);
        assert_eq!(
            ServerPiggyback::parse(&mut reader).unwrap(),
            ServerPiggyback::Unknown { code: 0x42 }
        );
    }
}
