//! Negotiated capabilities
//!
//! The proxy never advertises capabilities of its own. It watches the
//! protocol and data type negotiation go by and records what each side
//! announced, because several later field layouts depend on it: the TTC
//! version gates trailing fields, the EOS and FSAP bits decide what a status
//! message carries, and the big-chunk bit changes how CLR chunk lengths are
//! encoded.

use bytes::Bytes;
use serde::Serialize;

use crate::constants::{ccap_index, ccap_value, rcap_index, rcap_value};

/// Capability state observed on one connection
#[derive(Debug, Clone, Default, Serialize)]
pub struct Capabilities {
    /// Compile-time capabilities sent by the client
    #[serde(serialize_with = "crate::record::as_hex")]
    pub client_compile_caps: Bytes,
    /// Runtime capabilities sent by the client
    #[serde(serialize_with = "crate::record::as_hex")]
    pub client_runtime_caps: Bytes,
    /// Compile-time capabilities sent by the server
    #[serde(serialize_with = "crate::record::as_hex")]
    pub server_compile_caps: Bytes,
    /// Runtime capabilities sent by the server
    #[serde(serialize_with = "crate::record::as_hex")]
    pub server_runtime_caps: Bytes,
    /// Effective TTC field version
    pub ttc_version: u8,
    /// Status messages carry an end-of-call status
    pub end_of_call_status: bool,
    /// Status messages carry an end-to-end ECID sequence
    pub fast_session_propagate: bool,
    /// CLR chunk lengths are compressed UB4 values
    pub big_clr_chunks: bool,
    /// SCN values use the wide encoding
    pub big_scn: bool,
    /// Database character set id
    pub charset_id: u16,
    /// National character set id
    pub ncharset_id: u16,
    /// Time zone file version announced by the client
    pub client_tz_version: Option<u32>,
    /// Time zone file version announced by the server
    pub server_tz_version: Option<u32>,
}

impl Capabilities {
    /// Create an empty capability set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the server's answer to protocol negotiation
    pub fn apply_server_protocol(&mut self, compile_caps: Bytes, runtime_caps: Bytes) {
        self.end_of_call_status =
            cap(&compile_caps, ccap_index::TTC1) & ccap_value::END_OF_CALL_STATUS != 0;
        self.fast_session_propagate =
            cap(&compile_caps, ccap_index::OCI1) & ccap_value::FAST_SESSION_PROPAGATE != 0;
        self.big_clr_chunks = compile_caps.len() > ccap_index::TTC3
            && compile_caps[ccap_index::TTC3] & ccap_value::BIG_CHUNK_CLR != 0;
        self.server_compile_caps = compile_caps;
        self.server_runtime_caps = runtime_caps;
        tracing::debug!(
            eos = self.end_of_call_status,
            fsap = self.fast_session_propagate,
            big_clr_chunks = self.big_clr_chunks,
            "server protocol capabilities"
        );
    }

    /// Record the capabilities the client sends with its data type request
    pub fn apply_client_data_types(&mut self, compile_caps: Bytes, runtime_caps: Bytes) {
        self.client_compile_caps = compile_caps;
        self.client_runtime_caps = runtime_caps;
    }

    /// Derive the effective TTC version once data types are exchanged
    pub fn finish_data_types(&mut self) {
        let client = cap(&self.client_compile_caps, ccap_index::FIELD_VERSION);
        let server = cap(&self.server_compile_caps, ccap_index::FIELD_VERSION);
        self.ttc_version = client.min(server);
        self.big_scn = server >= ccap_value::FIELD_VERSION_BIG_SCN;
        tracing::debug!(
            ttc_version = self.ttc_version,
            big_scn = self.big_scn,
            "data type negotiation complete"
        );
    }

    /// Whether the client runtime caps announce time zone support
    pub fn has_timezone(&self) -> bool {
        cap(&self.client_runtime_caps, rcap_index::TIMEZONE) & rcap_value::HAS_TIMEZONE != 0
    }

    /// Whether the time zone version follows the time zone bytes
    pub fn has_tz_version(&self) -> bool {
        cap(&self.client_compile_caps, ccap_index::TTC3) & ccap_value::CLIENT_TZ_VERSION != 0
    }

    /// Whether conversion triples use UB2 entries
    pub fn ub2_data_types(&self) -> bool {
        cap(&self.client_compile_caps, ccap_index::UB2_DTY) != 0
    }

    /// Check the TTC version against a gate
    pub fn ttc_at_least(&self, version: u8) -> bool {
        self.ttc_version >= version
    }
}

/// Capability byte at `index`, zero when the array is shorter
fn cap(caps: &[u8], index: usize) -> u8 {
    caps.get(index).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps_with(entries: &[(usize, u8)]) -> Bytes {
        let mut caps = vec![0u8; 40];
        for &(index, value) in entries {
            caps[index] = value;
        }
        Bytes::from(caps)
    }

    #[test]
    fn test_server_protocol_flags() {
        let mut caps = Capabilities::new();
        caps.apply_server_protocol(
            caps_with(&[(15, 0x01), (16, 0x01), (37, 0x20)]),
            Bytes::new(),
        );
        assert!(caps.end_of_call_status);
        assert!(caps.fast_session_propagate);
        assert!(caps.big_clr_chunks);
    }

    #[test]
    fn test_short_server_caps_have_no_big_chunks() {
        let mut caps = Capabilities::new();
        caps.apply_server_protocol(Bytes::from_static(&[0; 20]), Bytes::new());
        assert!(!caps.big_clr_chunks);
        assert!(!caps.end_of_call_status);
    }

    #[test]
    fn test_ttc_version_is_minimum() {
        let mut caps = Capabilities::new();
        caps.apply_server_protocol(caps_with(&[(7, 6)]), Bytes::new());
        caps.apply_client_data_types(caps_with(&[(7, 24)]), Bytes::new());
        caps.finish_data_types();
        assert_eq!(caps.ttc_version, 6);
        assert!(!caps.big_scn);

        caps.apply_server_protocol(caps_with(&[(7, 24)]), Bytes::new());
        caps.apply_client_data_types(caps_with(&[(7, 12)]), Bytes::new());
        caps.finish_data_types();
        assert_eq!(caps.ttc_version, 12);
        assert!(caps.big_scn);
        assert!(caps.ttc_at_least(9));
    }
}
