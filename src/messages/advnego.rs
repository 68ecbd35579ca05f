//! Advanced negotiation (ANO) message
//!
//! Sent right after ACCEPT, before protocol negotiation, when the client
//! wants native network encryption, checksumming or external
//! authentication. It is recognised by the `DEADBEEF` magic in place of a
//! TTC message type.
//!
//! ```text
//!     10 |    4 | Magic 0xDEADBEEF
//!     14 |    2 | Length
//!     16 |    4 | Version
//!     20 |    2 | Service count
//!     22 |    1 | Error flags
//!     23 |    n | Services
//! ```
//!
//! Each service starts with its type, its sub-packet count and 4 reserved
//! bytes. Every sub-packet has a 2-byte length and a 2-byte type, followed
//! by the value; all integers are big endian.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::constants::{adv_nego_service, ADV_NEGO_AUTH_STATUS_MORE, DATA_MESSAGE_OFFSET};
use crate::error::{Error, Result};
use crate::packet::Packet;

/// Sub-packet count of a data integrity answer carrying Diffie-Hellman
/// parameters
const DH_SUB_PACKETS: u16 = 8;

/// Fixed part of an advanced negotiation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdvNegoHeader {
    /// Declared length
    pub length: u16,
    /// ANO version
    pub version: u32,
    /// Number of services that follow
    pub service_count: u16,
    /// Error flags
    pub error_flags: u8,
}

/// Diffie-Hellman parameters of a data integrity answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffieHellman {
    /// Generator length
    pub gen_length: u16,
    /// Prime length
    pub prime_length: u16,
    /// Generator
    #[serde(serialize_with = "crate::record::as_hex")]
    pub generator: Bytes,
    /// Prime
    #[serde(serialize_with = "crate::record::as_hex")]
    pub prime: Bytes,
    /// Server public key
    #[serde(serialize_with = "crate::record::as_hex")]
    pub server_public_key: Bytes,
    /// Initialisation vector
    #[serde(serialize_with = "crate::record::as_hex")]
    pub iv: Bytes,
}

/// Service body, by service type and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "service")]
pub enum ServiceData {
    /// Authentication adapters offered by the client
    AuthOffer {
        /// Service version
        version: u32,
        /// Unidentified UB2 field
        reserved: u16,
        /// Status
        status: u16,
        /// (adapter id, adapter name)
        adapters: Vec<(u8, String)>,
    },
    /// Encryption algorithms offered by the client
    EncryptionOffer {
        /// Service version
        version: u32,
        /// Algorithm ids
        #[serde(serialize_with = "crate::record::as_hex")]
        algorithms: Bytes,
    },
    /// Checksum algorithms offered by the client
    DataIntegrityOffer {
        /// Service version
        version: u32,
        /// Algorithm ids
        #[serde(serialize_with = "crate::record::as_hex")]
        algorithms: Bytes,
    },
    /// Supervisor service of the client
    SupervisorOffer {
        /// Service version
        version: u32,
        /// Client id bytes
        #[serde(serialize_with = "crate::record::as_hex")]
        cid: Bytes,
        /// Services the client supports
        services: Vec<u16>,
    },
    /// Authentication adapter chosen by the server
    AuthAnswer {
        /// Service version
        version: u32,
        /// Status, 0xFAFF when an adapter name follows
        status: u16,
        /// Chosen adapter
        adapter: Option<String>,
    },
    /// Encryption algorithm chosen by the server
    EncryptionAnswer {
        /// Service version
        version: u32,
        /// Algorithm id
        algorithm: u8,
    },
    /// Checksum algorithm chosen by the server
    DataIntegrityAnswer {
        /// Service version
        version: u32,
        /// Algorithm id
        algorithm: u8,
        /// Key exchange parameters
        diffie_hellman: Option<DiffieHellman>,
    },
    /// Supervisor answer
    SupervisorAnswer {
        /// Service version
        version: u32,
        /// Status
        status: u16,
        /// Accepted services
        services: Vec<u16>,
    },
}

/// One negotiated service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    /// Service type
    pub service_type: u16,
    /// Sub-packet count
    pub sub_packets: u16,
    /// Service body
    pub data: ServiceData,
}

/// Advanced negotiation message, request or response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvNegoMessage {
    /// Fixed header
    pub header: AdvNegoHeader,
    /// Services in order
    pub services: Vec<Service>,
}

impl AdvNegoMessage {
    /// Parse an advanced negotiation DATA packet
    pub fn parse(packet: &Packet, is_request: bool) -> Result<Self> {
        let mut buf = packet.reader(false);
        buf.set_position(DATA_MESSAGE_OFFSET)?;
        buf.skip(4)?;
        let header = AdvNegoHeader {
            length: buf.read_u16_be()?,
            version: buf.read_u32_be()?,
            service_count: buf.read_u16_be()?,
            error_flags: buf.read_u8()?,
        };

        let mut services = Vec::with_capacity(header.service_count as usize);
        for _ in 0..header.service_count {
            let service_type = buf.read_u16_be()?;
            let sub_packets = buf.read_u16_be()?;
            buf.skip(4)?;
            let data = if is_request {
                read_offer(&mut buf, service_type, sub_packets)?
            } else {
                read_answer(&mut buf, service_type, sub_packets)?
            };
            services.push(Service {
                service_type,
                sub_packets,
                data,
            });
        }
        tracing::trace!(services = services.len(), is_request, "advanced negotiation");
        Ok(Self { header, services })
    }
}

fn read_offer(buf: &mut ReadBuffer, service_type: u16, sub_packets: u16) -> Result<ServiceData> {
    Ok(match service_type {
        adv_nego_service::AUTH => {
            let version = read_u32(buf)?;
            let reserved = read_u16(buf)?;
            let status = read_u16(buf)?;
            let mut adapters = Vec::new();
            for _ in 0..sub_packets.saturating_sub(3) {
                let id = read_u8(buf)?;
                let name = String::from_utf8_lossy(&read_raw(buf)?).into_owned();
                adapters.push((id, name));
            }
            ServiceData::AuthOffer {
                version,
                reserved,
                status,
                adapters,
            }
        }
        adv_nego_service::ENCRYPT => {
            let version = read_u32(buf)?;
            let algorithms = read_raw(buf)?;
            read_u8(buf)?;
            ServiceData::EncryptionOffer { version, algorithms }
        }
        adv_nego_service::DATA_INTEGRITY => ServiceData::DataIntegrityOffer {
            version: read_u32(buf)?,
            algorithms: read_raw(buf)?,
        },
        adv_nego_service::SUPERVISOR => ServiceData::SupervisorOffer {
            version: read_u32(buf)?,
            cid: read_raw(buf)?,
            services: read_u16_array(buf)?,
        },
        other => return Err(unknown_service(other)),
    })
}

fn read_answer(buf: &mut ReadBuffer, service_type: u16, sub_packets: u16) -> Result<ServiceData> {
    Ok(match service_type {
        adv_nego_service::AUTH => {
            let version = read_u32(buf)?;
            let status = read_u16(buf)?;
            let mut adapter = None;
            if status == ADV_NEGO_AUTH_STATUS_MORE && sub_packets > 2 {
                read_u8(buf)?;
                adapter = Some(String::from_utf8_lossy(&read_raw(buf)?).into_owned());
                if sub_packets > 4 {
                    read_u32(buf)?;
                    read_u32(buf)?;
                    read_u32(buf)?;
                }
            }
            ServiceData::AuthAnswer {
                version,
                status,
                adapter,
            }
        }
        adv_nego_service::ENCRYPT => ServiceData::EncryptionAnswer {
            version: read_u32(buf)?,
            algorithm: read_u8(buf)?,
        },
        adv_nego_service::DATA_INTEGRITY => {
            let version = read_u32(buf)?;
            let algorithm = read_u8(buf)?;
            let diffie_hellman = if sub_packets == DH_SUB_PACKETS {
                Some(DiffieHellman {
                    gen_length: read_u16(buf)?,
                    prime_length: read_u16(buf)?,
                    generator: read_raw(buf)?,
                    prime: read_raw(buf)?,
                    server_public_key: read_raw(buf)?,
                    iv: read_raw(buf)?,
                })
            } else {
                None
            };
            ServiceData::DataIntegrityAnswer {
                version,
                algorithm,
                diffie_hellman,
            }
        }
        adv_nego_service::SUPERVISOR => ServiceData::SupervisorAnswer {
            version: read_u32(buf)?,
            status: read_u16(buf)?,
            services: read_u16_array(buf)?,
        },
        other => return Err(unknown_service(other)),
    })
}

fn unknown_service(service_type: u16) -> Error {
    Error::Protocol(format!("unknown advanced negotiation service {}", service_type))
}

/// Sub-packet header: value length and value type
fn read_sub_header(buf: &mut ReadBuffer) -> Result<usize> {
    let length = buf.read_u16_be()? as usize;
    buf.skip(2)?;
    Ok(length)
}

fn read_u8(buf: &mut ReadBuffer) -> Result<u8> {
    read_sub_header(buf)?;
    buf.read_u8()
}

fn read_u16(buf: &mut ReadBuffer) -> Result<u16> {
    read_sub_header(buf)?;
    buf.read_u16_be()
}

fn read_u32(buf: &mut ReadBuffer) -> Result<u32> {
    read_sub_header(buf)?;
    buf.read_u32_be()
}

fn read_raw(buf: &mut ReadBuffer) -> Result<Bytes> {
    let length = read_sub_header(buf)?;
    buf.read_bytes_owned(length)
}

/// UB2 array: header, 4-byte magic, 2-byte element type, 4-byte count,
/// then the elements
fn read_u16_array(buf: &mut ReadBuffer) -> Result<Vec<u16>> {
    read_sub_header(buf)?;
    buf.skip(4)?;
    buf.skip(2)?;
    let count = buf.read_u32_be()?;
    (0..count).map(|_| buf.read_u16_be()).collect()
}
