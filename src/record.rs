//! Exchange records
//!
//! Every client request and the server response that answers it are kept
//! together as one [`Exchange`]: the raw packets in both directions, what
//! each packet decoded to, and how long each took to arrive. Finished
//! exchanges are handed to an [`ExchangeSink`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::messages::Message;
use crate::packet::{Packet, PacketHeader};

/// Serialize a byte run as upper-case hex
pub fn as_hex<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&hex::encode_upper(value.as_ref()))
}

/// Serialize a byte run as text when it is printable UTF-8, as hex otherwise
pub fn text_or_hex<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    match std::str::from_utf8(value.as_ref()) {
        Ok(text) if !text.chars().any(char::is_control) => serializer.serialize_str(text),
        _ => as_hex(value, serializer),
    }
}

fn as_micros<S: Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_micros()).unwrap_or(u64::MAX))
}

/// Which peer sent a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to server
    Request,
    /// Server to client
    Response,
}

/// One packet as it crossed the proxy
#[derive(Debug, Clone, Serialize)]
pub struct PacketRecord {
    /// Sender
    pub direction: Direction,
    /// Packet header
    pub header: PacketHeader,
    /// Raw packet bytes
    #[serde(serialize_with = "as_hex")]
    pub raw: Bytes,
    /// What the packet decoded to
    pub message: Option<Message>,
    /// Time from the start of the read to the decoded packet
    #[serde(rename = "read_delay_us", serialize_with = "as_micros")]
    pub read_delay: Duration,
}

/// A client request and the server's answer
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    /// Connection the exchange belongs to
    pub connection_id: u64,
    /// Position within the connection, from 0
    pub sequence: u64,
    /// When the first request packet started arriving
    pub started_at: DateTime<Utc>,
    /// Request packets in order
    pub requests: Vec<PacketRecord>,
    /// Response packets in order
    pub responses: Vec<PacketRecord>,
}

impl Exchange {
    /// Start an empty exchange
    pub fn new(connection_id: u64, sequence: u64) -> Self {
        Self {
            connection_id,
            sequence,
            started_at: Utc::now(),
            requests: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Record a packet
    pub fn push(&mut self, direction: Direction, packet: &Packet, message: Option<Message>, read_delay: Duration) {
        let record = PacketRecord {
            direction,
            header: packet.header,
            raw: packet.data().clone(),
            message,
            read_delay,
        };
        match direction {
            Direction::Request => self.requests.push(record),
            Direction::Response => self.responses.push(record),
        }
    }

    /// Decoded messages in both directions, requests first
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.requests
            .iter()
            .chain(&self.responses)
            .filter_map(|r| r.message.as_ref())
    }

    /// Render as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Consumer of finished exchanges
#[async_trait::async_trait]
pub trait ExchangeSink: Send + Sync {
    /// Take one finished exchange
    async fn record(&self, exchange: Exchange) -> Result<()>;
}

/// Keeps every exchange in memory
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    exchanges: Arc<Mutex<Vec<Exchange>>>,
}

impl VecSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub async fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.lock().await.clone()
    }

    /// Number of exchanges recorded
    pub async fn len(&self) -> usize {
        self.exchanges.lock().await.len()
    }

    /// Whether nothing was recorded yet
    pub async fn is_empty(&self) -> bool {
        self.exchanges.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ExchangeSink for VecSink {
    async fn record(&self, exchange: Exchange) -> Result<()> {
        self.exchanges.lock().await.push(exchange);
        Ok(())
    }
}

/// Drops exchanges after logging them
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait::async_trait]
impl ExchangeSink for DiscardSink {
    async fn record(&self, exchange: Exchange) -> Result<()> {
        tracing::debug!(
            connection = exchange.connection_id,
            sequence = exchange.sequence,
            requests = exchange.requests.len(),
            responses = exchange.responses.len(),
            "exchange discarded"
        );
        Ok(())
    }
}
