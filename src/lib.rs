#![warn(missing_docs)]

//! # oracle-proxy
//!
//! A recording proxy and wire decoder for the Oracle TNS/TTC protocol.
//!
//! The proxy sits between a database client and its server, forwards every
//! packet unchanged and decodes both directions as it goes. Each client
//! request and the server response that answers it are recorded as an
//! [`Exchange`], ready to be stored and replayed by a mocking layer.
//!
//! ## Features
//!
//! - **Packet reassembly** - TCP reads are grouped into whole TNS packets
//! - **Session tracking** - negotiated capabilities and open cursors, per connection
//! - **Full TTC decoding** - function calls, binds, rows, describe info, summaries
//! - **Typed records** - every decoded message is a tagged enum that serializes with serde
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use oracle_proxy::{serve, ProxyConfig, VecSink};
//!
//! #[tokio::main]
//! async fn main() -> oracle_proxy::Result<()> {
//!     let config = ProxyConfig::new("db.internal:1521").with_listen("0.0.0.0:1521");
//!     let sink = VecSink::new();
//!     serve(config, Arc::new(sink)).await
//! }
//! ```
//!
//! ## Decoding captured packets
//!
//! [`Decoder`] works without any socket: feed it framed packets in the
//! order they crossed the wire.
//!
//! ```rust
//! use bytes::Bytes;
//! use oracle_proxy::{Decoder, Message, Packet};
//!
//! # fn main() -> oracle_proxy::Result<()> {
//! let raw = Bytes::from_static(&[0x00, 0x0b, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02]);
//! let packet = Packet::from_bytes(raw, false)?;
//!
//! let mut decoder = Decoder::new();
//! let decoded = decoder.decode(&packet, false)?;
//! assert!(matches!(decoded.message, Some(Message::Marker(_))));
//! assert!(!decoded.more);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration from the environment
//!
//! [`ProxyConfig::from_env`] reads `ORACLE_PROXY_LISTEN`,
//! `ORACLE_PROXY_UPSTREAM`, `ORACLE_PROXY_READ_CHUNK` and
//! `ORACLE_PROXY_CONNECT_TIMEOUT_MS`.
//!
//! ## Logging
//!
//! The crate logs through `tracing` and never installs a subscriber.

pub mod buffer;
pub mod capabilities;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod messages;
pub mod packet;
pub mod proxy;
pub mod record;
pub mod row;
pub mod session;
pub mod statement;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use capabilities::Capabilities;
pub use config::ProxyConfig;
pub use constants::{BindDirection, DataKind, FunctionCode, MessageType, OracleType, PacketType};
pub use dispatch::{Decoded, Decoder};
pub use error::{Error, OraError, Result};
pub use messages::{Message, Response, ResponseItem, Summary};
pub use packet::{Framer, Packet, PacketHeader};
pub use proxy::{serve, serve_listener, sink_for, Connection};
pub use record::{DiscardSink, Direction, Exchange, ExchangeSink, PacketRecord, VecSink};
pub use row::{Row, Value};
pub use session::{CursorTable, Session};
pub use statement::{ColumnInfo, DataSet, Statement, StatementKind};
pub use transport::{ChunkStream, StreamTransport, TcpTransport};
pub use types::{RefCursor, RowId, URowId};
