//! Transport layer
//!
//! The proxy sees each side of a connection as a stream of reads of
//! whatever size the socket delivers. Reassembly into packets happens
//! above this layer, in [`Framer`](crate::packet::Framer).

mod tcp;

pub use tcp::{connect, StreamTransport, TcpTransport};

use bytes::Bytes;

use crate::error::Result;

/// One side of a proxied connection
#[async_trait::async_trait]
pub trait ChunkStream: Send {
    /// Read whatever bytes are available; `ConnectionClosed` at end of stream
    async fn read_chunk(&mut self) -> Result<Bytes>;

    /// Write all of `data`
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Close the write half
    async fn shutdown(&mut self) -> Result<()>;
}
