//! Socket transport
//!
//! [`StreamTransport`] adapts any tokio byte stream to [`ChunkStream`]. TCP
//! is the case the proxy runs with; tests plug in in-memory duplex pipes.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::DEFAULT_READ_CHUNK;
use crate::error::{Error, Result};

use super::ChunkStream;

/// TCP side of a proxied connection
pub type TcpTransport = StreamTransport<TcpStream>;

/// Connect to `addr`, giving up after `connect_timeout`
pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<TcpStream> {
    let stream = timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| Error::ConnectionTimeout(connect_timeout))?
        .map_err(Error::Io)?;

    stream.set_nodelay(true).map_err(Error::Io)?;
    Ok(stream)
}

/// Byte stream read in chunks of at most `chunk_size`
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    read_buf: BytesMut,
    chunk_size: usize,
}

impl<S> StreamTransport<S> {
    /// Wrap a stream using the default read size
    pub fn new(stream: S) -> Self {
        Self::with_chunk_size(stream, DEFAULT_READ_CHUNK)
    }

    /// Wrap a stream with an explicit read size
    pub fn with_chunk_size(stream: S, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            stream,
            read_buf: BytesMut::with_capacity(chunk_size),
            chunk_size,
        }
    }

    /// Read size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The wrapped stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait::async_trait]
impl<S> ChunkStream for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_chunk(&mut self) -> Result<Bytes> {
        self.read_buf.reserve(self.chunk_size);
        let n = (&mut self.stream)
            .take(self.chunk_size as u64)
            .read_buf(&mut self.read_buf)
            .await
            .map_err(Error::Io)?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(self.read_buf.split().freeze())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await.map_err(Error::Io)?;
        self.stream.flush().await.map_err(Error::Io)?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_are_capped_at_chunk_size() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut transport = StreamTransport::with_chunk_size(client, 4);
        server.write_all(b"abcdefg").await.unwrap();

        assert_eq!(&transport.read_chunk().await.unwrap()[..], b"abcd");
        assert_eq!(&transport.read_chunk().await.unwrap()[..], b"efg");
    }

    #[tokio::test]
    async fn test_end_of_stream_is_connection_closed() {
        let (client, server) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);
        drop(server);
        assert!(matches!(transport.read_chunk().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);
        transport.write_all(b"\x00\x08").await.unwrap();
        let mut buf = [0u8; 2];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x00, 0x08]);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(connect(&addr, Duration::from_secs(1)).await.is_err());
    }
}
