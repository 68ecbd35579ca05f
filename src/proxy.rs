//! Recording proxy
//!
//! A [`Connection`] sits between one client and the database server. It
//! runs the protocol in lock step: read every packet of a client request,
//! forwarding each one to the server once decoded, then do the same for
//! the server's response. Each request/response pair becomes one
//! [`Exchange`] handed to the configured [`ExchangeSink`].
//!
//! Any decode or transport failure ends the connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::dispatch::Decoder;
use crate::error::{Error, Result};
use crate::packet::{Framer, Packet};
use crate::record::{DiscardSink, Direction, Exchange, ExchangeSink, VecSink};
use crate::transport::{self, ChunkStream, StreamTransport};

/// One proxied client connection
pub struct Connection<C, S> {
    id: u64,
    client: C,
    server: S,
    client_framer: Framer,
    server_framer: Framer,
    decoder: Decoder,
    sink: Arc<dyn ExchangeSink>,
    sequence: u64,
}

impl<C, S> Connection<C, S>
where
    C: ChunkStream,
    S: ChunkStream,
{
    /// Pair a client with its server
    pub fn new(id: u64, client: C, server: S, sink: Arc<dyn ExchangeSink>) -> Self {
        Self {
            id,
            client,
            server,
            client_framer: Framer::new(),
            server_framer: Framer::new(),
            decoder: Decoder::new(),
            sink,
            sequence: 0,
        }
    }

    /// Bytes the client already sent before the connection was handed over
    pub fn with_initial(mut self, data: Bytes) -> Self {
        self.client_framer.push(data);
        self
    }

    /// Decoder state, including the session
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Proxy until either side closes.
    ///
    /// The client closing between two exchanges is a normal end.
    pub async fn run(mut self) -> Result<()> {
        let result = loop {
            match self.exchange().await {
                Ok(Some(exchange)) => {
                    if let Err(e) = self.sink.record(exchange).await {
                        break Err(e);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let _ = self.server.shutdown().await;
        let _ = self.client.shutdown().await;
        match &result {
            Ok(()) => tracing::debug!(connection = self.id, exchanges = self.sequence, "connection closed"),
            Err(e) => tracing::error!(connection = self.id, error = %e, "proxy connection torn down"),
        }
        result
    }

    /// Proxy one request and its response. `None` when the client closed
    /// instead of sending another request.
    pub async fn exchange(&mut self) -> Result<Option<Exchange>> {
        self.decoder.reset_exchange();
        let mut exchange = Exchange::new(self.id, self.sequence);

        let mut first = match self.next_packet(Direction::Request).await {
            Err(Error::ConnectionClosed) if !self.client_framer.has_pending() => return Ok(None),
            read => Some(read?),
        };
        loop {
            let (packet, delay) = match first.take() {
                Some(read) => read,
                None => self.next_packet(Direction::Request).await?,
            };
            let decoded = self.decoder.decode(&packet, true)?;
            forward(&mut self.server, &packet).await?;
            exchange.push(Direction::Request, &packet, decoded.message, delay);
            if !decoded.more {
                break;
            }
        }

        loop {
            let (packet, delay) = self.next_packet(Direction::Response).await?;
            let decoded = self.decoder.decode(&packet, false)?;
            forward(&mut self.client, &packet).await?;
            exchange.push(Direction::Response, &packet, decoded.message, delay);
            if !decoded.more {
                break;
            }
        }

        tracing::trace!(
            connection = self.id,
            sequence = self.sequence,
            requests = exchange.requests.len(),
            responses = exchange.responses.len(),
            "exchange complete"
        );
        self.sequence += 1;
        Ok(Some(exchange))
    }

    async fn next_packet(&mut self, direction: Direction) -> Result<(Packet, Duration)> {
        let started = Instant::now();
        let large_sdu = self.decoder.session().large_sdu();
        let (stream, framer): (&mut dyn ChunkStream, &mut Framer) = match direction {
            Direction::Request => (&mut self.client, &mut self.client_framer),
            Direction::Response => (&mut self.server, &mut self.server_framer),
        };
        framer.set_large_sdu(large_sdu);
        loop {
            if let Some(packet) = framer.next_packet()? {
                return Ok((packet, started.elapsed()));
            }
            framer.push(stream.read_chunk().await?);
        }
    }
}

async fn forward<T: ChunkStream + ?Sized>(to: &mut T, packet: &Packet) -> Result<()> {
    for chunk in &packet.chunks {
        to.write_all(chunk).await?;
    }
    Ok(())
}

/// Sink matching the configuration
pub fn sink_for(config: &ProxyConfig) -> Arc<dyn ExchangeSink> {
    if config.retain_records {
        Arc::new(VecSink::new())
    } else {
        Arc::new(DiscardSink)
    }
}

/// Accept clients on `config.listen` and proxy each to `config.upstream`
pub async fn serve(config: ProxyConfig, sink: Arc<dyn ExchangeSink>) -> Result<()> {
    let listener = TcpListener::bind(&config.listen).await?;
    serve_listener(listener, config, sink).await
}

/// Accept loop over an already bound listener
pub async fn serve_listener(listener: TcpListener, config: ProxyConfig, sink: Arc<dyn ExchangeSink>) -> Result<()> {
    let next_id = AtomicU64::new(0);
    tracing::debug!(listen = ?listener.local_addr().ok(), upstream = %config.upstream, "proxy listening");
    loop {
        let (client, peer) = listener.accept().await?;
        let id = next_id.fetch_add(1, Ordering::Relaxed);
        let config = config.clone();
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            let server = match transport::connect(&config.upstream, config.connect_timeout).await {
                Ok(server) => server,
                Err(e) => {
                    tracing::error!(connection = id, %peer, error = %e, "upstream connect failed");
                    return;
                }
            };
            let _ = client.set_nodelay(true);
            let connection = Connection::new(
                id,
                StreamTransport::with_chunk_size(client, config.read_chunk),
                StreamTransport::with_chunk_size(server, config.read_chunk),
                sink,
            );
            // failures are logged by run
            let _ = connection.run().await;
        });
    }
}
