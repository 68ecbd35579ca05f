//! Packet reassembly
//!
//! TCP hands the proxy arbitrary slices of the byte stream. The framer
//! groups consecutive reads until their total length matches the length
//! declared in the first bytes of the packet, splitting a read that runs
//! past the end of the packet. The part after the split seeds the next
//! packet.

use std::collections::VecDeque;

use bytes::Bytes;

use super::header::peek_length;
use super::Packet;
use crate::constants::PACKET_HEADER_SIZE;
use crate::error::{Error, Result};

/// Split a run of reads at `target` total bytes.
///
/// Returns the reads making up exactly `target` bytes and, when the last
/// read overshoots, the remainder of that read followed by any later reads.
pub fn cut_chunks(chunks: Vec<Bytes>, target: usize) -> (Vec<Bytes>, Vec<Bytes>) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut taken = 0usize;

    for mut chunk in chunks {
        if taken >= target {
            tail.push(chunk);
            continue;
        }
        let wanted = target - taken;
        if chunk.len() > wanted {
            let rest = chunk.split_off(wanted);
            taken += chunk.len();
            head.push(chunk);
            tail.push(rest);
        } else {
            taken += chunk.len();
            head.push(chunk);
        }
    }

    (head, tail)
}

/// Stateful reassembler for one direction of a connection
#[derive(Debug, Default)]
pub struct Framer {
    /// Reads not yet handed out as part of a packet
    pending: VecDeque<Bytes>,
    /// Whether the length field is 4 bytes wide
    large_sdu: bool,
}

impl Framer {
    /// Create an empty framer using 2-byte lengths
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the width of the length field
    pub fn set_large_sdu(&mut self, large_sdu: bool) {
        self.large_sdu = large_sdu;
    }

    /// Queue a transport read
    pub fn push(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.pending.push_back(chunk);
        }
    }

    /// Bytes buffered but not yet returned
    pub fn buffered(&self) -> usize {
        self.pending.iter().map(Bytes::len).sum()
    }

    /// Whether any bytes are buffered
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Declared length of the packet at the front of the queue
    fn declared_length(&self) -> Option<usize> {
        let width = if self.large_sdu { 4 } else { 2 };
        let mut prefix = Vec::with_capacity(width);
        for chunk in &self.pending {
            let wanted = width - prefix.len();
            prefix.extend_from_slice(&chunk[..wanted.min(chunk.len())]);
            if prefix.len() == width {
                break;
            }
        }
        peek_length(&prefix, self.large_sdu)
    }

    /// Pop the next complete packet, if all of its bytes have arrived
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        let target = match self.declared_length() {
            Some(length) => length,
            None => return Ok(None),
        };
        if target < PACKET_HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: PACKET_HEADER_SIZE,
                actual: target,
            });
        }
        if self.buffered() < target {
            return Ok(None);
        }

        let queued: Vec<Bytes> = self.pending.drain(..).collect();
        let (packet_chunks, rest) = cut_chunks(queued, target);
        self.pending.extend(rest);

        tracing::trace!(
            length = target,
            reads = packet_chunks.len(),
            carried = self.buffered(),
            "packet reassembled"
        );
        Packet::from_chunks(packet_chunks, self.large_sdu).map(Some)
    }
}
