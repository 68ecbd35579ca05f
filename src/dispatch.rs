//! Packet dispatcher
//!
//! [`Decoder`] turns one framed [`Packet`] into a [`Decoded`] value. It
//! routes on the outer packet type and, for DATA packets, on the inner
//! message kind. A DATA packet that continues an earlier message (connect
//! data, redirect data, a response stream) has no usable message code of
//! its own; the kind announced by the previous decode step is carried over
//! instead.

use crate::buffer::ReadBuffer;
use crate::constants::{DataKind, MessageType, PacketType, ADV_NEGO_MAGIC, DATA_MESSAGE_OFFSET};
use crate::error::{Error, Result};
use crate::messages::{
    AcceptMessage, AdvNegoMessage, ConnectMessage, ConnectionData, ControlMessage, DataTypesRequest,
    DataTypesResponse, DbVersion, FunctionCall, MarkerMessage, Message, Piggyback, ProtocolRequest,
    ProtocolResponse, RedirectMessage, RefuseMessage, ResponseStream,
};
use crate::packet::{Packet, PacketHeader};
use crate::session::Session;
use crate::statement::Statement;

/// Result of decoding one packet
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Packet header
    pub header: PacketHeader,
    /// Decoded message, absent for packets with no body
    pub message: Option<Message>,
    /// More packets of the same logical message follow
    pub more: bool,
    /// Kind the next DATA packet is decoded as
    pub next: Option<DataKind>,
}

impl Decoded {
    fn done(header: PacketHeader, message: Message) -> Self {
        Self {
            header,
            message: Some(message),
            more: false,
            next: None,
        }
    }
}

/// Per-connection packet decoder
#[derive(Debug, Default)]
pub struct Decoder {
    session: Session,
    carried: Option<DataKind>,
    pending: Option<Statement>,
    stream: Option<ResponseStream>,
}

impl Decoder {
    /// Create a decoder for a fresh connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Session state built up so far
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session state
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Kind the next DATA packet will be decoded as
    pub fn carried(&self) -> Option<DataKind> {
        self.carried
    }

    /// Forget the carried kind at the start of a new client request
    pub fn reset_exchange(&mut self) {
        self.carried = None;
        self.stream = None;
    }

    /// Decode one packet. `is_request` tells client packets from server
    /// packets where both directions share a message code.
    pub fn decode(&mut self, packet: &Packet, is_request: bool) -> Result<Decoded> {
        let header = packet.header;
        let decoded = match packet.packet_type() {
            PacketType::Connect => {
                let (msg, overflow) = ConnectMessage::parse(packet, &mut self.session)?;
                Decoded {
                    header,
                    message: Some(Message::Connect(msg)),
                    more: overflow,
                    next: overflow.then_some(DataKind::ConnectionData),
                }
            }
            PacketType::Accept => {
                Decoded::done(header, Message::Accept(AcceptMessage::parse(packet, &mut self.session)?))
            }
            PacketType::Refuse => Decoded::done(header, Message::Refuse(RefuseMessage::parse(packet)?)),
            PacketType::Redirect => {
                let (msg, more) = RedirectMessage::parse(packet)?;
                Decoded {
                    header,
                    message: Some(Message::Redirect(msg)),
                    more,
                    next: more.then_some(DataKind::RedirectData),
                }
            }
            PacketType::Marker => {
                let marker = MarkerMessage::parse(packet)?;
                Decoded {
                    header,
                    message: Some(Message::Marker(marker)),
                    more: marker.expects_more(),
                    next: self.carried,
                }
            }
            PacketType::Control => Decoded::done(
                header,
                Message::Control(ControlMessage::parse(packet, &mut self.session)?),
            ),
            PacketType::Resend => Decoded::done(header, Message::Resend),
            PacketType::Data => self.decode_data(header, packet, is_request)?,
            other => return Err(Error::UnsupportedPacket(other)),
        };
        tracing::trace!(
            packet_type = ?packet.packet_type(),
            is_request,
            more = decoded.more,
            next = ?decoded.next,
            "decoded packet"
        );
        self.carried = decoded.next;
        Ok(decoded)
    }

    fn data_kind(&self, packet: &Packet) -> Result<DataKind> {
        if self.stream.as_ref().map_or(true, |s| !s.has_partial()) && is_adv_nego(packet) {
            return Ok(DataKind::AdvNego);
        }
        if let Some(kind) = self.carried {
            return Ok(kind);
        }
        let code = packet.message_code().ok_or(Error::PacketTooShort {
            expected: DATA_MESSAGE_OFFSET + 1,
            actual: packet.total_size(),
        })?;
        DataKind::from_request_code(code).ok_or(Error::InvalidMessageType(code))
    }

    fn decode_data(&mut self, header: PacketHeader, packet: &Packet, is_request: bool) -> Result<Decoded> {
        let kind = self.data_kind(packet)?;
        let session = &mut self.session;
        let message = match kind {
            DataKind::AdvNego => Message::AdvNego(AdvNegoMessage::parse(packet, is_request)?),
            DataKind::Protocol if is_request => Message::ProtocolRequest(ProtocolRequest::parse(packet)?),
            DataKind::Protocol => Message::ProtocolResponse(ProtocolResponse::parse(packet, session)?),
            DataKind::DataTypes if is_request => {
                Message::DataTypesRequest(DataTypesRequest::parse(packet, session)?)
            }
            DataKind::DataTypes => Message::DataTypesResponse(DataTypesResponse::parse(packet, session)?),
            DataKind::ConnectionData => Message::ConnectionData(ConnectionData::parse(packet)),
            DataKind::RedirectData => Message::RedirectData(RedirectMessage::parse_data(packet)),
            DataKind::GetDbVersion => {
                Message::DbVersion(DbVersion::parse(&mut packet.reader(session.big_chunks()))?)
            }
            DataKind::Function => {
                let mut buf = self.data_reader(packet)?;
                let call = FunctionCall::parse(&mut buf, &self.session)?;
                return Ok(self.after_function(header, Message::Function(call.clone()), &call));
            }
            DataKind::Piggyback => return self.decode_piggybacks(header, packet),
            DataKind::MessageWithData | DataKind::AuthPhaseOne | DataKind::AuthPhaseTwo => {
                return self.decode_response(header, packet, kind)
            }
        };
        Ok(Decoded::done(header, message))
    }

    /// Reader positioned after the message code of a DATA packet
    fn data_reader(&self, packet: &Packet) -> Result<ReadBuffer> {
        let mut buf = packet.reader(self.session.big_chunks());
        buf.set_position(DATA_MESSAGE_OFFSET + 1)?;
        Ok(buf)
    }

    fn after_function(&mut self, header: PacketHeader, message: Message, call: &FunctionCall) -> Decoded {
        self.pending = call.statement();
        Decoded {
            header,
            message: Some(message),
            more: false,
            next: Some(call.response_kind()),
        }
    }

    /// Piggybacks ride in front of a function call, either in the same
    /// packet or in a packet of their own.
    fn decode_piggybacks(&mut self, header: PacketHeader, packet: &Packet) -> Result<Decoded> {
        let mut buf = self.data_reader(packet)?;
        let mut piggybacks = Vec::new();
        loop {
            piggybacks.push(Piggyback::parse(&mut buf, &mut self.session)?);
            if !buf.has_remaining(1) {
                break;
            }
            match buf.read_u8()? {
                code if code == MessageType::Piggyback as u8 => continue,
                code if code == MessageType::Function as u8 => {
                    let call = FunctionCall::parse(&mut buf, &self.session)?;
                    let message = Message::Piggyback {
                        piggybacks,
                        function: Some(call.clone()),
                    };
                    return Ok(self.after_function(header, message, &call));
                }
                code => return Err(Error::InvalidMessageType(code)),
            }
        }
        Ok(Decoded {
            header,
            message: Some(Message::Piggyback {
                piggybacks,
                function: None,
            }),
            more: true,
            next: None,
        })
    }

    fn decode_response(&mut self, header: PacketHeader, packet: &Packet, kind: DataKind) -> Result<Decoded> {
        let pending = &mut self.pending;
        let stream = self
            .stream
            .get_or_insert_with(|| ResponseStream::new(kind, pending.take()));
        let response = stream.decode(packet, &mut self.session)?;
        let more = !response.complete;
        if !more {
            self.stream = None;
        }
        Ok(Decoded {
            header,
            message: Some(Message::Response(response)),
            more,
            next: more.then_some(kind),
        })
    }
}

fn is_adv_nego(packet: &Packet) -> bool {
    packet
        .data()
        .get(DATA_MESSAGE_OFFSET..DATA_MESSAGE_OFFSET + 4)
        .map_or(false, |raw| u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) == ADV_NEGO_MAGIC)
}
