//! TNS and TTC protocol messages
//!
//! One module per message family. Outer TNS packets (CONNECT, ACCEPT,
//! REFUSE, REDIRECT, MARKER, CONTROL) are parsed from the whole packet;
//! TTC messages inside DATA packets are parsed from a [`ReadBuffer`]
//! positioned after their message code.
//!
//! [`ReadBuffer`]: crate::buffer::ReadBuffer

mod accept;
mod advnego;
mod auth;
mod connect;
mod data_types;
mod db_version;
mod describe;
mod execute;
mod fetch;
mod function;
mod lob_op;
mod marker;
mod piggyback;
mod protocol;
mod redirect;
mod refuse;
mod response;
mod server_piggyback;
mod summary;

use serde::Serialize;

pub use accept::AcceptMessage;
pub use advnego::{AdvNegoHeader, AdvNegoMessage, DiffieHellman, Service, ServiceData};
pub use auth::{read_auth_parameters, AuthRequest};
pub use connect::{ConnectMessage, ConnectionData};
pub use data_types::{DataTypeEntry, DataTypesRequest, DataTypesResponse};
pub use db_version::{release_text, DbVersion};
pub use describe::DescribeInfo;
pub use execute::{read_bind_rows, Execute, Reexecute};
pub use fetch::Fetch;
pub use function::{FunctionBody, FunctionCall};
pub use lob_op::LobOp;
pub use marker::{ControlMessage, MarkerMessage};
pub use piggyback::{Attribute, ClientPiggyback, EndToEndAttributes, Piggyback};
pub use protocol::{ProtocolRequest, ProtocolResponse};
pub use redirect::RedirectMessage;
pub use refuse::{extract_error, RefuseMessage};
pub use response::{
    BitVector, IoVector, Response, ResponseItem, ResponseStream, ReturnParameters, RowData,
    RowHeader, RowSource,
};
pub use server_piggyback::ServerPiggyback;
pub use summary::{BindError, Status, Summary, Warning};

/// A decoded packet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum Message {
    /// CONNECT
    Connect(ConnectMessage),
    /// Connect data that overflowed into a DATA packet
    ConnectionData(ConnectionData),
    /// ACCEPT
    Accept(AcceptMessage),
    /// REFUSE
    Refuse(RefuseMessage),
    /// REDIRECT
    Redirect(RedirectMessage),
    /// Redirect data that overflowed into a DATA packet
    RedirectData(RedirectMessage),
    /// MARKER
    Marker(MarkerMessage),
    /// CONTROL
    Control(ControlMessage),
    /// RESEND, no body
    Resend,
    /// Protocol negotiation request
    ProtocolRequest(ProtocolRequest),
    /// Protocol negotiation response
    ProtocolResponse(ProtocolResponse),
    /// Data type negotiation request
    DataTypesRequest(DataTypesRequest),
    /// Data type negotiation response
    DataTypesResponse(DataTypesResponse),
    /// Advanced negotiation
    AdvNego(AdvNegoMessage),
    /// Function call
    Function(FunctionCall),
    /// Client piggybacks, optionally followed by the function they ride on
    Piggyback {
        /// Piggybacks in wire order
        piggybacks: Vec<Piggyback>,
        /// Function call sharing the packet
        function: Option<FunctionCall>,
    },
    /// Server response
    Response(Response),
    /// Database version
    DbVersion(DbVersion),
}
