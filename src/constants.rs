//! TNS/TTC protocol constants
//!
//! Every code the decoder dispatches on lives here, grouped by the level of
//! the protocol it belongs to: outer packet types, DATA message kinds,
//! TTC function codes, and the smaller per-message enumerations.

use serde::Serialize;

use crate::error::Error;

// Packet Types

/// TNS packet types (found in packet header byte 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum PacketType {
    /// Client opens a session
    Connect = 1,
    /// Listener agrees to the connect
    Accept = 2,
    /// Acknowledge
    Ack = 3,
    /// Listener turns the connect down
    Refuse = 4,
    /// Listener points the client elsewhere
    Redirect = 5,
    /// Data packet (contains TTC messages)
    Data = 6,
    /// Keepalive with no payload
    Null = 7,
    /// Connection torn down
    Abort = 9,
    /// Peer asks for the connect again
    Resend = 11,
    /// Break, reset or interrupt
    Marker = 12,
    /// Attention
    Attention = 13,
    /// In-band control notification
    Control = 14,
    /// Highest packet type
    Highest = 19,
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PacketType::Connect),
            2 => Ok(PacketType::Accept),
            3 => Ok(PacketType::Ack),
            4 => Ok(PacketType::Refuse),
            5 => Ok(PacketType::Redirect),
            6 => Ok(PacketType::Data),
            7 => Ok(PacketType::Null),
            9 => Ok(PacketType::Abort),
            11 => Ok(PacketType::Resend),
            12 => Ok(PacketType::Marker),
            13 => Ok(PacketType::Attention),
            14 => Ok(PacketType::Control),
            19 => Ok(PacketType::Highest),
            _ => Err(Error::InvalidPacketType(value)),
        }
    }
}

// Packet Flags

/// Packet flags (found in packet header byte 5)
#[allow(missing_docs)]
pub mod packet_flags {
    /// ACCEPT: a session id follows the packet body
    pub const SID: u8 = 0x01;
    /// REDIRECT: address and data are separated by a NUL byte
    pub const REDIRECT_DATA: u8 = 0x02;
    pub const REDIRECT: u8 = 0x04;
}

// Data Flags (for DATA packets)

/// Flags in the two bytes opening every DATA payload
#[allow(missing_docs)]
pub mod data_flags {
    pub const END_OF_RESPONSE: u16 = 0x2000;
    pub const EOF: u16 = 0x0040;
}

// Marker / Control

/// Kinds of MARKER packet
#[allow(missing_docs)]
pub mod marker_type {
    pub const BREAK: u8 = 1;
    pub const RESET: u8 = 2;
    pub const INTERRUPT: u8 = 3;
}

/// Kinds of CONTROL packet
#[allow(missing_docs)]
pub mod control_type {
    pub const INBAND_NOTIFICATION: u16 = 8;
}

// TTC Message Types (within DATA packets)

/// TTC message codes found in DATA packet payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum MessageType {
    /// Protocol version exchange
    Protocol = 1,
    /// Data type representation exchange
    DataTypes = 2,
    /// Function call
    Function = 3,
    /// Error / call summary
    Error = 4,
    /// Describes the rows that follow
    RowHeader = 6,
    /// One row of column values
    RowData = 7,
    /// Out parameters of a call
    Parameter = 8,
    /// Status word ending a call
    Status = 9,
    /// Bind direction vector
    IoVector = 11,
    /// Raw LOB bytes
    LobData = 14,
    /// Non-fatal warning
    Warning = 15,
    /// Select list description
    DescribeInfo = 16,
    /// Client piggyback function
    Piggyback = 17,
    /// Out binds follow
    FlushOutBinds = 19,
    /// Columns changed since the previous row
    BitVector = 21,
    /// Piggybacked server notification
    ServerSidePiggyback = 23,
    /// Function call with no response
    OnewayFn = 26,
    /// Result sets returned by a procedure
    ImplicitResultset = 27,
    /// Server asks to renegotiate
    Renegotiate = 28,
    /// Response is over
    EndOfResponse = 29,
    /// Cookie
    Cookie = 30,
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        match value {
            1 => Ok(MessageType::Protocol),
            2 => Ok(MessageType::DataTypes),
            3 => Ok(MessageType::Function),
            4 => Ok(MessageType::Error),
            6 => Ok(MessageType::RowHeader),
            7 => Ok(MessageType::RowData),
            8 => Ok(MessageType::Parameter),
            9 => Ok(MessageType::Status),
            11 => Ok(MessageType::IoVector),
            14 => Ok(MessageType::LobData),
            15 => Ok(MessageType::Warning),
            16 => Ok(MessageType::DescribeInfo),
            17 => Ok(MessageType::Piggyback),
            19 => Ok(MessageType::FlushOutBinds),
            21 => Ok(MessageType::BitVector),
            23 => Ok(MessageType::ServerSidePiggyback),
            26 => Ok(MessageType::OnewayFn),
            27 => Ok(MessageType::ImplicitResultset),
            28 => Ok(MessageType::Renegotiate),
            29 => Ok(MessageType::EndOfResponse),
            30 => Ok(MessageType::Cookie),
            _ => Err(Error::InvalidMessageType(value)),
        }
    }
}

// DATA message kinds (dispatcher level)

/// Sentinel at the start of an advanced negotiation payload
pub const ADV_NEGO_MAGIC: u32 = 0xDEAD_BEEF;

/// The kind of DATA message the dispatcher expects or decoded.
///
/// The first variants share their code with [`MessageType`]; the rest only
/// exist inside the decoder, to resolve follow-on packets that carry no
/// message code of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataKind {
    /// Protocol version exchange (1)
    Protocol,
    /// Data type representation exchange (2)
    DataTypes,
    /// Function call (3)
    Function,
    /// Client piggyback (17)
    Piggyback,
    /// Connect string that did not fit the CONNECT packet (100)
    ConnectionData,
    /// Redirect payload that did not fit the REDIRECT packet (101)
    RedirectData,
    /// Server response stream (103)
    MessageWithData,
    /// Server version response (104)
    GetDbVersion,
    /// First authentication round response (110)
    AuthPhaseOne,
    /// Second authentication round response (111)
    AuthPhaseTwo,
    /// Advanced negotiation (0xDEADBEEF)
    AdvNego,
}

impl DataKind {
    /// Numeric code of the kind
    pub fn code(self) -> u32 {
        match self {
            DataKind::Protocol => 1,
            DataKind::DataTypes => 2,
            DataKind::Function => 3,
            DataKind::Piggyback => 17,
            DataKind::ConnectionData => 100,
            DataKind::RedirectData => 101,
            DataKind::MessageWithData => 103,
            DataKind::GetDbVersion => 104,
            DataKind::AuthPhaseOne => 110,
            DataKind::AuthPhaseTwo => 111,
            DataKind::AdvNego => ADV_NEGO_MAGIC,
        }
    }

    /// Kinds a client may open a DATA packet with
    pub fn from_request_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(DataKind::Protocol),
            2 => Some(DataKind::DataTypes),
            3 => Some(DataKind::Function),
            17 => Some(DataKind::Piggyback),
            _ => None,
        }
    }
}

// TTC Function Codes

/// Function codes following a FUNCTION or PIGGYBACK message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum FunctionCode {
    /// Run a parsed cursor again
    Reexecute = 4,
    /// More rows from an open cursor
    Fetch = 5,
    /// End the session
    Logoff = 9,
    /// Commit
    Commit = 14,
    /// Rollback
    Rollback = 15,
    /// Get database version
    GetDbVersion = 59,
    /// Run again and fetch in one trip
    ReexecuteAndFetch = 78,
    /// Parse, bind, execute and fetch
    Execute = 94,
    /// Operate on a LOB locator
    LobOp = 96,
    /// Release server cursors
    CloseCursors = 105,
    /// Second authentication round
    AuthPhaseTwo = 115,
    /// First authentication round
    AuthPhaseOne = 118,
    /// End-to-end tracing attributes
    SetEndToEndAttr = 135,
    /// Ping
    Ping = 147,
    /// Change the current schema
    SetSchema = 152,
    /// Take a pooled session
    SessionGet = 162,
    /// Return a pooled session
    SessionRelease = 163,
}

impl TryFrom<u8> for FunctionCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(FunctionCode::Reexecute),
            5 => Ok(FunctionCode::Fetch),
            9 => Ok(FunctionCode::Logoff),
            14 => Ok(FunctionCode::Commit),
            15 => Ok(FunctionCode::Rollback),
            59 => Ok(FunctionCode::GetDbVersion),
            78 => Ok(FunctionCode::ReexecuteAndFetch),
            94 => Ok(FunctionCode::Execute),
            96 => Ok(FunctionCode::LobOp),
            105 => Ok(FunctionCode::CloseCursors),
            115 => Ok(FunctionCode::AuthPhaseTwo),
            118 => Ok(FunctionCode::AuthPhaseOne),
            135 => Ok(FunctionCode::SetEndToEndAttr),
            147 => Ok(FunctionCode::Ping),
            152 => Ok(FunctionCode::SetSchema),
            162 => Ok(FunctionCode::SessionGet),
            163 => Ok(FunctionCode::SessionRelease),
            _ => Err(Error::InvalidFunctionCode(value)),
        }
    }
}

impl FunctionCode {
    /// The response kind the server answers this function with
    pub fn response_kind(self) -> DataKind {
        match self {
            FunctionCode::GetDbVersion => DataKind::GetDbVersion,
            FunctionCode::AuthPhaseOne => DataKind::AuthPhaseOne,
            FunctionCode::AuthPhaseTwo => DataKind::AuthPhaseTwo,
            _ => DataKind::MessageWithData,
        }
    }
}

// Server Piggyback Codes

/// Piggybacked server notification operation codes
#[allow(missing_docs)]
pub mod server_piggyback {
    pub const QUERY_CACHE_INVALIDATION: u8 = 1;
    pub const OS_PID_MTS: u8 = 2;
    pub const TRACE_EVENT: u8 = 3;
    pub const SESS_RET: u8 = 4;
    pub const SYNC: u8 = 5;
    pub const LTXID: u8 = 7;
    pub const AC_REPLAY_CONTEXT: u8 = 8;
    pub const EXT_SYNC: u8 = 9;
}

// Advanced Negotiation

/// Advanced negotiation service types
#[allow(missing_docs)]
pub mod adv_nego_service {
    pub const AUTH: u16 = 1;
    pub const ENCRYPT: u16 = 2;
    pub const DATA_INTEGRITY: u16 = 3;
    pub const SUPERVISOR: u16 = 4;
}

/// Authentication service status asking for a follow-up exchange
pub const ADV_NEGO_AUTH_STATUS_MORE: u16 = 0xFAFF;

/// Operate on a LOB locator codes carried by the LOB-OP function and its piggyback
#[allow(missing_docs)]
pub mod lob_op {
    pub const GET_LENGTH: u32 = 0x0001;
    pub const READ: u32 = 0x0002;
    pub const TRIM: u32 = 0x0020;
    pub const WRITE: u32 = 0x0040;
    pub const FILE_OPEN: u32 = 0x0100;
    pub const CREATE_TEMP: u32 = 0x0110;
    pub const FREE_TEMP: u32 = 0x0111;
    pub const FILE_CLOSE: u32 = 0x0200;
    pub const FILE_ISOPEN: u32 = 0x0400;
    pub const FILE_EXISTS: u32 = 0x0800;
    pub const GET_CHUNK_SIZE: u32 = 0x4000;
    pub const OPEN: u32 = 0x8000;
    pub const CLOSE: u32 = 0x10000;
    pub const IS_OPEN: u32 = 0x11000;
    pub const ARRAY: u32 = 0x80000;

    /// Symbolic name of an operation code
    pub fn name(op: u32) -> Option<&'static str> {
        Some(match op {
            GET_LENGTH => "GET_LENGTH",
            READ => "READ",
            TRIM => "TRIM",
            WRITE => "WRITE",
            FILE_OPEN => "FILE_OPEN",
            CREATE_TEMP => "CREATE_TEMP",
            FREE_TEMP => "FREE_TEMP",
            FILE_CLOSE => "FILE_CLOSE",
            FILE_ISOPEN => "FILE_ISOPEN",
            FILE_EXISTS => "FILE_EXISTS",
            GET_CHUNK_SIZE => "GET_CHUNK_SIZE",
            OPEN => "OPEN",
            CLOSE => "CLOSE",
            IS_OPEN => "IS_OPEN",
            ARRAY => "ARRAY",
            _ => return None,
        })
    }
}

// Protocol Versions

/// TNS versions that change the framing
pub mod version {
    /// Minimum version using a 4-byte packet length
    pub const MIN_LARGE_SDU: u16 = 315;
}

// Connection Constants

/// Sizes from the connect handshake
pub mod connection {
    /// Maximum connect data that fits in the CONNECT packet
    pub const MAX_CONNECT_DATA: u16 = 230;
    /// Minimum connect data offset carrying the extra connect flags
    pub const CONNECT_FLAGS_OFFSET: u16 = 70;
    /// Connect flag 2 value announcing out-of-band support
    pub const SUPPORT_OOB: u32 = 1;
}

// Authentication Modes

/// Bits of the auth mode word
#[allow(missing_docs)]
pub mod auth_mode {
    pub const LOGON: u32 = 0x00000001;
    pub const SYSDBA: u32 = 0x00000020;
    pub const SYSOPER: u32 = 0x00000040;
    pub const SYSASM: u32 = 0x00400000;
    pub const SYSBKP: u32 = 0x01000000;
    pub const SYSDGD: u32 = 0x02000000;
    pub const SYSKMT: u32 = 0x04000000;
    pub const SYSRAC: u32 = 0x08000000;
}

// Capability Indices

/// Positions inside the compile-time capability vector
#[allow(missing_docs)]
pub mod ccap_index {
    pub const FIELD_VERSION: usize = 7;
    pub const TTC1: usize = 15;
    pub const OCI1: usize = 16;
    pub const UB2_DTY: usize = 27;
    pub const TTC3: usize = 37;
}

/// Bits inside the compile-time capability vector
#[allow(missing_docs)]
pub mod ccap_value {
    pub const END_OF_CALL_STATUS: u8 = 0x01;
    pub const FAST_SESSION_PROPAGATE: u8 = 0x01;
    pub const CLIENT_TZ_VERSION: u8 = 0x02;
    pub const BIG_CHUNK_CLR: u8 = 0x20;
    /// First field version using 8-byte SCNs
    pub const FIELD_VERSION_BIG_SCN: u8 = 8;
}

/// Positions inside the runtime capability vector
#[allow(missing_docs)]
pub mod rcap_index {
    pub const TIMEZONE: usize = 1;
}

/// Bits inside the runtime capability vector
#[allow(missing_docs)]
pub mod rcap_value {
    pub const HAS_TIMEZONE: u8 = 0x01;
}

/// TTC field versions gating optional fields
#[allow(missing_docs)]
pub mod ttc_version {
    pub const V3: u8 = 3;
    pub const V4: u8 = 4;
    pub const V5: u8 = 5;
    pub const V6: u8 = 6;
    pub const V7: u8 = 7;
    pub const V8: u8 = 8;
    pub const V9: u8 = 9;
    pub const V10: u8 = 10;
}

// TNS Length Indicators

/// Special CLR length bytes
pub mod length {
    /// Chunked value follows
    pub const LONG_INDICATOR: u8 = 254;
    /// Empty value
    pub const NULL_INDICATOR: u8 = 255;
}

// Oracle Data Types (ORA_TYPE_NUM)

/// Column and parameter type codes the value decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum OracleType {
    /// NCHAR / VARCHAR2
    Nchar = 1,
    /// NUMBER
    Number = 2,
    /// BINARY_INTEGER
    BInteger = 3,
    /// FLOAT
    Float = 4,
    /// NULL terminated string
    NullStr = 5,
    /// VARNUM
    VarNum = 6,
    /// LONG
    Long = 8,
    /// VARCHAR
    Varchar = 9,
    /// ROWID
    Rowid = 11,
    /// DATE
    Date = 12,
    /// VARRAW
    VarRaw = 15,
    /// Native float
    BFloat = 21,
    /// Native double
    BDouble = 22,
    /// RAW
    Raw = 23,
    /// LONG RAW
    LongRaw = 24,
    /// Unsigned int
    Uint = 68,
    /// LONG VARCHAR
    LongVarChar = 94,
    /// LONG VARRAW
    LongVarRaw = 95,
    /// CHAR
    Char = 96,
    /// CHARZ
    Charz = 97,
    /// BINARY_FLOAT
    IbFloat = 100,
    /// BINARY_DOUBLE
    IbDouble = 101,
    /// REF CURSOR
    RefCursor = 102,
    /// OCI XMLType
    OciXmlType = 108,
    /// XMLType / named object
    XmlType = 109,
    /// OCI REF
    OciRef = 110,
    /// CLOB
    Clob = 112,
    /// BLOB
    Blob = 113,
    /// BFILE
    Bfile = 114,
    /// Result set
    ResultSet = 116,
    /// OCI string
    OciString = 155,
    /// OCI date
    OciDate = 156,
    /// TIMESTAMP (DTY form)
    TimestampDty = 180,
    /// TIMESTAMP WITH TIME ZONE (DTY form)
    TimestampTzDty = 181,
    /// INTERVAL YEAR TO MONTH (DTY form)
    IntervalYmDty = 182,
    /// INTERVAL DAY TO SECOND (DTY form)
    IntervalDsDty = 183,
    /// TIME WITH TIME ZONE
    TimeTz = 186,
    /// TIMESTAMP
    Timestamp = 187,
    /// TIMESTAMP WITH TIME ZONE
    TimestampTz = 188,
    /// INTERVAL YEAR TO MONTH
    IntervalYm = 189,
    /// INTERVAL DAY TO SECOND
    IntervalDs = 190,
    /// UROWID
    Urowid = 208,
    /// TIMESTAMP WITH LOCAL TIME ZONE (DTY form)
    TimestampLtzDty = 231,
    /// TIMESTAMP WITH LOCAL TIME ZONE
    TimestampLtz = 232,
}

impl OracleType {
    /// Map a wire code to a known type
    pub fn from_code(value: u8) -> Option<Self> {
        use OracleType::*;
        Some(match value {
            1 => Nchar,
            2 => Number,
            3 => BInteger,
            4 => Float,
            5 => NullStr,
            6 => VarNum,
            8 => Long,
            9 => Varchar,
            11 => Rowid,
            12 => Date,
            15 => VarRaw,
            21 => BFloat,
            22 => BDouble,
            23 => Raw,
            24 => LongRaw,
            68 => Uint,
            94 => LongVarChar,
            95 => LongVarRaw,
            96 => Char,
            97 => Charz,
            100 => IbFloat,
            101 => IbDouble,
            102 => RefCursor,
            108 => OciXmlType,
            109 => XmlType,
            110 => OciRef,
            112 => Clob,
            113 => Blob,
            114 => Bfile,
            116 => ResultSet,
            155 => OciString,
            156 => OciDate,
            180 => TimestampDty,
            181 => TimestampTzDty,
            182 => IntervalYmDty,
            183 => IntervalDsDty,
            186 => TimeTz,
            187 => Timestamp,
            188 => TimestampTz,
            189 => IntervalYm,
            190 => IntervalDs,
            208 => Urowid,
            231 => TimestampLtzDty,
            232 => TimestampLtz,
            _ => return None,
        })
    }

    /// Types whose scale is sent as a compressed signed integer
    pub fn has_signed_scale(self) -> bool {
        matches!(
            self,
            OracleType::Number
                | OracleType::TimestampDty
                | OracleType::TimestampTzDty
                | OracleType::IntervalDsDty
                | OracleType::Timestamp
                | OracleType::TimestampTz
                | OracleType::IntervalDs
                | OracleType::TimestampLtz
                | OracleType::TimestampLtzDty
        )
    }

    /// Date and timestamp types
    pub fn is_datetime(self) -> bool {
        matches!(
            self,
            OracleType::Date
                | OracleType::TimestampDty
                | OracleType::TimestampTzDty
                | OracleType::Timestamp
                | OracleType::TimestampTz
                | OracleType::TimestampLtz
                | OracleType::TimestampLtzDty
                | OracleType::TimeTz
        )
    }

    /// Large object types that travel as locators
    pub fn is_lob(self) -> bool {
        matches!(self, OracleType::Clob | OracleType::Blob | OracleType::Bfile)
    }
}

// Character Set Form (CSFRM)

/// Which character set a text column uses
pub mod csfrm {
    /// Database character set
    pub const IMPLICIT: u8 = 1;
    /// National character set
    pub const NCHAR: u8 = 2;
}

/// Parameter flag marking a value the client does not send
pub const PARAM_FLAG_NO_VALUE: u8 = 0x80;

/// Which way a bind value travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum BindDirection {
    /// Server to client
    Output = 16,
    /// Client to server
    #[default]
    Input = 32,
    /// Both ways
    InputOutput = 48,
}

impl BindDirection {
    /// Whether the server sends a value back
    pub fn is_output(&self) -> bool {
        matches!(self, BindDirection::Output | BindDirection::InputOutput)
    }

    /// Direction for a wire byte
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            16 => Some(BindDirection::Output),
            32 => Some(BindDirection::Input),
            48 => Some(BindDirection::InputOutput),
            _ => None,
        }
    }
}

// Error Codes

/// Database error numbers with protocol meaning
#[allow(missing_docs)]
pub mod error_code {
    pub const NO_DATA_FOUND: u32 = 1403;
    pub const CONNECTION_REFUSED: u32 = 12564;
    pub const ARRAY_DML_ERRORS: u32 = 24381;
    /// Session parameter key carrying the session time zone
    pub const SESSION_TIME_ZONE_KEY: u32 = 163;
}

/// Summary flag asking the client to stop compressing fetched rows
pub const SUMMARY_FLAG_DISABLE_COMPRESSION: u16 = 0x20;

// Packet Header

/// Bytes in every packet header
pub const PACKET_HEADER_SIZE: usize = 8;

/// Offset of the TTC message code inside a DATA packet
pub const DATA_MESSAGE_OFFSET: usize = 10;
