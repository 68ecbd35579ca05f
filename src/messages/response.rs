//! Server response streams
//!
//! After a function call the server answers with a stream of TTC
//! messages: describe info, row headers and row data for queries, output
//! binds for PL/SQL and RETURNING clauses, piggybacks, warnings, and
//! finally a STATUS or an ERROR (call summary). The two authentication
//! phases answer with a shorter stream of the same shape whose PARAMETER
//! message is a key/value dictionary.
//!
//! A stream may span many DATA packets and a single message may be split
//! across a packet boundary. [`ResponseStream`] carries the statement being
//! filled and the unread tail of a split message from one packet to the
//! next.

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::buffer::{KeyValue, ReadBuffer};
use crate::capabilities::Capabilities;
use crate::constants::{
    data_flags, error_code, ttc_version, BindDirection, DataKind, MessageType, OracleType,
    DATA_MESSAGE_OFFSET, SUMMARY_FLAG_DISABLE_COMPRESSION,
};
use crate::error::{Error, Result};
use crate::messages::auth::read_auth_parameters;
use crate::messages::{DescribeInfo, ServerPiggyback, Status, Summary, Warning};
use crate::packet::Packet;
use crate::row::{decode_column_value, decode_prime_value, Row, Value};
use crate::session::Session;
use crate::statement::Statement;
use crate::types::RefCursor;

/// One message of a response stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "message", content = "body")]
pub enum ResponseItem {
    /// Row header
    RowHeader(RowHeader),
    /// Row data
    RowData(RowData),
    /// Output binds follow
    FlushOutBinds,
    /// Column presence bit vector
    BitVector(BitVector),
    /// Bind directions
    IoVector(IoVector),
    /// Column metadata
    Describe(DescribeInfo),
    /// Call summary
    Error(Summary),
    /// Warning
    Warning(Warning),
    /// Call status
    Status(Status),
    /// Server piggyback
    ServerPiggyback(ServerPiggyback),
    /// Values returned after execution
    Parameter(ReturnParameters),
    /// Authentication dictionary
    AuthParameters(Vec<KeyValue>),
    /// Result sets a PL/SQL block returned implicitly
    ImplicitResults(Vec<RefCursor>),
    /// LOB content
    LobData(#[serde(serialize_with = "crate::record::as_hex")] Bytes),
    /// End of response
    EndOfResponse,
}

impl ResponseItem {
    /// Whether this message completes the call
    fn completes_call(&self) -> bool {
        matches!(
            self,
            ResponseItem::Status(_) | ResponseItem::Error(_) | ResponseItem::EndOfResponse
        )
    }

    /// Whether nothing of the stream follows this message in `kind`
    fn ends_stream(&self, kind: DataKind) -> bool {
        match self {
            ResponseItem::Status(_) | ResponseItem::EndOfResponse => true,
            ResponseItem::Error(_) => kind != DataKind::MessageWithData,
            _ => false,
        }
    }
}

/// Decoded row header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowHeader {
    /// Header flags
    pub flags: u8,
    /// Column count
    pub column_count: usize,
    /// Rows following
    pub row_count: u32,
    /// UAC buffer length
    pub buffer_length: u16,
    /// Columns sent in the following rows
    #[serde(serialize_with = "crate::record::as_hex")]
    pub bit_vector: Bytes,
}

/// What a row data message carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowSource {
    /// Query columns
    Columns,
    /// Output binds of a PL/SQL call
    OutputBinds,
    /// Values of a RETURNING ... INTO clause
    Returning,
}

/// Decoded row data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowData {
    /// Kind of values
    pub source: RowSource,
    /// The values, unsent columns repeated from the previous row
    pub row: Row,
}

/// Decoded bit vector message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BitVector {
    /// Number of columns sent
    pub columns_sent: u16,
    /// Presence bits
    #[serde(serialize_with = "crate::record::as_hex")]
    pub bit_vector: Bytes,
}

/// Decoded I/O vector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IoVector {
    /// Bind count
    pub column_count: usize,
    /// Rows
    pub row_count: u32,
    /// Direction per bind
    pub directions: Vec<BindDirection>,
}

/// Values the server returns after executing a statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReturnParameters {
    /// Snapshot SCN
    pub scn: [u32; 2],
    /// Session properties
    pub properties: Vec<KeyValue>,
    /// Query id
    pub query_id: Option<u64>,
    /// Rows affected per array DML iteration
    pub dml_row_counts: Vec<u64>,
}

/// The messages one DATA packet contributed to a response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Stream kind
    pub kind: DataKind,
    /// Messages in wire order
    pub items: Vec<ResponseItem>,
    /// The call is complete
    pub complete: bool,
}

impl Response {
    /// Rows carried by this packet
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.items.iter().filter_map(|item| match item {
            ResponseItem::RowData(data) => Some(&data.row),
            _ => None,
        })
    }

    /// Call summary, when this packet carried it
    pub fn summary(&self) -> Option<&Summary> {
        self.items.iter().find_map(|item| match item {
            ResponseItem::Error(summary) => Some(summary),
            _ => None,
        })
    }
}

/// Decoding state of one response that may span several DATA packets
#[derive(Debug)]
pub struct ResponseStream {
    kind: DataKind,
    statement: Statement,
    origin_cursor_id: u32,
    partial: Option<Bytes>,
}

impl ResponseStream {
    /// Start a stream; `statement` is what the request executed or fetched
    pub fn new(kind: DataKind, statement: Option<Statement>) -> Self {
        let statement = statement.unwrap_or_default();
        Self {
            kind,
            origin_cursor_id: statement.cursor_id,
            statement,
            partial: None,
        }
    }

    /// Stream kind
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Statement as filled so far
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Whether a split message waits for the next packet
    pub fn has_partial(&self) -> bool {
        self.partial.is_some()
    }

    /// Decode the messages of one DATA packet.
    ///
    /// A message cut by the end of the packet is kept and completed with
    /// the payload of the next packet, unless the packet's data flags say
    /// the response ended.
    pub fn decode(&mut self, packet: &Packet, session: &mut Session) -> Result<Response> {
        let data = packet.data();
        let body = data.slice(DATA_MESSAGE_OFFSET.min(data.len())..);
        let input = match self.partial.take() {
            Some(head) => {
                let mut joined = BytesMut::with_capacity(head.len() + body.len());
                joined.extend_from_slice(&head);
                joined.extend_from_slice(&body);
                joined.freeze()
            }
            None => body,
        };
        let flags = packet.data_flags().unwrap_or(0);
        let end_flagged = flags & (data_flags::END_OF_RESPONSE | data_flags::EOF) != 0;

        let mut buf = ReadBuffer::new(input).with_big_chunks(session.big_chunks());
        let mut items = Vec::new();
        let mut call_done = false;
        while buf.has_remaining(1) {
            let start = buf.position();
            match self.read_item(&mut buf, session) {
                Ok(item) => {
                    call_done |= item.completes_call();
                    let ends = item.ends_stream(self.kind);
                    items.push(item);
                    if ends {
                        break;
                    }
                }
                Err(e) if e.is_truncated() && !end_flagged => {
                    buf.set_position(start)?;
                    let tail = buf.read_rest();
                    tracing::trace!(bytes = tail.len(), "message continues in next packet");
                    self.partial = Some(tail);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let complete = self.partial.is_none() && (call_done || end_flagged);
        if complete && self.kind == DataKind::MessageWithData {
            self.store_statement(session);
        }
        tracing::trace!(kind = ?self.kind, messages = items.len(), complete, "response packet");
        Ok(Response {
            kind: self.kind,
            items,
            complete,
        })
    }

    /// Keep the cursor's layout for later FETCH and re-execute calls; the
    /// rows themselves stay in the decoded responses
    fn store_statement(&mut self, session: &mut Session) {
        let stmt = &self.statement;
        if stmt.cursor_id == 0 || (stmt.sql.is_empty() && stmt.columns.is_empty()) {
            return;
        }
        let mut stored = stmt.clone();
        stored.data_set.rows.clear();
        session.cursors.replace(self.origin_cursor_id, stored);
        self.origin_cursor_id = self.statement.cursor_id;
    }

    fn read_item(&mut self, buf: &mut ReadBuffer, session: &mut Session) -> Result<ResponseItem> {
        let code = buf.read_u8()?;
        let message = MessageType::try_from(code).map_err(|_| Error::UnexpectedMessageCode(code))?;
        if self.kind != DataKind::MessageWithData {
            return read_auth_item(buf, session, self.kind, message);
        }

        let stmt = &mut self.statement;
        let item = match message {
            MessageType::RowHeader => ResponseItem::RowHeader(read_row_header(buf, stmt)?),
            MessageType::RowData => ResponseItem::RowData(read_row_data(buf, stmt, session)?),
            MessageType::FlushOutBinds => ResponseItem::FlushOutBinds,
            MessageType::BitVector => ResponseItem::BitVector(read_bit_vector(buf, stmt)?),
            MessageType::IoVector => ResponseItem::IoVector(read_io_vector(buf, stmt)?),
            MessageType::DescribeInfo => {
                let info = DescribeInfo::parse(buf, &session.caps)?;
                stmt.set_columns(info.columns.clone());
                stmt.data_set.max_row_size = info.max_row_size;
                ResponseItem::Describe(info)
            }
            MessageType::Error => {
                let summary = Summary::parse(buf, &session.caps)?;
                apply_summary(stmt, &summary);
                session.summary = Some(summary.clone());
                ResponseItem::Error(summary)
            }
            MessageType::Warning => ResponseItem::Warning(Warning::parse(buf)?),
            MessageType::Status => ResponseItem::Status(Status::parse(buf, session)?),
            MessageType::ServerSidePiggyback => ResponseItem::ServerPiggyback(ServerPiggyback::parse(buf)?),
            MessageType::Parameter => ResponseItem::Parameter(ReturnParameters::parse(buf, stmt, session)?),
            MessageType::ImplicitResultset => {
                let cursors = read_implicit_results(buf, &session.caps)?;
                for cursor in &cursors {
                    session.cursors.insert(cursor.to_statement());
                }
                ResponseItem::ImplicitResults(cursors)
            }
            MessageType::LobData => ResponseItem::LobData(buf.read_clr()?),
            MessageType::EndOfResponse => ResponseItem::EndOfResponse,
            _ => return Err(Error::UnexpectedMessageCode(code)),
        };
        Ok(item)
    }
}

fn read_auth_item(
    buf: &mut ReadBuffer,
    session: &mut Session,
    kind: DataKind,
    message: MessageType,
) -> Result<ResponseItem> {
    let item = match message {
        MessageType::Status => ResponseItem::Status(Status::parse(buf, session)?),
        MessageType::Warning => ResponseItem::Warning(Warning::parse(buf)?),
        MessageType::ServerSidePiggyback => ResponseItem::ServerPiggyback(ServerPiggyback::parse(buf)?),
        MessageType::Parameter => ResponseItem::AuthParameters(read_auth_parameters(buf, kind)?),
        MessageType::Error => {
            let summary = Summary::parse(buf, &session.caps)?;
            session.summary = Some(summary.clone());
            ResponseItem::Error(summary)
        }
        other => return Err(Error::UnexpectedMessageCode(other as u8)),
    };
    Ok(item)
}

fn apply_summary(stmt: &mut Statement, summary: &Summary) {
    if summary.cursor_id != 0 {
        stmt.cursor_id = summary.cursor_id;
    }
    stmt.disable_compression = summary.flags & SUMMARY_FLAG_DISABLE_COMPRESSION != 0;
    if summary.is_no_data_found() {
        stmt.has_more_rows = false;
    } else if summary.return_code == 0 && stmt.is_query() {
        stmt.has_more_rows = true;
    }
    if let Some(err) = summary.error() {
        if summary.return_code != error_code::NO_DATA_FOUND {
            tracing::debug!(code = err.code, cursor_id = summary.cursor_id, "call failed");
        }
    }
}

/// A FETCH or re-execute starts from the columns the describe set up
fn seed_columns(stmt: &mut Statement) {
    if stmt.data_set.columns.is_empty() && !stmt.columns.is_empty() {
        stmt.data_set.columns = stmt.columns.clone();
    }
}

/// Column count as a UB2 plus a UB4 counting multiples of 256
fn read_column_count(buf: &mut ReadBuffer) -> Result<usize> {
    let low = buf.read_ub2()? as usize;
    let high = buf.read_ub4()? as usize;
    Ok(low + high * 0x100)
}

fn read_row_header(buf: &mut ReadBuffer, stmt: &mut Statement) -> Result<RowHeader> {
    let flags = buf.read_u8()?;
    let column_count = read_column_count(buf)?;
    let row_count = buf.read_ub4()?;
    let buffer_length = buf.read_ub2()?;
    let bit_vector = buf.read_dlc()?;
    buf.skip_dlc()?;

    seed_columns(stmt);
    let ds = &mut stmt.data_set;
    ds.grow_column_count(column_count);
    ds.row_count = row_count;
    ds.set_bit_vector(bit_vector.clone());
    Ok(RowHeader {
        flags,
        column_count,
        row_count,
        buffer_length,
        bit_vector,
    })
}

fn read_bit_vector(buf: &mut ReadBuffer, stmt: &mut Statement) -> Result<BitVector> {
    let columns_sent = buf.read_ub2()?;
    seed_columns(stmt);
    let length = (stmt.data_set.column_count + 7) / 8;
    let bit_vector = buf.read_bytes_owned(length)?;
    stmt.data_set.set_bit_vector(bit_vector.clone());
    Ok(BitVector {
        columns_sent,
        bit_vector,
    })
}

fn read_io_vector(buf: &mut ReadBuffer, stmt: &mut Statement) -> Result<IoVector> {
    buf.skip(1)?;
    let column_count = read_column_count(buf)?;
    let row_count = buf.read_ub4()?;
    buf.skip_ub2()?;
    let bit_vector = buf.read_dlc()?;
    buf.skip_dlc()?;
    stmt.data_set.grow_column_count(column_count);
    stmt.data_set.row_count = row_count;
    stmt.data_set.set_bit_vector(bit_vector);

    let mut directions = Vec::with_capacity(column_count);
    for x in 0..column_count {
        let wire = buf.read_u8()?;
        let Some(direction) = BindDirection::from_wire(wire) else {
            continue;
        };
        if direction.is_output() {
            stmt.contains_output = true;
        }
        if let Some(par) = stmt.params.get_mut(x) {
            par.direction = direction;
        }
        directions.push(direction);
    }
    Ok(IoVector {
        column_count,
        row_count,
        directions,
    })
}

fn read_row_data(buf: &mut ReadBuffer, stmt: &mut Statement, session: &mut Session) -> Result<RowData> {
    let caps = &session.caps;
    let plsql = stmt.is_plsql();

    let (source, row) = if stmt.has_return_clause && stmt.contains_output {
        let mut values = Vec::new();
        for par in stmt.params.iter_mut().filter(|p| p.direction == BindDirection::Output) {
            if buf.read_ub4()? == 0 {
                par.value = Value::Null;
            } else {
                par.value = decode_prime_value(buf, par, caps, false)?;
                buf.skip_ub2()?;
            }
            values.push(par.value.clone());
        }
        (RowSource::Returning, Row::new(values))
    } else if stmt.contains_output {
        let mut values = Vec::new();
        for par in stmt.params.iter_mut() {
            if par.is(OracleType::RefCursor) {
                let cursor = RefCursor::load(buf, caps)?;
                if plsql {
                    buf.skip_ub2()?;
                }
                par.value = Value::Cursor(cursor);
            } else if par.direction != BindDirection::Input {
                par.value = decode_prime_value(buf, par, caps, false)?;
                buf.skip_ub2()?;
            } else {
                continue;
            }
            values.push(par.value.clone());
        }
        (RowSource::OutputBinds, Row::new(values))
    } else {
        seed_columns(stmt);
        for col in stmt.data_set.columns.iter_mut() {
            if !col.get_data_from_server {
                continue;
            }
            col.value = decode_column_value(buf, col, caps, plsql)?;
            if col.is(OracleType::Long) || col.is(OracleType::LongRaw) {
                buf.skip_ub4()?;
                buf.skip_ub4()?;
            }
        }
        let row = Row::new(stmt.data_set.columns.iter().map(|c| c.value.clone()).collect());
        stmt.data_set.rows.push(row.clone());
        (RowSource::Columns, row)
    };

    for value in &row.values {
        if let Value::Cursor(cursor) = value {
            session.cursors.insert(cursor.to_statement());
        }
    }
    Ok(RowData { source, row })
}

fn read_implicit_results(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Vec<RefCursor>> {
    let count = buf.read_ub4()?;
    let mut cursors = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let skip = buf.read_u8()? as usize;
        buf.skip(skip)?;
        let describe = DescribeInfo::read_body(buf, caps)?;
        let cursor_id = buf.read_ub2()? as u32;
        cursors.push(RefCursor::from_describe(cursor_id, describe));
    }
    Ok(cursors)
}

impl ReturnParameters {
    /// Read a PARAMETER message of a call response
    pub fn parse(buf: &mut ReadBuffer, stmt: &mut Statement, session: &mut Session) -> Result<Self> {
        let mut params = ReturnParameters::default();
        let words = buf.read_ub2()?;
        params.scn = [buf.read_ub4()?, buf.read_ub4()?];
        for _ in 2..words {
            buf.skip_ub4()?;
        }
        stmt.scn = params.scn;

        buf.skip_ub2()?;
        let count = buf.read_ub2()? as usize;
        params.properties = buf.read_key_values(count)?;
        if let Some(tz) = params
            .properties
            .iter()
            .find(|kv| kv.code == error_code::SESSION_TIME_ZONE_KEY)
        {
            session.time_zone = Some(tz.value_str());
        }

        let caps = &session.caps;
        if caps.ttc_at_least(ttc_version::V4) {
            let length = buf.read_ub4()? as usize;
            if length > 0 {
                let raw = buf.read_bytes_owned(length)?;
                if length >= 8 {
                    let mut id = [0u8; 8];
                    id.copy_from_slice(&raw[length - 8..]);
                    params.query_id = Some(u64::from_le_bytes(id));
                    stmt.query_id = u64::from_le_bytes(id);
                }
            }
        }
        if caps.ttc_at_least(ttc_version::V7) && stmt.is_dml() && stmt.array_bind_count > 0 {
            let rows = buf.read_ub4()?;
            for _ in 0..rows {
                params.dml_row_counts.push(buf.read_ub8()?);
            }
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::WriteBuffer;
    use crate::constants::PacketType;
    use crate::messages::describe::tests::write_describe_body;
    use crate::messages::summary::tests::write_summary;
    use crate::packet::PacketBuilder;
    use crate::statement::ColumnInfo;

    fn data_packet(flags: u16, body: &[u8]) -> Packet {
        let mut builder = PacketBuilder::new(PacketType::Data);
        builder.payload().write_u16_be(flags).unwrap();
        builder.payload().write_bytes(body).unwrap();
        Packet::from_bytes(builder.build().unwrap(), false).unwrap()
    }

    fn session_v6() -> Session {
        let mut session = Session::new();
        session.caps.ttc_version = 6;
        session
    }

    fn number_column(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            data_type: OracleType::Number as u8,
            precision: 38,
            scale: 0xFF,
            max_len: 22,
            get_data_from_server: true,
            ..Default::default()
        }
    }

    fn query(cursor_id: u32, columns: &[&str]) -> Statement {
        let mut stmt = Statement::new("SELECT a, b FROM t");
        stmt.cursor_id = cursor_id;
        stmt.columns = columns.iter().map(|c| number_column(c)).collect();
        stmt
    }

    fn row_header(buf: &mut WriteBuffer, columns: u16, bit_vector: &[u8]) {
        buf.write_u8(MessageType::RowHeader as u8).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub2(columns).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub4(1).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_dlc(bit_vector).unwrap();
        buf.write_dlc(&[]).unwrap();
    }

    fn row_of_numbers(buf: &mut WriteBuffer, numbers: &[&[u8]]) {
        buf.write_u8(MessageType::RowData as u8).unwrap();
        for n in numbers {
            buf.write_clr(n).unwrap();
        }
    }

    #[test]
    fn test_rows_with_bit_vector_repeat_unsent_columns() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, Some(query(4, &["A", "B"])));

        let mut body = WriteBuffer::new();
        row_header(&mut body, 2, &[]);
        row_of_numbers(&mut body, &[&[0xC1, 0x02], &[0xC1, 0x03]]); // 1, 2
        body.write_u8(MessageType::BitVector as u8).unwrap();
        body.write_ub2(1).unwrap();
        body.write_u8(0b0000_0010).unwrap();
        row_of_numbers(&mut body, &[&[0xC1, 0x06]]); // b = 5
        body.write_u8(MessageType::Error as u8).unwrap();
        write_summary(&mut body, 4, 1403, "ORA-01403: no data found");

        let response = stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        assert!(response.complete);
        let rows: Vec<Vec<Option<i64>>> = response
            .rows()
            .map(|r| r.values.iter().map(Value::as_i64).collect())
            .collect();
        assert_eq!(rows, vec![vec![Some(1), Some(2)], vec![Some(1), Some(5)]]);
        assert!(!stream.statement().has_more_rows);
        assert_eq!(response.summary().map(|s| s.return_code), Some(1403));

        let stored = session.cursors.get(4).unwrap();
        assert!(stored.data_set.rows.is_empty());
        assert_eq!(stored.columns.len(), 2);
    }

    #[test]
    fn test_stream_without_status_asks_for_more() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, Some(query(4, &["A"])));

        let mut body = WriteBuffer::new();
        row_header(&mut body, 1, &[]);
        row_of_numbers(&mut body, &[&[0xC1, 0x02]]);
        let first = stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        assert!(!first.complete);

        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::EndOfResponse as u8).unwrap();
        let second = stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        assert!(second.complete);
    }

    #[test]
    fn test_end_of_response_flag_completes() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, None);
        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::Warning as u8).unwrap();
        body.write_ub2(0).unwrap();
        body.write_ub2(0).unwrap();
        body.write_ub2(0).unwrap();
        let response = stream
            .decode(&data_packet(data_flags::END_OF_RESPONSE, body.as_slice()), &mut session)
            .unwrap();
        assert!(response.complete);
    }

    #[test]
    fn test_message_split_across_packets() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, Some(query(9, &["A"])));

        let mut body = WriteBuffer::new();
        row_header(&mut body, 1, &[]);
        row_of_numbers(&mut body, &[&[0xC2, 0x02, 0x03]]); // 102
        body.write_u8(MessageType::Error as u8).unwrap();
        write_summary(&mut body, 9, 0, "");
        let bytes = body.as_slice();
        let cut = bytes.len() - 6;

        let first = stream.decode(&data_packet(0, &bytes[..cut]), &mut session).unwrap();
        assert!(!first.complete);
        assert!(stream.has_partial());

        let second = stream.decode(&data_packet(0, &bytes[cut..]), &mut session).unwrap();
        assert!(second.complete);
        assert!(!stream.has_partial());
        assert_eq!(second.summary().map(|s| s.cursor_id), Some(9));
        assert_eq!(first.rows().chain(second.rows()).count(), 1);
    }

    #[test]
    fn test_split_message_at_end_of_response_is_an_error() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, None);
        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::Error as u8).unwrap();
        body.write_ub4(1).unwrap();
        let err = stream
            .decode(&data_packet(data_flags::EOF, body.as_slice()), &mut session)
            .unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn test_describe_then_rows() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, Some(Statement::new("SELECT x FROM t")));

        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::DescribeInfo as u8).unwrap();
        body.write_u8(0).unwrap();
        write_describe_body(&mut body, &[("X", OracleType::Number, 22)]);
        row_header(&mut body, 1, &[]);
        row_of_numbers(&mut body, &[&[0xC1, 0x08]]);
        body.write_u8(MessageType::Error as u8).unwrap();
        write_summary(&mut body, 12, 0, "");

        let response = stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        assert!(response.complete);
        assert_eq!(response.rows().next().and_then(|r| r.get(0)).and_then(Value::as_i64), Some(7));
        assert!(stream.statement().has_more_rows);
        let stored = session.cursors.get(12).unwrap();
        assert_eq!(stored.columns[0].name, "X");
    }

    #[test]
    fn test_io_vector_and_output_binds() {
        let mut session = session_v6();
        let mut stmt = Statement::new("BEGIN :1 := 42; END;");
        stmt.params = vec![ColumnInfo {
            direction: BindDirection::Input,
            ..number_column("1")
        }];
        let mut stream = ResponseStream::new(DataKind::MessageWithData, Some(stmt));

        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::IoVector as u8).unwrap();
        body.write_u8(0).unwrap();
        body.write_ub2(1).unwrap();
        body.write_ub4(0).unwrap();
        body.write_ub4(1).unwrap();
        body.write_ub2(0).unwrap();
        body.write_dlc(&[]).unwrap();
        body.write_dlc(&[]).unwrap();
        body.write_u8(BindDirection::Output as u8).unwrap();
        body.write_u8(MessageType::FlushOutBinds as u8).unwrap();
        body.write_u8(MessageType::RowData as u8).unwrap();
        body.write_clr(&[0xC1, 0x2B]).unwrap(); // 42
        body.write_ub2(0).unwrap();

        let response = stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        assert!(!response.complete);
        match &response.items[2] {
            ResponseItem::RowData(data) => {
                assert_eq!(data.source, RowSource::OutputBinds);
                assert_eq!(data.row.get(0).and_then(Value::as_i64), Some(42));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(stream.statement().contains_output);
    }

    #[test]
    fn test_parameter_sets_time_zone_and_query_id() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, None);

        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::Parameter as u8).unwrap();
        body.write_ub2(2).unwrap();
        body.write_ub4(100).unwrap();
        body.write_ub4(7).unwrap();
        body.write_ub2(0).unwrap();
        body.write_ub2(1).unwrap();
        body.write_key_value(b"", b"+02:00", error_code::SESSION_TIME_ZONE_KEY).unwrap();
        body.write_ub4(8).unwrap();
        body.write_bytes(&42u64.to_le_bytes()).unwrap();
        body.write_u8(MessageType::Status as u8).unwrap();

        let response = stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        assert!(response.complete);
        match &response.items[0] {
            ResponseItem::Parameter(params) => {
                assert_eq!(params.scn, [100, 7]);
                assert_eq!(params.query_id, Some(42));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.time_zone.as_deref(), Some("+02:00"));
    }

    #[test]
    fn test_implicit_results_open_cursors() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::MessageWithData, None);

        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::ImplicitResultset as u8).unwrap();
        body.write_ub4(1).unwrap();
        body.write_u8(0).unwrap();
        write_describe_body(&mut body, &[("N", OracleType::Number, 22)]);
        body.write_ub2(21).unwrap();
        body.write_u8(MessageType::Status as u8).unwrap();

        stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        let cursor = session.cursors.get(21).unwrap();
        assert!(cursor.is_query());
        assert_eq!(cursor.columns[0].name, "N");
    }

    #[test]
    fn test_auth_stream_stops_at_summary() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::AuthPhaseOne, None);

        let mut body = WriteBuffer::new();
        body.write_u8(MessageType::Parameter as u8).unwrap();
        body.write_ub4(1).unwrap();
        body.write_key_value(b"AUTH_SESSKEY", b"A1B2", 0).unwrap();
        body.write_u8(MessageType::Error as u8).unwrap();
        write_summary(&mut body, 0, 0, "");
        body.write_u8(0xEE).unwrap();

        let response = stream.decode(&data_packet(0, body.as_slice()), &mut session).unwrap();
        assert!(response.complete);
        assert_eq!(response.items.len(), 2);
        assert!(session.summary.is_some());
    }

    #[test]
    fn test_unknown_code_is_an_error() {
        let mut session = session_v6();
        let mut stream = ResponseStream::new(DataKind::AuthPhaseTwo, None);
        let err = stream
            .decode(&data_packet(0, &[MessageType::RowData as u8]), &mut session)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedMessageCode(7)));

        let mut stream = ResponseStream::new(DataKind::MessageWithData, None);
        let err = stream.decode(&data_packet(0, &[0x63]), &mut session).unwrap_err();
        assert!(matches!(err, Error::UnexpectedMessageCode(0x63)));
    }
}
