//! Integration tests for the recording proxy

use std::sync::Arc;

use bytes::Bytes;
use oracle_proxy::buffer::WriteBuffer;
use oracle_proxy::constants::{FunctionCode, MessageType, OracleType, PacketType};
use oracle_proxy::messages::{FunctionBody, Message, ResponseItem};
use oracle_proxy::packet::PacketBuilder;
use oracle_proxy::{Connection, StatementKind, StreamTransport, Value, VecSink};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const PIPE_SIZE: usize = 64 * 1024;
const TTC_VERSION: u8 = 6;

fn connect_packet(descriptor: &str) -> Bytes {
    let offset = 74u16;
    let mut data = vec![0u8; offset as usize];
    data[4] = PacketType::Connect as u8;
    data[8..10].copy_from_slice(&319u16.to_be_bytes());
    data[10..12].copy_from_slice(&300u16.to_be_bytes());
    data[14..16].copy_from_slice(&8192u16.to_be_bytes());
    data[16..18].copy_from_slice(&65535u16.to_be_bytes());
    data[22..24].copy_from_slice(&1u16.to_be_bytes());
    data[24..26].copy_from_slice(&(descriptor.len() as u16).to_be_bytes());
    data[26..28].copy_from_slice(&offset.to_be_bytes());
    data[58..62].copy_from_slice(&2_097_152u32.to_be_bytes());
    data[62..66].copy_from_slice(&2_097_152u32.to_be_bytes());
    data.extend_from_slice(descriptor.as_bytes());
    let len = data.len() as u16;
    data[0..2].copy_from_slice(&len.to_be_bytes());
    Bytes::from(data)
}

fn accept_packet(version: u16) -> Bytes {
    let mut data = vec![0u8; 40];
    data[0..2].copy_from_slice(&40u16.to_be_bytes());
    data[4] = PacketType::Accept as u8;
    data[8..10].copy_from_slice(&version.to_be_bytes());
    data[12..14].copy_from_slice(&8192u16.to_be_bytes());
    data[14..16].copy_from_slice(&65535u16.to_be_bytes());
    data[20..22].copy_from_slice(&40u16.to_be_bytes());
    data[32..36].copy_from_slice(&2_097_152u32.to_be_bytes());
    data[36..40].copy_from_slice(&2_097_152u32.to_be_bytes());
    Bytes::from(data)
}

/// DATA packet with 4-byte lengths, as used once version 315+ is accepted
fn data_packet(body: &[u8]) -> Bytes {
    let mut builder = PacketBuilder::new(PacketType::Data).large_sdu(true);
    builder.payload().write_u16_be(0).unwrap();
    builder.payload().write_bytes(body).unwrap();
    builder.build().unwrap()
}

fn compile_caps() -> Vec<u8> {
    let mut ccaps = vec![0u8; 40];
    ccaps[7] = TTC_VERSION;
    ccaps
}

fn protocol_request() -> Bytes {
    let mut buf = WriteBuffer::new();
    buf.write_bytes(&[0x01, 0x06]).unwrap();
    buf.write_null_terminated(&[0x06, 0x05, 0x04, 0x03, 0x02, 0x01]).unwrap();
    buf.write_null_terminated(b"rust-driver").unwrap();
    data_packet(buf.as_slice())
}

fn protocol_response() -> Bytes {
    let mut buf = WriteBuffer::new();
    buf.write_bytes(&[0x01, 0x06]).unwrap();
    buf.write_null_terminated(&[0x06, 0x05]).unwrap();
    buf.write_null_terminated(b"x86_64/Linux 2.4.xx").unwrap();
    buf.write_u16_le(873).unwrap();
    buf.write_u8(0x01).unwrap();
    buf.write_u16_le(0).unwrap();
    buf.write_u16_be(0).unwrap(); // no FDO
    buf.write_u8_prefixed(&compile_caps()).unwrap();
    buf.write_u8_prefixed(&[0x02, 0x00]).unwrap();
    data_packet(buf.as_slice())
}

fn data_types_request() -> Bytes {
    let mut buf = WriteBuffer::new();
    buf.write_u8(0x02).unwrap();
    buf.write_u16_le(873).unwrap();
    buf.write_u16_le(2000).unwrap();
    buf.write_u8(0x04).unwrap();
    buf.write_u8_prefixed(&compile_caps()).unwrap();
    buf.write_u8_prefixed(&[0x02, 0x00]).unwrap();
    buf.write_u16_le(2000).unwrap();
    buf.write_bytes(&[0x02, 0x02, 0x01, 0x00, 0x00]).unwrap();
    data_packet(buf.as_slice())
}

fn data_types_response() -> Bytes {
    data_packet(&[0x02, 0x02, 0x02, 0x01, 0x00, 0x00])
}

/// EXECUTE of a fresh query with one NUMBER column defined
fn execute_select_one(sql: &str) -> Bytes {
    let mut buf = WriteBuffer::new();
    buf.write_u8(MessageType::Function as u8).unwrap();
    buf.write_u8(FunctionCode::Execute as u8).unwrap();
    buf.write_u8(1).unwrap(); // sequence
    buf.write_ub4(0x8061).unwrap(); // options
    buf.write_ub2(0).unwrap(); // new cursor
    buf.write_u8(0).unwrap();
    buf.write_ub4(sql.len() as u32).unwrap();
    buf.write_u8(1).unwrap();
    buf.write_ub2(13).unwrap();
    buf.write_zeros(3).unwrap();
    buf.write_ub4(50).unwrap(); // rows to fetch
    buf.write_ub4(0).unwrap();
    buf.write_u8(0).unwrap();
    buf.write_ub2(0).unwrap(); // no binds
    buf.write_zeros(5).unwrap();
    buf.write_u8(1).unwrap(); // define
    buf.write_ub2(1).unwrap(); // one column
    buf.write_zeros(3).unwrap(); // v4 fields
    buf.write_zeros(5).unwrap(); // v5 fields
    buf.write_clr(sql.as_bytes()).unwrap();
    for _ in 0..13 {
        buf.write_ub4(0).unwrap();
    }
    // define descriptor
    buf.write_u8(OracleType::Number as u8).unwrap();
    buf.write_u8(0x03).unwrap();
    buf.write_u8(0).unwrap();
    buf.write_u8(0).unwrap();
    buf.write_ub4(22).unwrap();
    buf.write_ub4(0).unwrap();
    buf.write_ub4(0).unwrap();
    buf.write_u8(0).unwrap(); // no toid
    buf.write_ub2(0).unwrap();
    buf.write_ub2(873).unwrap();
    buf.write_u8(1).unwrap();
    buf.write_ub4(22).unwrap();
    data_packet(buf.as_slice())
}

fn write_success_summary(buf: &mut WriteBuffer, cursor_id: u16) {
    buf.write_u8(MessageType::Error as u8).unwrap();
    buf.write_ub4(1).unwrap(); // current row
    buf.write_ub2(0).unwrap(); // return code
    buf.write_ub2(0).unwrap();
    buf.write_ub2(0).unwrap();
    buf.write_ub2(cursor_id).unwrap();
    buf.write_ub2(0).unwrap();
    buf.write_u8(3).unwrap(); // sql type
    buf.write_u8(0).unwrap();
    buf.write_ub2(0).unwrap(); // flags
    buf.write_ub2(0).unwrap(); // user cursor options
    buf.write_u8(0).unwrap();
    buf.write_u8(0).unwrap();
    buf.write_ub4(0).unwrap(); // rowid
    buf.write_ub2(0).unwrap();
    buf.write_u8(0).unwrap();
    buf.write_ub4(0).unwrap();
    buf.write_ub2(0).unwrap();
    buf.write_ub4(0).unwrap(); // os error
    buf.write_u8(0).unwrap();
    buf.write_u8(0).unwrap();
    buf.write_ub2(0).unwrap();
    buf.write_ub4(0).unwrap(); // success iterations
    buf.write_ub4(0).unwrap();
    for _ in 0..3 {
        buf.write_ub4(0).unwrap();
    }
}

/// Row header, one row holding NUMBER 1, then the call summary
fn rows_response(cursor_id: u16) -> Bytes {
    let mut buf = WriteBuffer::new();
    buf.write_u8(MessageType::RowHeader as u8).unwrap();
    buf.write_u8(0).unwrap();
    buf.write_ub2(1).unwrap();
    buf.write_ub4(0).unwrap();
    buf.write_ub4(1).unwrap();
    buf.write_ub2(0).unwrap();
    buf.write_dlc(&[]).unwrap();
    buf.write_dlc(&[]).unwrap();
    buf.write_u8(MessageType::RowData as u8).unwrap();
    buf.write_clr(&[0xC1, 0x02]).unwrap();
    write_success_summary(&mut buf, cursor_id);
    data_packet(buf.as_slice())
}

struct Harness {
    connection: Connection<StreamTransport<DuplexStream>, StreamTransport<DuplexStream>>,
    client: DuplexStream,
    server: DuplexStream,
    sink: VecSink,
}

impl Harness {
    fn new(read_chunk: usize) -> Self {
        let (client_side, client) = tokio::io::duplex(PIPE_SIZE);
        let (server_side, server) = tokio::io::duplex(PIPE_SIZE);
        let sink = VecSink::new();
        let connection = Connection::new(
            3,
            StreamTransport::with_chunk_size(client_side, read_chunk),
            StreamTransport::with_chunk_size(server_side, read_chunk),
            Arc::new(sink.clone()),
        );
        Self {
            connection,
            client,
            server,
            sink,
        }
    }

    /// Queue a request and its response, then proxy them. Both sides must
    /// see exactly the bytes the other sent.
    async fn round_trip(&mut self, request: &[u8], response: &[u8]) -> oracle_proxy::Exchange {
        self.client.write_all(request).await.unwrap();
        self.server.write_all(response).await.unwrap();
        let exchange = self.connection.exchange().await.unwrap().unwrap();

        let mut forwarded = vec![0u8; request.len()];
        self.server.read_exact(&mut forwarded).await.unwrap();
        assert_eq!(&forwarded[..], request);
        let mut answered = vec![0u8; response.len()];
        self.client.read_exact(&mut answered).await.unwrap();
        assert_eq!(&answered[..], response);
        exchange
    }
}

#[tokio::test]
async fn test_select_one_from_dual_session() {
    let mut harness = Harness::new(7);
    let descriptor = "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST=db)(PORT=1521))(CONNECT_DATA=(SERVICE_NAME=FREEPDB1)))";

    let handshake = harness
        .round_trip(&connect_packet(descriptor), &accept_packet(319))
        .await;
    assert!(matches!(handshake.requests[0].message, Some(Message::Connect(_))));
    assert!(matches!(handshake.responses[0].message, Some(Message::Accept(_))));
    assert!(harness.connection.decoder().session().large_sdu());

    let protocol = harness.round_trip(&protocol_request(), &protocol_response()).await;
    match &protocol.requests[0].message {
        Some(Message::ProtocolRequest(req)) => assert_eq!(req.driver_name, "rust-driver"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(protocol.responses[0].message, Some(Message::ProtocolResponse(_))));

    let data_types = harness
        .round_trip(&data_types_request(), &data_types_response())
        .await;
    assert!(matches!(data_types.responses[0].message, Some(Message::DataTypesResponse(_))));
    assert_eq!(harness.connection.decoder().session().caps.ttc_version, TTC_VERSION);

    let query = harness
        .round_trip(&execute_select_one("SELECT 1 FROM DUAL"), &rows_response(5))
        .await;
    match &query.requests[0].message {
        Some(Message::Function(call)) => match &call.body {
            FunctionBody::Execute(exec) => {
                assert_eq!(exec.statement.kind, StatementKind::Query);
                assert_eq!(exec.statement.sql, "SELECT 1 FROM DUAL");
                assert_eq!(exec.statement.columns.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
    let response = match &query.responses[0].message {
        Some(Message::Response(response)) => response,
        other => panic!("unexpected {:?}", other),
    };
    assert!(response.complete);
    assert!(matches!(response.items[0], ResponseItem::RowHeader(_)));
    let rows: Vec<_> = response.rows().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values.len(), 1);
    assert_eq!(rows[0].get(0).and_then(Value::as_i64), Some(1));
    assert_eq!(response.summary().map(|s| s.return_code), Some(0));
    assert_eq!(query.sequence, 3);

    let cursor = harness.connection.decoder().session().cursors.get(5).unwrap();
    assert_eq!(cursor.sql, "SELECT 1 FROM DUAL");
    assert!(cursor.data_set.rows.is_empty());
    assert!(query.to_json().unwrap().contains("SELECT 1 FROM DUAL"));
}

#[tokio::test]
async fn test_response_split_across_reads_and_packets() {
    let mut harness = Harness::new(3);
    harness.round_trip(&connect_packet("(DESCRIPTION=)"), &accept_packet(319)).await;
    harness.round_trip(&protocol_request(), &protocol_response()).await;
    harness.round_trip(&data_types_request(), &data_types_response()).await;

    // the same response body cut into two DATA packets mid message
    let whole = rows_response(8);
    let body = &whole[10..];
    let cut = body.len() - 4;
    let mut response = data_packet(&body[..cut]).to_vec();
    response.extend_from_slice(&data_packet(&body[cut..]));

    let query = harness
        .round_trip(&execute_select_one("select 1 from dual"), &response)
        .await;
    assert_eq!(query.responses.len(), 2);
    let complete: Vec<bool> = query
        .responses
        .iter()
        .map(|r| match &r.message {
            Some(Message::Response(resp)) => resp.complete,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(complete, vec![false, true]);
    assert!(harness.connection.decoder().session().cursors.get(8).is_some());
}

#[tokio::test]
async fn test_run_records_every_exchange_until_client_closes() {
    let Harness {
        connection,
        mut client,
        mut server,
        sink,
    } = Harness::new(64);
    let task = tokio::spawn(connection.run());

    for (request, response) in [
        (connect_packet("(DESCRIPTION=)"), accept_packet(319)),
        (protocol_request(), protocol_response()),
    ] {
        client.write_all(&request).await.unwrap();
        let mut forwarded = vec![0u8; request.len()];
        server.read_exact(&mut forwarded).await.unwrap();
        server.write_all(&response).await.unwrap();
        let mut answered = vec![0u8; response.len()];
        client.read_exact(&mut answered).await.unwrap();
    }

    drop(client);
    task.await.unwrap().unwrap();

    let exchanges = sink.exchanges().await;
    assert_eq!(exchanges.len(), 2);
    assert_eq!(exchanges[1].sequence, 1);
    assert!(exchanges.iter().all(|e| e.connection_id == 3));
    assert_eq!(exchanges[1].messages().count(), 2);
}
