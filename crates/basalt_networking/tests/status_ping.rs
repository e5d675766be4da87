//! # Loopback Status Tests
//!
//! Runs a real server on an ephemeral loopback port and talks to it the way
//! a server-list client does.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use basalt_networking::protocol::{
    encode_packet, FrameReader, Handshake, PingRequest, PongResponse, ProtocolState, StatusRequest,
    StatusResponse, VarInt, WireString,
};
use basalt_networking::server::{GameServer, JsonStatus};
use basalt_shared::ServerConfig;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start_server(read_timeout_ms: u64) -> SocketAddr {
    let config = ServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        read_timeout_ms,
        ..ServerConfig::default()
    };
    let status = JsonStatus::from_config(&config.status).unwrap();
    let server = GameServer::bind(config, Arc::new(status)).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

fn handshake(next_state: ProtocolState) -> Vec<u8> {
    encode_packet(&Handshake {
        protocol_version: VarInt(767),
        server_address: WireString::from("localhost"),
        server_port: 25565,
        next_state,
    })
    .unwrap()
    .to_vec()
}

/// Reads until one whole frame is buffered, returning its id and payload.
async fn read_frame(stream: &mut TcpStream, buffer: &mut BytesMut) -> (i32, Vec<u8>) {
    loop {
        let mut reader = FrameReader::new(&buffer[..]);
        if let Ok(frame) = reader.next_frame() {
            let result = (frame.header.id.value(), frame.payload.to_vec());
            let consumed = reader.position();
            let _ = buffer.split_to(consumed);
            return result;
        }
        let n = stream.read_buf(buffer).await.unwrap();
        assert_ne!(n, 0, "server closed before a full frame arrived");
    }
}

#[tokio::test]
async fn test_status_and_ping_over_tcp() {
    let addr = start_server(5_000).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut buffer = BytesMut::new();

    stream.write_all(&handshake(ProtocolState::Status)).await.unwrap();
    stream.write_all(&encode_packet(&StatusRequest {}).unwrap()).await.unwrap();

    let (id, payload) = read_frame(&mut stream, &mut buffer).await;
    assert_eq!(id, 0);
    let response: StatusResponse = basalt_networking::PacketReader::new(&payload).read().unwrap();
    let json: serde_json::Value = serde_json::from_str(response.json.to_str().unwrap()).unwrap();
    assert_eq!(json["version"]["protocol"], 767);
    assert_eq!(json["description"]["text"], "A Basalt Server");

    let ping = encode_packet(&PingRequest { payload: 0x0123_4567_89AB_CDEF }).unwrap();
    stream.write_all(&ping).await.unwrap();

    let (id, payload) = read_frame(&mut stream, &mut buffer).await;
    assert_eq!(id, 1);
    let pong: PongResponse = basalt_networking::PacketReader::new(&payload).read().unwrap();
    assert_eq!(pong.payload, 0x0123_4567_89AB_CDEF);
}

#[tokio::test]
async fn test_byte_at_a_time_delivery() {
    let addr = start_server(5_000).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();

    let mut request = handshake(ProtocolState::Status);
    request.extend_from_slice(&encode_packet(&PingRequest { payload: 7 }).unwrap());
    for byte in request {
        stream.write_all(&[byte]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let (id, payload) = read_frame(&mut stream, &mut BytesMut::new()).await;
    assert_eq!(id, 1);
    assert_eq!(payload, 7_i64.to_be_bytes());
}

#[tokio::test]
async fn test_violation_closes_connection() {
    let addr = start_server(5_000).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(&[0xFF; 6]).await.unwrap();

    let mut rest = Vec::new();
    let closed = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut rest)).await;
    assert!(matches!(closed, Ok(Ok(0)) | Ok(Err(_))));
}

#[tokio::test]
async fn test_idle_connection_times_out() {
    let addr = start_server(200).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut rest = Vec::new();
    let closed = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut rest)).await;
    assert!(matches!(closed, Ok(Ok(0)) | Ok(Err(_))));
}

#[tokio::test]
async fn test_connections_are_independent() {
    let addr = start_server(5_000).await;
    let mut broken = TcpStream::connect(addr).await.unwrap();
    let mut healthy = TcpStream::connect(addr).await.unwrap();

    broken.write_all(&[0xFF; 6]).await.unwrap();

    healthy.write_all(&handshake(ProtocolState::Status)).await.unwrap();
    healthy.write_all(&encode_packet(&PingRequest { payload: 3 }).unwrap()).await.unwrap();
    let (id, _) = read_frame(&mut healthy, &mut BytesMut::new()).await;
    assert_eq!(id, 1);
}
