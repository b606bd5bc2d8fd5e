//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use coral::config::Config;
use coral::input::MessageReader;
use coral::resp::RespValue;
use coral::server::Server;

/// A test client speaking RESP over a real loopback socket.
pub struct TestClient {
    pub reader: MessageReader<OwnedReadHalf>,
    pub writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(format!("127.0.0.1:{}", port))
            .await
            .expect("should connect to test server");
        let (read_half, write_half) = stream.into_split();

        Self {
            reader: MessageReader::new(read_half),
            writer: write_half,
        }
    }

    pub async fn send_command(&mut self, parts: &[&str]) {
        self.send_raw(RespValue::command(parts).encode().as_bytes())
            .await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer
            .write_all(bytes)
            .await
            .expect("should write to test server");
        self.writer.flush().await.expect("should flush");
    }

    pub async fn read_reply(&mut self) -> RespValue {
        let (value, _) = self
            .reader
            .read_message()
            .await
            .expect("should read a reply");
        value
    }

    /// Sends a command and asserts on the single reply.
    pub async fn expect_reply(&mut self, parts: &[&str], expected: RespValue) {
        self.send_command(parts).await;
        assert_eq!(self.read_reply().await, expected, "command {:?}", parts);
    }
}

pub async fn spawn_master(port: u16) {
    spawn_server(Config {
        port,
        ..Config::default()
    })
    .await;
}

pub async fn spawn_replica(port: u16, master_port: u16) {
    spawn_server(Config {
        port,
        replica_of: Some(("127.0.0.1".to_string(), master_port)),
        ..Config::default()
    })
    .await;
}

pub async fn spawn_server(config: Config) {
    let server = Server::initialize(config)
        .await
        .expect("should initialize test server");

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the server time to bind (and, for replicas, to finish the
    // handshake against the master).
    tokio::time::sleep(Duration::from_millis(300)).await;
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn bulk_string(value: &str) -> RespValue {
    RespValue::BulkString(value.to_string())
}

pub fn simple_string(value: &str) -> RespValue {
    RespValue::SimpleString(value.to_string())
}
