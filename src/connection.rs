//! Per-connection handling.
//!
//! Every accepted connection is split into a read half driven by the handler
//! task and a write half owned by a dedicated writer task. All outbound
//! bytes for a connection, replies and propagated commands alike, funnel
//! through one unbounded queue, which serializes interleaving and gives
//! replicas their per-connection FIFO guarantee for free.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::commands::{execute_command, set, Command, CommandResult};
use crate::input::{MessageReader, ReadError};
use crate::resp::RespValue;
use crate::server::Server;

/// Handle a command handler uses to reach its connection: the peer address
/// identifies the connection in the replica registry, the sender is the
/// endpoint of its outbound queue.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub addr: String,
    pub outbound: UnboundedSender<Vec<u8>>,
}

impl ClientSession {
    /// Enqueues bytes for the writer task. Fails once the writer has exited.
    fn send(&self, bytes: Vec<u8>) -> Result<(), ()> {
        self.outbound.send(bytes).map_err(|_| ())
    }
}

/// Spawns the writer task owning the connection's write half and returns the
/// queue endpoint feeding it. The task exits when every sender is dropped or
/// a write fails; dropping it closes the socket.
pub fn spawn_connection_writer(mut writer: OwnedWriteHalf) -> UnboundedSender<Vec<u8>> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        while let Some(bytes) = receiver.recv().await {
            if let Err(error) = writer.write_all(&bytes).await {
                warn!(%error, "connection writer stopped");
                break;
            }

            if let Err(error) = writer.flush().await {
                warn!(%error, "connection writer stopped");
                break;
            }
        }
    });

    sender
}

/// Runs one client connection to completion: parse a command, execute it,
/// reply, repeat until EOF or a protocol error.
///
/// Command-level errors (wrong arity, unknown command) answer a `-ERR` line
/// and keep the connection open; malformed RESP closes it.
pub async fn handle_client_connection(
    stream: TcpStream,
    addr: String,
    server: Arc<RwLock<Server>>,
) {
    let (read_half, write_half) = stream.into_split();
    let outbound = spawn_connection_writer(write_half);
    let session = ClientSession {
        addr: addr.clone(),
        outbound,
    };
    let mut reader = MessageReader::new(read_half);

    loop {
        let message = match reader.read_message().await {
            Ok((message, _)) => message,
            Err(ReadError::ConnectionClosed) => break,
            Err(error) => {
                warn!(client = %addr, %error, "closing connection after protocol error");
                break;
            }
        };

        let command = match Command::from_resp(&message) {
            Ok(command) => command,
            Err(error) => {
                if session.send(error.as_string().into_bytes()).is_err() {
                    break;
                }
                continue;
            }
        };

        let sent = match execute_command(&command, &server, &session).await {
            Ok(CommandResult::Response(response)) => session.send(response.into_bytes()),
            Ok(CommandResult::FullResync { header, payload }) => session
                .send(header.into_bytes())
                .and_then(|_| session.send(payload)),
            Err(error) => session.send(error.as_string().into_bytes()),
        };

        if sent.is_err() {
            break;
        }
    }

    // The connection may have been a replica; registration dies with it.
    server.write().await.remove_replica(&addr);
}

/// Replica side of a replication session, entered after the handshake.
///
/// Commands from the master are applied locally without replying;
/// `REPLCONF GETACK *` is the one exception and answers the number of
/// stream bytes processed before it arrived.
pub async fn handle_master_connection(
    mut reader: MessageReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    server: Arc<RwLock<Server>>,
) {
    let database = { server.read().await.databases[0].clone() };
    let mut processed_bytes: u64 = 0;

    loop {
        let (message, consumed) = match reader.read_message().await {
            Ok(result) => result,
            Err(ReadError::ConnectionClosed) => {
                info!("master closed the replication stream");
                break;
            }
            Err(error) => {
                warn!(%error, "leaving replication stream");
                break;
            }
        };

        let command = match Command::from_resp(&message) {
            Ok(command) => command,
            Err(error) => {
                debug!(%error, "skipping malformed replicated command");
                processed_bytes += consumed as u64;
                continue;
            }
        };

        match command.canonical_name().as_str() {
            "SET" => {
                if let Err(error) = set::set(&database, &command.args).await {
                    warn!(%error, "failed to apply replicated SET");
                }
            }
            "PING" => {}
            "REPLCONF" => {
                let is_getack = command
                    .args
                    .first()
                    .is_some_and(|sub| sub.eq_ignore_ascii_case("getack"));

                if is_getack {
                    let ack = RespValue::command(&[
                        "REPLCONF",
                        "ACK",
                        &processed_bytes.to_string(),
                    ])
                    .encode();

                    if let Err(error) = writer.write_all(ack.as_bytes()).await {
                        warn!(%error, "failed to acknowledge master");
                        break;
                    }
                }
            }
            other => {
                debug!(command = other, "ignoring replicated command");
            }
        }

        processed_bytes += consumed as u64;
    }
}
