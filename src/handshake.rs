//! Replica side of the replication handshake.
//!
//! The sequence is PING, `REPLCONF listening-port`, `REPLCONF capa psync2`,
//! then `PSYNC ? -1`. The master answers the PSYNC with a
//! `+FULLRESYNC <replid> <offset>` simple string followed by a
//! bulk-length-prefixed snapshot payload that carries no trailing CRLF.
//! Whatever follows the payload is already the continuous replication
//! stream, which is why the caller keeps the reader.

use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::input::{MessageReader, ReadError};
use crate::rdb::{Snapshot, SnapshotError};
use crate::resp::RespValue;

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("malformed FULLRESYNC reply")]
    BadFullresync,
    #[error("failed to parse snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// What the replica learns from a successful handshake.
#[derive(Debug)]
pub struct HandshakeOutcome {
    /// The master's replication id, adopted by the replica.
    pub replication_id: String,
    /// The master's replication offset at fullresync time.
    pub master_offset: u64,
    /// The initial snapshot of the master's keyspace.
    pub snapshot: Snapshot,
}

/// Runs the handshake against a freshly opened master connection.
pub async fn perform_handshake<R, W>(
    reader: &mut MessageReader<R>,
    writer: &mut W,
    listening_port: u16,
) -> Result<HandshakeOutcome, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send_command(writer, &["PING"]).await?;
    reader.read_message().await?;

    send_command(
        writer,
        &["REPLCONF", "listening-port", &listening_port.to_string()],
    )
    .await?;
    reader.read_message().await?;

    send_command(writer, &["REPLCONF", "capa", "psync2"]).await?;
    reader.read_message().await?;

    send_command(writer, &["PSYNC", "?", "-1"]).await?;
    let (reply, _) = reader.read_message().await?;

    let (replication_id, master_offset) = parse_fullresync(&reply)?;

    let payload = reader.read_snapshot_payload().await?;
    let snapshot = Snapshot::parse(&payload)?;

    Ok(HandshakeOutcome {
        replication_id,
        master_offset,
        snapshot,
    })
}

fn parse_fullresync(reply: &RespValue) -> Result<(String, u64), HandshakeError> {
    let RespValue::SimpleString(line) = reply else {
        return Err(HandshakeError::BadFullresync);
    };

    let tokens: Vec<&str> = line.split(' ').collect();

    if tokens.len() < 3 || tokens[0] != "FULLRESYNC" {
        return Err(HandshakeError::BadFullresync);
    }

    if !is_valid_replication_id(tokens[1]) {
        return Err(HandshakeError::BadFullresync);
    }

    let offset = tokens[2]
        .parse::<i64>()
        .map_err(|_| HandshakeError::BadFullresync)?;

    Ok((tokens[1].to_string(), offset.max(0) as u64))
}

fn is_valid_replication_id(replication_id: &str) -> bool {
    let pattern = Regex::new(r"^[0-9a-fA-F]{40}$").unwrap();
    pattern.is_match(replication_id)
}

async fn send_command<W: AsyncWrite + Unpin>(
    writer: &mut W,
    parts: &[&str],
) -> Result<(), HandshakeError> {
    writer
        .write_all(RespValue::command(parts).encode().as_bytes())
        .await?;
    writer.flush().await?;

    Ok(())
}
