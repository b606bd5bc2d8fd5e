//! Buffered message reading on top of a raw socket.
//!
//! [`MessageReader`] accumulates socket reads in a [`BytesMut`] and hands out
//! one decoded RESP message at a time together with the number of wire bytes
//! it occupied. Leftover bytes stay in the buffer, which matters on a
//! replication link: the bytes following the FULLRESYNC payload are already
//! the first propagated commands.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::resp::{RespError, RespValue};

#[derive(Error, Debug)]
pub enum ReadError {
    /// The peer closed the connection at a message boundary. This is the
    /// normal end of a session, not a protocol violation.
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("connection closed in the middle of a message")]
    TruncatedMessage,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Resp(#[from] RespError),
}

pub struct MessageReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Reads one complete RESP message, pulling more bytes from the socket
    /// as needed. Returns the message and its exact wire length.
    pub async fn read_message(&mut self) -> Result<(RespValue, usize), ReadError> {
        loop {
            if let Some((value, consumed)) = RespValue::decode(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok((value, consumed));
            }

            if self.fill().await? == 0 {
                if self.buffer.is_empty() {
                    return Err(ReadError::ConnectionClosed);
                }
                return Err(ReadError::TruncatedMessage);
            }
        }
    }

    /// Reads a `$<len>\r\n`-prefixed snapshot payload.
    ///
    /// This is the one framing exception in the protocol: unlike a bulk
    /// string, the payload carries no trailing CRLF, so it cannot go through
    /// [`RespValue::decode`].
    pub async fn read_snapshot_payload(&mut self) -> Result<Vec<u8>, ReadError> {
        let header_end = loop {
            if let Some(position) = find_crlf(&self.buffer) {
                break position;
            }

            if self.fill().await? == 0 {
                return Err(ReadError::TruncatedMessage);
            }
        };

        if self.buffer.first() != Some(&b'$') {
            return Err(RespError::BadLength.into());
        }

        let length = std::str::from_utf8(&self.buffer[1..header_end])
            .map_err(|_| RespError::BadLength)?
            .parse::<usize>()
            .map_err(|_| RespError::BadLength)?;

        self.buffer.advance(header_end + 2);

        while self.buffer.len() < length {
            if self.fill().await? == 0 {
                return Err(ReadError::TruncatedMessage);
            }
        }

        Ok(self.buffer.split_to(length).to_vec())
    }

    async fn fill(&mut self) -> Result<usize, ReadError> {
        Ok(self.reader.read_buf(&mut self.buffer).await?)
    }
}

fn find_crlf(input: &[u8]) -> Option<usize> {
    input.windows(2).position(|window| window == b"\r\n")
}
