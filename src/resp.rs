//! RESP (Redis serialization protocol) wire codec.
//!
//! The same codec frames traffic on every socket the server touches: client
//! connections, the master side of a replication session and the replica
//! side. Encoding produces owned strings ready to be written; decoding is
//! incremental so a frame split across several socket reads parses exactly
//! like a frame delivered in one piece.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("unknown RESP type prefix {0:#04x}")]
    UnknownType(u8),
    #[error("line not terminated with CRLF")]
    BadTerminator,
    #[error("invalid length")]
    BadLength,
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
}

/// A single RESP message.
///
/// Only the forms the server speaks are represented. A nil bulk string is
/// its own variant so that `$-1\r\n` round-trips without a sentinel value.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    BulkString(String),
    NullBulkString,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Encodes the message into its exact wire form.
    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(content) => format!("+{}\r\n", content),
            RespValue::Error(content) => format!("-{}\r\n", content),
            RespValue::BulkString(content) => {
                format!("${}\r\n{}\r\n", content.len(), content)
            }
            RespValue::NullBulkString => "$-1\r\n".to_string(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());
                for element in elements {
                    encoded.push_str(&element.encode());
                }
                encoded
            }
        }
    }

    /// Builds a command as an array of bulk strings, the form in which
    /// commands travel on the wire and are propagated to replicas.
    pub fn command(parts: &[&str]) -> RespValue {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(part.to_string()))
                .collect(),
        )
    }

    /// Attempts to decode one message from the front of `input`.
    ///
    /// Returns `Ok(Some((message, consumed)))` on success, where `consumed`
    /// is the exact number of wire bytes the message occupied, or `Ok(None)`
    /// when the buffer holds only a prefix of a frame and more bytes are
    /// needed. The consumed count is what replication offset accounting is
    /// built on, so it must include all framing.
    pub fn decode(input: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
        let Some(&prefix) = input.first() else {
            return Ok(None);
        };

        match prefix {
            b'+' => decode_simple_string(input),
            b'$' => decode_bulk_string(input),
            b'*' => decode_array(input),
            other => Err(RespError::UnknownType(other)),
        }
    }
}

fn decode_simple_string(input: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some(line_end) = find_crlf(&input[1..]) else {
        return Ok(None);
    };

    let content = std::str::from_utf8(&input[1..1 + line_end])
        .map_err(|_| RespError::InvalidUtf8)?
        .to_string();

    Ok(Some((RespValue::SimpleString(content), 1 + line_end + 2)))
}

fn decode_bulk_string(input: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some(line_end) = find_crlf(&input[1..]) else {
        return Ok(None);
    };

    let length = parse_length(&input[1..1 + line_end])?;
    let header_len = 1 + line_end + 2;

    if length == -1 {
        return Ok(Some((RespValue::NullBulkString, header_len)));
    }

    if length < 0 {
        return Err(RespError::BadLength);
    }

    let length = length as usize;
    let total = header_len + length + 2;

    if input.len() < total {
        return Ok(None);
    }

    if &input[header_len + length..total] != b"\r\n" {
        return Err(RespError::BadTerminator);
    }

    let content = std::str::from_utf8(&input[header_len..header_len + length])
        .map_err(|_| RespError::InvalidUtf8)?
        .to_string();

    Ok(Some((RespValue::BulkString(content), total)))
}

fn decode_array(input: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some(line_end) = find_crlf(&input[1..]) else {
        return Ok(None);
    };

    let length = parse_length(&input[1..1 + line_end])?;

    if length < 0 {
        return Err(RespError::BadLength);
    }

    let mut consumed = 1 + line_end + 2;
    let mut elements = Vec::with_capacity(length as usize);

    for _ in 0..length {
        match RespValue::decode(&input[consumed..])? {
            Some((element, element_consumed)) => {
                elements.push(element);
                consumed += element_consumed;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((RespValue::Array(elements), consumed)))
}

fn parse_length(digits: &[u8]) -> Result<i64, RespError> {
    std::str::from_utf8(digits)
        .map_err(|_| RespError::BadLength)?
        .parse::<i64>()
        .map_err(|_| RespError::BadLength)
}

fn find_crlf(input: &[u8]) -> Option<usize> {
    input.windows(2).position(|window| window == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let test_cases = vec![
            (RespValue::SimpleString("PONG".to_string()), "+PONG\r\n"),
            (
                RespValue::Error("ERR unknown command".to_string()),
                "-ERR unknown command\r\n",
            ),
            (RespValue::BulkString("bar".to_string()), "$3\r\nbar\r\n"),
            (RespValue::BulkString(String::new()), "$0\r\n\r\n"),
            (RespValue::NullBulkString, "$-1\r\n"),
            (
                RespValue::command(&["SET", "foo", "bar"]),
                "*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n",
            ),
            (RespValue::Array(vec![]), "*0\r\n"),
        ];

        for (value, expected) in test_cases {
            assert_eq!(value.encode(), expected);
        }
    }

    #[test]
    fn test_decode_reports_consumed_bytes() {
        let test_cases = vec![
            ("+OK\r\n", RespValue::SimpleString("OK".to_string()), 5),
            (
                "$5\r\nhello\r\n",
                RespValue::BulkString("hello".to_string()),
                11,
            ),
            ("$-1\r\n", RespValue::NullBulkString, 5),
            (
                "*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n",
                RespValue::command(&["GET", "foo"]),
                22,
            ),
            ("*0\r\n", RespValue::Array(vec![]), 4),
        ];

        for (input, expected, expected_consumed) in test_cases {
            let (value, consumed) = RespValue::decode(input.as_bytes())
                .unwrap()
                .expect("complete frame should decode");
            assert_eq!(value, expected, "decoding {:?}", input);
            assert_eq!(consumed, expected_consumed, "decoding {:?}", input);
        }
    }

    #[test]
    fn test_decode_incomplete_frames() {
        let test_cases: Vec<&[u8]> = vec![
            b"",
            b"+OK",
            b"$5\r\nhel",
            b"$5\r\nhello",
            b"*2\r\n$3\r\nGET\r\n",
            b"*2\r\n$3\r\nGET\r\n$3\r\nfo",
        ];

        for input in test_cases {
            assert_eq!(
                RespValue::decode(input),
                Ok(None),
                "decoding {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_decode_errors() {
        let test_cases: Vec<(&[u8], RespError)> = vec![
            (b":42\r\n", RespError::UnknownType(b':')),
            (b"?what\r\n", RespError::UnknownType(b'?')),
            (b"$abc\r\n", RespError::BadLength),
            (b"$-2\r\n", RespError::BadLength),
            (b"*-1\r\n", RespError::BadLength),
            (b"$3\r\nbarXY", RespError::BadTerminator),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                RespValue::decode(input),
                Err(expected),
                "decoding {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_decode_only_consumes_first_frame() {
        let input = b"+PONG\r\n+PONG\r\n";
        let (value, consumed) = RespValue::decode(input).unwrap().unwrap();

        assert_eq!(value, RespValue::SimpleString("PONG".to_string()));
        assert_eq!(consumed, 7);
    }
}
