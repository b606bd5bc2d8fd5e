//! The RDB string encoding.
//!
//! A string starts with one byte. When its top two bits are not `11` the
//! byte is itself the 6-bit length form and that many raw bytes follow.
//! When they are `11`, the low six bits select a special form: an 8-, 16- or
//! 32-bit signed little-endian integer whose decimal rendering is the string
//! value, or an LZF-compressed payload, which is recognized but rejected.

use crate::rdb::length::{read_byte, read_slice};
use crate::rdb::SnapshotError;

const SPECIAL_INT8: u8 = 0;
const SPECIAL_INT16: u8 = 1;
const SPECIAL_INT32: u8 = 2;
const SPECIAL_LZF: u8 = 3;

/// Decodes one string starting at `cursor`, returning the value and the
/// number of bytes read.
pub(crate) fn decode_string(
    input: &[u8],
    cursor: usize,
) -> Result<(String, usize), SnapshotError> {
    let first = read_byte(input, cursor)?;

    if first >> 6 != 0b11 {
        let length = (first & 0x3F) as usize;
        let payload = read_slice(input, cursor + 1, length)?;
        let value = String::from_utf8(payload.to_vec())
            .map_err(|_| SnapshotError::InvalidUtf8)?;
        return Ok((value, 1 + length));
    }

    match first & 0x3F {
        SPECIAL_INT8 => {
            let byte = read_byte(input, cursor + 1)?;
            Ok(((byte as i8).to_string(), 2))
        }
        SPECIAL_INT16 => {
            let bytes = read_slice(input, cursor + 1, 2)?;
            let array: [u8; 2] = bytes.try_into().map_err(|_| SnapshotError::UnexpectedEof)?;
            Ok((i16::from_le_bytes(array).to_string(), 3))
        }
        SPECIAL_INT32 => {
            let bytes = read_slice(input, cursor + 1, 4)?;
            let array: [u8; 4] = bytes.try_into().map_err(|_| SnapshotError::UnexpectedEof)?;
            Ok((i32::from_le_bytes(array).to_string(), 5))
        }
        SPECIAL_LZF => Err(SnapshotError::Unimplemented),
        _ => Err(SnapshotError::BadLength),
    }
}
