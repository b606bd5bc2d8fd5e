//! RDB snapshot decoding.
//!
//! The snapshot format is a binary stream: a magic marker, a version marker,
//! auxiliary key/value metadata, then per-database sections of keyed fields
//! with optional expiry prefixes. Length and string payloads use the
//! encodings in [`length`] and [`string`]; the opcode walk lives in
//! [`snapshot`].

mod length;
mod snapshot;
mod string;

pub use snapshot::{DatabaseImage, FieldImage, ResizeHints, Snapshot};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SnapshotError {
    #[error("bad magic marker")]
    BadMagic,
    #[error("truncated snapshot")]
    UnexpectedEof,
    #[error("invalid length encoding")]
    BadLength,
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,
    #[error("unsupported field type {0:#04x}")]
    UnsupportedType(u8),
    #[error("LZF-compressed strings are not implemented")]
    Unimplemented,
    #[error("database section before any SELECTDB")]
    NoDatabaseSelected,
    #[error("invalid expiry timestamp")]
    BadExpiry,
}

/// Pre-built empty snapshot, emitted verbatim by the master during a
/// fullresync. Byte-exact copy of what a real server writes for an empty
/// keyspace.
const EMPTY_SNAPSHOT_BASE64: &str = "UkVESVMwMDEx+glyZWRpcy12ZXIFNy4yLjD6CnJlZGlzLWJpdHPAQPoFY3RpbWXCbQi8ZfoIdXNlZC1tZW3CsMQQAPoIYW9mLWJhc2XAAP/wbjv+wP9aog==";

/// Decodes the embedded empty snapshot into its raw bytes.
pub fn empty_snapshot_bytes() -> Vec<u8> {
    // The constant is a valid base64 literal; decoding it cannot fail.
    STANDARD.decode(EMPTY_SNAPSHOT_BASE64).unwrap_or_default()
}
