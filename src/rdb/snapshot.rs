//! The snapshot opcode walk.
//!
//! A snapshot is `REDIS`, a 4-byte version marker, then a stream of opcode
//! sections until the EOF opcode (or the end of the input, which is
//! tolerated at an opcode boundary). Keyed fields always belong to the most
//! recently selected database.

use std::collections::HashMap;

use jiff::Timestamp;

use crate::database::FieldValue;
use crate::rdb::length::{decode_plain_length, read_byte, read_slice};
use crate::rdb::string::decode_string;
use crate::rdb::SnapshotError;

const OPCODE_AUX: u8 = 0xFA;
const OPCODE_RESIZEDB: u8 = 0xFB;
const OPCODE_EXPIRETIME_MS: u8 = 0xFC;
const OPCODE_EXPIRETIME: u8 = 0xFD;
const OPCODE_SELECTDB: u8 = 0xFE;
const OPCODE_EOF: u8 = 0xFF;

const FIELD_TYPE_STRING: u8 = 0x00;

const MAGIC: &[u8] = b"REDIS";

/// Auxiliary keys worth keeping; everything else is silently dropped.
const RETAINED_AUX_KEYS: [&str; 4] = ["redis-ver", "redis-bits", "ctime", "used-mem"];

/// Advisory hash-table sizing carried by the RESIZEDB opcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeHints {
    pub hash_table_size: usize,
    pub expire_hash_table_size: usize,
}

/// One decoded keyed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldImage {
    pub key: String,
    pub value: FieldValue,
    pub expires_at: Option<Timestamp>,
}

/// One database section of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseImage {
    pub id: usize,
    pub resize_hints: Option<ResizeHints>,
    pub fields: HashMap<String, FieldImage>,
}

impl DatabaseImage {
    fn new(id: usize) -> Self {
        Self {
            id,
            resize_hints: None,
            fields: HashMap::new(),
        }
    }
}

/// A fully materialized snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: String,
    pub aux: HashMap<String, String>,
    pub databases: Vec<DatabaseImage>,
}

impl Snapshot {
    /// Decodes a complete snapshot from `input`.
    pub fn parse(input: &[u8]) -> Result<Snapshot, SnapshotError> {
        if read_slice(input, 0, 5)? != MAGIC {
            return Err(SnapshotError::BadMagic);
        }

        let version = String::from_utf8(read_slice(input, 5, 4)?.to_vec())
            .map_err(|_| SnapshotError::BadMagic)?;

        let mut snapshot = Snapshot {
            version,
            aux: HashMap::new(),
            databases: Vec::new(),
        };

        // Index of the currently selected database, local to this parse so
        // concurrent loads never interfere.
        let mut current: Option<usize> = None;
        let mut cursor = 9;

        while cursor < input.len() {
            let opcode = read_byte(input, cursor)?;
            cursor += 1;

            match opcode {
                OPCODE_AUX => {
                    let (key, read) = decode_string(input, cursor)?;
                    cursor += read;
                    let (value, read) = decode_string(input, cursor)?;
                    cursor += read;

                    if RETAINED_AUX_KEYS.contains(&key.as_str()) {
                        snapshot.aux.insert(key, value);
                    }
                }
                OPCODE_SELECTDB => {
                    let (id, read) = decode_plain_length(input, cursor)?;
                    cursor += read;

                    snapshot.databases.push(DatabaseImage::new(id));
                    current = Some(snapshot.databases.len() - 1);
                }
                OPCODE_RESIZEDB => {
                    let (hash_table_size, read) = decode_plain_length(input, cursor)?;
                    cursor += read;
                    let (expire_hash_table_size, read) = decode_plain_length(input, cursor)?;
                    cursor += read;

                    let database = current
                        .and_then(|index| snapshot.databases.get_mut(index))
                        .ok_or(SnapshotError::NoDatabaseSelected)?;
                    database.resize_hints = Some(ResizeHints {
                        hash_table_size,
                        expire_hash_table_size,
                    });
                }
                OPCODE_EXPIRETIME => {
                    let bytes = read_slice(input, cursor, 4)?;
                    let array: [u8; 4] =
                        bytes.try_into().map_err(|_| SnapshotError::UnexpectedEof)?;
                    cursor += 4;

                    let expires_at = Timestamp::from_second(u32::from_le_bytes(array) as i64)
                        .map_err(|_| SnapshotError::BadExpiry)?;

                    let field_type = read_byte(input, cursor)?;
                    cursor += 1;
                    cursor += Self::parse_field(
                        input,
                        cursor,
                        field_type,
                        Some(expires_at),
                        current,
                        &mut snapshot.databases,
                    )?;
                }
                OPCODE_EXPIRETIME_MS => {
                    let bytes = read_slice(input, cursor, 8)?;
                    let array: [u8; 8] =
                        bytes.try_into().map_err(|_| SnapshotError::UnexpectedEof)?;
                    cursor += 8;

                    let expires_at =
                        Timestamp::from_millisecond(u64::from_le_bytes(array) as i64)
                            .map_err(|_| SnapshotError::BadExpiry)?;

                    let field_type = read_byte(input, cursor)?;
                    cursor += 1;
                    cursor += Self::parse_field(
                        input,
                        cursor,
                        field_type,
                        Some(expires_at),
                        current,
                        &mut snapshot.databases,
                    )?;
                }
                OPCODE_EOF => {
                    // Anything after this opcode is the 8-byte CRC trailer,
                    // which is not validated.
                    break;
                }
                field_type => {
                    cursor += Self::parse_field(
                        input,
                        cursor,
                        field_type,
                        None,
                        current,
                        &mut snapshot.databases,
                    )?;
                }
            }
        }

        Ok(snapshot)
    }

    fn parse_field(
        input: &[u8],
        cursor: usize,
        field_type: u8,
        expires_at: Option<Timestamp>,
        current: Option<usize>,
        databases: &mut [DatabaseImage],
    ) -> Result<usize, SnapshotError> {
        if field_type != FIELD_TYPE_STRING {
            return Err(SnapshotError::UnsupportedType(field_type));
        }

        let mut read = 0;
        let (key, key_read) = decode_string(input, cursor)?;
        read += key_read;
        let (value, value_read) = decode_string(input, cursor + read)?;
        read += value_read;

        let database = current
            .and_then(|index| databases.get_mut(index))
            .ok_or(SnapshotError::NoDatabaseSelected)?;

        database.fields.insert(
            key.clone(),
            FieldImage {
                key,
                value: FieldValue::String(value),
                expires_at,
            },
        );

        Ok(read)
    }
}
