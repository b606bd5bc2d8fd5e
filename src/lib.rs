//! A minimal Redis-compatible server.
//!
//! The crate implements the pieces a small replicated key/value server
//! needs:
//!
//! - The RESP wire codec shared by client and replication sockets
//! - An RDB snapshot decoder for boot-time loading and initial replica sync
//! - An in-memory keyspace with guarded TTL scheduling
//! - A command engine (PING, ECHO, SET, GET, KEYS, CONFIG GET, INFO,
//!   REPLCONF, PSYNC)
//! - Single-master/multi-replica asynchronous replication: the PSYNC
//!   handshake on both sides and FIFO fan-out of write commands
//!
//! Concurrency is tokio tasks throughout: one per accepted connection, one
//! writer per connection outbound queue, one for the replication stream when
//! running as a replica.

pub mod commands;
pub mod config;
pub mod connection;
pub mod database;
pub mod handshake;
pub mod input;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
