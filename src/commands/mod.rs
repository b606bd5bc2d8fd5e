//! Command parsing and execution.
//!
//! Each command lives in its own module with an argument parser and a
//! handler producing an encoded RESP response. [`execute_command`] is the
//! dispatch point for client connections; write commands additionally fan
//! out to the replica registry after their database mutation.

mod command;
mod command_error;
mod config_get;
mod echo;
mod get;
mod info;
mod keys;
mod ping;
mod psync;
mod replconf;
pub mod set;

pub use command::Command;
pub use command_error::CommandError;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::connection::ClientSession;
use crate::database::Database;
use crate::server::Server;

/// What a command handler produced for the client.
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// An encoded RESP reply.
    Response(String),
    /// The FULLRESYNC header followed by a raw snapshot payload. The payload
    /// is binary and carries no trailing CRLF, so it is kept apart from the
    /// RESP-encoded header.
    FullResync { header: String, payload: Vec<u8> },
}

/// Executes one client command against the server.
///
/// Mutation-before-propagation ordering is guaranteed here: `SET` runs
/// against the database, then its wire form is enqueued to every registered
/// replica while the same lock that guards the registry advances the
/// replication offset.
pub async fn execute_command(
    command: &Command,
    server: &Arc<RwLock<Server>>,
    session: &ClientSession,
) -> Result<CommandResult, CommandError> {
    match command.canonical_name().as_str() {
        "PING" => ping::ping(&command.args),
        "ECHO" => echo::echo(&command.args),
        "GET" => {
            let database = primary_database(server).await;
            get::get(&database, &command.args).await
        }
        "SET" => {
            let database = primary_database(server).await;
            let result = set::set(&database, &command.args).await?;

            server.write().await.propagate_write(&command.wire_format());

            Ok(result)
        }
        "KEYS" => {
            let database = primary_database(server).await;
            keys::keys(&database, &command.args).await
        }
        "CONFIG" => config_get::config_get(server, &command.args).await,
        "INFO" => info::info(server, &command.args).await,
        "REPLCONF" => replconf::replconf(server, session, &command.args).await,
        "PSYNC" => psync::psync(server, &command.args).await,
        _ => Err(CommandError::UnknownCommand),
    }
}

/// The database commands operate on. Index 0 is always present.
async fn primary_database(server: &Arc<RwLock<Server>>) -> Database {
    server.read().await.databases[0].clone()
}
