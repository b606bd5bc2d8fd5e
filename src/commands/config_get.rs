use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::Server;

/// `CONFIG GET name` answers a two-element array of name and value, or nil
/// when the parameter is unknown or unset.
pub async fn config_get(
    server: &Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [subcommand, name] = arguments else {
        return Err(CommandError::WrongArity("config"));
    };

    if !subcommand.eq_ignore_ascii_case("get") {
        return Err(CommandError::UnknownConfigSubcommand(subcommand.clone()));
    }

    let server_guard = server.read().await;
    let value = match name.as_str() {
        "dir" => Some(server_guard.config.dir.clone()),
        "dbfilename" => Some(server_guard.config.dbfilename.clone()),
        _ => None,
    };

    let response = match value {
        Some(value) if !value.is_empty() => RespValue::Array(vec![
            RespValue::BulkString(name.clone()),
            RespValue::BulkString(value),
        ]),
        _ => RespValue::NullBulkString,
    };

    Ok(CommandResult::Response(response.encode()))
}
