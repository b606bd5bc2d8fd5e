use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::server::{Role, Server};

/// `INFO replication` reports the replication role. Masters include their
/// replication id and offset; replicas only report the role. Replies are
/// bulk-string framed. Sections other than `replication` answer nil.
pub async fn info(
    server: &Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [section] = arguments else {
        return Err(CommandError::WrongArity("info"));
    };

    if section != "replication" {
        return Ok(CommandResult::Response(RespValue::NullBulkString.encode()));
    }

    let server_guard = server.read().await;
    let body = match server_guard.role {
        Role::Master => format!(
            "role:master\r\nmaster_replid:{}\r\nmaster_repl_offset:{}",
            server_guard.replication_id, server_guard.replication_offset
        ),
        Role::Replica { .. } => "role:slave".to_string(),
    };

    Ok(CommandResult::Response(
        RespValue::BulkString(body).encode(),
    ))
}
