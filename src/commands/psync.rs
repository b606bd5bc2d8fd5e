use std::sync::Arc;

use tokio::sync::RwLock;

use crate::commands::{CommandError, CommandResult};
use crate::rdb;
use crate::resp::RespValue;
use crate::server::Server;

pub struct PsyncArguments {
    pub replication_id: String,
    pub offset: i64,
}

impl PsyncArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [replication_id, offset] = arguments else {
            return Err(CommandError::WrongArity("psync"));
        };

        let offset = offset
            .parse::<i64>()
            .map_err(|_| CommandError::BadPsyncOffset)?;

        Ok(Self {
            replication_id: replication_id.clone(),
            offset,
        })
    }
}

/// Master-side PSYNC: answer `+FULLRESYNC <replid> <offset>` followed by a
/// bulk-length-prefixed empty snapshot. The snapshot payload is the one
/// framing exception on the wire: no trailing CRLF follows it.
pub async fn psync(
    server: &Arc<RwLock<Server>>,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let psync_arguments = PsyncArguments::parse(arguments)?;

    let server_guard = server.read().await;

    if psync_arguments.replication_id != "?"
        && psync_arguments.replication_id != server_guard.replication_id
    {
        return Err(CommandError::BadPsyncReplicationId);
    }

    let header = RespValue::SimpleString(format!(
        "FULLRESYNC {} {}",
        server_guard.replication_id, server_guard.replication_offset
    ))
    .encode();

    let snapshot = rdb::empty_snapshot_bytes();
    let mut payload = format!("${}\r\n", snapshot.len()).into_bytes();
    payload.extend_from_slice(&snapshot);

    Ok(CommandResult::FullResync { header, payload })
}
