use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::commands::{CommandError, CommandResult};
use crate::connection::ClientSession;
use crate::resp::RespValue;
use crate::server::Server;

/// Master-side REPLCONF.
///
/// `listening-port` is the registration point: from here on the peer is in
/// the replica set and receives every propagated write through the
/// connection's outbound queue. All other subcommands are acknowledged
/// without further effect.
pub async fn replconf(
    server: &Arc<RwLock<Server>>,
    session: &ClientSession,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let Some(subcommand) = arguments.first() else {
        return Err(CommandError::WrongArity("replconf"));
    };

    if subcommand.eq_ignore_ascii_case("listening-port") {
        let port = arguments
            .get(1)
            .ok_or(CommandError::WrongArity("replconf"))?
            .parse::<u16>()
            .map_err(|_| CommandError::BadListeningPort)?;

        server
            .write()
            .await
            .register_replica(&session.addr, port, session.outbound.clone());
        info!(replica = %session.addr, port, "registered replica");
    }

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
