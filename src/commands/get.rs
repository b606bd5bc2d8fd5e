use crate::commands::{CommandError, CommandResult};
use crate::database::Database;
use crate::resp::RespValue;

pub async fn get(
    database: &Database,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("get"));
    };

    let response = match database.get(key).await {
        Some(value) => RespValue::BulkString(value),
        None => RespValue::NullBulkString,
    };

    Ok(CommandResult::Response(response.encode()))
}
