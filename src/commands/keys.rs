use crate::commands::{CommandError, CommandResult};
use crate::database::Database;
use crate::resp::RespValue;

/// `KEYS *` lists every key in the current database. Pattern matching
/// beyond the literal `*` is not supported; any other pattern yields an
/// empty array.
pub async fn keys(
    database: &Database,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let [pattern] = arguments else {
        return Err(CommandError::WrongArity("keys"));
    };

    let elements = if pattern == "*" {
        database
            .keys()
            .await
            .into_iter()
            .map(RespValue::BulkString)
            .collect()
    } else {
        Vec::new()
    };

    Ok(CommandResult::Response(RespValue::Array(elements).encode()))
}
