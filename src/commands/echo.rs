use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;

pub fn echo(arguments: &[String]) -> Result<CommandResult, CommandError> {
    let [message] = arguments else {
        return Err(CommandError::WrongArity("echo"));
    };

    Ok(CommandResult::Response(
        RespValue::SimpleString(message.clone()).encode(),
    ))
}
