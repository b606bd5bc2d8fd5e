use crate::commands::{CommandError, CommandResult};
use crate::resp::RespValue;

pub fn ping(arguments: &[String]) -> Result<CommandResult, CommandError> {
    if !arguments.is_empty() {
        return Err(CommandError::WrongArity("ping"));
    }

    Ok(CommandResult::Response(
        RespValue::SimpleString("PONG".to_string()).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping() {
        let result = ping(&[]).unwrap();
        assert_eq!(result, CommandResult::Response("+PONG\r\n".to_string()));
    }

    #[test]
    fn test_ping_rejects_arguments() {
        let result = ping(&["message".to_string()]);
        assert_eq!(result, Err(CommandError::WrongArity("ping")));
    }
}
