use thiserror::Error;

use crate::resp::RespValue;

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("command must be an array of bulk strings")]
    BadCommand,
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("invalid expiration time")]
    InvalidExpiry,
    #[error("unknown SET option '{0}'")]
    UnknownSetOption(String),
    #[error("unknown CONFIG subcommand '{0}'")]
    UnknownConfigSubcommand(String),
    #[error("invalid listening port")]
    BadListeningPort,
    #[error("invalid PSYNC replication id")]
    BadPsyncReplicationId,
    #[error("invalid PSYNC offset")]
    BadPsyncOffset,
}

impl CommandError {
    /// The `-ERR …` line sent back to the client. Command errors never close
    /// the connection.
    pub fn as_string(&self) -> String {
        RespValue::Error(format!("ERR {}", self)).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lines() {
        let test_cases = vec![
            (CommandError::UnknownCommand, "-ERR unknown command\r\n"),
            (
                CommandError::WrongArity("set"),
                "-ERR wrong number of arguments for 'set' command\r\n",
            ),
            (
                CommandError::UnknownSetOption("KEEPTTL".to_string()),
                "-ERR unknown SET option 'KEEPTTL'\r\n",
            ),
        ];

        for (error, expected) in test_cases {
            assert_eq!(error.as_string(), expected);
        }
    }
}
