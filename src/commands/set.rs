use std::time::Duration;

use crate::commands::{CommandError, CommandResult};
use crate::database::Database;
use crate::resp::RespValue;

pub struct SetArguments {
    pub key: String,
    pub value: String,
    pub ttl: Option<Duration>,
}

impl SetArguments {
    /// Accepts `SET key value`, `SET key value PX milliseconds` and
    /// `SET key value EX seconds`.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        match arguments {
            [key, value] => Ok(Self {
                key: key.clone(),
                value: value.clone(),
                ttl: None,
            }),
            [key, value, option, amount] => {
                let amount = amount
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidExpiry)?;

                let ttl = if option.eq_ignore_ascii_case("px") {
                    Duration::from_millis(amount)
                } else if option.eq_ignore_ascii_case("ex") {
                    Duration::from_secs(amount)
                } else {
                    return Err(CommandError::UnknownSetOption(option.clone()));
                };

                Ok(Self {
                    key: key.clone(),
                    value: value.clone(),
                    ttl: Some(ttl),
                })
            }
            _ => Err(CommandError::WrongArity("set")),
        }
    }
}

pub async fn set(
    database: &Database,
    arguments: &[String],
) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    database
        .set(set_arguments.key, set_arguments.value, set_arguments.ttl)
        .await;

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
