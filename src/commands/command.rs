use crate::commands::CommandError;
use crate::resp::RespValue;

/// A parsed command: the decoded form of a top-level RESP array whose
/// elements are all bulk strings.
///
/// The name keeps the casing it arrived with so the wire form can be
/// reproduced byte-exactly for replica propagation; comparisons go through
/// [`Command::canonical_name`].
#[derive(Debug, PartialEq, Clone)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn from_resp(message: &RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = message else {
            return Err(CommandError::BadCommand);
        };

        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                RespValue::BulkString(content) => parts.push(content.clone()),
                _ => return Err(CommandError::BadCommand),
            }
        }

        let Some(name) = parts.first().cloned() else {
            return Err(CommandError::BadCommand);
        };

        Ok(Self {
            name,
            args: parts[1..].to_vec(),
        })
    }

    /// Uppercase name for case-insensitive dispatch.
    pub fn canonical_name(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Re-serializes the command as a bulk-string array, exactly as it would
    /// appear on the wire. This is the form propagated to replicas, and its
    /// byte length is what advances the master's replication offset.
    pub fn wire_format(&self) -> String {
        let mut elements = vec![RespValue::BulkString(self.name.clone())];
        elements.extend(
            self.args
                .iter()
                .map(|arg| RespValue::BulkString(arg.clone())),
        );

        RespValue::Array(elements).encode()
    }
}
