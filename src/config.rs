//! Command-line configuration.
//!
//! Flags are order-independent and each consumes a fixed number of following
//! tokens. A flag with its value missing is fatal; tokens that are not
//! recognized flags are silently ignored.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("missing value for {0}")]
    MissingFlagValue(&'static str),
    #[error("invalid port number")]
    InvalidPort,
    #[error("invalid master port")]
    InvalidMasterPort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory containing the snapshot file.
    pub dir: String,
    /// Snapshot file name.
    pub dbfilename: String,
    /// TCP listen port.
    pub port: u16,
    /// `(host, port)` of the upstream master, when running as a replica.
    pub replica_of: Option<(String, u16)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: String::new(),
            dbfilename: String::new(),
            port: 6379,
            replica_of: None,
        }
    }
}

impl Config {
    /// Parses configuration from command-line arguments, skipping the
    /// program name.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut config = Config::default();
        let mut iter = args.into_iter().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--dir" => {
                    config.dir = iter
                        .next()
                        .ok_or(CliError::MissingFlagValue("--dir"))?;
                }
                "--dbfilename" => {
                    config.dbfilename = iter
                        .next()
                        .ok_or(CliError::MissingFlagValue("--dbfilename"))?;
                }
                "--port" => {
                    let value = iter
                        .next()
                        .ok_or(CliError::MissingFlagValue("--port"))?;
                    config.port = value.parse::<u16>().map_err(|_| CliError::InvalidPort)?;
                }
                "--replicaof" => {
                    let host = iter
                        .next()
                        .ok_or(CliError::MissingFlagValue("--replicaof"))?;
                    let port = iter
                        .next()
                        .ok_or(CliError::MissingFlagValue("--replicaof"))?
                        .parse::<u16>()
                        .map_err(|_| CliError::InvalidMasterPort)?;
                    config.replica_of = Some((host, port));
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Path of the snapshot file, or `None` when no file name is configured.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        if self.dbfilename.is_empty() {
            return None;
        }

        Some(PathBuf::from(&self.dir).join(&self.dbfilename))
    }
}
