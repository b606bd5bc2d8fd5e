//! Server state and the accept loop.
//!
//! [`Server`] owns the database list, the replica registry and the
//! replication identity. [`Server::run`] wires everything together: the
//! optional replica handshake, the TCP accept loop and shutdown on ctrl-c.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::Config;
use crate::connection::{handle_client_connection, handle_master_connection};
use crate::database::Database;
use crate::handshake::{perform_handshake, HandshakeError};
use crate::input::MessageReader;
use crate::rdb::{Snapshot, SnapshotError};
use crate::replication::Replica;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to read snapshot file {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("failed to bind to port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },
    #[error("failed to connect to master at {addr}: {source}")]
    MasterConnect { addr: String, source: std::io::Error },
    #[error("replication handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Role {
    Master,
    Replica { host: String, port: u16 },
}

#[derive(Debug)]
pub struct Server {
    pub config: Config,
    pub role: Role,
    /// 40-character hex id, stable for the lifetime of a master process.
    /// Replicas adopt their master's id on FULLRESYNC.
    pub replication_id: String,
    /// Bytes of write commands propagated so far.
    pub replication_offset: u64,
    /// Index 0 is always present.
    pub databases: Vec<Database>,
    pub replicas: HashMap<String, Replica>,
}

impl Server {
    /// Builds the server state: loads the snapshot when one is configured
    /// and present, otherwise starts with a single empty database.
    pub async fn initialize(config: Config) -> Result<Self, ServerError> {
        let databases = load_databases(&config).await?;

        let role = match &config.replica_of {
            Some((host, port)) => Role::Replica {
                host: host.clone(),
                port: *port,
            },
            None => Role::Master,
        };

        Ok(Server {
            config,
            role,
            replication_id: generate_replication_id(),
            replication_offset: 0,
            databases,
            replicas: HashMap::new(),
        })
    }

    /// Runs the server until shutdown.
    ///
    /// In replica mode the replication session is established first: connect
    /// to the master, handshake, install the snapshot, then apply the
    /// continuing stream in a background task. Either way the server then
    /// accepts client connections until ctrl-c.
    pub async fn run(self) -> Result<(), ServerError> {
        let port = self.config.port;
        let role = self.role.clone();
        let server = Arc::new(RwLock::new(self));

        if let Role::Replica {
            host,
            port: master_port,
        } = role
        {
            let addr = format!("{}:{}", host, master_port);
            let stream = TcpStream::connect(&addr)
                .await
                .map_err(|source| ServerError::MasterConnect {
                    addr: addr.clone(),
                    source,
                })?;

            let (read_half, write_half) = stream.into_split();
            let mut reader = MessageReader::new(read_half);
            let mut writer = write_half;

            let outcome = perform_handshake(&mut reader, &mut writer, port).await?;
            info!(
                master = %addr,
                replication_id = %outcome.replication_id,
                "completed replication handshake"
            );

            {
                let mut server_guard = server.write().await;
                server_guard.replication_id = outcome.replication_id;
                server_guard.databases = build_databases(outcome.snapshot).await;
            }

            let server_clone = Arc::clone(&server);
            tokio::spawn(async move {
                handle_master_connection(reader, writer, server_clone).await;
            });
        }

        let listener = TcpListener::bind(format!("0.0.0.0:{}", port))
            .await
            .map_err(|source| ServerError::Bind { port, source })?;
        info!(port, "listening for connections");

        tokio::select! {
            _ = accept_loop(listener, Arc::clone(&server)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping server");
            }
        }

        Ok(())
    }
}

async fn accept_loop(listener: TcpListener, server: Arc<RwLock<Server>>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let server = Arc::clone(&server);

                tokio::spawn(async move {
                    handle_client_connection(stream, addr.to_string(), server).await;
                });
            }
            Err(error) => {
                error!(%error, "failed to accept connection");
            }
        }
    }
}

async fn load_databases(config: &Config) -> Result<Vec<Database>, ServerError> {
    let Some(path) = config.snapshot_path() else {
        return Ok(vec![Database::new(0)]);
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let snapshot = Snapshot::parse(&bytes)?;
            info!(
                path = %path.display(),
                databases = snapshot.databases.len(),
                "loaded snapshot"
            );
            Ok(build_databases(snapshot).await)
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot file, starting empty");
            Ok(vec![Database::new(0)])
        }
        Err(source) => Err(ServerError::SnapshotRead { path, source }),
    }
}

async fn build_databases(snapshot: Snapshot) -> Vec<Database> {
    let mut databases = Vec::with_capacity(snapshot.databases.len());

    for image in snapshot.databases {
        databases.push(Database::from_image(image).await);
    }

    if databases.is_empty() {
        databases.push(Database::new(0));
    }

    databases
}

fn generate_replication_id() -> String {
    let mut rng = rand::rng();

    (0..40)
        .map(|_| char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_replication_id() {
        let first = generate_replication_id();
        let second = generate_replication_id();

        assert_eq!(first.len(), 40);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_initialize_master_by_default() {
        let server = Server::initialize(Config::default()).await.unwrap();

        assert_eq!(server.role, Role::Master);
        assert_eq!(server.replication_offset, 0);
        assert_eq!(server.databases.len(), 1);
        assert!(server.replicas.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_replica_role() {
        let config = Config {
            replica_of: Some(("localhost".to_string(), 6379)),
            ..Config::default()
        };

        let server = Server::initialize(config).await.unwrap();
        assert_eq!(
            server.role,
            Role::Replica {
                host: "localhost".to_string(),
                port: 6379,
            }
        );
    }

    #[tokio::test]
    async fn test_initialize_missing_snapshot_file_starts_empty() {
        let config = Config {
            dir: "/nonexistent".to_string(),
            dbfilename: "dump.rdb".to_string(),
            ..Config::default()
        };

        let server = Server::initialize(config).await.unwrap();
        assert_eq!(server.databases.len(), 1);
        assert!(server.databases[0].is_empty().await);
    }

    #[tokio::test]
    async fn test_build_databases_always_has_primary() {
        let snapshot = Snapshot::parse(&crate::rdb::empty_snapshot_bytes()).unwrap();
        let databases = build_databases(snapshot).await;

        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].id().await, 0);
    }
}
