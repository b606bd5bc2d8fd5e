//! Replica registry and write fan-out.
//!
//! A replica entry owns nothing but its identity and the endpoint of the
//! owning connection's outbound queue; the accept loop keeps the socket and
//! the writer task drains the queue FIFO. Removal happens by dropping the
//! entry: once the queue endpoint is gone the writer exits and the socket
//! closes with it.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::server::Server;

#[derive(Debug)]
pub struct Replica {
    pub addr: String,
    pub listening_port: u16,
    sender: UnboundedSender<Vec<u8>>,
}

impl Replica {
    pub fn new(addr: String, listening_port: u16, sender: UnboundedSender<Vec<u8>>) -> Self {
        Self {
            addr,
            listening_port,
            sender,
        }
    }

    /// Enqueues bytes for delivery. Returns `false` once the owning
    /// connection has gone away.
    fn enqueue(&self, bytes: Vec<u8>) -> bool {
        self.sender.send(bytes).is_ok()
    }
}

impl Server {
    /// Adds the peer to the replica set. Called when a connection sends
    /// `REPLCONF listening-port`; re-registration from the same address
    /// replaces the old entry.
    pub fn register_replica(
        &mut self,
        addr: &str,
        listening_port: u16,
        sender: UnboundedSender<Vec<u8>>,
    ) {
        self.replicas.insert(
            addr.to_string(),
            Replica::new(addr.to_string(), listening_port, sender),
        );
    }

    pub fn remove_replica(&mut self, addr: &str) {
        if self.replicas.remove(addr).is_some() {
            debug!(replica = %addr, "removed replica");
        }
    }

    /// Fans a write command out to every registered replica and advances the
    /// replication offset by the command's wire length.
    ///
    /// Enqueueing never blocks the executing command; delivery order per
    /// replica equals enqueue order. Replicas whose connection is gone are
    /// dropped here, best-effort, with no retry.
    pub fn propagate_write(&mut self, wire_form: &str) {
        let mut disconnected = Vec::new();

        for (addr, replica) in &self.replicas {
            if !replica.enqueue(wire_form.as_bytes().to_vec()) {
                disconnected.push(addr.clone());
            }
        }

        for addr in disconnected {
            warn!(replica = %addr, "dropping disconnected replica");
            self.replicas.remove(&addr);
        }

        self.replication_offset += wire_form.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use crate::config::Config;
    use crate::server::Server;

    #[tokio::test]
    async fn test_propagation_is_fifo_and_advances_offset() {
        let mut server = Server::initialize(Config::default()).await.unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();

        server.register_replica("127.0.0.1:5000", 6380, sender);

        let first = "*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n";
        let second = "*3\r\n$3\r\nSET\r\n$1\r\nb\r\n$1\r\n2\r\n";
        server.propagate_write(first);
        server.propagate_write(second);

        assert_eq!(receiver.recv().await.unwrap(), first.as_bytes());
        assert_eq!(receiver.recv().await.unwrap(), second.as_bytes());
        assert_eq!(
            server.replication_offset,
            (first.len() + second.len()) as u64
        );
    }

    #[tokio::test]
    async fn test_disconnected_replica_is_dropped() {
        let mut server = Server::initialize(Config::default()).await.unwrap();
        let (sender, receiver) = mpsc::unbounded_channel();

        server.register_replica("127.0.0.1:5000", 6380, sender);
        drop(receiver);

        server.propagate_write("*1\r\n$4\r\nPING\r\n");
        assert!(server.replicas.is_empty());
    }

    #[tokio::test]
    async fn test_remove_replica() {
        let mut server = Server::initialize(Config::default()).await.unwrap();
        let (sender, _receiver) = mpsc::unbounded_channel();

        server.register_replica("127.0.0.1:5000", 6380, sender);
        assert_eq!(server.replicas.len(), 1);

        server.remove_replica("127.0.0.1:5000");
        assert!(server.replicas.is_empty());
    }
}
