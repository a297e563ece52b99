//! Thread-safe registry of live client connections

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outbound side of one client connection. Messages pushed here are written
/// to the socket by that connection's writer task.
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    /// Queue a message for this connection. Fails when the writer task has
    /// exited, which is how a dead socket shows up on the broadcast path.
    fn send(&self, msg: Message) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Set of live connections, shared between the accept path, per-connection
/// session tasks and the tick loop.
pub struct ConnectionRegistry {
    sockets: DashMap<Uuid, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sockets: DashMap::new(),
        }
    }

    pub fn add(&self, id: Uuid, tx: mpsc::UnboundedSender<Message>) {
        self.sockets.insert(id, ConnectionHandle { tx });
        debug!(connection_id = %id, total = self.sockets.len(), "connection registered");
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.sockets.remove(id).is_some()
    }

    pub fn count(&self) -> usize {
        self.sockets.len()
    }

    /// Send `msg` to every registered connection. Connections whose writer is
    /// gone are dropped from the registry within this same pass.
    pub fn broadcast(&self, msg: Message) {
        self.sockets.retain(|id, handle| {
            if handle.send(msg.clone()) {
                true
            } else {
                warn!(connection_id = %id, "removing dead connection during broadcast");
                false
            }
        });
    }

    /// Close every connection and empty the registry. Used on server stop.
    pub fn clear(&self) {
        for entry in self.sockets.iter() {
            let _ = entry.value().tx.send(Message::Close(None));
        }
        self.sockets.clear();
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
