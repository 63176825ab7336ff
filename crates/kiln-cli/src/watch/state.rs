//! Shared state for the live reload server.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Connected reload clients, keyed by connection id.
///
/// parking_lot locks are held only for map access; event delivery happens
/// on cloned senders outside the lock.
pub struct ServerState {
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_client_id: RwLock<usize>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_client_id: RwLock::new(0),
        }
    }

    /// Register a new reload client.
    ///
    /// Returns the client id and the receiver its event stream reads from.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(16);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    /// Unregister a reload client.
    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Send `data` to every connected client, dropping the ones that have
    /// disconnected.
    pub async fn broadcast(&self, data: &str) {
        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut disconnected = Vec::new();
        for (id, tx) in clients {
            if tx.send(data.to_string()).await.is_err() {
                disconnected.push(id);
            }
        }

        for id in disconnected {
            self.unregister_client(id);
        }
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
