//! Downstream Broadcaster (C7): fan-out of events to UI SSE clients.
//! Uses a skip-on-disconnect model; a client that falls behind or
//! disconnects is dropped rather than buffered for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

/// Per-client bounded event buffer. A send that can't enqueue marks the
/// client disconnected; it is removed on the following fan-out pass.
const CLIENT_BUFFER_CAPACITY: usize = 256;

pub type ClientId = u64;

struct Client {
    sender: mpsc::Sender<Value>,
    instance_id: Option<String>,
}

/// Registry of connected UI SSE clients and their instance subscriptions.
pub struct Broadcaster {
    clients: RwLock<HashMap<ClientId, Client>>,
    by_instance: RwLock<HashMap<String, Vec<ClientId>>>,
    next_id: AtomicU64,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            by_instance: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new client, optionally scoped to one instance id, and
    /// return its receiving end plus the id used to remove it later.
    pub fn add_client(&self, instance_id: Option<String>) -> (ClientId, mpsc::Receiver<Value>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER_CAPACITY);

        if let Some(instance_id) = &instance_id {
            self.by_instance.write().entry(instance_id.clone()).or_default().push(id);
        }
        self.clients.write().insert(id, Client { sender: tx, instance_id });

        (id, rx)
    }

    pub fn remove_client(&self, id: ClientId) {
        let removed = self.clients.write().remove(&id);
        if let Some(Client { instance_id: Some(instance_id), .. }) = removed {
            if let Some(list) = self.by_instance.write().get_mut(&instance_id) {
                list.retain(|c| *c != id);
            }
        }
    }

    /// Deliver `payload` to every subscriber of `instance_id`. Clients that
    /// can't accept the send (full buffer or closed) are collected and
    /// removed after the pass.
    pub fn send_tunnel_update(&self, instance_id: &str, payload: &Value) {
        let targets = {
            let by_instance = self.by_instance.read();
            by_instance.get(instance_id).cloned().unwrap_or_default()
        };
        self.fan_out(&targets, payload);
    }

    /// Deliver `payload` to every connected client, regardless of instance
    /// subscription (e.g. `endpoint_shutdown`).
    pub fn send_global_update(&self, payload: &Value) {
        let targets: Vec<ClientId> = self.clients.read().keys().copied().collect();
        self.fan_out(&targets, payload);
    }

    fn fan_out(&self, targets: &[ClientId], payload: &Value) {
        let mut dead = Vec::new();
        {
            let clients = self.clients.read();
            for id in targets {
                let Some(client) = clients.get(id) else { continue };
                if client.sender.try_send(payload.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        for id in dead {
            warn!(client_id = id, "dropping unresponsive broadcast client");
            self.remove_client(id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}
