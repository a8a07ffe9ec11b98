use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::error::{BroadcasterError, Result};

/// How long one receiver may stall a write before it is dropped.
const WRITE_TIMEOUT: Duration = Duration::from_millis(250);

/// Attached output process
pub struct Client {
    id: u64,
    stream: UnixStream,
}

impl Client {
    pub fn new(id: u64, stream: UnixStream) -> Self {
        Self { id, stream }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Write one already-encoded line
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        match tokio::time::timeout(WRITE_TIMEOUT, self.stream.write_all(line.as_bytes())).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(BroadcasterError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "receiver stalled",
            ))),
        }
    }
}

/// Thread-safe client list manager
#[derive(Clone)]
pub struct ClientManager {
    clients: Arc<Mutex<Vec<Client>>>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add new client
    pub async fn add_client(&self, client: Client) {
        let mut clients = self.clients.lock().await;
        clients.push(client);
        tracing::info!("Output receiver attached. Total receivers: {}", clients.len());
    }

    /// Write a line to every client, removing dead ones.
    ///
    /// Returns how many receivers took the line.
    pub async fn broadcast_line(&self, line: &str) -> usize {
        let mut clients = self.clients.lock().await;
        let mut dead_indices = Vec::new();

        for (idx, client) in clients.iter_mut().enumerate() {
            if let Err(e) = client.send_line(line).await {
                tracing::warn!("Failed to send to receiver {}: {}", client.id(), e);
                dead_indices.push(idx);
            }
        }

        // Remove dead clients in reverse order
        for idx in dead_indices.iter().rev() {
            clients.remove(*idx);
            tracing::info!("Removed dead receiver. Remaining: {}", clients.len());
        }

        clients.len()
    }

    /// Drop every client, closing their streams
    pub async fn disconnect_all(&self) {
        self.clients.lock().await.clear();
    }

    /// Get current client count
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
