use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use lumen_content::{ContentItem, ThemeUpdate, TransitionSpec};

use crate::client::{Client, ClientManager};
use crate::error::{BroadcasterError, Result};
use crate::events::{Envelope, OutputEvent};

/// Operator-side end of the content distribution channel
pub struct ContentBroadcaster {
    socket_path: PathBuf,
    client_manager: ClientManager,
    next_seq: AtomicU64,
    accept_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    running: Arc<RwLock<bool>>,
}

impl ContentBroadcaster {
    /// Create new broadcaster
    pub async fn new(socket_path: impl AsRef<Path>) -> Result<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();
        lumen_paths::validate_socket_path(&socket_path)
            .map_err(|e| BroadcasterError::SocketPath(e.to_string()))?;

        Ok(Self {
            socket_path,
            client_manager: ClientManager::new(),
            next_seq: AtomicU64::new(1),
            accept_task: Arc::new(Mutex::new(None)),
            running: Arc::new(RwLock::new(false)),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Start listening for output receivers
    pub async fn start(&self) -> Result<()> {
        let is_running = *self.running.read().await;
        if is_running {
            return Err(BroadcasterError::AlreadyRunning);
        }

        // Remove stale socket file from a previous run
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        lumen_paths::secure_socket_permissions(&self.socket_path)
            .map_err(|e| BroadcasterError::SocketPath(e.to_string()))?;

        tracing::info!("Content broadcaster listening on {:?} (permissions: 0600)", self.socket_path);

        *self.running.write().await = true;

        let clients = self.client_manager.clone();
        let running = Arc::clone(&self.running);

        let task = tokio::spawn(async move {
            let mut next_client_id = 1u64;
            loop {
                if !*running.read().await {
                    break;
                }

                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        // No catch-up: a late receiver only sees what is sent from now on.
                        let client = Client::new(next_client_id, stream);
                        next_client_id += 1;

                        clients.add_client(client).await;
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept output receiver: {}", e);
                    }
                }
            }
            tracing::info!("Receiver acceptance task stopped");
        });

        *self.accept_task.lock().await = Some(task);

        Ok(())
    }

    /// Stop the broadcaster and detach every receiver
    pub async fn stop(&self) -> Result<()> {
        let is_running = *self.running.read().await;
        if !is_running {
            return Err(BroadcasterError::NotStarted);
        }

        *self.running.write().await = false;

        if let Some(task) = self.accept_task.lock().await.take() {
            task.abort();
        }

        self.client_manager.disconnect_all().await;

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        tracing::info!("Content broadcaster stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Fire-and-forget send of one event to every attached receiver.
    ///
    /// Returns the number of receivers the line was written to. Failures are
    /// logged, never returned.
    pub async fn send(&self, event: OutputEvent) -> usize {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let name = event.name();
        let envelope = Envelope::new(seq, event);

        let line = match envelope.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to encode {} (seq {}): {}", name, seq, e);
                return 0;
            }
        };

        let delivered = self.client_manager.broadcast_line(&line).await;
        tracing::debug!("Sent {} (seq {}) to {} receiver(s)", name, seq, delivered);
        delivered
    }

    pub async fn send_content(&self, item: ContentItem, transition: Option<TransitionSpec>) -> usize {
        self.send(OutputEvent::ContentUpdate { item, transition }).await
    }

    pub async fn clear_content(&self) -> usize {
        self.send(OutputEvent::ContentClear).await
    }

    pub async fn show_black(&self) -> usize {
        self.send(OutputEvent::ShowBlack).await
    }

    pub async fn show_logo(&self) -> usize {
        self.send(OutputEvent::ShowLogo).await
    }

    pub async fn update_theme(&self, theme: ThemeUpdate) -> usize {
        self.send(OutputEvent::ThemeUpdate { theme }).await
    }

    /// Get current receiver count
    pub async fn client_count(&self) -> usize {
        self.client_manager.client_count().await
    }
}

impl Drop for ContentBroadcaster {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.accept_task.try_lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcaster_create() {
        let dir = tempfile::tempdir().unwrap();
        let broadcaster = ContentBroadcaster::new(dir.path().join("out.sock"))
            .await
            .unwrap();
        assert_eq!(broadcaster.client_count().await, 0);
        assert!(!broadcaster.is_running().await);
    }

    #[tokio::test]
    async fn test_send_without_receivers_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let broadcaster = ContentBroadcaster::new(dir.path().join("out.sock"))
            .await
            .unwrap();

        assert_eq!(broadcaster.show_black().await, 0);
        assert_eq!(broadcaster.clear_content().await, 0);
        assert_eq!(broadcaster.next_seq.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_double_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let broadcaster = ContentBroadcaster::new(dir.path().join("out.sock"))
            .await
            .unwrap();

        assert!(matches!(broadcaster.stop().await, Err(BroadcasterError::NotStarted)));
        broadcaster.start().await.unwrap();
        assert!(matches!(broadcaster.start().await, Err(BroadcasterError::AlreadyRunning)));
        broadcaster.stop().await.unwrap();
    }
}
