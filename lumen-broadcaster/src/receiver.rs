use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{decode_line, OutputEvent};

/// Delay between attach attempts while the operator is not listening
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Output-side end of the content distribution channel
pub struct OutputReceiver {
    socket_path: PathBuf,
    reconnect_delay: Duration,
    last_seq: Option<u64>,
}

impl OutputReceiver {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            reconnect_delay: RECONNECT_DELAY,
            last_seq: None,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Forward decoded events to `tx`, re-attaching whenever the operator
    /// goes away. Returns once `tx` has no receiver left.
    ///
    /// Events sent while detached are lost; nothing is replayed on re-attach.
    pub async fn listen(&mut self, tx: mpsc::UnboundedSender<OutputEvent>) {
        loop {
            match self.attach_and_process(&tx).await {
                Ok(true) => info!("Content channel closed by operator"),
                Ok(false) => return,
                Err(e) => debug!("Content channel unavailable: {}", e),
            }

            if tx.is_closed() {
                return;
            }

            sleep(self.reconnect_delay).await;
        }
    }

    /// Process one connection. `Ok(false)` means the consumer went away.
    async fn attach_and_process(&mut self, tx: &mpsc::UnboundedSender<OutputEvent>) -> Result<bool> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        info!("✓ Attached to content channel at {:?}", self.socket_path);
        self.last_seq = None;

        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let envelope = match decode_line(&line) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("Rejected content event: {} (line: {})", e, line);
                    continue;
                }
            };

            if let Some(last) = self.last_seq {
                if envelope.seq > last + 1 {
                    debug!("Missed {} event(s) before seq {}", envelope.seq - last - 1, envelope.seq);
                }
            }
            self.last_seq = Some(envelope.seq);

            debug!("Received {} (seq {})", envelope.event.name(), envelope.seq);
            if tx.send(envelope.event).is_err() {
                return Ok(false);
            }
        }

        Ok(true)
    }
}
