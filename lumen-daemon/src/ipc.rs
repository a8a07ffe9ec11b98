//! Unix socket IPC server for control commands
//!
//! Newline-delimited JSON in both directions: one command object per line,
//! one response object per line. A connection may send any number of
//! commands.
//!
//! ```text
//! → {"command":"create_output","display_id":2}
//! ← {"ok":true,"data":true}
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use lumen_content::{ContentItem, ThemeUpdate, TransitionSpec, Verse};

use crate::control::ControlSurface;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    // Output window
    CreateOutput {
        #[serde(default)]
        display_id: Option<u32>,
    },
    MoveOutput {
        display_id: u32,
    },
    ShowOutput,
    HideOutput,
    CloseOutput,
    GetOutputStatus,
    GetDisplays,
    CaptureDisplay {
        display_id: u32,
    },
    TestDisplay {
        display_id: u32,
    },

    // Channel
    SendContent {
        item: ContentItem,
        #[serde(default)]
        transition: Option<TransitionSpec>,
    },
    ClearContent,
    ShowBlack,
    ShowLogo,
    UpdateTheme {
        theme: ThemeUpdate,
    },

    // Staging
    SetPreview {
        item: ContentItem,
    },
    Promote,
    ClearPreview,
    ClearLive,
    SendVerseToPreview {
        verse: Verse,
    },
    SendVerseToLive {
        verse: Verse,
    },
    Stage {
        item: ContentItem,
    },
    Unstage {
        id: String,
    },
    StageToPreview {
        id: String,
    },
    GetState,

    // Queue
    QueueAdd {
        item: ContentItem,
    },
    QueueRemove {
        id: String,
    },
    QueueMove {
        from: usize,
        to: usize,
    },
    QueueClear,
    QueueNext,
    QueuePrevious,
    QueueJump {
        index: usize,
    },
    QueuePlay {
        #[serde(default)]
        interval_secs: Option<u64>,
    },
    QueueStop,
    GetQueue,

    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
        }
    }

    pub fn data(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                ok: true,
                data: Some(value),
                error: None,
            },
            Err(e) => Self::error(format!("Failed to serialize response: {}", e)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn to_json_line(&self) -> Result<String> {
        let json = serde_json::to_string(self).context("Failed to serialize response")?;
        Ok(format!("{}\n", json))
    }
}

/// Unix socket IPC server
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    surface: Arc<ControlSurface>,
    capture_dir: PathBuf,
}

impl IpcServer {
    pub fn new(socket_path: &Path, surface: Arc<ControlSurface>, capture_dir: PathBuf) -> Result<Self> {
        // Remove existing socket if it exists
        let _ = std::fs::remove_file(socket_path);

        let listener = UnixListener::bind(socket_path).context("Failed to bind Unix socket")?;
        lumen_paths::secure_socket_permissions(socket_path)?;

        info!("IPC server listening on {}", socket_path.display());

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
            surface,
            capture_dir,
        })
    }

    pub async fn run(&self) -> Result<()> {
        loop {
            let (stream, _) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            let surface = self.surface.clone();
            let capture_dir = self.capture_dir.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, surface, capture_dir).await {
                    warn!("IPC connection error: {}", e);
                }
            });
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Serve every command on one connection until the peer hangs up.
pub async fn handle_connection(
    stream: UnixStream,
    surface: Arc<ControlSurface>,
    capture_dir: PathBuf,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("Received IPC command: {}", line);

        let response = match serde_json::from_str::<ControlCommand>(line) {
            Ok(command) => dispatch(command, &surface, &capture_dir).await,
            Err(e) => ControlResponse::error(format!("Invalid command: {}", e)),
        };

        writer.write_all(response.to_json_line()?.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

pub async fn dispatch(
    command: ControlCommand,
    surface: &Arc<ControlSurface>,
    capture_dir: &Path,
) -> ControlResponse {
    match command {
        ControlCommand::CreateOutput { display_id } => {
            ControlResponse::data(json!({ "success": surface.create_output(display_id).await }))
        }
        ControlCommand::MoveOutput { display_id } => {
            ControlResponse::data(json!({ "success": surface.move_output(display_id).await }))
        }
        ControlCommand::ShowOutput => {
            surface.show_output().await;
            ControlResponse::ok()
        }
        ControlCommand::HideOutput => {
            surface.hide_output().await;
            ControlResponse::ok()
        }
        ControlCommand::CloseOutput => {
            surface.close_output().await;
            ControlResponse::ok()
        }
        ControlCommand::GetOutputStatus => ControlResponse::data(surface.output_status()),
        ControlCommand::GetDisplays => ControlResponse::data(surface.displays().await),
        ControlCommand::CaptureDisplay { display_id } => {
            match surface.capture_display(display_id).await {
                Some(png) => match save_capture(capture_dir, display_id, &png) {
                    Ok(path) => ControlResponse::data(json!({ "path": path })),
                    Err(e) => {
                        error!("Failed to save capture: {:#}", e);
                        ControlResponse::data(Value::Null)
                    }
                },
                None => ControlResponse::data(Value::Null),
            }
        }
        ControlCommand::TestDisplay { display_id } => {
            ControlResponse::data(json!({ "success": surface.test_display(display_id).await }))
        }

        ControlCommand::SendContent { item, transition } => {
            if let Err(e) = item.validate() {
                warn!("Sending incomplete {} item: {}", item.kind(), e);
            }
            surface.send_content(item, transition).await;
            ControlResponse::ok()
        }
        ControlCommand::ClearContent => {
            surface.clear_content().await;
            ControlResponse::ok()
        }
        ControlCommand::ShowBlack => {
            surface.show_black().await;
            ControlResponse::ok()
        }
        ControlCommand::ShowLogo => {
            surface.show_logo().await;
            ControlResponse::ok()
        }
        ControlCommand::UpdateTheme { theme } => {
            surface.update_theme(theme).await;
            ControlResponse::ok()
        }

        ControlCommand::SetPreview { item } => {
            surface.set_preview(item).await;
            ControlResponse::ok()
        }
        ControlCommand::Promote => ControlResponse::data(surface.promote().await),
        ControlCommand::ClearPreview => {
            surface.clear_preview().await;
            ControlResponse::ok()
        }
        ControlCommand::ClearLive => {
            surface.clear_live().await;
            ControlResponse::ok()
        }
        ControlCommand::SendVerseToPreview { verse } => {
            surface.send_verse_to_preview(&verse).await;
            ControlResponse::ok()
        }
        ControlCommand::SendVerseToLive { verse } => {
            ControlResponse::data(surface.send_verse_to_live(&verse).await)
        }
        ControlCommand::Stage { item } => {
            ControlResponse::data(json!({ "added": surface.stage(item).await }))
        }
        ControlCommand::Unstage { id } => {
            ControlResponse::data(json!({ "removed": surface.unstage(&id).await }))
        }
        ControlCommand::StageToPreview { id } => {
            ControlResponse::data(json!({ "found": surface.stage_to_preview(&id).await }))
        }
        ControlCommand::GetState => ControlResponse::data(surface.presentation_state().await),

        ControlCommand::QueueAdd { item } => {
            surface.queue_add(item).await;
            ControlResponse::data(surface.queue_view().await)
        }
        ControlCommand::QueueRemove { id } => {
            surface.queue_remove(&id).await;
            ControlResponse::data(surface.queue_view().await)
        }
        ControlCommand::QueueMove { from, to } => {
            surface.queue_move(from, to).await;
            ControlResponse::data(surface.queue_view().await)
        }
        ControlCommand::QueueClear => {
            surface.queue_clear().await;
            ControlResponse::data(surface.queue_view().await)
        }
        ControlCommand::QueueNext => ControlResponse::data(surface.queue_next().await),
        ControlCommand::QueuePrevious => ControlResponse::data(surface.queue_previous().await),
        ControlCommand::QueueJump { index } => ControlResponse::data(surface.queue_jump(index).await),
        ControlCommand::QueuePlay { interval_secs } => {
            let started = surface
                .queue_play(interval_secs.map(Duration::from_secs))
                .await;
            ControlResponse::data(json!({ "playing": started }))
        }
        ControlCommand::QueueStop => {
            surface.queue_stop().await;
            ControlResponse::ok()
        }
        ControlCommand::GetQueue => ControlResponse::data(surface.queue_view().await),

        ControlCommand::Shutdown => {
            info!("Received shutdown command");
            surface.request_shutdown();
            ControlResponse::ok()
        }
    }
}

fn save_capture(dir: &Path, display_id: u32, png: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("display-{}.png", display_id));
    std::fs::write(&path, png).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Send one command to a running daemon and return its response.
pub async fn send_command(socket_path: &Path, command: &ControlCommand) -> Result<ControlResponse> {
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("Failed to connect to {}", socket_path.display()))?;
    let (reader, mut writer) = stream.into_split();

    let line = serde_json::to_string(command).context("Failed to serialize command")?;
    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.flush().await?;

    let mut lines = BufReader::new(reader).lines();
    let response = lines
        .next_line()
        .await?
        .context("Daemon closed the connection without answering")?;
    serde_json::from_str(&response).context("Failed to parse response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shape() {
        let command: ControlCommand =
            serde_json::from_str(r#"{"command":"create_output","display_id":2}"#).unwrap();
        assert_eq!(command, ControlCommand::CreateOutput { display_id: Some(2) });

        let command: ControlCommand = serde_json::from_str(r#"{"command":"create_output"}"#).unwrap();
        assert_eq!(command, ControlCommand::CreateOutput { display_id: None });

        let command: ControlCommand = serde_json::from_str(
            r#"{"command":"send_content","item":{"id":"a","timestamp":1,"type":"logo"}}"#,
        )
        .unwrap();
        assert!(matches!(command, ControlCommand::SendContent { transition: None, .. }));

        assert!(serde_json::from_str::<ControlCommand>(r#"{"command":"launch_rockets"}"#).is_err());
    }

    #[test]
    fn test_response_omits_empty_fields() {
        assert_eq!(ControlResponse::ok().to_json_line().unwrap(), "{\"ok\":true}\n");
        let line = ControlResponse::error("nope").to_json_line().unwrap();
        assert_eq!(line, "{\"ok\":false,\"error\":\"nope\"}\n");
    }

    #[test]
    fn test_save_capture_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_capture(&dir.path().join("captures"), 7, b"\x89PNG").unwrap();
        assert!(path.ends_with("display-7.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"\x89PNG");
    }
}
