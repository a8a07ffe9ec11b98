//! Output windows hosted by a `lumen-output` child process
//!
//! Placement goes on the command line; later lifecycle changes are
//! newline-delimited [`WindowCommand`]s on the child's stdin. Content never
//! travels this way, it goes through the broadcaster socket.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

use lumen_broadcaster::WindowCommand;
use lumen_displays::Bounds;

use crate::window::{OutputWindow, Result, WindowBackend, WindowError, WindowRequest};

const CLOSE_GRACE: Duration = Duration::from_secs(2);

pub struct ProcessWindowBackend {
    binary: PathBuf,
    socket_path: PathBuf,
    headless: bool,
}

impl ProcessWindowBackend {
    pub fn new(binary: impl Into<PathBuf>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            socket_path: socket_path.into(),
            headless: false,
        }
    }

    /// Children log frames instead of opening windows.
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    fn command(&self, request: &WindowRequest) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--socket")
            .arg(&self.socket_path)
            .arg("--display-id")
            .arg(request.display_id.to_string())
            .args(bounds_args(&request.bounds));

        if !request.visible {
            command.arg("--hidden");
        }
        if request.test_pattern {
            command.arg("--test-pattern");
        }
        if self.headless {
            command.arg("--headless");
        }

        command
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

fn bounds_args(bounds: &Bounds) -> Vec<String> {
    vec![
        format!("--x={}", bounds.x),
        format!("--y={}", bounds.y),
        format!("--width={}", bounds.width),
        format!("--height={}", bounds.height),
    ]
}

#[async_trait]
impl WindowBackend for ProcessWindowBackend {
    async fn open(&self, request: &WindowRequest) -> Result<Box<dyn OutputWindow>> {
        let mut child = self.command(request).spawn().map_err(|e| {
            WindowError::Open(format!("failed to spawn {}: {}", self.binary.display(), e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WindowError::Open("child stdin was not captured".to_string()))?;

        info!(
            "Spawned output process (pid {:?}) on display {}",
            child.id(),
            request.display_id
        );

        Ok(Box::new(ProcessWindow {
            child,
            stdin: Some(stdin),
        }))
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

pub struct ProcessWindow {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl ProcessWindow {
    async fn send(&mut self, command: WindowCommand) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or(WindowError::Closed)?;
        let line = command.to_json_line()?;
        debug!("→ output process: {}", line.trim_end());

        if let Err(e) = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        }
        .await
        {
            // Broken pipe: the child is gone
            self.stdin = None;
            return Err(WindowError::Io(e));
        }
        Ok(())
    }
}

#[async_trait]
impl OutputWindow for ProcessWindow {
    async fn show(&mut self) -> Result<()> {
        self.send(WindowCommand::Show).await
    }

    async fn hide(&mut self) -> Result<()> {
        self.send(WindowCommand::Hide).await
    }

    async fn move_to(&mut self, display_id: u32, bounds: Bounds) -> Result<()> {
        self.send(WindowCommand::Move {
            display_id,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.send(WindowCommand::Close).await {
            debug!("Close command not delivered: {}", e);
        }
        // EOF on stdin also tells the child to exit
        self.stdin = None;

        match tokio::time::timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("Output process exited with {}", status);
                Ok(())
            }
            Ok(Err(e)) => Err(WindowError::Io(e)),
            Err(_) => {
                warn!("Output process ignored close for {:?}, killing it", CLOSE_GRACE);
                self.child.kill().await?;
                Ok(())
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}
