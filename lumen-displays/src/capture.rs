//! Display screenshots for the display picker
//!
//! Capture shells out to the tool matching the session (`grim` on Wayland,
//! ImageMagick `import` on X11), crops to the display's bounds and shrinks
//! the result to a PNG thumbnail. It runs on its own task with a timeout and
//! never touches the content channel.

use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;

use image::imageops::FilterType;
use image::ImageFormat;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::descriptor::Bounds;
use crate::error::{Result, TopologyError};
use crate::session::{self, DisplayServer, SessionInfo};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTool {
    /// Wayland (wlroots compositors and anything implementing screencopy)
    Grim,
    /// ImageMagick, X11 only
    Import,
}

impl CaptureTool {
    pub fn command(&self) -> &'static str {
        match self {
            Self::Grim => "grim",
            Self::Import => "import",
        }
    }

    /// Arguments that write a PNG of `bounds` to stdout
    pub fn args(&self, bounds: &Bounds) -> Vec<String> {
        match self {
            Self::Grim => vec![
                "-g".to_string(),
                format!("{},{} {}x{}", bounds.x, bounds.y, bounds.width, bounds.height),
                "-t".to_string(),
                "png".to_string(),
                "-".to_string(),
            ],
            Self::Import => vec![
                "-silent".to_string(),
                "-window".to_string(),
                "root".to_string(),
                "-crop".to_string(),
                format!("{}x{}{:+}{:+}", bounds.width, bounds.height, bounds.x, bounds.y),
                "png:-".to_string(),
            ],
        }
    }
}

/// Tools found on PATH
pub fn detect_available_tools() -> Vec<CaptureTool> {
    let tools: Vec<CaptureTool> = [CaptureTool::Grim, CaptureTool::Import]
        .into_iter()
        .filter(|tool| session::is_command_available(tool.command()))
        .collect();
    debug!("Available capture tools: {:?}", tools);
    tools
}

/// Pick the tool for this session; `None` disables capture.
pub fn select_capture_tool(session: &SessionInfo, available: &[CaptureTool]) -> Option<CaptureTool> {
    let wanted = match session.server {
        DisplayServer::Wayland => CaptureTool::Grim,
        DisplayServer::X11 => CaptureTool::Import,
        DisplayServer::Headless => return None,
    };

    if available.contains(&wanted) {
        Some(wanted)
    } else {
        warn!(
            "{} not found; display capture unavailable on {:?}",
            wanted.command(),
            session.server
        );
        None
    }
}

pub struct DisplayCapture {
    tool: Option<CaptureTool>,
    thumbnail_width: u32,
    timeout: Duration,
}

impl DisplayCapture {
    pub fn new(tool: Option<CaptureTool>, thumbnail_width: u32) -> Self {
        Self {
            tool,
            thumbnail_width,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Inspect the session and PATH for a usable tool.
    pub fn detect(thumbnail_width: u32) -> Self {
        let session = session::detect_display_server();
        let tool = select_capture_tool(&session, &detect_available_tools());
        Self::new(tool, thumbnail_width)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tool(&self) -> Option<CaptureTool> {
        self.tool
    }

    /// PNG thumbnail of `bounds`, or `None` on any failure.
    pub async fn capture(&self, bounds: &Bounds) -> Option<Vec<u8>> {
        match self.try_capture(bounds).await {
            Ok(png) => Some(png),
            Err(e) => {
                warn!("Display capture failed: {}", e);
                None
            }
        }
    }

    pub async fn try_capture(&self, bounds: &Bounds) -> Result<Vec<u8>> {
        let tool = self
            .tool
            .ok_or_else(|| TopologyError::Capture("no capture tool for this session".to_string()))?;

        let output = Command::new(tool.command())
            .args(tool.args(bounds))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| {
                TopologyError::Capture(format!("{} timed out after {:?}", tool.command(), self.timeout))
            })??;

        if !output.status.success() {
            return Err(TopologyError::Capture(format!(
                "{} exited with {}: {}",
                tool.command(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let width = self.thumbnail_width;
        tokio::task::spawn_blocking(move || make_thumbnail(&output.stdout, width))
            .await
            .map_err(|e| TopologyError::Capture(format!("thumbnail task failed: {}", e)))?
    }
}

/// Shrink an encoded image to at most `max_width` pixels wide, as PNG.
pub fn make_thumbnail(encoded: &[u8], max_width: u32) -> Result<Vec<u8>> {
    let image = image::load_from_memory(encoded)?;

    let image = if max_width > 0 && image.width() > max_width {
        image.resize(max_width, u32::MAX, FilterType::Triangle)
    } else {
        image
    };

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}
