//! Graphical session detection
//!
//! Decides whether the operator is running under X11 or Wayland. The
//! answer selects the screen capture tool and tells the daemon whether
//! xrandr output can be trusted for display enumeration.
//!
//! Evidence is scored rather than taken from a single variable, since
//! XWayland sessions set `DISPLAY` alongside `WAYLAND_DISPLAY`.

use std::process::Command;
use tracing::{debug, info};

/// Environment variable access, injectable for tests
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    X11,
    Wayland,
    /// No graphical session (CI, SSH, headless kiosk boot)
    Headless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    /// 4+ evidence points
    High,
    /// 2-3 evidence points
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub server: DisplayServer,
    /// e.g. "GNOME", "KDE", "sway"
    pub desktop_environment: Option<String>,
    pub confidence: ConfidenceLevel,
}

impl SessionInfo {
    /// xrandr reports real outputs only on X11. Under XWayland it lists a
    /// single virtual screen.
    pub fn xrandr_is_authoritative(&self) -> bool {
        self.server == DisplayServer::X11
    }
}

pub fn detect_display_server() -> SessionInfo {
    detect_display_server_with_env(&SystemEnv)
}

pub fn detect_display_server_with_env(env: &dyn EnvProvider) -> SessionInfo {
    let session_type = env.get("XDG_SESSION_TYPE");
    let desktop = env.get("XDG_CURRENT_DESKTOP");
    let wayland_display = env.get("WAYLAND_DISPLAY");
    let x11_display = env.get("DISPLAY");

    debug!(
        "Session environment: XDG_SESSION_TYPE={:?} XDG_CURRENT_DESKTOP={:?} WAYLAND_DISPLAY={:?} DISPLAY={:?}",
        session_type, desktop, wayland_display, x11_display
    );

    let mut x11_score = 0;
    let mut wayland_score = 0;

    match session_type.as_deref() {
        Some("x11") => x11_score += 4,
        Some("wayland") => wayland_score += 4,
        _ => {}
    }

    if wayland_display.is_some() {
        wayland_score += 2;
    }

    if x11_display.is_some() {
        x11_score += 1;
    }

    let (server, winning_score) = if wayland_score > x11_score {
        (DisplayServer::Wayland, wayland_score)
    } else if x11_score > wayland_score {
        (DisplayServer::X11, x11_score)
    } else {
        (DisplayServer::Headless, 0)
    };

    let confidence = match winning_score {
        s if s >= 4 => ConfidenceLevel::High,
        s if s >= 2 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::Low,
    };

    let info = SessionInfo {
        server,
        desktop_environment: desktop,
        confidence,
    };

    info!(
        "Detected display server: {:?} (confidence: {:?})",
        info.server, info.confidence
    );

    info
}

/// Whether `command` resolves on PATH
pub fn is_command_available(command: &str) -> bool {
    Command::new("which")
        .arg(command)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockEnv(HashMap<&'static str, &'static str>);

    impl MockEnv {
        fn new(vars: &[(&'static str, &'static str)]) -> Self {
            Self(vars.iter().copied().collect())
        }
    }

    impl EnvProvider for MockEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn test_x11_session() {
        let env = MockEnv::new(&[("XDG_SESSION_TYPE", "x11"), ("DISPLAY", ":0")]);
        let info = detect_display_server_with_env(&env);
        assert_eq!(info.server, DisplayServer::X11);
        assert_eq!(info.confidence, ConfidenceLevel::High);
        assert!(info.xrandr_is_authoritative());
    }

    #[test]
    fn test_xwayland_counts_as_wayland() {
        let env = MockEnv::new(&[
            ("XDG_SESSION_TYPE", "wayland"),
            ("WAYLAND_DISPLAY", "wayland-0"),
            ("DISPLAY", ":0"),
            ("XDG_CURRENT_DESKTOP", "GNOME"),
        ]);
        let info = detect_display_server_with_env(&env);
        assert_eq!(info.server, DisplayServer::Wayland);
        assert_eq!(info.desktop_environment.as_deref(), Some("GNOME"));
        assert!(!info.xrandr_is_authoritative());
    }

    #[test]
    fn test_display_only_is_low_confidence_x11() {
        let env = MockEnv::new(&[("DISPLAY", ":1")]);
        let info = detect_display_server_with_env(&env);
        assert_eq!(info.server, DisplayServer::X11);
        assert_eq!(info.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_empty_environment_is_headless() {
        let info = detect_display_server_with_env(&MockEnv::new(&[]));
        assert_eq!(info.server, DisplayServer::Headless);
    }
}
