//! Cross-platform path utilities for Lumen.
//!
//! Single source of truth for where the operator daemon and the output
//! process keep their sockets, configuration and captures.
//!
//! # Platform Behavior
//!
//! | Platform | Data Directory | Socket Directory |
//! |----------|----------------|------------------|
//! | Linux    | `~/.local/share/lumen` | `$XDG_RUNTIME_DIR` or data dir |
//! | macOS    | `~/Library/Application Support/lumen` | Same as data dir |
//! | Windows  | `%APPDATA%/lumen` | Same as data dir |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Errors specific to path operations.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine home directory")]
    NoHomeDirectory,

    #[error("Could not determine data directory")]
    NoDataDirectory,

    #[error("Invalid socket path: {0}")]
    InvalidSocketPath(String),
}

/// Application identifier used in path construction.
const APP_NAME: &str = "lumen";

/// Socket file name for the operator control surface.
pub const IPC_SOCKET_NAME: &str = "lumen.sock";

/// Socket file name for the operator → output content channel.
pub const OUTPUT_SOCKET_NAME: &str = "lumen_output.sock";

/// Longest path a `sockaddr_un` accepts on the platforms we run on.
const MAX_SOCKET_PATH_LEN: usize = 104;

fn ensure_dir(dir: &Path, secure: bool) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    #[cfg(unix)]
    if secure {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o700);
        fs::set_permissions(dir, perms)
            .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;
    }
    #[cfg(not(unix))]
    let _ = secure;

    Ok(())
}

/// Get the application data directory, creating it (0o700) if needed.
pub fn get_data_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().ok_or(PathError::NoDataDirectory)?;
    let data_dir = base_dir.join(APP_NAME);
    ensure_dir(&data_dir, true)?;
    Ok(data_dir)
}

/// Get the socket directory for IPC sockets.
///
/// On Linux this prefers `$XDG_RUNTIME_DIR`; everywhere else the data
/// directory is used.
pub fn get_socket_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        if let Some(runtime_dir) = dirs::runtime_dir() {
            if runtime_dir.exists() {
                return Ok(runtime_dir);
            }
        }
    }

    get_data_dir()
}

/// Path of the control socket the surrounding application talks to.
pub fn get_ipc_socket_path() -> Result<PathBuf> {
    Ok(get_socket_dir()?.join(IPC_SOCKET_NAME))
}

/// Path of the content-distribution socket the output process attaches to.
pub fn get_output_socket_path() -> Result<PathBuf> {
    Ok(get_socket_dir()?.join(OUTPUT_SOCKET_NAME))
}

/// Get the configuration directory.
///
/// - **Linux**: `~/.config/lumen`
/// - **macOS / Windows**: the data directory
pub fn get_config_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let config_base = dirs::config_dir().ok_or(PathError::NoHomeDirectory)?;
        let config_dir = config_base.join(APP_NAME);
        ensure_dir(&config_dir, true)?;
        Ok(config_dir)
    }

    #[cfg(not(target_os = "linux"))]
    {
        get_data_dir()
    }
}

/// Directory display captures are written to.
pub fn get_capture_dir() -> Result<PathBuf> {
    let dir = get_data_dir()?.join("captures");
    ensure_dir(&dir, true)?;
    Ok(dir)
}

/// Resolve a configured socket path, falling back to `default` when the
/// configured value is empty.
pub fn resolve_socket_path(
    configured: &str,
    default: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    let path = if configured.trim().is_empty() {
        default()?
    } else {
        PathBuf::from(configured)
    };

    validate_socket_path(&path)?;
    Ok(path)
}

/// Reject socket paths the kernel would refuse to bind.
pub fn validate_socket_path(path: &Path) -> Result<(), PathError> {
    let display = path.display().to_string();
    if display.is_empty() {
        return Err(PathError::InvalidSocketPath("empty path".to_string()));
    }
    if display.len() > MAX_SOCKET_PATH_LEN {
        return Err(PathError::InvalidSocketPath(format!(
            "{} ({} bytes, max {})",
            display,
            display.len(),
            MAX_SOCKET_PATH_LEN
        )));
    }
    Ok(())
}

/// Set secure Unix socket permissions (0o600).
#[cfg(unix)]
pub fn secure_socket_permissions(socket_path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if socket_path.exists() {
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(socket_path, perms).with_context(|| {
            format!(
                "Failed to set socket permissions: {}",
                socket_path.display()
            )
        })?;
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn secure_socket_permissions(_socket_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_creation() {
        let dir = get_data_dir().expect("Should get data directory");
        assert!(dir.exists(), "Data directory should exist");
        assert!(dir.ends_with("lumen"), "Should end with app name");
    }

    #[test]
    fn test_socket_paths() {
        let ipc = get_ipc_socket_path().expect("Should get socket path");
        let output = get_output_socket_path().expect("Should get socket path");
        assert!(ipc.ends_with(IPC_SOCKET_NAME));
        assert!(output.ends_with(OUTPUT_SOCKET_NAME));
        assert_eq!(ipc.parent(), output.parent());
    }

    #[test]
    fn test_resolve_prefers_configured_path() {
        let path = resolve_socket_path("/tmp/custom.sock", || {
            panic!("default should not be consulted")
        })
        .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.sock"));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let path = resolve_socket_path("  ", || Ok(PathBuf::from("/tmp/default.sock"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/default.sock"));
    }

    #[test]
    fn test_overlong_socket_path_rejected() {
        let long = format!("/tmp/{}.sock", "x".repeat(200));
        assert!(matches!(
            validate_socket_path(Path::new(&long)),
            Err(PathError::InvalidSocketPath(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_socket_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fake.sock");
        std::fs::write(&file, b"").unwrap();
        secure_socket_permissions(&file).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
