//! Configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use lumen_content::TransitionSpec;
use lumen_displays::{Bounds, RawDisplay};

use crate::controller::{ControllerOptions, DisplayPreference};
use crate::staging::DEFAULT_HISTORY_LIMIT;

/// Where display descriptors come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackendKind {
    /// Window-system monitors, falling back to xrandr
    #[default]
    Winit,
    Xrandr,
    /// `virtual_displays` from this file; no window system needed
    Virtual,
}

/// Operator daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Control socket; empty for the platform default
    pub ipc_socket_path: String,

    /// Content channel socket; empty for the platform default
    pub output_socket_path: String,

    /// Output process binary; empty to use the one next to this executable
    pub output_binary: String,

    pub display_backend: DisplayBackendKind,

    /// How often the display watcher re-enumerates
    pub topology_poll_ms: u64,

    /// Target for `create_output` without a display id
    pub preferred_display: DisplayPreference,

    /// Open new output windows visible
    pub show_on_create: bool,

    /// How long a fresh output window gets to attach before content flows
    pub attach_timeout_ms: u64,

    /// Transition for promotions; unset defers to the theme's
    pub default_transition: Option<TransitionSpec>,

    /// Bounded history of promoted items
    pub history_limit: usize,

    /// Queue auto-advance interval; unset disables it unless `queue_play`
    /// names one
    pub auto_advance_secs: Option<u64>,

    /// Width of display capture thumbnails in pixels
    pub capture_thumbnail_width: u32,

    /// Screenshot tools taking longer than this are killed
    pub capture_timeout_ms: u64,

    /// How long `test_display` shows its pattern
    pub test_pattern_secs: u64,

    /// Displays reported by the virtual backend
    pub virtual_displays: Vec<RawDisplay>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            ipc_socket_path: String::new(),
            output_socket_path: String::new(),
            output_binary: String::new(),
            display_backend: DisplayBackendKind::Winit,
            topology_poll_ms: 2000,
            preferred_display: DisplayPreference::Secondary,
            show_on_create: true,
            attach_timeout_ms: 2000,
            default_transition: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            auto_advance_secs: None,
            capture_thumbnail_width: 320,
            capture_timeout_ms: 5000,
            test_pattern_secs: 3,
            virtual_displays: default_virtual_displays(),
        }
    }
}

/// A laptop panel plus a projector to its right
fn default_virtual_displays() -> Vec<RawDisplay> {
    vec![
        RawDisplay::new(1, "Virtual-1", Bounds::new(0, 0, 1920, 1080), true),
        RawDisplay::new(2, "Virtual-2", Bounds::new(1920, 0, 1920, 1080), false),
    ]
}

impl ControlConfig {
    /// Load configuration from the default location, or create it
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path())
    }

    /// Load configuration from `path`, writing defaults there if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;

            let mut config: ControlConfig =
                toml::from_str(&contents).context("Failed to parse config file")?;

            config.config_path = path.to_path_buf();
            if config.history_limit > DEFAULT_HISTORY_LIMIT {
                warn!(
                    "history_limit {} exceeds the maximum, using {}",
                    config.history_limit, DEFAULT_HISTORY_LIMIT
                );
                config.history_limit = DEFAULT_HISTORY_LIMIT;
            }
            Ok(config)
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            };
            config.save().context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn default_config_path() -> PathBuf {
        let config_dir = lumen_paths::get_config_dir().unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lumen")
        });

        config_dir.join("config.toml")
    }

    pub fn ipc_socket_path(&self) -> Result<PathBuf> {
        lumen_paths::resolve_socket_path(&self.ipc_socket_path, lumen_paths::get_ipc_socket_path)
    }

    pub fn output_socket_path(&self) -> Result<PathBuf> {
        lumen_paths::resolve_socket_path(
            &self.output_socket_path,
            lumen_paths::get_output_socket_path,
        )
    }

    /// The configured binary, else `lumen-output` beside the running
    /// executable, else whatever `lumen-output` PATH resolves to.
    pub fn output_binary(&self) -> PathBuf {
        if !self.output_binary.trim().is_empty() {
            return PathBuf::from(&self.output_binary);
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("lumen-output")))
            .filter(|candidate| candidate.exists())
            .unwrap_or_else(|| PathBuf::from("lumen-output"))
    }

    pub fn topology_poll_interval(&self) -> Duration {
        Duration::from_millis(self.topology_poll_ms.max(100))
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms.max(100))
    }

    pub fn auto_advance_delay(&self) -> Option<Duration> {
        self.auto_advance_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            preference: self.preferred_display,
            show_on_create: self.show_on_create,
            attach_timeout: Duration::from_millis(self.attach_timeout_ms),
            test_pattern_duration: Duration::from_secs(self.test_pattern_secs),
        }
    }
}
