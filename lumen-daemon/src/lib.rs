//! Operator process for Lumen
//!
//! Owns the output window lifecycle, the preview/live staging model, the
//! content queue and the control socket the surrounding application drives
//! them through. Content reaches the output process over the
//! [`lumen_broadcaster`] channel; window commands go to its stdin.

pub mod config;
pub mod control;
pub mod controller;
pub mod ipc;
pub mod process_window;
pub mod queue;
pub mod staging;
pub mod window;

pub use config::{ControlConfig, DisplayBackendKind};
pub use control::{ControlSurface, QueueView};
pub use controller::{
    ControllerOptions, DisplayPreference, OutputWindowController, OutputWindowStatus, WindowState,
};
pub use ipc::{send_command, ControlCommand, ControlResponse, IpcServer};
pub use process_window::ProcessWindowBackend;
pub use queue::{AutoAdvance, ContentQueue};
pub use staging::{ContentSink, HistoryEntry, PresentationState, StagingModel};
pub use window::{MemoryWindowBackend, OutputWindow, WindowBackend, WindowError, WindowRequest};
