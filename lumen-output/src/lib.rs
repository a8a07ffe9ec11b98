//! Output process for Lumen
//!
//! Attaches to the operator's content channel, runs every event through the
//! [`ContentRenderer`] and presents the resulting composites full-screen on
//! the display it was placed on. Window lifecycle commands arrive on stdin.

pub mod app;
pub mod commands;
pub mod renderer;
pub mod runtime;
pub mod surface;
pub mod template;
pub mod window;

pub use app::OutputApp;
pub use commands::{read_commands, CommandsEnd};
pub use renderer::{Composite, ContentRenderer, Layer, RendererState};
pub use runtime::{LoopEvent, OutputLoop, DEFAULT_FRAME_INTERVAL};
pub use surface::{LogSurface, Placement, Surface};
pub use template::{layout, Frame, Visual};
pub use window::WinitSurface;
