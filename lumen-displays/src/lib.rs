//! Display topology for Lumen
//!
//! Enumerates the physical displays the output window can be placed on,
//! gives each a human-friendly name, and publishes hot-plug changes to any
//! number of subscribers.
//!
//! Descriptors are recomputed on every query. Ids are only stable within a
//! session; never persist them.

pub mod backend;
pub mod capture;
pub mod descriptor;
pub mod error;
pub mod naming;
pub mod session;
pub mod topology;
#[cfg(target_os = "linux")]
pub mod winit_backend;
pub mod xrandr;

pub use backend::{DisplayBackend, VirtualBackend};
pub use capture::{CaptureTool, DisplayCapture};
pub use descriptor::{Bounds, DisplayDescriptor, RawDisplay, TouchSupport};
pub use error::{Result, TopologyError};
pub use session::{detect_display_server, ConfidenceLevel, DisplayServer, SessionInfo};
pub use topology::{DisplayEvent, DisplayTopology};
#[cfg(target_os = "linux")]
pub use winit_backend::WinitBackend;
pub use xrandr::XrandrBackend;
