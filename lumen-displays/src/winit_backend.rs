//! Display enumeration through the window system, via winit
//!
//! Works the same on X11 and Wayland. A process gets one winit event loop,
//! so a dedicated thread owns it for the life of the backend and answers
//! each enumeration through the loop's proxy.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::monitor::MonitorHandle;
use winit::platform::wayland::EventLoopBuilderExtWayland;
use winit::platform::x11::EventLoopBuilderExtX11;
use winit::window::WindowId;

use crate::backend::DisplayBackend;
use crate::descriptor::{Bounds, RawDisplay};
use crate::error::{Result, TopologyError};
use crate::xrandr::display_id;

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

enum Request {
    Enumerate(mpsc::Sender<Vec<RawDisplay>>),
}

pub struct WinitBackend {
    proxy: Mutex<EventLoopProxy<Request>>,
}

impl WinitBackend {
    /// Start the monitor thread; fails when no window system is reachable.
    pub fn spawn() -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("lumen-monitors".to_string())
            .spawn(move || {
                let mut builder = EventLoop::<Request>::with_user_event();
                EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
                EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);

                let event_loop = match builder.build() {
                    Ok(event_loop) => event_loop,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                if ready_tx.send(Ok(event_loop.create_proxy())).is_err() {
                    return;
                }

                if let Err(e) = event_loop.run_app(&mut MonitorService) {
                    warn!("Monitor event loop ended: {}", e);
                }
            })?;

        let proxy = ready_rx
            .recv()
            .map_err(|_| TopologyError::Enumeration("monitor thread exited".to_string()))?
            .map_err(TopologyError::Enumeration)?;

        info!("Enumerating displays through the window system");
        Ok(Self {
            proxy: Mutex::new(proxy),
        })
    }
}

impl DisplayBackend for WinitBackend {
    fn enumerate(&self) -> Result<Vec<RawDisplay>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.proxy
            .lock()
            .send_event(Request::Enumerate(reply_tx))
            .map_err(|_| TopologyError::Enumeration("monitor event loop has exited".to_string()))?;

        let displays = reply_rx.recv_timeout(REPLY_TIMEOUT).map_err(|_| {
            TopologyError::Enumeration("window system did not answer in time".to_string())
        })?;
        debug!("winit reported {} monitors", displays.len());
        Ok(displays)
    }

    fn name(&self) -> &'static str {
        "winit"
    }
}

struct MonitorService;

impl ApplicationHandler<Request> for MonitorService {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, _event: WindowEvent) {}

    fn user_event(&mut self, event_loop: &ActiveEventLoop, request: Request) {
        match request {
            Request::Enumerate(reply) => {
                let _ = reply.send(monitors(event_loop));
            }
        }
    }
}

fn monitors(event_loop: &ActiveEventLoop) -> Vec<RawDisplay> {
    let primary = event_loop.primary_monitor();
    let mut displays: Vec<RawDisplay> = event_loop
        .available_monitors()
        .map(|monitor| describe(&monitor, primary.as_ref() == Some(&monitor)))
        .collect();
    ensure_primary(&mut displays);
    displays
}

fn describe(monitor: &MonitorHandle, is_primary: bool) -> RawDisplay {
    let position = monitor.position();
    let size = monitor.size();
    raw_display(
        monitor.name().as_deref(),
        Bounds::new(position.x, position.y, size.width, size.height),
        monitor.scale_factor(),
        is_primary,
    )
}

/// Connector names match what xrandr reports, so ids agree across backends.
pub fn raw_display(name: Option<&str>, bounds: Bounds, scale_factor: f64, is_primary: bool) -> RawDisplay {
    let label = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!("Display at {},{}", bounds.x, bounds.y),
    };
    RawDisplay {
        scale_factor,
        ..RawDisplay::new(display_id(&label), label, bounds, is_primary)
    }
}

/// Wayland has no primary monitor; the one at the desktop origin stands in.
pub fn ensure_primary(displays: &mut [RawDisplay]) {
    if displays.is_empty() || displays.iter().any(|d| d.is_primary) {
        return;
    }
    let index = displays
        .iter()
        .position(|d| d.bounds.contains(0, 0))
        .unwrap_or(0);
    displays[index].is_primary = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_monitor_shares_xrandr_id() {
        let display = raw_display(Some("HDMI-1"), Bounds::new(1920, 0, 1920, 1080), 1.0, false);
        assert_eq!(display.label, "HDMI-1");
        assert_eq!(display.id, display_id("HDMI-1"));
        assert_eq!(display.bounds.x, 1920);
    }

    #[test]
    fn test_unnamed_monitor_is_labelled_by_position() {
        let display = raw_display(Some("  "), Bounds::new(-1280, 0, 1280, 1024), 2.0, false);
        assert_eq!(display.label, "Display at -1280,0");
        assert_eq!(display.scale_factor, 2.0);

        let again = raw_display(None, Bounds::new(-1280, 0, 1280, 1024), 2.0, false);
        assert_eq!(again.id, display.id);
    }

    #[test]
    fn test_origin_monitor_becomes_primary() {
        let mut displays = vec![
            raw_display(Some("DP-2"), Bounds::new(1920, 0, 1920, 1080), 1.0, false),
            raw_display(Some("eDP-1"), Bounds::new(0, 0, 1920, 1080), 1.0, false),
        ];
        ensure_primary(&mut displays);
        assert!(!displays[0].is_primary);
        assert!(displays[1].is_primary);
    }

    #[test]
    fn test_reported_primary_is_kept() {
        let mut displays = vec![
            raw_display(Some("DP-2"), Bounds::new(1920, 0, 1920, 1080), 1.0, true),
            raw_display(Some("eDP-1"), Bounds::new(0, 0, 1920, 1080), 1.0, false),
        ];
        ensure_primary(&mut displays);
        assert!(displays[0].is_primary);
        assert!(!displays[1].is_primary);

        let mut none: Vec<RawDisplay> = Vec::new();
        ensure_primary(&mut none);
    }
}
