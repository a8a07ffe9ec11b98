//! Output window lifecycle
//!
//! ```text
//! Absent ──create──▶ CreatedHidden ◀──hide/show──▶ Visible
//!                         │                          │
//!                         └──close / display lost ───┴──▶ Destroyed ──create──▶ …
//! ```
//!
//! `create`, `move_to_display` and `close` hold the lifecycle lock for
//! their whole duration. A `create` or move that finds the lock taken
//! returns `false` instead of queueing behind the transition in flight.
//! Status reads never wait on that lock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use lumen_broadcaster::ContentBroadcaster;
use lumen_content::{ContentItem, Theme, ThemeUpdate, TransitionSpec};
use lumen_displays::topology::{primary_of, secondary_of};
use lumen_displays::{Bounds, DisplayCapture, DisplayDescriptor, DisplayEvent, DisplayTopology};

use crate::staging::ContentSink;
use crate::window::{OutputWindow, WindowBackend, WindowRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowState {
    Absent,
    CreatedHidden,
    Visible,
    Destroyed,
}

impl WindowState {
    pub fn has_window(&self) -> bool {
        matches!(self, WindowState::CreatedHidden | WindowState::Visible)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputWindowStatus {
    pub has_window: bool,
    pub is_visible: bool,
    pub current_display_id: Option<u32>,
    pub bounds: Option<Bounds>,
    pub is_fullscreen: bool,
}

/// Which display `create` picks when none is named and several exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPreference {
    #[default]
    Secondary,
    Primary,
    Id(u32),
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub preference: DisplayPreference,
    pub show_on_create: bool,
    /// How long a fresh window gets to attach to the channel before
    /// content is sent anyway
    pub attach_timeout: Duration,
    pub test_pattern_duration: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            preference: DisplayPreference::Secondary,
            show_on_create: true,
            attach_timeout: Duration::from_secs(2),
            test_pattern_duration: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    state: WindowState,
    display_id: Option<u32>,
    bounds: Option<Bounds>,
}

impl Snapshot {
    fn absent() -> Self {
        Self {
            state: WindowState::Absent,
            display_id: None,
            bounds: None,
        }
    }

    fn destroyed() -> Self {
        Self {
            state: WindowState::Destroyed,
            display_id: None,
            bounds: None,
        }
    }
}

type WindowSlot = Option<Box<dyn OutputWindow>>;

pub struct OutputWindowController {
    topology: DisplayTopology,
    backend: Arc<dyn WindowBackend>,
    channel: Arc<ContentBroadcaster>,
    capture: DisplayCapture,
    options: ControllerOptions,
    lifecycle: Mutex<WindowSlot>,
    snapshot: RwLock<Snapshot>,
    theme: RwLock<Theme>,
}

impl OutputWindowController {
    pub fn new(
        topology: DisplayTopology,
        backend: Arc<dyn WindowBackend>,
        channel: Arc<ContentBroadcaster>,
        capture: DisplayCapture,
        options: ControllerOptions,
    ) -> Self {
        Self {
            topology,
            backend,
            channel,
            capture,
            options,
            lifecycle: Mutex::new(None),
            snapshot: RwLock::new(Snapshot::absent()),
            theme: RwLock::new(Theme::default()),
        }
    }

    pub fn topology(&self) -> &DisplayTopology {
        &self.topology
    }

    pub fn state(&self) -> WindowState {
        self.snapshot.read().state
    }

    /// Open the output window on `display_id`, or on the preferred display.
    ///
    /// Returns `false` and leaves the state untouched when the display is not
    /// connected, the window cannot be opened, or another lifecycle
    /// transition is in flight. An existing window is re-targeted instead.
    pub async fn create(&self, display_id: Option<u32>) -> bool {
        let Ok(mut slot) = self.lifecycle.try_lock() else {
            warn!("Output window create ignored: a lifecycle transition is in flight");
            return false;
        };
        self.create_locked(&mut slot, display_id).await
    }

    async fn create_locked(&self, slot: &mut WindowSlot, display_id: Option<u32>) -> bool {
        let displays = self.topology.displays().await;
        let Some(target) = self.resolve_target(&displays, display_id) else {
            match display_id {
                Some(id) => warn!("Cannot create output window: display {} is not connected", id),
                None => warn!("Cannot create output window: no displays available"),
            }
            return false;
        };

        self.reap_dead_window(slot);
        if slot.is_some() {
            return self.move_locked(slot, &target).await;
        }

        let request = WindowRequest {
            display_id: target.id,
            bounds: target.bounds,
            visible: self.options.show_on_create,
            test_pattern: false,
        };

        let clients_before = self.channel.client_count().await;
        match self.backend.open(&request).await {
            Ok(window) => {
                *slot = Some(window);
                *self.snapshot.write() = Snapshot {
                    state: if request.visible {
                        WindowState::Visible
                    } else {
                        WindowState::CreatedHidden
                    },
                    display_id: Some(target.id),
                    bounds: Some(target.bounds),
                };
                info!(
                    "Output window created on {} ({}) at {:?}",
                    target.friendly_name, target.id, target.bounds
                );

                self.wait_for_attach(clients_before).await;
                let theme = self.theme.read().clone();
                self.channel.update_theme(ThemeUpdate::from(&theme)).await;
                true
            }
            Err(e) => {
                error!("Failed to create output window ({} backend): {}", self.backend.name(), e);
                false
            }
        }
    }

    fn resolve_target(
        &self,
        displays: &[DisplayDescriptor],
        display_id: Option<u32>,
    ) -> Option<DisplayDescriptor> {
        if let Some(id) = display_id {
            return displays.iter().find(|d| d.id == id).cloned();
        }

        if displays.len() == 1 {
            return displays.first().cloned();
        }

        let preferred = match self.options.preference {
            DisplayPreference::Secondary => secondary_of(displays),
            DisplayPreference::Primary => primary_of(displays),
            DisplayPreference::Id(id) => displays
                .iter()
                .find(|d| d.id == id)
                .or_else(|| secondary_of(displays)),
        };
        preferred.or_else(|| primary_of(displays)).cloned()
    }

    /// A new output process attaches to the channel asynchronously. Content
    /// sent before it attaches is lost, so give it a moment.
    async fn wait_for_attach(&self, clients_before: usize) {
        let deadline = tokio::time::Instant::now() + self.options.attach_timeout;
        while tokio::time::Instant::now() < deadline {
            if self.channel.client_count().await > clients_before {
                debug!("Output process attached to the content channel");
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        if !self.options.attach_timeout.is_zero() {
            warn!(
                "Output window did not attach within {:?}; first content may be dropped",
                self.options.attach_timeout
            );
        }
    }

    fn reap_dead_window(&self, slot: &mut WindowSlot) {
        if let Some(window) = slot.as_mut() {
            if !window.is_alive() {
                warn!("Output window process died; marking window destroyed");
                *slot = None;
                *self.snapshot.write() = Snapshot::destroyed();
            }
        }
    }

    pub async fn show(&self) -> bool {
        let mut slot = self.lifecycle.lock().await;
        let Some(window) = slot.as_mut() else {
            warn!("show ignored: no output window");
            return false;
        };
        match window.show().await {
            Ok(()) => {
                self.snapshot.write().state = WindowState::Visible;
                info!("Output window shown");
                true
            }
            Err(e) => {
                warn!("Failed to show output window: {}", e);
                self.reap_dead_window(&mut slot);
                false
            }
        }
    }

    pub async fn hide(&self) -> bool {
        let mut slot = self.lifecycle.lock().await;
        let Some(window) = slot.as_mut() else {
            warn!("hide ignored: no output window");
            return false;
        };
        match window.hide().await {
            Ok(()) => {
                self.snapshot.write().state = WindowState::CreatedHidden;
                info!("Output window hidden");
                true
            }
            Err(e) => {
                warn!("Failed to hide output window: {}", e);
                self.reap_dead_window(&mut slot);
                false
            }
        }
    }

    /// Release the window. Waits for any transition in flight.
    pub async fn close(&self) {
        let mut slot = self.lifecycle.lock().await;
        self.close_locked(&mut slot).await;
    }

    async fn close_locked(&self, slot: &mut WindowSlot) {
        let Some(mut window) = slot.take() else {
            debug!("close: no output window");
            return;
        };
        if let Err(e) = window.close().await {
            warn!("Output window did not close cleanly: {}", e);
        }
        *self.snapshot.write() = Snapshot::destroyed();
        info!("Output window closed");
    }

    /// Re-target the window to another display; creates it if absent.
    pub async fn move_to_display(&self, display_id: u32) -> bool {
        let Ok(mut slot) = self.lifecycle.try_lock() else {
            warn!("Output window move ignored: a lifecycle transition is in flight");
            return false;
        };

        self.reap_dead_window(&mut slot);
        if slot.is_none() {
            return self.create_locked(&mut slot, Some(display_id)).await;
        }

        let Some(target) = self.topology.by_id(display_id).await else {
            warn!("Cannot move output window: display {} is not connected", display_id);
            return false;
        };
        self.move_locked(&mut slot, &target).await
    }

    async fn move_locked(&self, slot: &mut WindowSlot, target: &DisplayDescriptor) -> bool {
        let Some(window) = slot.as_mut() else {
            return false;
        };
        match window.move_to(target.id, target.bounds).await {
            Ok(()) => {
                let mut snapshot = self.snapshot.write();
                snapshot.display_id = Some(target.id);
                snapshot.bounds = Some(target.bounds);
                info!("Output window moved to {} ({})", target.friendly_name, target.id);
                true
            }
            Err(e) => {
                warn!("Failed to move output window: {}", e);
                self.reap_dead_window(slot);
                false
            }
        }
    }

    /// Close the window if it sits on the display that just disappeared.
    pub async fn handle_display_removed(&self, display_id: u32) -> bool {
        let mut slot = self.lifecycle.lock().await;
        if self.snapshot.read().display_id != Some(display_id) {
            return false;
        }
        warn!("Target display {} was removed; closing output window", display_id);
        self.close_locked(&mut slot).await;
        true
    }

    async fn handle_metrics_changed(&self, display: &DisplayDescriptor) {
        let mut slot = self.lifecycle.lock().await;
        let current = *self.snapshot.read();
        if current.display_id == Some(display.id) && current.bounds != Some(display.bounds) {
            self.move_locked(&mut slot, display).await;
        }
    }

    /// Follow hot-plug events until the topology is dropped.
    pub fn spawn_display_monitor(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut events = self.topology.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DisplayEvent::Removed(id)) => {
                        controller.handle_display_removed(id).await;
                    }
                    Ok(DisplayEvent::MetricsChanged(display)) => {
                        controller.handle_metrics_changed(&display).await;
                    }
                    Ok(DisplayEvent::Added(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Display monitor missed {} events; re-validating target", missed);
                        if let Some(id) = controller.status().current_display_id {
                            if controller.topology.by_id(id).await.is_none() {
                                controller.handle_display_removed(id).await;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Non-blocking status snapshot.
    ///
    /// Notices a dead output process when no transition is in flight.
    pub fn status(&self) -> OutputWindowStatus {
        if self.snapshot.read().state.has_window() {
            if let Ok(mut slot) = self.lifecycle.try_lock() {
                self.reap_dead_window(&mut slot);
            }
        }

        let snapshot = *self.snapshot.read();
        let has_window = snapshot.state.has_window();
        OutputWindowStatus {
            has_window,
            is_visible: snapshot.state == WindowState::Visible,
            current_display_id: snapshot.display_id,
            bounds: snapshot.bounds,
            is_fullscreen: has_window,
        }
    }

    fn can_send(&self, what: &str) -> bool {
        if self.snapshot.read().state.has_window() {
            true
        } else {
            warn!("Dropping {}: no output window", what);
            false
        }
    }

    /// Returns the number of output processes the event reached.
    pub async fn send_content(&self, item: ContentItem, transition: Option<TransitionSpec>) -> usize {
        if !self.can_send("content-update") {
            return 0;
        }
        self.channel.send_content(item, transition).await
    }

    pub async fn clear_content(&self) -> usize {
        if !self.can_send("content-clear") {
            return 0;
        }
        self.channel.clear_content().await
    }

    pub async fn show_black(&self) -> usize {
        if !self.can_send("show-black") {
            return 0;
        }
        self.channel.show_black().await
    }

    pub async fn show_logo(&self) -> usize {
        if !self.can_send("show-logo") {
            return 0;
        }
        self.channel.show_logo().await
    }

    /// Always merged locally so a window created later starts with it.
    pub async fn update_theme(&self, update: ThemeUpdate) -> usize {
        self.theme.write().apply(&update);
        if !self.can_send("theme-update") {
            return 0;
        }
        self.channel.update_theme(update).await
    }

    pub fn theme(&self) -> Theme {
        self.theme.read().clone()
    }

    /// Make sure a visible window exists, creating one on the preferred
    /// display if needed.
    pub async fn ensure_visible(&self) -> bool {
        let state = self.status();
        if !state.has_window {
            return self.create(None).await && (self.options.show_on_create || self.show().await);
        }
        state.is_visible || self.show().await
    }

    /// Fixed-duration calibration pattern in a separate window.
    ///
    /// The test window is not tracked and never changes the status of the
    /// broadcast window.
    pub async fn test_display(&self, display_id: u32) -> bool {
        let Some(target) = self.topology.by_id(display_id).await else {
            warn!("Cannot test display {}: not connected", display_id);
            return false;
        };

        let request = WindowRequest {
            display_id,
            bounds: target.bounds,
            visible: true,
            test_pattern: true,
        };

        match self.backend.open(&request).await {
            Ok(mut window) => {
                let duration = self.options.test_pattern_duration;
                info!("Showing test pattern on {} for {:?}", target.friendly_name, duration);
                tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    if let Err(e) = window.close().await {
                        debug!("Test pattern window close: {}", e);
                    }
                });
                true
            }
            Err(e) => {
                error!("Failed to open test pattern window: {}", e);
                false
            }
        }
    }

    /// PNG thumbnail of a display; `None` if it is gone or capture fails.
    pub async fn capture_display(&self, display_id: u32) -> Option<Vec<u8>> {
        let display = self.topology.by_id(display_id).await?;
        self.capture.capture(&display.bounds).await
    }

    /// Close the window and detach every receiver.
    pub async fn shutdown(&self) {
        self.close().await;
        if let Err(e) = self.channel.stop().await {
            warn!("Content channel did not stop cleanly: {}", e);
        }
    }
}

/// Live content from the staging model: bring the window up if needed,
/// then broadcast.
#[async_trait]
impl ContentSink for OutputWindowController {
    async fn present(&self, item: &ContentItem, transition: Option<TransitionSpec>) {
        if !self.ensure_visible().await {
            warn!("Live item {} not broadcast: no output window could be opened", item.id);
            return;
        }
        self.send_content(item.clone(), transition).await;
    }

    async fn clear(&self) {
        self.clear_content().await;
    }
}
