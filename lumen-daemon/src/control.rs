//! Operator control surface
//!
//! One object per process wiring the output window controller, the
//! staging model and the queue together. The IPC server and `main` only
//! ever talk to this.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

use lumen_content::{ContentItem, ThemeUpdate, TransitionSpec, Verse};
use lumen_displays::DisplayDescriptor;

use crate::controller::{OutputWindowController, OutputWindowStatus};
use crate::queue::{AutoAdvance, ContentQueue};
use crate::staging::{PresentationState, StagingModel};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueView {
    pub items: Vec<ContentItem>,
    pub cursor: isize,
    pub playing: bool,
}

#[derive(Default)]
struct QueueState {
    queue: ContentQueue,
    playing: bool,
    /// Bumped on every play and stop; a timer shot from an older run is stale
    run: u64,
}

pub struct ControlSurface {
    controller: Arc<OutputWindowController>,
    staging: Mutex<StagingModel>,
    queue: Mutex<QueueState>,
    auto_advance: AutoAdvance,
    auto_advance_delay: Option<Duration>,
    shutdown: Notify,
}

impl ControlSurface {
    pub fn new(
        controller: Arc<OutputWindowController>,
        history_limit: usize,
        default_transition: Option<TransitionSpec>,
        auto_advance_delay: Option<Duration>,
    ) -> Self {
        let staging = StagingModel::new(controller.clone(), history_limit)
            .with_transition(default_transition);

        Self {
            controller,
            staging: Mutex::new(staging),
            queue: Mutex::new(QueueState::default()),
            auto_advance: AutoAdvance::new(),
            auto_advance_delay,
            shutdown: Notify::new(),
        }
    }

    pub fn controller(&self) -> &Arc<OutputWindowController> {
        &self.controller
    }

    // Output window

    pub async fn create_output(&self, display_id: Option<u32>) -> bool {
        self.controller.create(display_id).await
    }

    pub async fn move_output(&self, display_id: u32) -> bool {
        self.controller.move_to_display(display_id).await
    }

    pub async fn show_output(&self) {
        self.controller.show().await;
    }

    pub async fn hide_output(&self) {
        self.controller.hide().await;
    }

    pub async fn close_output(&self) {
        self.controller.close().await;
    }

    pub fn output_status(&self) -> OutputWindowStatus {
        self.controller.status()
    }

    pub async fn displays(&self) -> Vec<DisplayDescriptor> {
        self.controller.topology().displays().await
    }

    pub async fn capture_display(&self, display_id: u32) -> Option<Vec<u8>> {
        self.controller.capture_display(display_id).await
    }

    pub async fn test_display(&self, display_id: u32) -> bool {
        self.controller.test_display(display_id).await
    }

    // Direct channel operations, bypassing staging

    pub async fn send_content(&self, item: ContentItem, transition: Option<TransitionSpec>) {
        self.controller.send_content(item, transition).await;
    }

    pub async fn clear_content(&self) {
        self.controller.clear_content().await;
    }

    pub async fn show_black(&self) {
        self.controller.show_black().await;
    }

    pub async fn show_logo(&self) {
        self.controller.show_logo().await;
    }

    pub async fn update_theme(&self, update: ThemeUpdate) {
        self.controller.update_theme(update).await;
    }

    // Staging

    pub async fn set_preview(&self, item: ContentItem) {
        self.staging.lock().await.set_preview(item);
    }

    pub async fn promote(&self) -> ContentItem {
        self.staging.lock().await.promote().await
    }

    pub async fn clear_preview(&self) {
        self.staging.lock().await.clear_preview();
    }

    pub async fn clear_live(&self) {
        self.staging.lock().await.clear_live().await;
    }

    pub async fn send_verse_to_preview(&self, verse: &Verse) {
        self.staging.lock().await.send_verse_to_preview(verse);
    }

    pub async fn send_verse_to_live(&self, verse: &Verse) -> ContentItem {
        self.staging.lock().await.send_verse_to_live(verse).await
    }

    pub async fn stage(&self, item: ContentItem) -> bool {
        self.staging.lock().await.stage(item)
    }

    pub async fn unstage(&self, id: &str) -> bool {
        self.staging.lock().await.unstage(id)
    }

    pub async fn stage_to_preview(&self, id: &str) -> bool {
        self.staging.lock().await.stage_to_preview(id)
    }

    pub async fn presentation_state(&self) -> PresentationState {
        self.staging.lock().await.snapshot()
    }

    // Queue

    pub async fn queue_add(&self, item: ContentItem) {
        let mut state = self.queue.lock().await;
        self.stop_locked(&mut state);
        state.queue.add(item);
    }

    pub async fn queue_remove(&self, id: &str) -> bool {
        let mut state = self.queue.lock().await;
        self.stop_locked(&mut state);
        state.queue.remove(id)
    }

    pub async fn queue_move(&self, from: usize, to: usize) -> bool {
        let mut state = self.queue.lock().await;
        self.stop_locked(&mut state);
        state.queue.move_item(from, to)
    }

    pub async fn queue_clear(&self) {
        let mut state = self.queue.lock().await;
        self.stop_locked(&mut state);
        state.queue.clear();
    }

    pub async fn queue_next(&self) -> Option<ContentItem> {
        let item = {
            let mut state = self.queue.lock().await;
            self.stop_locked(&mut state);
            state.queue.next().cloned()
        };
        self.preview_queue_item(item).await
    }

    pub async fn queue_previous(&self) -> Option<ContentItem> {
        let item = {
            let mut state = self.queue.lock().await;
            self.stop_locked(&mut state);
            state.queue.previous().cloned()
        };
        self.preview_queue_item(item).await
    }

    pub async fn queue_jump(&self, index: usize) -> Option<ContentItem> {
        let item = {
            let mut state = self.queue.lock().await;
            self.stop_locked(&mut state);
            state.queue.jump(index).cloned()
        };
        self.preview_queue_item(item).await
    }

    async fn preview_queue_item(&self, item: Option<ContentItem>) -> Option<ContentItem> {
        let item = item?;
        self.staging.lock().await.set_preview(item.clone());
        Some(item)
    }

    /// Start auto-advance with `interval`, or the configured default.
    pub async fn queue_play(self: &Arc<Self>, interval: Option<Duration>) -> bool {
        let Some(delay) = interval.or(self.auto_advance_delay) else {
            debug!("queue_play ignored: no auto-advance interval configured");
            return false;
        };

        let mut state = self.queue.lock().await;
        if state.queue.is_at_end() {
            return false;
        }
        state.playing = true;
        state.run += 1;
        info!("Queue auto-advance every {:?}", delay);
        self.arm_next(delay, state.run);
        true
    }

    pub async fn queue_stop(&self) {
        let mut state = self.queue.lock().await;
        self.stop_locked(&mut state);
    }

    fn stop_locked(&self, state: &mut QueueState) {
        if state.playing {
            info!("Queue auto-advance stopped");
        }
        state.playing = false;
        state.run += 1;
        self.auto_advance.cancel();
    }

    fn arm_next(self: &Arc<Self>, delay: Duration, run: u64) {
        let surface = Arc::clone(self);
        self.auto_advance
            .arm(delay, move || async move { surface.auto_advance_fired(delay, run).await });
    }

    async fn auto_advance_fired(self: &Arc<Self>, delay: Duration, run: u64) {
        // Staging before queue: navigation stops the run under the queue lock
        // and only then waits for staging, so a stop that lands while this
        // shot waits is seen below.
        let mut staging = self.staging.lock().await;

        let (item, keep_playing) = {
            let mut state = self.queue.lock().await;
            if !state.playing || state.run != run {
                debug!("Auto-advance shot from a stopped run ignored");
                return;
            }
            let item = state.queue.next().cloned();
            state.playing = !state.queue.is_at_end();
            (item, state.playing)
        };

        if let Some(item) = item {
            staging.set_preview(item);
            staging.promote().await;
        }
        drop(staging);

        let state = self.queue.lock().await;
        if !keep_playing {
            info!("Queue auto-advance reached the last item");
        } else if state.playing && state.run == run {
            self.arm_next(delay, run);
        } else {
            debug!("Queue stopped during auto-advance; not re-arming");
        }
    }

    pub async fn queue_view(&self) -> QueueView {
        let state = self.queue.lock().await;
        QueueView {
            items: state.queue.items().to_vec(),
            cursor: state.queue.cursor(),
            playing: state.playing,
        }
    }

    // Process lifecycle

    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }

    pub async fn shutdown(&self) {
        self.auto_advance.cancel();
        self.controller.shutdown().await;
    }
}
