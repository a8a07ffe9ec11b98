//! The output process event loop
//!
//! Channel events feed the renderer, window commands drive the surface, and
//! a frame ticker presents while anything is changing. The loop ends on a
//! `close` command or when the command stream ends.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::info;

use lumen_broadcaster::{OutputEvent, WindowCommand};

use crate::renderer::{Composite, ContentRenderer};
use crate::surface::{Placement, Surface};
use crate::template::Frame;

/// Roughly 60 frames per second while animating
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Both input streams merged into one, for drivers that own a single queue
#[derive(Debug, Clone)]
pub enum LoopEvent {
    Output(OutputEvent),
    Command(WindowCommand),
    /// stdin closed; the operator is gone
    CommandsEnded,
}

pub struct OutputLoop<S: Surface> {
    renderer: ContentRenderer,
    surface: S,
    frame_interval: Duration,
    /// Shown instead of content in test-pattern mode
    pinned: Option<Frame>,
    dirty: bool,
}

impl<S: Surface> OutputLoop<S> {
    pub fn new(renderer: ContentRenderer, surface: S) -> Self {
        Self {
            renderer,
            surface,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            pinned: None,
            dirty: true,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Show a test pattern for `placement` and ignore content.
    pub fn with_test_pattern(mut self, placement: Placement) -> Self {
        self.pinned = Some(Frame::test_pattern(
            placement.display_id,
            placement.width,
            placement.height,
        ));
        self
    }

    pub fn renderer(&self) -> &ContentRenderer {
        &self.renderer
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Whether the next `frame` call would present.
    pub fn needs_frame(&self) -> bool {
        self.dirty || self.renderer.is_animating()
    }

    /// Feed one merged event; `Break` means the loop should stop.
    pub fn handle(&mut self, event: LoopEvent, now: Instant) -> ControlFlow<()> {
        match event {
            LoopEvent::Output(event) => {
                self.handle_event(event, now);
                ControlFlow::Continue(())
            }
            LoopEvent::Command(command) => {
                let flow = self.handle_command(command);
                if flow.is_break() {
                    info!("Close requested");
                }
                flow
            }
            LoopEvent::CommandsEnded => {
                info!("Command stream ended");
                ControlFlow::Break(())
            }
        }
    }

    pub fn handle_event(&mut self, event: OutputEvent, now: Instant) {
        if self.pinned.is_some() {
            return;
        }
        self.dirty |= self.renderer.apply(event, now);
    }

    pub fn handle_command(&mut self, command: WindowCommand) -> ControlFlow<()> {
        match command {
            WindowCommand::Show => {
                self.surface.set_visible(true);
                self.dirty = true;
            }
            WindowCommand::Hide => self.surface.set_visible(false),
            WindowCommand::Move {
                display_id,
                x,
                y,
                width,
                height,
            } => {
                self.surface.place(Placement {
                    display_id,
                    x,
                    y,
                    width,
                    height,
                });
                self.dirty = true;
            }
            WindowCommand::Close => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Present if anything changed since the last frame.
    pub fn frame(&mut self, now: Instant) -> Option<Composite> {
        if !self.needs_frame() {
            return None;
        }
        self.dirty = false;

        let composite = match &self.pinned {
            Some(pattern) => Composite::single(0, pattern.clone()),
            None => self.renderer.tick(now),
        };
        self.surface.present(&composite);
        Some(composite)
    }

    /// Run until closed and hand back the surface.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<OutputEvent>,
        mut commands: mpsc::UnboundedReceiver<WindowCommand>,
    ) -> S {
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    self.handle_event(event, Instant::now());
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            info!("Close requested");
                            break;
                        }
                    }
                    None => {
                        info!("Command stream ended");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.frame(Instant::now());
                }
            }
        }

        self.surface.close();
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::LogSurface;
    use crate::template::Visual;
    use lumen_content::ContentItem;

    fn placement() -> Placement {
        Placement {
            display_id: 2,
            x: 1920,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }

    fn output_loop() -> OutputLoop<LogSurface> {
        OutputLoop::new(ContentRenderer::default(), LogSurface::new(placement(), true))
    }

    #[test]
    fn test_frames_only_when_dirty() {
        let mut output = output_loop();
        let now = Instant::now();
        assert!(output.frame(now).is_some());
        assert!(output.frame(now).is_none());

        output.handle_event(OutputEvent::ShowBlack, now);
        assert!(output.frame(now).is_some());
    }

    #[test]
    fn test_commands_drive_surface() {
        let mut output = output_loop();
        assert!(output.handle_command(WindowCommand::Hide).is_continue());
        assert!(!output.surface().is_visible());

        let moved = WindowCommand::Move {
            display_id: 1,
            x: 0,
            y: 0,
            width: 1280,
            height: 720,
        };
        assert!(output.handle_command(moved).is_continue());
        assert_eq!(output.surface().placement().width, 1280);

        assert!(output.handle_command(WindowCommand::Close).is_break());
    }

    #[test]
    fn test_pattern_ignores_content() {
        let mut output = output_loop().with_test_pattern(placement());
        let now = Instant::now();
        output.handle_event(
            OutputEvent::ContentUpdate {
                item: ContentItem::slide("Ignored", ""),
                transition: None,
            },
            now,
        );

        let composite = output.frame(now).unwrap();
        assert!(matches!(
            composite.top().unwrap().frame.visual,
            Visual::TestPattern { display_id: 2, .. }
        ));
        assert!(output.renderer().current_item().is_none());
    }

    #[test]
    fn test_merged_events_drive_the_loop() {
        let mut output = output_loop();
        let now = Instant::now();
        output.frame(now);
        assert!(!output.needs_frame());

        let flow = output.handle(LoopEvent::Output(OutputEvent::ShowBlack), now);
        assert!(flow.is_continue());
        assert!(output.needs_frame());

        let flow = output.handle(LoopEvent::Command(WindowCommand::Hide), now);
        assert!(flow.is_continue());
        assert!(!output.surface().is_visible());

        assert!(output.handle(LoopEvent::CommandsEnded, now).is_break());
    }

    #[tokio::test]
    async fn test_run_ends_when_commands_close() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(output_loop().run(event_rx, command_rx));
        event_tx.send(OutputEvent::ShowLogo).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        command_tx.send(WindowCommand::Close).unwrap();

        let surface = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(surface.is_closed());
        assert!(surface.frames_presented() > 0);
    }
}
