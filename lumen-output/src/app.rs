//! winit application driving an [`OutputLoop`] over a [`WinitSurface`]
//!
//! Channel events and window commands reach the event loop as user events
//! through an `EventLoopProxy`. The window only exists once the loop has
//! resumed, so anything that arrives earlier is replayed afterwards.

use std::time::{Duration, Instant};

use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::WindowId;

use crate::renderer::ContentRenderer;
use crate::runtime::{LoopEvent, OutputLoop};
use crate::surface::{Placement, Surface};
use crate::window::WinitSurface;

pub struct OutputApp {
    placement: Placement,
    visible: bool,
    test_pattern: bool,
    frame_interval: Duration,
    output: Option<OutputLoop<WinitSurface>>,
    pending: Vec<LoopEvent>,
    failure: Option<anyhow::Error>,
}

impl OutputApp {
    pub fn new(placement: Placement, visible: bool, frame_interval: Duration) -> Self {
        Self {
            placement,
            visible,
            test_pattern: false,
            frame_interval,
            output: None,
            pending: Vec::new(),
            failure: None,
        }
    }

    pub fn with_test_pattern(mut self) -> Self {
        self.test_pattern = true;
        self
    }

    /// Why the window could not be opened, if it could not.
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: LoopEvent) {
        let Some(output) = &mut self.output else {
            self.pending.push(event);
            return;
        };

        if output.handle(event, Instant::now()).is_break() {
            event_loop.exit();
        } else if output.needs_frame() {
            output.surface().request_redraw();
        }
    }
}

impl ApplicationHandler<LoopEvent> for OutputApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.output.is_some() {
            return;
        }

        let surface = match WinitSurface::open(event_loop, self.placement, self.visible) {
            Ok(surface) => surface,
            Err(e) => {
                error!("Failed to open output window: {:#}", e);
                self.failure = Some(e);
                event_loop.exit();
                return;
            }
        };

        let mut output = OutputLoop::new(ContentRenderer::default(), surface)
            .with_frame_interval(self.frame_interval);
        if self.test_pattern {
            output = output.with_test_pattern(self.placement);
        }
        output.surface().request_redraw();
        self.output = Some(output);

        for event in std::mem::take(&mut self.pending) {
            self.dispatch(event_loop, event);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: LoopEvent) {
        self.dispatch(event_loop, event);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(output) = &mut self.output else {
            return;
        };
        if output.surface().window_id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Output window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => output.surface_mut().resize(size),
            WindowEvent::RedrawRequested => {
                if output.frame(Instant::now()).is_none() {
                    output.surface_mut().redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(output) = &self.output else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        if output.needs_frame() {
            output.surface().request_redraw();
            event_loop.set_control_flow(ControlFlow::WaitUntil(
                Instant::now() + output.frame_interval(),
            ));
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(output) = &mut self.output {
            output.surface_mut().close();
        }
    }
}
