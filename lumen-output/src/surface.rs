//! Where composites end up
//!
//! [`Surface`] is the seam between the renderer and whatever draws pixels.
//! The window surface lives in [`crate::window`]; [`LogSurface`] records and
//! logs what it is asked to show, which is what headless deployments and
//! tests use.

use serde::Serialize;
use tracing::{debug, info};

use crate::renderer::Composite;

/// Full-screen placement on one display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub display_id: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

pub trait Surface {
    fn present(&mut self, composite: &Composite);
    fn set_visible(&mut self, visible: bool);
    fn place(&mut self, placement: Placement);
    fn close(&mut self);
}

pub struct LogSurface {
    placement: Placement,
    visible: bool,
    closed: bool,
    frames_presented: u64,
    last: Option<Composite>,
}

impl LogSurface {
    pub fn new(placement: Placement, visible: bool) -> Self {
        info!(
            "Output surface on display {} at ({}, {}) {}x{}{}",
            placement.display_id,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
            if visible { "" } else { " (hidden)" }
        );
        Self {
            placement,
            visible,
            closed: false,
            frames_presented: 0,
            last: None,
        }
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn last(&self) -> Option<&Composite> {
        self.last.as_ref()
    }
}

impl Surface for LogSurface {
    fn present(&mut self, composite: &Composite) {
        self.frames_presented += 1;

        let newly_settled = composite.is_settled()
            && self
                .last
                .as_ref()
                .map_or(true, |last| !last.is_settled() || last.generation != composite.generation);

        if newly_settled {
            if let Some(top) = composite.top() {
                match serde_json::to_string(&top.frame) {
                    Ok(json) => info!("Showing {}", json),
                    Err(_) => info!("Showing {}", top.frame.item_id),
                }
            }
        } else {
            debug!(
                "Frame {} (generation {}, {} layers)",
                self.frames_presented,
                composite.generation,
                composite.layers.len()
            );
        }

        self.last = Some(composite.clone());
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            info!("Output surface {}", if visible { "shown" } else { "hidden" });
        }
        self.visible = visible;
    }

    fn place(&mut self, placement: Placement) {
        info!(
            "Output surface moved to display {} at ({}, {}) {}x{}",
            placement.display_id, placement.x, placement.y, placement.width, placement.height
        );
        self.placement = placement;
    }

    fn close(&mut self) {
        self.closed = true;
        info!("Output surface closed after {} frames", self.frames_presented);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Frame;
    use lumen_content::Theme;

    fn placement() -> Placement {
        Placement {
            display_id: 2,
            x: 1920,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn test_records_last_composite() {
        let mut surface = LogSurface::new(placement(), true);
        assert!(surface.last().is_none());

        let composite = Composite::single(3, Frame::placeholder(&Theme::default()));
        surface.present(&composite);
        surface.present(&composite);

        assert_eq!(surface.frames_presented(), 2);
        assert_eq!(surface.last(), Some(&composite));
    }

    #[test]
    fn test_visibility_and_placement() {
        let mut surface = LogSurface::new(placement(), false);
        assert!(!surface.is_visible());
        surface.set_visible(true);
        assert!(surface.is_visible());

        let moved = Placement {
            display_id: 1,
            x: 0,
            ..placement()
        };
        surface.place(moved);
        assert_eq!(surface.placement(), moved);

        surface.close();
        assert!(surface.is_closed());
    }
}
