//! Output-side content state machine
//!
//! Turns channel events into what the surface should show at a given
//! instant. Every visible change bumps a generation token; a transition only
//! completes for the generation that started it, so a late completion from
//! a superseded animation never clobbers newer content.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use lumen_broadcaster::OutputEvent;
use lumen_content::{ContentItem, Theme, ThemeUpdate, TransitionKind, TransitionSpec};

use crate::template::{layout, Frame};

/// Scale a zooming layer starts from
const ZOOM_FROM: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererState {
    /// Showing the placeholder
    Idle,
    Rendering,
    Black,
    Logo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlay {
    Black,
    Logo,
}

#[derive(Debug, Clone)]
struct ActiveTransition {
    generation: u64,
    spec: TransitionSpec,
    started: Instant,
    outgoing: Frame,
}

impl ActiveTransition {
    fn progress(&self, now: Instant) -> f32 {
        let duration = Duration::from_millis(self.spec.duration_ms);
        if duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// One frame placed on the surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub frame: Frame,
    pub opacity: f32,
    /// Translation as a fraction of the surface size
    pub offset: (f32, f32),
    pub scale: f32,
}

impl Layer {
    pub fn full(frame: Frame) -> Self {
        Self {
            frame,
            opacity: 1.0,
            offset: (0.0, 0.0),
            scale: 1.0,
        }
    }
}

/// Layers to draw bottom to top
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composite {
    pub generation: u64,
    pub layers: Vec<Layer>,
}

impl Composite {
    pub fn single(generation: u64, frame: Frame) -> Self {
        Self {
            generation,
            layers: vec![Layer::full(frame)],
        }
    }

    /// The layer that ends up on screen once any transition finishes.
    pub fn top(&self) -> Option<&Layer> {
        self.layers.last()
    }

    pub fn is_settled(&self) -> bool {
        self.layers.len() == 1
    }
}

pub struct ContentRenderer {
    theme: Theme,
    /// Underlying content; `None` while idle
    content: Option<ContentItem>,
    frame: Frame,
    overlay: Option<Overlay>,
    transition: Option<ActiveTransition>,
    generation: u64,
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl ContentRenderer {
    pub fn new(theme: Theme) -> Self {
        let frame = Frame::placeholder(&theme);
        Self {
            theme,
            content: None,
            frame,
            overlay: None,
            transition: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> RendererState {
        match (self.overlay, &self.content) {
            (Some(Overlay::Black), _) => RendererState::Black,
            (Some(Overlay::Logo), _) => RendererState::Logo,
            (None, Some(_)) => RendererState::Rendering,
            (None, None) => RendererState::Idle,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// The content under any overlay.
    pub fn current_item(&self) -> Option<&ContentItem> {
        self.content.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Apply one channel event. Returns whether anything visible changed.
    pub fn apply(&mut self, event: OutputEvent, now: Instant) -> bool {
        match event {
            OutputEvent::ContentUpdate { item, transition } => {
                self.show_content(item, transition, now)
            }
            OutputEvent::ContentClear => self.clear(now),
            OutputEvent::ShowBlack => self.show_overlay(Overlay::Black, now),
            OutputEvent::ShowLogo => self.show_overlay(Overlay::Logo, now),
            OutputEvent::ThemeUpdate { theme } => self.update_theme(&theme),
        }
    }

    /// Replace the content, leaving any overlay.
    ///
    /// Re-sending what is already on screen changes nothing.
    pub fn show_content(
        &mut self,
        item: ContentItem,
        transition: Option<TransitionSpec>,
        now: Instant,
    ) -> bool {
        if self.overlay.is_none() {
            if let Some(current) = &self.content {
                if current.same_content(&item) {
                    debug!("Content {} already on screen", item.id);
                    self.frame.item_id = item.id.clone();
                    self.content = Some(item);
                    return false;
                }
            }
        }

        let spec = transition.unwrap_or(self.theme.transition);
        let outgoing = self.visible_frame();

        info!("Rendering {} {}", item.kind(), item.id);
        self.overlay = None;
        self.frame = layout(&item, &self.theme);
        self.content = Some(item);
        self.begin(spec, outgoing, now);
        true
    }

    /// Back to the placeholder, leaving any overlay.
    pub fn clear(&mut self, now: Instant) -> bool {
        if self.content.is_none() && self.overlay.is_none() {
            return false;
        }

        let outgoing = self.visible_frame();
        info!("Content cleared");
        self.overlay = None;
        self.content = None;
        self.frame = Frame::placeholder(&self.theme);
        self.begin(self.theme.transition, outgoing, now);
        true
    }

    pub fn show_black(&mut self, now: Instant) -> bool {
        self.show_overlay(Overlay::Black, now)
    }

    pub fn show_logo(&mut self, now: Instant) -> bool {
        self.show_overlay(Overlay::Logo, now)
    }

    fn show_overlay(&mut self, overlay: Overlay, now: Instant) -> bool {
        if self.overlay == Some(overlay) {
            return false;
        }

        let outgoing = self.visible_frame();
        info!("Overlay {:?} on", overlay);
        self.overlay = Some(overlay);

        // Overlays always cross-fade, at the theme's pace
        let spec = if self.theme.transition.is_instant() {
            TransitionSpec::none()
        } else {
            TransitionSpec::fade(self.theme.transition.duration_ms)
        };
        self.begin(spec, outgoing, now);
        true
    }

    /// Merge a partial theme and re-lay out what is showing.
    pub fn update_theme(&mut self, update: &ThemeUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        self.theme.apply(update);
        self.frame = match &self.content {
            Some(item) => layout(item, &self.theme),
            None => Frame::placeholder(&self.theme),
        };
        debug!("Theme updated");
        true
    }

    fn begin(&mut self, spec: TransitionSpec, outgoing: Frame, now: Instant) {
        self.generation += 1;
        self.transition = if spec.is_instant() {
            None
        } else {
            Some(ActiveTransition {
                generation: self.generation,
                spec,
                started: now,
                outgoing,
            })
        };
    }

    /// Finish the transition started for `generation`.
    ///
    /// Returns `false` when that transition was already superseded.
    pub fn complete_transition(&mut self, generation: u64) -> bool {
        match &self.transition {
            Some(t) if t.generation == generation => {
                self.transition = None;
                true
            }
            _ => {
                debug!("Ignoring completion for stale generation {}", generation);
                false
            }
        }
    }

    fn visible_frame(&self) -> Frame {
        match self.overlay {
            Some(Overlay::Black) => Frame::black(),
            Some(Overlay::Logo) => Frame::logo(&self.theme),
            None => self.frame.clone(),
        }
    }

    /// What to draw at `now`. Finishes the running transition once its
    /// time is up.
    pub fn tick(&mut self, now: Instant) -> Composite {
        let incoming = self.visible_frame();

        let Some(transition) = &self.transition else {
            return Composite::single(self.generation, incoming);
        };

        let progress = transition.progress(now);
        if progress >= 1.0 {
            let generation = transition.generation;
            self.complete_transition(generation);
            return Composite::single(self.generation, incoming);
        }

        let p = transition.spec.easing.apply(progress);
        let outgoing = transition.outgoing.clone();

        let (out_layer, in_layer) = match transition.spec.kind {
            TransitionKind::Fade | TransitionKind::None => (
                Layer {
                    opacity: 1.0 - p,
                    ..Layer::full(outgoing)
                },
                Layer {
                    opacity: p,
                    ..Layer::full(incoming)
                },
            ),
            TransitionKind::Slide => {
                let (dx, dy) = transition.spec.direction().entry_vector();
                (
                    Layer {
                        opacity: 1.0 - p,
                        offset: (-dx * p, -dy * p),
                        ..Layer::full(outgoing)
                    },
                    Layer {
                        opacity: p,
                        offset: (dx * (1.0 - p), dy * (1.0 - p)),
                        ..Layer::full(incoming)
                    },
                )
            }
            TransitionKind::Zoom => (
                Layer {
                    opacity: 1.0 - p,
                    ..Layer::full(outgoing)
                },
                Layer {
                    opacity: p,
                    scale: ZOOM_FROM + (1.0 - ZOOM_FROM) * p,
                    ..Layer::full(incoming)
                },
            ),
        };

        Composite {
            generation: self.generation,
            layers: vec![out_layer, in_layer],
        }
    }
}
