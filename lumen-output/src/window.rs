//! Full-screen output window
//!
//! A frameless, always-on-top winit window made borderless-fullscreen on the
//! monitor that holds the placement origin. Composites are painted with egui
//! onto a wgpu surface, one egui shape pass per presented frame.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use egui::text::LayoutJob;
use egui::{Align, Color32, FontId, Painter, Pos2, Rect, Vec2};
use tracing::{debug, error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId, WindowLevel};

use lumen_content::{MediaType, ResolvedStyle, TextAlign};
use lumen_displays::Bounds;

use crate::renderer::{Composite, Layer};
use crate::surface::{Placement, Surface};
use crate::template::{Frame, Visual};

const WINDOW_TITLE: &str = "Lumen Output";

/// Body text height as a share of the screen height at font scale 1.0
const TEXT_HEIGHT: f32 = 0.055;
const TEXT_WIDTH: f32 = 0.85;
const BLOCK_GAP: f32 = 0.4;

const TEST_BARS: [Color32; 7] = [
    Color32::from_rgb(192, 192, 192),
    Color32::from_rgb(192, 192, 0),
    Color32::from_rgb(0, 192, 192),
    Color32::from_rgb(0, 192, 0),
    Color32::from_rgb(192, 0, 192),
    Color32::from_rgb(192, 0, 0),
    Color32::from_rgb(0, 0, 192),
];

/// `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(value: &str) -> Option<Color32> {
    let hex = value.trim().strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Color32::from_rgb(rgb[0], rgb[1], rgb[2]))
        }
        6 => Some(Color32::from_rgb(
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        )),
        8 => Some(Color32::from_rgba_unmultiplied(
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
            channel(hex.get(6..8)?)?,
        )),
        _ => None,
    }
}

/// Where a layer lands on `screen`.
///
/// Offsets are fractions of the screen size; scale shrinks about the centre.
pub fn layer_rect(screen: Rect, layer: &Layer) -> Rect {
    let offset = Vec2::new(
        layer.offset.0 * screen.width(),
        layer.offset.1 * screen.height(),
    );
    Rect::from_center_size(screen.center() + offset, screen.size() * layer.scale)
}

/// Index of the monitor whose bounds, in physical pixels, contain (`x`, `y`).
pub fn monitor_at(monitors: &[Bounds], x: i32, y: i32) -> Option<usize> {
    monitors.iter().position(|bounds| bounds.contains(x, y))
}

fn find_monitor(
    monitors: impl Iterator<Item = MonitorHandle>,
    placement: &Placement,
) -> Option<MonitorHandle> {
    let monitors: Vec<MonitorHandle> = monitors.collect();
    let bounds: Vec<Bounds> = monitors
        .iter()
        .map(|m| {
            let position = m.position();
            let size = m.size();
            Bounds::new(position.x, position.y, size.width, size.height)
        })
        .collect();
    monitor_at(&bounds, placement.x, placement.y).map(|i| monitors[i].clone())
}

fn faded(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

/// Local path behind an image reference; remote URLs are not fetched.
fn local_image_path(url: &str) -> Option<&Path> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(Path::new(path));
    }
    if url.contains("://") {
        return None;
    }
    Some(Path::new(url))
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("Failed to create render surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("No graphics adapter for the output surface"))?;
        info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Lumen Output Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("Failed to create graphics device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("Render surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }
}

pub struct WinitSurface {
    window: Arc<Window>,
    gpu: Gpu,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    placement: Placement,
    last: Option<Composite>,
    /// `None` marks an image that failed to load, so it is not retried
    images: HashMap<String, Option<egui::TextureHandle>>,
    closed: bool,
}

impl WinitSurface {
    pub fn open(event_loop: &ActiveEventLoop, placement: Placement, visible: bool) -> Result<Self> {
        let monitor = find_monitor(event_loop.available_monitors(), &placement);
        if monitor.is_none() {
            warn!(
                "No monitor at ({}, {}); using the primary monitor",
                placement.x, placement.y
            );
        }
        let monitor = monitor.or_else(|| event_loop.primary_monitor());

        let attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_decorations(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_visible(visible)
            .with_position(PhysicalPosition::new(placement.x, placement.y))
            .with_inner_size(PhysicalSize::new(
                placement.width.max(1),
                placement.height.max(1),
            ))
            .with_fullscreen(Some(Fullscreen::Borderless(monitor)));

        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create output window")?,
        );
        window.set_cursor_visible(false);

        let gpu = Gpu::new(window.clone())?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let size = window.inner_size();
        info!(
            "Output window on display {} ({}x{}){}",
            placement.display_id,
            size.width,
            size.height,
            if visible { "" } else { " (hidden)" }
        );

        Ok(Self {
            window,
            gpu,
            egui_ctx,
            egui_state,
            placement,
            last: None,
            images: HashMap::new(),
            closed: false,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size.width, size.height);
        self.window.request_redraw();
    }

    /// Draw the last composite again, after an expose or resize.
    pub fn redraw(&mut self) {
        if let Some(composite) = self.last.take() {
            self.draw(&composite);
            self.last = Some(composite);
        }
    }

    fn draw(&mut self, composite: &Composite) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        self.egui_ctx.begin_pass(raw_input);
        self.paint(composite);
        let full_output = self.egui_ctx.end_pass();
        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                debug!("Render surface outdated, reconfiguring");
                self.gpu.resize(size.width, size.height);
                self.window.request_redraw();
                return;
            }
            Err(e) => {
                error!("Render surface error: {:?}", e);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let gpu = &mut self.gpu;
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Output Encoder"),
            });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, delta);
        }
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Output Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut render_pass = render_pass.forget_lifetime();
            gpu.egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn paint(&mut self, composite: &Composite) {
        let ctx = self.egui_ctx.clone();
        let painter = ctx.layer_painter(egui::LayerId::background());
        let screen = ctx.screen_rect();
        painter.rect_filled(screen, 0.0, Color32::BLACK);

        for layer in &composite.layers {
            self.paint_layer(&painter, screen, layer);
        }
    }

    fn paint_layer(&mut self, painter: &Painter, screen: Rect, layer: &Layer) {
        let rect = layer_rect(screen, layer);
        let frame = &layer.frame;
        let opacity = layer.opacity;

        let background = parse_color(&frame.style.background_color).unwrap_or(Color32::BLACK);
        painter.rect_filled(rect, 0.0, faded(background, opacity));
        if let Some(url) = &frame.style.background_image {
            self.paint_image(painter, rect, url, opacity, false);
        }

        match &frame.visual {
            Visual::Placeholder | Visual::Black => {}
            Visual::Logo { url } => {
                if let Some(url) = url {
                    let inner = Rect::from_center_size(rect.center(), rect.size() * 0.5);
                    self.paint_image(painter, inner, url, opacity, true);
                }
            }
            Visual::Media {
                url, media_type, ..
            } => match media_type {
                MediaType::Image => self.paint_image(painter, rect, url, opacity, true),
                MediaType::Video | MediaType::Audio => {
                    // No decoder on this surface; show what would play
                    paint_text(painter, rect, frame, &[(url.clone(), 0.6)], opacity);
                }
            },
            Visual::TestPattern {
                display_id,
                width,
                height,
            } => {
                paint_test_bars(painter, rect, opacity);
                let label = format!("Display {}\n{} x {}", display_id, width, height);
                paint_text(painter, rect, frame, &[(label, 1.4)], opacity);
            }
            visual => paint_text(painter, rect, frame, &text_blocks(visual), opacity),
        }
    }

    fn paint_image(&mut self, painter: &Painter, rect: Rect, url: &str, opacity: f32, fit: bool) {
        let Some(texture) = self.texture(url) else {
            return;
        };
        let size = texture.size_vec2();
        let target = if fit && size.x > 0.0 && size.y > 0.0 {
            let scale = (rect.width() / size.x).min(rect.height() / size.y);
            Rect::from_center_size(rect.center(), size * scale)
        } else {
            rect
        };
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        painter.image(texture.id(), target, uv, faded(Color32::WHITE, opacity));
    }

    fn texture(&mut self, url: &str) -> Option<egui::TextureHandle> {
        if let Some(cached) = self.images.get(url) {
            return cached.clone();
        }

        let loaded = match load_image(url) {
            Ok(image) => Some(
                self.egui_ctx
                    .load_texture(url, image, egui::TextureOptions::LINEAR),
            ),
            Err(e) => {
                warn!("Cannot show image {}: {:#}", url, e);
                None
            }
        };
        self.images.insert(url.to_string(), loaded.clone());
        loaded
    }
}

fn load_image(url: &str) -> Result<egui::ColorImage> {
    let path = local_image_path(url).ok_or_else(|| anyhow!("remote images are not fetched"))?;
    let image = image::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

/// Text for the text templates, each with its size relative to body text.
fn text_blocks(visual: &Visual) -> Vec<(String, f32)> {
    let mut blocks = Vec::new();
    let mut push = |text: Option<&String>, size: f32| {
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            blocks.push((text.clone(), size));
        }
    };

    match visual {
        Visual::Scripture {
            reference,
            text,
            translation,
        } => {
            push(Some(text), 1.0);
            push(Some(reference), 0.6);
            push(translation.as_ref(), 0.45);
        }
        Visual::Song {
            title,
            lines,
            artist,
            verse_label,
        } => {
            push(Some(title), 0.5);
            push(Some(&lines.join("\n")), 1.0);
            push(artist.as_ref(), 0.4);
            push(verse_label.as_ref(), 0.4);
        }
        Visual::Announcement {
            title,
            subtitle,
            content,
            category,
        } => {
            push(category.as_ref(), 0.4);
            push(Some(title), 1.3);
            push(subtitle.as_ref(), 0.8);
            push(Some(content), 0.8);
        }
        Visual::Slide {
            title,
            subtitle,
            content,
        } => {
            push(Some(title), 1.4);
            push(subtitle.as_ref(), 0.9);
            push(Some(content), 0.9);
        }
        _ => {}
    }
    blocks
}

fn paint_text(painter: &Painter, rect: Rect, frame: &Frame, blocks: &[(String, f32)], opacity: f32) {
    let style: &ResolvedStyle = &frame.style;
    let color = faded(
        parse_color(&style.text_color).unwrap_or(Color32::WHITE),
        opacity,
    );
    let base = rect.height() * TEXT_HEIGHT * style.font_scale;
    if base <= 0.0 {
        return;
    }
    let wrap = rect.width() * TEXT_WIDTH;
    let margin = rect.width() * (1.0 - TEXT_WIDTH) / 2.0;
    let (halign, x) = match style.text_align {
        TextAlign::Left => (Align::LEFT, rect.left() + margin),
        TextAlign::Center => (Align::Center, rect.center().x),
        TextAlign::Right => (Align::RIGHT, rect.right() - margin),
    };

    let galleys: Vec<_> = blocks
        .iter()
        .map(|(text, size)| {
            let font = if style.font_family.eq_ignore_ascii_case("monospace") {
                FontId::monospace(base * size)
            } else {
                FontId::proportional(base * size)
            };
            let mut job = LayoutJob::simple(text.clone(), font, color, wrap);
            job.halign = halign;
            painter.layout_job(job)
        })
        .collect();
    if galleys.is_empty() {
        return;
    }

    let gap = base * BLOCK_GAP;
    let total: f32 = galleys.iter().map(|g| g.size().y).sum::<f32>()
        + gap * (galleys.len() - 1) as f32;
    let mut y = rect.center().y - total / 2.0;
    for galley in galleys {
        let height = galley.size().y;
        painter.galley(Pos2::new(x, y), galley, color);
        y += height + gap;
    }
}

fn paint_test_bars(painter: &Painter, rect: Rect, opacity: f32) {
    let width = rect.width() / TEST_BARS.len() as f32;
    for (i, color) in TEST_BARS.iter().enumerate() {
        let left = rect.left() + width * i as f32;
        let bar = Rect::from_min_max(
            Pos2::new(left, rect.top()),
            Pos2::new(left + width, rect.bottom()),
        );
        painter.rect_filled(bar, 0.0, faded(*color, opacity));
    }
}

impl Surface for WinitSurface {
    fn present(&mut self, composite: &Composite) {
        if self.closed {
            return;
        }
        self.draw(composite);
        self.last = Some(composite.clone());
    }

    fn set_visible(&mut self, visible: bool) {
        info!("Output window {}", if visible { "shown" } else { "hidden" });
        self.window.set_visible(visible);
        if visible {
            self.window.request_redraw();
        }
    }

    fn place(&mut self, placement: Placement) {
        let monitor = find_monitor(self.window.available_monitors(), &placement);
        info!(
            "Output window moved to display {} at ({}, {})",
            placement.display_id, placement.x, placement.y
        );
        if monitor.is_none() {
            warn!(
                "No monitor at ({}, {}); keeping the current one",
                placement.x, placement.y
            );
        }
        let monitor = monitor.or_else(|| self.window.current_monitor());
        self.window
            .set_outer_position(PhysicalPosition::new(placement.x, placement.y));
        self.window
            .set_fullscreen(Some(Fullscreen::Borderless(monitor)));
        self.placement = placement;
        self.window.request_redraw();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.window.set_visible(false);
        info!(
            "Output window on display {} closed",
            self.placement.display_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_content::Theme;

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#ffffff"), Some(Color32::WHITE));
        assert_eq!(parse_color("#000"), Some(Color32::BLACK));
        assert_eq!(parse_color(" #1e90ff "), Some(Color32::from_rgb(30, 144, 255)));
        assert_eq!(
            parse_color("#ff000080"),
            Some(Color32::from_rgba_unmultiplied(255, 0, 0, 128))
        );
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#gg0000"), None);
    }

    #[test]
    fn test_monitor_at_picks_containing_bounds() {
        let monitors = [
            Bounds::new(0, 0, 1920, 1080),
            Bounds::new(1920, 0, 1920, 1080),
            Bounds::new(-1280, 0, 1280, 1024),
        ];
        assert_eq!(monitor_at(&monitors, 1920, 0), Some(1));
        assert_eq!(monitor_at(&monitors, 100, 100), Some(0));
        assert_eq!(monitor_at(&monitors, -1280, 0), Some(2));
        assert_eq!(monitor_at(&monitors, 3840, 0), None);
        assert_eq!(monitor_at(&[], 0, 0), None);
    }

    #[test]
    fn test_layer_rect_applies_offset_and_scale() {
        let screen = Rect::from_min_size(Pos2::ZERO, Vec2::new(1000.0, 500.0));
        let frame = Frame::placeholder(&Theme::default());

        let full = layer_rect(screen, &Layer::full(frame.clone()));
        assert_eq!(full, screen);

        let slid = Layer {
            offset: (0.5, 0.0),
            ..Layer::full(frame.clone())
        };
        assert_eq!(layer_rect(screen, &slid).left(), 500.0);

        let zoomed = Layer {
            scale: 0.5,
            ..Layer::full(frame)
        };
        let rect = layer_rect(screen, &zoomed);
        assert_eq!(rect.size(), Vec2::new(500.0, 250.0));
        assert_eq!(rect.center(), screen.center());
    }

    #[test]
    fn test_text_blocks_skip_empty_fields() {
        let blocks = text_blocks(&Visual::Slide {
            title: "Welcome".to_string(),
            subtitle: Some("  ".to_string()),
            content: String::new(),
        });
        assert_eq!(blocks, vec![("Welcome".to_string(), 1.4)]);

        let blocks = text_blocks(&Visual::Scripture {
            reference: "John 3:16".to_string(),
            text: "For God so loved the world".to_string(),
            translation: Some("KJV".to_string()),
        });
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].0, "For God so loved the world");
    }

    #[test]
    fn test_only_local_images_load() {
        assert_eq!(
            local_image_path("file:///srv/logo.png"),
            Some(Path::new("/srv/logo.png"))
        );
        assert_eq!(local_image_path("logo.png"), Some(Path::new("logo.png")));
        assert_eq!(local_image_path("https://example.org/logo.png"), None);
        assert!(load_image("/nonexistent/lumen-logo.png").is_err());
    }
}
