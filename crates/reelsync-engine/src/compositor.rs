//! Per-tick compositing onto the output surface.
//!
//! Z-order is fixed: cleared background, then the active clip (cropped,
//! stretched and filtered), then the overlay with its border.

use reelsync_audio::SourceKey;
use reelsync_core::frame::{BLACK, WHITE};
use reelsync_core::{FrameBuffer, Rect, Size};
use reelsync_effects::{draw_stretched, stroke_rect, VisualFilter};
use reelsync_timeline::Playlist;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::registry::SourceRegistry;

/// Smallest crop extent in surface pixels.
pub const MIN_CROP_EXTENT: f32 = 50.0;
/// Overlay width as a fraction of the surface width.
pub const OVERLAY_WIDTH_FRACTION: f32 = 0.3;
/// Overlay distance from the top-right corner.
pub const OVERLAY_MARGIN: f32 = 20.0;
pub const OVERLAY_BORDER_WIDTH: f32 = 2.0;

/// Crop rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropArea {
    pub enabled: bool,
    pub rect: Rect,
}

impl CropArea {
    /// Disabled, covering the whole surface.
    pub fn full(surface: Size) -> Self {
        Self {
            enabled: false,
            rect: Rect::full(surface),
        }
    }
}

/// Initial overlay placement: 30% of the surface width, source aspect
/// preserved, top-right corner.
pub fn default_overlay_rect(surface: Size, native: Size) -> Option<Rect> {
    let aspect = native.inverse_aspect()?;
    let width = surface.width as f32 * OVERLAY_WIDTH_FRACTION;
    let height = width * aspect;
    Some(Rect::new(
        surface.width as f32 - width - OVERLAY_MARGIN,
        OVERLAY_MARGIN,
        width,
        height,
    ))
}

/// Map a surface-space crop onto a source frame of size `native`.
pub fn crop_source_rect(crop: Rect, surface: Size, native: Size) -> Rect {
    if surface.is_empty() {
        return Rect::full(native);
    }
    let sx = native.width as f32 / surface.width as f32;
    let sy = native.height as f32 / surface.height as f32;
    crop.scale(sx, sy)
}

pub struct Compositor {
    size: Size,
    surface: FrameBuffer,
    filter: VisualFilter,
    crop: CropArea,
    overlay: Option<Rect>,
    frames_rendered: u64,
}

impl Compositor {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            surface: FrameBuffer::new(size.width, size.height),
            filter: VisualFilter::None,
            crop: CropArea::full(size),
            overlay: None,
            frames_rendered: 0,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// The most recently rendered surface.
    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    pub fn filter(&self) -> VisualFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: VisualFilter) {
        self.filter = filter;
    }

    pub fn crop(&self) -> CropArea {
        self.crop
    }

    pub fn set_crop_enabled(&mut self, enabled: bool) {
        self.crop.enabled = enabled;
    }

    /// Replace the crop rectangle, forced inside the surface with each side
    /// at least [`MIN_CROP_EXTENT`]. Non-finite rectangles are ignored.
    pub fn set_crop_rect(&mut self, rect: Rect) -> Rect {
        if rect.is_finite() {
            self.crop.rect = rect.clamp_within(self.size, MIN_CROP_EXTENT);
        }
        self.crop.rect
    }

    pub fn overlay_rect(&self) -> Option<Rect> {
        self.overlay
    }

    /// Place the overlay at its default position for a source of `native`
    /// size. An empty size leaves no overlay rectangle.
    pub fn place_overlay(&mut self, native: Size) -> Option<Rect> {
        self.overlay = default_overlay_rect(self.size, native);
        self.overlay
    }

    /// Move (and optionally resize) the overlay, keeping it on the surface.
    /// An overlay larger than the surface is shrunk to fit first.
    pub fn set_overlay_rect(&mut self, rect: Rect) -> Option<Rect> {
        if rect.is_finite() && rect.width >= 0.0 && rect.height >= 0.0 {
            let fitted = Rect::new(
                rect.x,
                rect.y,
                rect.width.min(self.size.width as f32),
                rect.height.min(self.size.height as f32),
            );
            self.overlay = Some(fitted.clamp_position(self.size));
        }
        self.overlay
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    /// Render the frame for `time`.
    pub fn render(
        &mut self,
        playlist: &Playlist,
        sources: &mut SourceRegistry,
        time: f64,
    ) -> &FrameBuffer {
        self.surface.fill(BLACK);
        let target = Rect::full(self.size);

        if let Some(pos) = playlist.resolve_clip_at(time) {
            if let Some(source) = sources.get_mut(SourceKey::Clip(pos.clip_id)) {
                let frame = if source.is_ready() {
                    source.current_frame()
                } else {
                    None
                };
                if let Some(frame) = frame {
                    let native = frame.size();
                    let region = if self.crop.enabled {
                        crop_source_rect(self.crop.rect, self.size, native)
                    } else {
                        Rect::full(native)
                    };
                    draw_stretched(&mut self.surface, target, &frame, region);
                    self.filter.apply(&mut self.surface);
                }
            }
        }

        if let Some(rect) = self.overlay.filter(|r| r.width > 0.0) {
            if let Some(source) = sources.get_mut(SourceKey::Overlay) {
                if source.is_ready() {
                    stroke_rect(&mut self.surface, rect, OVERLAY_BORDER_WIDTH, WHITE);
                    if let Some(frame) = source.current_frame() {
                        let full = Rect::full(frame.size());
                        draw_stretched(&mut self.surface, rect, &frame, full);
                    }
                }
            }
        }

        self.frames_rendered += 1;
        trace!(time, frame = self.frames_rendered, "Composited");
        &self.surface
    }
}
