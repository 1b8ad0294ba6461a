//! Integration tests for compositing: filters, crop and overlay.

use reelsync_audio::SourceKey;
use reelsync_core::frame::WHITE;
use reelsync_core::{FrameBuffer, Rect, Rgba, SharedFrameBuffer, Size};
use reelsync_effects::VisualFilter;
use reelsync_engine::{Compositor, SourceRegistry};
use reelsync_media::{MediaResource, MediaSource, SimulatedMedia, StartError};
use reelsync_timeline::{Clip, Playlist};
use std::sync::Arc;

use crate::support::Studio;

const SAMPLE: Rgba = [200, 100, 50, 255];

// ── Helpers ────────────────────────────────────────────────────

/// A still source whose left half is `left` and right half is `right`.
struct SplitSource {
    frame: SharedFrameBuffer,
}

impl SplitSource {
    fn new(width: u32, height: u32, left: Rgba, right: Rgba) -> Self {
        let mut frame = FrameBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let color = if x < width / 2 { left } else { right };
                frame.set_pixel(x, y, color);
            }
        }
        Self {
            frame: Arc::new(frame),
        }
    }
}

impl MediaSource for SplitSource {
    fn local_time(&self) -> f64 {
        0.0
    }

    fn seek(&mut self, _t: f64) {}

    fn play(&mut self) -> Result<(), StartError> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn is_ready(&self) -> bool {
        true
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn native_size(&self) -> Option<Size> {
        Some(self.frame.size())
    }

    fn current_frame(&mut self) -> Option<SharedFrameBuffer> {
        Some(Arc::clone(&self.frame))
    }
}

fn assert_close(actual: Option<Rgba>, expected: Rgba) {
    let actual = actual.expect("pixel inside surface");
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (*a as i32 - e as i32).abs() <= 1,
            "got {actual:?}, expected {expected:?}"
        );
    }
}

fn filtered_sample(filter: VisualFilter) -> Option<Rgba> {
    let (mut studio, _) = Studio::new();
    studio.clip("sample", SimulatedMedia::video(2.0).with_color(SAMPLE));
    studio.session.set_filter(filter);
    studio.step();
    studio.session.surface().pixel(32, 18)
}

// ── Filters ────────────────────────────────────────────────────

#[test]
fn filters_match_css_reference_values() {
    let cases: [(VisualFilter, Rgba); 8] = [
        (VisualFilter::None, SAMPLE),
        (VisualFilter::Grayscale, [118, 118, 118, 255]),
        (VisualFilter::Sepia, [165, 147, 114, 255]),
        (VisualFilter::Invert, [55, 155, 205, 255]),
        (VisualFilter::Brightness, [240, 120, 60, 255]),
        (VisualFilter::Contrast, [236, 86, 11, 255]),
        (VisualFilter::HueRotate, [50, 146, 35, 255]),
        // a uniform frame is unchanged by blurring
        (VisualFilter::Blur, SAMPLE),
    ];
    for (filter, expected) in cases {
        assert_close(filtered_sample(filter), expected);
    }
}

#[test]
fn filter_names_round_trip_through_session() {
    let (mut studio, _) = Studio::new();
    for filter in VisualFilter::ALL {
        let applied = studio.session.set_filter_by_name(filter.name()).unwrap();
        assert_eq!(applied, filter);
    }
    assert_eq!(
        studio.session.set_filter_by_name("hue-rotate(90deg)").unwrap(),
        VisualFilter::HueRotate
    );
}

// ── Crop ───────────────────────────────────────────────────────

#[test]
fn crop_samples_scaled_source_region() {
    let red = [255, 0, 0, 255];
    let blue = [0, 0, 255, 255];
    let mut playlist = Playlist::new();
    let id = playlist.add(Clip::with_duration("split", 5.0));
    let mut sources = SourceRegistry::new();
    sources.register(
        SourceKey::Clip(id),
        Box::new(SplitSource::new(320, 180, red, blue)),
    );

    let mut compositor = Compositor::new(Size::new(160, 90));
    let frame = compositor.render(&playlist, &mut sources, 1.0);
    assert_eq!(frame.pixel(10, 45), Some(red));
    assert_eq!(frame.pixel(150, 45), Some(blue));

    // right half of the surface maps to the right half of the source
    compositor.set_crop_rect(Rect::new(80.0, 0.0, 80.0, 90.0));
    compositor.set_crop_enabled(true);
    let frame = compositor.render(&playlist, &mut sources, 1.0);
    assert_eq!(frame.pixel(0, 0), Some(blue));
    assert_eq!(frame.pixel(159, 89), Some(blue));

    compositor.set_crop_enabled(false);
    let frame = compositor.render(&playlist, &mut sources, 1.0);
    assert_eq!(frame.pixel(10, 45), Some(red));
}

#[test]
fn crop_rect_is_kept_on_surface() {
    let (mut studio, _) = Studio::new();
    let applied = studio.session.set_crop(Rect::new(-10.0, 30.0, 10.0, 10.0));
    assert_eq!(applied, Rect::new(0.0, 0.0, 50.0, 36.0));
    assert!(!studio.session.crop().enabled);
}

// ── Overlay ────────────────────────────────────────────────────

#[test]
fn overlay_border_is_drawn_above_filtered_clip() {
    let (mut studio, _) = Studio::new();
    studio.clip("clip", SimulatedMedia::video(3.0).with_color([255, 0, 0, 255]));
    studio.ingest.insert(
        "pip",
        SimulatedMedia::video(3.0)
            .with_size(160, 90)
            .with_color([0, 0, 255, 255]),
    );
    studio.session.load_overlay(&MediaResource::named("pip"));
    studio.session.set_overlay_rect(Rect::new(30.0, 10.0, 20.0, 10.0));
    studio.session.set_filter(VisualFilter::Grayscale);
    studio.step();

    let surface = studio.session.surface();
    // border straddles the overlay edge
    assert_eq!(surface.pixel(29, 15), Some(WHITE));
    // overlay content is not filtered
    assert_eq!(surface.pixel(40, 15), Some([0, 0, 255, 255]));
    // clip underneath is
    let clip = surface.pixel(5, 5).unwrap();
    assert_eq!(clip[0], clip[1]);
    assert_eq!(clip[1], clip[2]);
}

#[test]
fn overlay_not_drawn_until_ready() {
    let (mut studio, _) = Studio::new();
    studio.clip("clip", SimulatedMedia::video(3.0).with_color([255, 0, 0, 255]));
    studio
        .ingest
        .insert("pip", SimulatedMedia::video(3.0).buffering());
    studio.session.load_overlay(&MediaResource::named("pip"));
    assert!(studio.session.overlay_rect().is_some());
    studio.step();
    let rect = studio.session.overlay_rect().unwrap();
    let inside = studio
        .session
        .surface()
        .pixel(rect.x as u32 + 2, rect.y as u32 + 2);
    assert_eq!(inside, Some([255, 0, 0, 255]));
}

#[test]
fn empty_timeline_renders_background() {
    let (mut studio, _) = Studio::new();
    studio.step();
    assert_eq!(
        studio.session.surface().pixel(0, 0),
        Some(reelsync_core::frame::BLACK)
    );
}
