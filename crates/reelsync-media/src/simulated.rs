//! Deterministic in-memory media backend.
//!
//! Simulated sources run off a shared [`SimClock`] that only moves when the
//! host advances it, so playback, hand-off and recording can be driven
//! tick by tick without real decoding.

use parking_lot::Mutex;
use reelsync_core::frame::BLACK;
use reelsync_core::{FrameBuffer, ReelsyncError, Rgba, SharedFrameBuffer, Size};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::ingest::{DurationProbe, IngestedMedia, MediaIngest, MediaInfo, MediaResource, ProbeResolver};
use crate::source::{MediaSource, StartError};

// ── Clock ───────────────────────────────────────────────────────

/// A manually advanced clock shared by every simulated source.
#[derive(Debug, Clone, Default)]
pub struct SimClock(Arc<Mutex<f64>>);

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock reading in seconds.
    pub fn now(&self) -> f64 {
        *self.0.lock()
    }

    /// Move the clock forward. Negative or non-finite steps are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            *self.0.lock() += seconds;
        }
    }
}

// ── Media description ───────────────────────────────────────────

/// What a simulated resource looks like once probed.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedMedia {
    /// Reported duration. A non-finite value makes the probe fail.
    pub duration: f64,
    /// Frame size; `None` for audio-only media.
    pub size: Option<Size>,
    /// Every frame is a solid fill of this color.
    pub color: Rgba,
    /// Constant sample value emitted while playing; `None` for silent media.
    pub audio_level: Option<f32>,
    /// Whether the source starts out ready.
    pub ready: bool,
}

impl SimulatedMedia {
    /// A 640×360 video with audio.
    pub fn video(duration: f64) -> Self {
        Self {
            duration,
            size: Some(Size::new(640, 360)),
            color: [128, 128, 128, 255],
            audio_level: Some(0.25),
            ready: true,
        }
    }

    /// An audio-only resource.
    pub fn audio(duration: f64) -> Self {
        Self {
            duration,
            size: None,
            color: BLACK,
            audio_level: Some(0.25),
            ready: true,
        }
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_audio_level(mut self, level: Option<f32>) -> Self {
        self.audio_level = level;
        self
    }

    /// Start out not ready (as if still buffering).
    pub fn buffering(mut self) -> Self {
        self.ready = false;
        self
    }

    fn info(&self) -> reelsync_core::Result<MediaInfo> {
        MediaInfo::new(self.duration, self.size, self.audio_level.is_some())
    }

    fn clamped_duration(&self) -> f64 {
        if self.duration.is_finite() {
            self.duration.max(0.0)
        } else {
            0.0
        }
    }
}

// ── Source ──────────────────────────────────────────────────────

#[derive(Debug)]
struct SimState {
    position: f64,
    /// Clock reading when the source last started or was repositioned.
    anchor: Option<f64>,
    ready: bool,
    pending_rejection: Option<StartError>,
    play_calls: usize,
    seek_calls: usize,
}

impl SimState {
    fn local_time(&self, now: f64, duration: f64) -> f64 {
        match self.anchor {
            Some(anchor) => (self.position + (now - anchor)).min(duration),
            None => self.position,
        }
    }
}

/// A simulated source handle.
pub struct SimulatedSource {
    media: SimulatedMedia,
    clock: SimClock,
    state: Arc<Mutex<SimState>>,
    frame: Option<SharedFrameBuffer>,
}

impl SimulatedSource {
    pub fn new(media: SimulatedMedia, clock: SimClock) -> Self {
        let state = SimState {
            position: 0.0,
            anchor: None,
            ready: media.ready,
            pending_rejection: None,
            play_calls: 0,
            seek_calls: 0,
        };
        Self {
            media,
            clock,
            state: Arc::new(Mutex::new(state)),
            frame: None,
        }
    }

    /// A handle for observing and steering this source from outside.
    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            state: Arc::clone(&self.state),
            clock: self.clock.clone(),
            duration: self.media.clamped_duration(),
        }
    }
}

impl MediaSource for SimulatedSource {
    fn local_time(&self) -> f64 {
        self.state
            .lock()
            .local_time(self.clock.now(), self.media.clamped_duration())
    }

    fn seek(&mut self, t: f64) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.position = t.clamp(0.0, self.media.clamped_duration());
        state.seek_calls += 1;
        if state.anchor.is_some() {
            state.anchor = Some(now);
        }
    }

    fn play(&mut self) -> Result<(), StartError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.play_calls += 1;
        if let Some(err) = state.pending_rejection.take() {
            return Err(err);
        }
        if state.anchor.is_none() {
            state.anchor = Some(now);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let now = self.clock.now();
        let duration = self.media.clamped_duration();
        let mut state = self.state.lock();
        state.position = state.local_time(now, duration);
        state.anchor = None;
    }

    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn is_playing(&self) -> bool {
        self.state.lock().anchor.is_some()
    }

    fn native_size(&self) -> Option<Size> {
        self.media.size
    }

    fn current_frame(&mut self) -> Option<SharedFrameBuffer> {
        if !self.is_ready() {
            return None;
        }
        let size = self.media.size?;
        let frame = self.frame.get_or_insert_with(|| {
            Arc::new(FrameBuffer::filled(size.width, size.height, self.media.color))
        });
        Some(Arc::clone(frame))
    }

    fn read_audio(&mut self, out: &mut [f32]) -> usize {
        let Some(level) = self.media.audio_level else {
            return 0;
        };
        if !self.is_playing() || self.local_time() >= self.media.clamped_duration() {
            return 0;
        }
        out.fill(level);
        out.len()
    }
}

/// External view of a [`SimulatedSource`].
#[derive(Debug, Clone)]
pub struct SimulatedHandle {
    state: Arc<Mutex<SimState>>,
    clock: SimClock,
    duration: f64,
}

impl SimulatedHandle {
    pub fn local_time(&self) -> f64 {
        self.state.lock().local_time(self.clock.now(), self.duration)
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().anchor.is_some()
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    /// Make the next `play()` fail with `err`.
    pub fn reject_next_play(&self, err: StartError) {
        self.state.lock().pending_rejection = Some(err);
    }

    /// Jump the source's own clock, as a drifting decoder would.
    pub fn drift_to(&self, t: f64) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.position = t.clamp(0.0, self.duration);
        if state.anchor.is_some() {
            state.anchor = Some(now);
        }
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    pub fn seek_calls(&self) -> usize {
        self.state.lock().seek_calls
    }
}

// ── Ingest ──────────────────────────────────────────────────────

/// Ingests resources from an in-memory catalog keyed by resource name.
#[derive(Default)]
pub struct SimulatedIngest {
    clock: SimClock,
    catalog: Mutex<HashMap<String, SimulatedMedia>>,
    handles: Mutex<HashMap<String, SimulatedHandle>>,
    defer_probes: AtomicBool,
    pending: Mutex<Vec<(ProbeResolver, reelsync_core::Result<MediaInfo>)>>,
}

impl SimulatedIngest {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Add or replace a catalog entry.
    pub fn insert(&self, name: impl Into<String>, media: SimulatedMedia) {
        self.catalog.lock().insert(name.into(), media);
    }

    /// Hold probe results back until [`SimulatedIngest::resolve_pending`].
    pub fn defer_probes(&self, defer: bool) {
        self.defer_probes.store(defer, Ordering::Relaxed);
    }

    /// Complete every held-back probe. Returns how many were completed.
    pub fn resolve_pending(&self) -> usize {
        let pending: Vec<_> = self.pending.lock().drain(..).collect();
        let count = pending.len();
        for (resolver, result) in pending {
            resolver.resolve(result);
        }
        count
    }

    /// Handle of the most recently ingested source with this name.
    pub fn handle(&self, name: &str) -> Option<SimulatedHandle> {
        self.handles.lock().get(name).cloned()
    }
}

impl MediaIngest for SimulatedIngest {
    fn ingest(&self, resource: &MediaResource) -> IngestedMedia {
        let entry = self.catalog.lock().get(&resource.name).cloned();
        let (media, result) = match entry {
            Some(media) => {
                let info = media.info();
                (media, info)
            }
            None => {
                let media = SimulatedMedia {
                    duration: 0.0,
                    size: None,
                    color: BLACK,
                    audio_level: None,
                    ready: false,
                };
                let err = ReelsyncError::unreadable(format!("unknown resource: {}", resource.name));
                (media, Err(err))
            }
        };

        let source = SimulatedSource::new(media, self.clock.clone());
        self.handles
            .lock()
            .insert(resource.name.clone(), source.handle());

        let probe = if self.defer_probes.load(Ordering::Relaxed) {
            let (resolver, probe) = DurationProbe::channel();
            self.pending.lock().push((resolver, result));
            probe
        } else {
            DurationProbe::ready(result)
        };
        debug!(name = %resource.name, "Simulated resource ingested");

        IngestedMedia {
            source: Box::new(source),
            probe,
        }
    }
}
