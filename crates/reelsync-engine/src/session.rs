//! The editor session: one object owning the timeline, every source and the
//! render/record pipeline.
//!
//! Presentation layers drive it with commands (or the typed methods) and
//! call [`EditorSession::tick`] once per frame.

use reelsync_audio::{AudioGraph, Channel, SourceKey};
use reelsync_core::{Action, ActionLog, ClipId, FrameBuffer, ReelsyncError, Rect, Result};
use reelsync_effects::VisualFilter;
use reelsync_media::{
    ArtifactSink, CaptureBackend, CaptureSettings, DurationProbe, IngestedMedia, MediaIngest,
    MediaInfo, MediaResource,
};
use reelsync_timeline::{Clip, Playlist, TrimBound};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::command::{ChannelGains, Command, OverlaySnapshot, SessionSnapshot};
use crate::compositor::{Compositor, CropArea};
use crate::config::EngineConfig;
use crate::controller::{loop_time, PlaybackController, PlaybackState, Transport};
use crate::recording::{Recorder, SavedRecording};
use crate::registry::SourceRegistry;
use crate::synchronizer::{synchronize, SyncReport};

/// Longest stretch of audio pulled in a single tick.
const MAX_PUMP_SECONDS: f64 = 0.25;

/// The pluggable parts of a session.
pub struct Collaborators {
    pub ingest: Arc<dyn MediaIngest>,
    pub capture: Box<dyn CaptureBackend>,
    pub artifacts: Arc<dyn ArtifactSink>,
    pub actions: Arc<dyn ActionLog>,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    pub time: f64,
    pub state: PlaybackState,
    /// Present when the synchronizer ran.
    pub sync: Option<SyncReport>,
    pub probes_resolved: usize,
    pub samples_mixed: usize,
    pub frame_captured: bool,
    pub auto_stopped: bool,
}

/// A loaded overlay or external audio track.
#[derive(Debug, Clone)]
struct AuxTrack {
    name: String,
    duration: f64,
}

pub struct EditorSession {
    config: EngineConfig,
    playlist: Playlist,
    sources: SourceRegistry,
    probes: Vec<(SourceKey, DurationProbe)>,
    audio: AudioGraph,
    controller: PlaybackController,
    compositor: Compositor,
    recorder: Recorder,
    overlay: Option<AuxTrack>,
    external: Option<AuxTrack>,
    ingest: Arc<dyn MediaIngest>,
    actions: Arc<dyn ActionLog>,
    last_tick: Option<f64>,
    ticks: u64,
}

impl EditorSession {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            ingest,
            capture,
            artifacts,
            actions,
        } = collaborators;

        let size = config.surface.size();
        let spec = config.audio.spec();
        let mut settings = CaptureSettings::new(size, spec);
        settings.fps = config.recording.frame_rate();

        let audio = AudioGraph::new(spec, config.audio.ring_capacity, config.audio.limiter);
        actions.log(
            Action::AppOpened,
            json!({
                "surface": { "width": size.width, "height": size.height },
                "capture": capture.name(),
            }),
        );
        info!(
            width = size.width,
            height = size.height,
            capture = capture.name(),
            "Editor session created"
        );

        Self {
            playlist: Playlist::new(),
            sources: SourceRegistry::new(),
            probes: Vec::new(),
            audio,
            controller: PlaybackController::new(),
            compositor: Compositor::new(size),
            recorder: Recorder::new(capture, settings, artifacts),
            overlay: None,
            external: None,
            ingest,
            actions,
            last_tick: None,
            ticks: 0,
            config,
        }
    }

    fn with_transport<R>(
        &mut self,
        f: impl FnOnce(&mut PlaybackController, &mut Transport<'_>) -> R,
    ) -> R {
        let mut transport = Transport {
            playlist: &self.playlist,
            sources: &mut self.sources,
            audio: &mut self.audio,
            overlay_duration: self.overlay.as_ref().map_or(0.0, |o| o.duration),
        };
        f(&mut self.controller, &mut transport)
    }

    fn ingest_source(&mut self, key: SourceKey, resource: &MediaResource) {
        let IngestedMedia { source, probe } = self.ingest.ingest(resource);
        if self.sources.register(key, source).is_some() {
            debug!(?key, "Replaced existing source");
        }
        self.probes.retain(|(k, _)| *k != key);
        self.probes.push((key, probe));
    }

    // ── Probes ──────────────────────────────────────────────────

    /// Apply every finished duration probe. Returns how many finished.
    fn poll_probes(&mut self) -> usize {
        let mut finished = Vec::new();
        self.probes.retain(|(key, probe)| match probe.poll() {
            Some(result) => {
                finished.push((*key, result));
                false
            }
            None => true,
        });
        let count = finished.len();
        for (key, result) in finished {
            self.apply_probe(key, result);
        }
        count
    }

    fn apply_probe(&mut self, key: SourceKey, result: Result<MediaInfo>) {
        let info = match result {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(?key, "Probe failed, treating duration as zero: {e}");
                None
            }
        };
        let duration = info.as_ref().map_or(0.0, |i| i.duration);

        match key {
            SourceKey::Clip(id) => {
                if self.playlist.set_duration(id, duration).is_ok() {
                    debug!(clip = %id, duration, "Clip duration resolved");
                }
            }
            SourceKey::Overlay => {
                if let Some(track) = self.overlay.as_mut() {
                    track.duration = duration;
                }
                let native = info.and_then(|i| i.size).or_else(|| {
                    self.sources
                        .get(SourceKey::Overlay)
                        .and_then(|s| s.native_size())
                });
                match native.and_then(|size| self.compositor.place_overlay(size)) {
                    Some(rect) => debug!(?rect, "Overlay placed"),
                    None => {
                        self.compositor.clear_overlay();
                        warn!("Overlay has no frame size, not drawn");
                    }
                }
            }
            SourceKey::External => {
                if let Some(track) = self.external.as_mut() {
                    track.duration = duration;
                }
            }
        }
    }

    // ── Playlist ────────────────────────────────────────────────

    /// Append a clip for `resource`. Its duration is zero until the probe
    /// finishes.
    pub fn add_clip(&mut self, resource: &MediaResource) -> ClipId {
        let was_empty = self.playlist.is_empty();
        let id = self.playlist.add(Clip::pending(resource.name.clone()));
        self.ingest_source(SourceKey::Clip(id), resource);
        self.actions
            .log(Action::AddClip, json!({ "name": resource.name, "clipId": id }));
        if was_empty {
            self.actions.log(Action::SelectClip, json!({ "clipId": id }));
        }
        self.poll_probes();
        self.with_transport(|c, tr| c.playlist_changed(tr));
        id
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Result<()> {
        let clip = self.playlist.remove(id)?;
        let key = SourceKey::Clip(id);
        if let Some(mut source) = self.sources.unregister(key) {
            source.pause();
        }
        self.audio.disconnect(key);
        self.probes.retain(|(k, _)| *k != key);
        self.actions
            .log(Action::RemoveClip, json!({ "name": clip.name, "clipId": id }));
        self.with_transport(|c, tr| c.playlist_changed(tr));
        Ok(())
    }

    pub fn select_clip(&mut self, id: ClipId) -> Result<()> {
        self.playlist.select(id)?;
        self.actions.log(Action::SelectClip, json!({ "clipId": id }));
        Ok(())
    }

    /// Set a trim bound. Returns the applied value, or `None` when the value
    /// was rejected (non-finite or collapsing the clip).
    pub fn set_trim(&mut self, id: ClipId, bound: TrimBound, value: f64) -> Result<Option<f64>> {
        let applied = self.playlist.set_trim(id, bound, value)?;
        let action = match bound {
            TrimBound::Start => Action::TrimStart,
            TrimBound::End => Action::TrimEnd,
        };
        self.actions.log(
            action,
            json!({ "clipId": id, "value": value, "applied": applied.is_some() }),
        );
        if applied.is_some() {
            self.with_transport(|c, tr| c.playlist_changed(tr));
        }
        Ok(applied)
    }

    // ── Playback ────────────────────────────────────────────────

    pub fn play(&mut self) -> bool {
        let started = self.with_transport(|c, tr| c.play(tr));
        if started {
            self.actions
                .log(Action::Play, json!({ "time": self.controller.current_time() }));
        }
        started
    }

    /// Stop playback. Pausing a recording ends (and saves) it.
    pub fn pause(&mut self) -> Result<()> {
        if self.controller.state() == PlaybackState::Recording {
            self.stop_recording()?;
            return Ok(());
        }
        let previous = self.with_transport(|c, tr| c.pause(tr));
        if previous == PlaybackState::Playing {
            self.actions
                .log(Action::Pause, json!({ "time": self.controller.current_time() }));
        }
        Ok(())
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        if self.controller.is_playing() {
            self.pause()
        } else {
            self.play();
            Ok(())
        }
    }

    /// Seek the timeline; returns the clamped time actually applied.
    pub fn seek(&mut self, t: f64) -> Option<f64> {
        let applied = self.with_transport(|c, tr| c.seek(tr, t));
        if let Some(time) = applied {
            self.actions.log(Action::Seek, json!({ "time": time }));
        }
        applied
    }

    /// Start a scrub gesture. Ignored on an empty timeline.
    pub fn begin_scrub(&mut self) -> bool {
        if self.playlist.total_duration() <= 0.0 {
            return false;
        }
        self.with_transport(|c, tr| c.begin_scrub(tr));
        self.actions
            .log(Action::Scrub, json!({ "time": self.controller.current_time() }));
        true
    }

    pub fn scrub_to(&mut self, t: f64) -> Option<f64> {
        self.with_transport(|c, tr| c.scrub_to(tr, t))
    }

    pub fn end_scrub(&mut self) -> PlaybackState {
        self.with_transport(|c, tr| c.end_scrub(tr))
    }

    // ── Effects and layers ──────────────────────────────────────

    pub fn set_filter(&mut self, filter: VisualFilter) {
        self.compositor.set_filter(filter);
        self.actions
            .log(Action::ApplyFilter, json!({ "filter": filter.name(), "css": filter.css() }));
    }

    /// Select a filter by name (`"sepia"`, `"hue-rotate"`, ...).
    pub fn set_filter_by_name(&mut self, name: &str) -> Result<VisualFilter> {
        let filter: VisualFilter = name
            .parse()
            .map_err(|_| ReelsyncError::InvalidParameter(format!("unknown filter: {name}")))?;
        self.set_filter(filter);
        Ok(filter)
    }

    /// Replace the crop rectangle; returns the clamped rectangle.
    pub fn set_crop(&mut self, rect: Rect) -> Rect {
        let before = self.compositor.crop().rect;
        let applied = self.compositor.set_crop_rect(rect);
        let resized = before.width != applied.width || before.height != applied.height;
        let action = if resized {
            Action::CropResize
        } else {
            Action::CropMove
        };
        self.actions.log(action, json!({ "rect": applied }));
        applied
    }

    pub fn set_crop_enabled(&mut self, enabled: bool) {
        self.compositor.set_crop_enabled(enabled);
        let action = if enabled {
            Action::CropEnable
        } else {
            Action::CropDisable
        };
        self.actions.log(action, json!({}));
    }

    /// Move the overlay. Ignored until an overlay has been loaded.
    pub fn set_overlay_rect(&mut self, rect: Rect) -> Option<Rect> {
        if self.overlay.is_none() {
            debug!("No overlay loaded, move ignored");
            return None;
        }
        let applied = self.compositor.set_overlay_rect(rect);
        self.actions.log(Action::MoveOverlay, json!({ "rect": applied }));
        applied
    }

    /// Load (or replace) the looping overlay layer.
    pub fn load_overlay(&mut self, resource: &MediaResource) {
        self.compositor.clear_overlay();
        self.overlay = Some(AuxTrack {
            name: resource.name.clone(),
            duration: 0.0,
        });
        self.ingest_source(SourceKey::Overlay, resource);
        self.actions.log(Action::AddOverlay, json!({ "name": resource.name }));
        self.poll_probes();

        if self.controller.is_playing() {
            let duration = self.overlay.as_ref().map_or(0.0, |o| o.duration);
            self.audio.connect(SourceKey::Overlay);
            self.sources.seek(
                SourceKey::Overlay,
                loop_time(self.controller.current_time(), duration),
            );
            self.sources.start(SourceKey::Overlay);
        }
    }

    /// Load (or replace) the external audio track.
    pub fn load_external_audio(&mut self, resource: &MediaResource) {
        self.external = Some(AuxTrack {
            name: resource.name.clone(),
            duration: 0.0,
        });
        self.ingest_source(SourceKey::External, resource);
        self.actions.log(Action::AddAudio, json!({ "name": resource.name }));
        self.poll_probes();

        if self.controller.is_playing() {
            self.audio.connect(SourceKey::External);
            self.sources
                .seek(SourceKey::External, self.controller.current_time());
            self.sources.start(SourceKey::External);
        }
    }

    pub fn set_channel_gain(&mut self, channel: Channel, value: f32) -> Option<f32> {
        let applied = self.audio.set_gain(channel, value);
        if let Some(gain) = applied {
            self.actions.log(
                Action::SetVolume,
                json!({ "channel": channel.label(), "value": gain }),
            );
        }
        applied
    }

    // ── Recording ───────────────────────────────────────────────

    /// Rewind and start recording the composited output.
    ///
    /// Fails with `EmptyPlaylist` when there is nothing to record, and with
    /// the backend's error (typically `CapabilityUnavailable`) when no
    /// recorder can be created. Failures leave the session untouched.
    pub fn start_recording(&mut self) -> Result<()> {
        if self.recorder.is_recording() {
            return Ok(());
        }
        if self.playlist.is_empty() {
            return Err(ReelsyncError::EmptyPlaylist);
        }
        if let Err(e) = self.recorder.start() {
            warn!("Cannot start recording: {e}");
            return Err(e);
        }
        self.audio.init();
        self.audio.clear_capture();
        self.with_transport(|c, tr| c.begin_recording(tr));
        self.actions.log(
            Action::StartRecording,
            json!({ "fps": self.recorder.settings().fps.to_fps_f64() }),
        );
        Ok(())
    }

    /// Finalize and save the running recording. No-op when not recording.
    pub fn stop_recording(&mut self) -> Result<Option<SavedRecording>> {
        if !self.recorder.is_recording() {
            return Ok(None);
        }
        self.actions
            .log(Action::StopRecording, json!({ "time": self.controller.current_time() }));
        let result = self.recorder.stop();
        self.with_transport(|c, tr| c.end_recording(tr));
        if let Ok(Some(saved)) = &result {
            self.actions.log(
                Action::ExportComplete,
                json!({
                    "path": saved.path.display().to_string(),
                    "size": saved.bytes,
                    "frames": saved.frames,
                }),
            );
        }
        result
    }

    // ── Tick ────────────────────────────────────────────────────

    /// Run one frame at host time `now` (seconds, monotonic).
    ///
    /// Order: finished probes, synchronizer, audio, compositing, capture,
    /// then the end-of-timeline check for a running recording.
    pub fn tick(&mut self, now: f64) -> TickReport {
        let probes_resolved = self.poll_probes();
        if probes_resolved > 0 {
            self.with_transport(|c, tr| c.playlist_changed(tr));
        }

        let sync = if self.controller.is_playing() {
            let report = synchronize(
                &self.playlist,
                &mut self.sources,
                self.controller.current_time(),
            );
            self.controller.set_time(report.time);
            if report.finished {
                self.controller.finish();
            }
            Some(report)
        } else {
            None
        };

        let samples_mixed = self.pump_audio(now);

        self.compositor.render(
            &self.playlist,
            &mut self.sources,
            self.controller.current_time(),
        );

        let mut frame_captured = false;
        if self.recorder.is_recording() {
            let audio = self.audio.drain_capture();
            match self
                .recorder
                .capture(now, self.compositor.surface(), &audio)
            {
                Ok(pushed) => frame_captured = pushed,
                Err(e) => warn!("Capture failed: {e}"),
            }
        }

        let mut auto_stopped = false;
        if self.recorder.is_recording()
            && self.controller.current_time() >= self.playlist.total_duration()
        {
            info!("Timeline finished, stopping recording");
            if let Err(e) = self.stop_recording() {
                error!("Recording could not be saved: {e}");
            }
            auto_stopped = true;
        }

        self.last_tick = Some(now);
        self.ticks += 1;
        TickReport {
            time: self.controller.current_time(),
            state: self.controller.state(),
            sync,
            probes_resolved,
            samples_mixed,
            frame_captured,
            auto_stopped,
        }
    }

    /// Mix the audio produced since the previous tick.
    fn pump_audio(&mut self, now: f64) -> usize {
        let elapsed = match self.last_tick {
            Some(previous) => (now - previous).clamp(0.0, MAX_PUMP_SECONDS),
            None => 0.0,
        };
        let frames = self.audio.spec().frames_for(elapsed);
        if frames == 0 {
            return 0;
        }
        let sources = &mut self.sources;
        self.audio.mix(frames, |key, out| {
            sources.get_mut(key).map_or(0, |source| source.read_audio(out))
        })
    }

    // ── Commands ────────────────────────────────────────────────

    pub fn dispatch(&mut self, command: Command) -> Result<()> {
        debug!(?command, "Dispatch");
        match command {
            Command::Play => {
                self.play();
            }
            Command::Pause => self.pause()?,
            Command::TogglePlay => self.toggle_play()?,
            Command::Seek { time } => {
                self.seek(time);
            }
            Command::BeginScrub => {
                self.begin_scrub();
            }
            Command::ScrubTo { time } => {
                self.scrub_to(time);
            }
            Command::EndScrub => {
                self.end_scrub();
            }
            Command::AddClip { resource } => {
                self.add_clip(&resource);
            }
            Command::RemoveClip { id } => self.remove_clip(id)?,
            Command::SelectClip { id } => self.select_clip(id)?,
            Command::SetTrim { id, bound, value } => {
                self.set_trim(id, bound, value)?;
            }
            Command::SetFilter { filter } => self.set_filter(filter),
            Command::SetCrop { rect } => {
                self.set_crop(rect);
            }
            Command::SetCropEnabled { enabled } => self.set_crop_enabled(enabled),
            Command::SetOverlayRect { rect } => {
                self.set_overlay_rect(rect);
            }
            Command::LoadOverlay { resource } => self.load_overlay(&resource),
            Command::LoadExternalAudio { resource } => self.load_external_audio(&resource),
            Command::SetChannelGain { channel, value } => {
                self.set_channel_gain(channel, value).ok_or_else(|| {
                    ReelsyncError::InvalidParameter(format!("gain {value} for {channel}"))
                })?;
            }
            Command::StartRecording => self.start_recording()?,
            Command::StopRecording => {
                self.stop_recording()?;
            }
        }
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.controller.state(),
            total_duration: self.playlist.total_duration(),
            current_time: self.controller.current_time(),
            is_playing: self.controller.is_playing(),
            is_recording: self.recorder.is_recording(),
            clips: self.playlist.clips().to_vec(),
            selected: self.playlist.selected(),
            filter: self.compositor.filter(),
            crop: self.compositor.crop(),
            overlay: self.overlay.as_ref().map(|track| OverlaySnapshot {
                name: track.name.clone(),
                rect: self.compositor.overlay_rect(),
                duration: track.duration,
            }),
            external_audio: self.external.as_ref().map(|track| track.name.clone()),
            gains: ChannelGains {
                main: self.audio.gain(Channel::Main),
                overlay: self.audio.gain(Channel::Overlay),
                external: self.audio.gain(Channel::External),
            },
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn current_time(&self) -> f64 {
        self.controller.current_time()
    }

    pub fn total_duration(&self) -> f64 {
        self.playlist.total_duration()
    }

    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn filter(&self) -> VisualFilter {
        self.compositor.filter()
    }

    pub fn crop(&self) -> CropArea {
        self.compositor.crop()
    }

    pub fn overlay_rect(&self) -> Option<Rect> {
        self.compositor.overlay_rect()
    }

    pub fn gain(&self, channel: Channel) -> f32 {
        self.audio.gain(channel)
    }

    /// The most recently composited frame.
    pub fn surface(&self) -> &FrameBuffer {
        self.compositor.surface()
    }

    pub fn audio(&self) -> &AudioGraph {
        &self.audio
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Duration probes that have not finished yet.
    pub fn pending_probes(&self) -> usize {
        self.probes.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Frames delivered to the running recording.
    pub fn frames_captured(&self) -> u64 {
        self.recorder.frames_captured()
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("state", &self.controller.state())
            .field("time", &self.controller.current_time())
            .field("clips", &self.playlist.len())
            .field("recorder", &self.recorder)
            .finish()
    }
}
