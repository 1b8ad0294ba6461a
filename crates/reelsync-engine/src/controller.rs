//! Playback state machine.
//!
//! The controller owns the authoritative global time and the playback state.
//! Transitions that touch sources go through a [`Transport`], a short-lived
//! borrow of everything a transition needs to steer.

use reelsync_audio::{AudioGraph, SourceKey};
use reelsync_core::{clamp_time, END_EPSILON};
use reelsync_timeline::Playlist;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::registry::SourceRegistry;

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No clips.
    #[default]
    Idle,
    Paused,
    Playing,
    /// The user is dragging the playhead; every source is paused.
    Scrubbing,
    /// Playing while capturing.
    Recording,
}

impl PlaybackState {
    /// Whether sources are meant to be running.
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::Recording)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Paused => "paused",
            Self::Playing => "playing",
            Self::Scrubbing => "scrubbing",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a transition steers.
pub struct Transport<'a> {
    pub playlist: &'a Playlist,
    pub sources: &'a mut SourceRegistry,
    pub audio: &'a mut AudioGraph,
    /// Probed overlay duration; zero while unknown.
    pub overlay_duration: f64,
}

/// Position of a looping source of `duration` at global time `t`.
///
/// An unknown (zero) duration is treated as one second.
pub fn loop_time(t: f64, duration: f64) -> f64 {
    let d = if duration > 0.0 { duration } else { 1.0 };
    t.rem_euclid(d)
}

impl Transport<'_> {
    fn overlay_time(&self, t: f64) -> f64 {
        loop_time(t, self.overlay_duration)
    }

    /// Connect every clip and auxiliary source to the audio graph.
    fn arm_audio(&mut self) {
        for clip in self.playlist.clips() {
            self.audio.connect(SourceKey::Clip(clip.id));
        }
        for key in [SourceKey::Overlay, SourceKey::External] {
            if self.sources.contains(key) {
                self.audio.connect(key);
            }
        }
    }

    /// Position every source for global time `t`.
    ///
    /// The active clip goes to its local offset; all other clips are paused
    /// at their trim start. With `start`, the active clip and the auxiliary
    /// sources are started as well.
    fn position(&mut self, t: f64, start: bool) {
        let active = self.playlist.resolve_clip_at(t);
        for (index, clip) in self.playlist.clips().iter().enumerate() {
            let key = SourceKey::Clip(clip.id);
            match active {
                Some(pos) if pos.index == index => {
                    self.sources.seek(key, pos.local_time(clip));
                    if start {
                        self.sources.start(key);
                    }
                }
                _ => {
                    self.sources.pause(key);
                    self.sources.seek(key, clip.trim_start());
                }
            }
        }

        let overlay_t = self.overlay_time(t);
        self.sources.seek(SourceKey::Overlay, overlay_t);
        self.sources.seek(SourceKey::External, t);
        if start {
            self.sources.start(SourceKey::Overlay);
            self.sources.start(SourceKey::External);
        }
    }
}

/// Owns the playback state and the global time.
#[derive(Debug, Default)]
pub struct PlaybackController {
    state: PlaybackState,
    time: f64,
    /// State to restore when a scrub ends.
    resume: Option<PlaybackState>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Publish a time computed by the synchronizer.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Playback state");
            self.state = next;
        }
    }

    /// Start playback from the current time.
    ///
    /// At the end of the timeline playback restarts from zero. No-op on an
    /// empty playlist, while scrubbing, or when already playing.
    pub fn play(&mut self, tr: &mut Transport<'_>) -> bool {
        match self.state {
            PlaybackState::Idle | PlaybackState::Paused if !tr.playlist.is_empty() => {}
            state => {
                debug!(%state, "Play ignored");
                return false;
            }
        }
        if self.time >= tr.playlist.total_duration() - END_EPSILON {
            self.apply_seek(tr, 0.0);
        }
        self.start_sources(tr);
        self.transition(PlaybackState::Playing);
        true
    }

    fn start_sources(&mut self, tr: &mut Transport<'_>) {
        tr.audio.init();
        tr.arm_audio();
        tr.position(self.time, true);
    }

    /// Stop every source. Returns the state that was left.
    ///
    /// While scrubbing, the scrub resumes into `Paused` instead.
    pub fn pause(&mut self, tr: &mut Transport<'_>) -> PlaybackState {
        let previous = self.state;
        match previous {
            PlaybackState::Playing | PlaybackState::Recording => {
                tr.sources.pause_all();
                self.transition(PlaybackState::Paused);
            }
            PlaybackState::Scrubbing => {
                self.resume = Some(PlaybackState::Paused);
            }
            PlaybackState::Idle | PlaybackState::Paused => {}
        }
        previous
    }

    /// Called when playback ran off the end of the timeline.
    ///
    /// A recording stays in `Recording` until it is stopped.
    pub fn finish(&mut self) {
        if self.state == PlaybackState::Playing {
            self.transition(PlaybackState::Paused);
        }
    }

    /// Enter scrubbing, remembering whether playback should resume.
    pub fn begin_scrub(&mut self, tr: &mut Transport<'_>) {
        if self.state == PlaybackState::Scrubbing {
            return;
        }
        self.resume = Some(self.state);
        tr.sources.pause_all();
        self.transition(PlaybackState::Scrubbing);
    }

    /// One scrub sample. Outside a scrub this is a plain seek.
    pub fn scrub_to(&mut self, tr: &mut Transport<'_>, t: f64) -> Option<f64> {
        self.apply_seek(tr, t)
    }

    /// Leave scrubbing, restoring playback if it was active.
    pub fn end_scrub(&mut self, tr: &mut Transport<'_>) -> PlaybackState {
        if self.state != PlaybackState::Scrubbing {
            return self.state;
        }
        let resume = self.resume.take().unwrap_or(PlaybackState::Paused);
        let next = match resume {
            _ if tr.playlist.is_empty() => PlaybackState::Idle,
            PlaybackState::Playing | PlaybackState::Recording => {
                self.start_sources(tr);
                resume
            }
            _ => PlaybackState::Paused,
        };
        self.transition(next);
        next
    }

    /// Seek the timeline. Ignored while scrubbing (use [`Self::scrub_to`]).
    pub fn seek(&mut self, tr: &mut Transport<'_>, t: f64) -> Option<f64> {
        if self.state == PlaybackState::Scrubbing {
            debug!(t, "Seek ignored while scrubbing");
            return None;
        }
        self.apply_seek(tr, t)
    }

    /// Clamp `t` to the timeline, publish it and reposition every source.
    ///
    /// Non-finite times are ignored. While playing, the newly active clip
    /// is started.
    fn apply_seek(&mut self, tr: &mut Transport<'_>, t: f64) -> Option<f64> {
        if !t.is_finite() {
            debug!("Ignoring non-finite seek");
            return None;
        }
        let clamped = clamp_time(t, tr.playlist.total_duration());
        self.time = clamped;
        tr.position(clamped, self.state.is_playing());
        Some(clamped)
    }

    /// Begin playback for a recording: rewind to zero and start everything.
    pub fn begin_recording(&mut self, tr: &mut Transport<'_>) {
        self.resume = None;
        self.time = 0.0;
        tr.position(0.0, false);
        self.start_sources(tr);
        self.transition(PlaybackState::Recording);
    }

    /// Leave `Recording` after the capture was finalized.
    pub fn end_recording(&mut self, tr: &mut Transport<'_>) {
        match self.state {
            PlaybackState::Recording => {
                tr.sources.pause_all();
                self.transition(PlaybackState::Paused);
            }
            PlaybackState::Scrubbing => {
                if self.resume == Some(PlaybackState::Recording) {
                    self.resume = Some(PlaybackState::Paused);
                }
            }
            _ => {}
        }
    }

    /// Re-derive state after clips were added, removed, trimmed or probed.
    pub fn playlist_changed(&mut self, tr: &mut Transport<'_>) {
        if tr.playlist.is_empty() {
            tr.sources.pause_all();
            self.time = 0.0;
            self.resume = None;
            self.transition(PlaybackState::Idle);
            return;
        }
        if self.state == PlaybackState::Idle {
            self.transition(PlaybackState::Paused);
        }
        let total = tr.playlist.total_duration();
        if self.time > total {
            self.time = total;
        }
        if self.state.is_playing() {
            tr.arm_audio();
            tr.position(self.time, true);
        }
    }
}
