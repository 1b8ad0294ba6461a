//! Recording pipeline.
//!
//! A [`Recorder`] turns composited surfaces and mixed audio into one saved
//! artifact. Frames are paced at the capture rate against the host clock;
//! encoded chunks are collected in order until the recording stops.

use reelsync_core::{FrameBuffer, FrameRate, ReelsyncError, Result};
use reelsync_media::{Artifact, ArtifactSink, CaptureBackend, CaptureSettings, CaptureSink};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Decides which ticks deliver a captured frame.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: f64,
    started: Option<f64>,
    next_due: f64,
}

impl FramePacer {
    pub fn new(rate: FrameRate) -> Self {
        Self {
            interval: rate.frame_seconds(),
            started: None,
            next_due: 0.0,
        }
    }

    /// Whether a frame is due at host time `now`. The first call is always
    /// due; a pacer that fell behind skips ahead instead of bursting.
    pub fn due(&mut self, now: f64) -> bool {
        if self.started.is_none() {
            self.started = Some(now);
            self.next_due = now + self.interval;
            return true;
        }
        if now + 1e-9 < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }

    /// Seconds since the first frame.
    pub fn elapsed(&self, now: f64) -> f64 {
        self.started.map_or(0.0, |start| (now - start).max(0.0))
    }
}

/// Where a finished recording went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedRecording {
    pub path: PathBuf,
    pub bytes: usize,
    pub frames: u64,
}

struct ActiveRecording {
    sink: Box<dyn CaptureSink>,
    chunks: Vec<Vec<u8>>,
    pacer: FramePacer,
    frames: u64,
}

/// Owns the capture backend and at most one running recording.
pub struct Recorder {
    backend: Box<dyn CaptureBackend>,
    settings: CaptureSettings,
    artifacts: Arc<dyn ArtifactSink>,
    active: Option<ActiveRecording>,
}

impl Recorder {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        settings: CaptureSettings,
        artifacts: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            backend,
            settings,
            artifacts,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Frames delivered to the running recording.
    pub fn frames_captured(&self) -> u64 {
        self.active.as_ref().map_or(0, |a| a.frames)
    }

    /// Open a capture sink and start it. Nothing changes on failure.
    pub fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            debug!("Recording already running");
            return Ok(());
        }
        let mut sink = self.backend.create(&self.settings)?;
        sink.start()?;
        info!(
            backend = self.backend.name(),
            width = self.settings.size.width,
            height = self.settings.size.height,
            fps = %self.settings.fps,
            "Recording started"
        );
        self.active = Some(ActiveRecording {
            sink,
            chunks: Vec::new(),
            pacer: FramePacer::new(self.settings.fps),
            frames: 0,
        });
        Ok(())
    }

    /// Feed one tick's surface and audio. Frames are dropped between
    /// capture intervals; audio is always forwarded.
    pub fn capture(&mut self, now: f64, frame: &FrameBuffer, audio: &[f32]) -> Result<bool> {
        let Some(active) = self.active.as_mut() else {
            return Ok(false);
        };
        let mut pushed = false;
        if active.pacer.due(now) {
            let timestamp = active.pacer.elapsed(now);
            active.sink.push_frame(frame, timestamp)?;
            active.frames += 1;
            pushed = true;
        }
        active.sink.push_audio(audio)?;
        active.chunks.extend(active.sink.poll_chunks());
        Ok(pushed)
    }

    /// Finalize the running recording and save it as
    /// `edited-video-<unix millis>.<ext>`.
    ///
    /// No-op (returns `Ok(None)`) when not recording. The recording is
    /// cleared even if finalizing or saving fails.
    pub fn stop(&mut self) -> Result<Option<SavedRecording>> {
        let Some(mut active) = self.active.take() else {
            return Ok(None);
        };
        active.chunks.extend(active.sink.poll_chunks());
        let tail = active.sink.finalize().map_err(|e| {
            error!("Failed to finalize recording: {e}");
            e
        })?;
        active.chunks.extend(tail);

        let file_name = format!(
            "edited-video-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            self.backend.extension()
        );
        let artifact = Artifact::from_chunks(file_name, self.backend.mime_type(), active.chunks);
        if artifact.is_empty() {
            warn!("Recording produced no data");
        }
        let bytes = artifact.len();
        match self.artifacts.save(artifact) {
            Ok(path) => {
                info!(path = %path.display(), bytes, frames = active.frames, "Recording saved");
                Ok(Some(SavedRecording {
                    path,
                    bytes,
                    frames: active.frames,
                }))
            }
            Err(e) => {
                error!("Failed to save recording: {e}");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("backend", &self.backend.name())
            .field("recording", &self.is_recording())
            .finish()
    }
}

/// Backend that never has a recorder, for hosts without capture support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCapture;

impl CaptureBackend for UnavailableCapture {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn extension(&self) -> &'static str {
        "bin"
    }

    fn mime_type(&self) -> &'static str {
        "application/octet-stream"
    }

    fn create(&self, _settings: &CaptureSettings) -> Result<Box<dyn CaptureSink>> {
        Err(ReelsyncError::capability("no capture backend available"))
    }
}
