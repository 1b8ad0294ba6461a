//! Engine configuration.
//!
//! Read from JSON. Every field has a default, so a partial file only
//! overrides what it names.

use reelsync_core::{AudioSpec, FrameRate, ReelsyncError, Result, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub surface: SurfaceConfig,
    pub playback: PlaybackConfig,
    pub audio: AudioConfig,
    pub recording: RecordingConfig,
    pub logging: LoggingConfig,
}

/// Output surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
        }
    }
}

impl SurfaceConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Tick frequency of the fixed-rate scheduler.
    pub tick_rate_hz: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { tick_rate_hz: 60.0 }
    }
}

impl PlaybackConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples buffered per graph output before new audio is dropped.
    pub ring_capacity: usize,
    /// Master limiter threshold; `null` disables it.
    pub limiter: Option<f32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            ring_capacity: 48_000 * 2 * 2,
            limiter: Some(0.98),
        }
    }
}

impl AudioConfig {
    pub fn spec(&self) -> AudioSpec {
        AudioSpec::new(self.sample_rate, self.channels)
    }
}

/// Which capture backend records the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackendKind {
    /// Uncompressed in-process container.
    Raw,
    /// VP9/WebM via an ffmpeg subprocess.
    #[default]
    Ffmpeg,
}

impl std::str::FromStr for CaptureBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "ffmpeg" | "webm" => Ok(Self::Ffmpeg),
            other => Err(format!("unknown capture backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub capture_fps: u32,
    pub backend: CaptureBackendKind,
    /// Where finished recordings are written.
    pub output_dir: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        let output_dir = dirs::video_dir()
            .map(|d| d.join("reelsync"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            capture_fps: 30,
            backend: CaptureBackendKind::default(),
            output_dir,
        }
    }
}

impl RecordingConfig {
    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::from_fps(self.capture_fps)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// `<config dir>/reelsync/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("reelsync").join("config.json"))
    }

    /// Parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ReelsyncError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from [`EngineConfig::default_path`] when `None`.
    ///
    /// A missing default file is silent; any other failure falls back to
    /// defaults with a warning.
    pub fn load(path: Option<&Path>) -> Self {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Self::default(),
            },
        };
        if !explicit && !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), "Falling back to default config: {e}");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.surface.size().is_empty() {
            return Err(ReelsyncError::Config("surface must be non-empty".into()));
        }
        if !self.playback.tick_rate_hz.is_finite() || self.playback.tick_rate_hz <= 0.0 {
            return Err(ReelsyncError::Config(format!(
                "tick rate must be positive, got {}",
                self.playback.tick_rate_hz
            )));
        }
        if self.audio.sample_rate == 0 || self.audio.channels == 0 {
            return Err(ReelsyncError::Config("audio format must be non-empty".into()));
        }
        if self.recording.capture_fps == 0 {
            return Err(ReelsyncError::Config("capture fps must be positive".into()));
        }
        Ok(())
    }
}
