//! Reelsync Media - Source handles, ingestion and capture
//!
//! This crate handles:
//! - The source-handle capability every media backend implements
//! - Resource ingestion with asynchronous duration probing
//! - A deterministic simulated backend
//! - FFmpeg-backed probing, frame decoding and audio decoding
//! - Capture backends that turn composited frames into an artifact

pub mod artifact;
pub mod capture;
pub mod ffmpeg;
pub mod ingest;
pub mod simulated;
pub mod source;

pub use artifact::{Artifact, ArtifactSink, DirectorySink, MemorySink};
pub use capture::{
    CaptureBackend, CaptureSettings, CaptureSink, FfmpegCaptureBackend, RawCapture, RawCaptureBackend,
};
pub use ffmpeg::{FfmpegIngest, FfmpegSource};
pub use ingest::{DurationProbe, IngestedMedia, MediaIngest, MediaInfo, MediaResource, ProbeResolver};
pub use simulated::{SimClock, SimulatedHandle, SimulatedIngest, SimulatedMedia, SimulatedSource};
pub use source::{MediaSource, StartError};

/// Log which external media tools are available (call once at startup).
pub fn init() {
    let ffmpeg = ffmpeg::tools_available();
    tracing::info!(ffmpeg, "Reelsync media initialized");
}
