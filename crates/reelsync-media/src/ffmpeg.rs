//! FFmpeg-backed media sources.
//!
//! Probing shells out to `ffprobe`, frames are decoded one at a time by an
//! `ffmpeg` subprocess on a worker thread, and audio is streamed as raw
//! `f32le` from a second subprocess while the source plays. Binaries are
//! located through `ffmpeg-sidecar`, so a sidecar download works as well as a
//! system install.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use reelsync_core::{AudioSpec, FrameBuffer, ReelsyncError, Result, SharedFrameBuffer, Size};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::ingest::{DurationProbe, IngestedMedia, MediaIngest, MediaInfo, MediaResource};
use crate::source::{MediaSource, StartError};

/// Frame requests are quantized to this rate so a steady playhead does not
/// spawn a decoder on every tick.
const FRAME_REQUEST_FPS: f64 = 30.0;

/// Path of the `ffprobe` binary next to the resolved `ffmpeg`.
pub fn ffprobe_path() -> PathBuf {
    let name = if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" };
    ffmpeg_sidecar::paths::ffmpeg_path().with_file_name(name)
}

/// Whether both `ffmpeg` and `ffprobe` can be run.
pub fn tools_available() -> bool {
    ffmpeg_sidecar::command::ffmpeg_is_installed()
        && Command::new(ffprobe_path())
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
}

// ── Probing ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_json(json: &[u8]) -> Result<MediaInfo> {
    let output: ProbeOutput = serde_json::from_slice(json)?;

    let stream_duration = output
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));
    let duration = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .or(stream_duration)
        .ok_or_else(|| ReelsyncError::unreadable("no duration reported"))?;

    let size = output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .find_map(|s| Some(Size::new(s.width?, s.height?)));
    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    MediaInfo::new(duration, size, has_audio)
}

/// Probe a file with `ffprobe`. Blocks until the subprocess exits.
pub fn probe_file(path: &Path) -> Result<MediaInfo> {
    if !path.exists() {
        return Err(ReelsyncError::unreadable(format!(
            "file not found: {}",
            path.display()
        )));
    }
    let output = Command::new(ffprobe_path())
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| ReelsyncError::unreadable(format!("failed to run ffprobe: {e}")))?;
    if !output.status.success() {
        return Err(ReelsyncError::unreadable(format!(
            "ffprobe exited with status: {}",
            output.status
        )));
    }
    parse_probe_json(&output.stdout)
}

// ── Ingest ──────────────────────────────────────────────────────

/// Ingests files through FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegIngest {
    audio: AudioSpec,
}

impl FfmpegIngest {
    /// Decoded audio is resampled to `audio`.
    pub fn new(audio: AudioSpec) -> Self {
        Self { audio }
    }
}

impl MediaIngest for FfmpegIngest {
    fn ingest(&self, resource: &MediaResource) -> IngestedMedia {
        let path = resource
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&resource.name));
        let info = Arc::new(Mutex::new(None));
        let source = FfmpegSource::new(path.clone(), Arc::clone(&info), self.audio);

        let (resolver, probe) = DurationProbe::channel();
        let spawned = std::thread::Builder::new()
            .name("reelsync-probe".into())
            .spawn(move || {
                let result = probe_file(&path);
                if let Ok(probed) = &result {
                    *info.lock() = Some(*probed);
                }
                resolver.resolve(result);
            });
        if let Err(e) = spawned {
            // The resolver was dropped with the closure; the probe reports
            // the resource as unreadable.
            warn!("Failed to spawn probe thread: {e}");
        }

        IngestedMedia {
            source: Box::new(source),
            probe,
        }
    }
}

// ── Source ──────────────────────────────────────────────────────

/// A file played back through FFmpeg subprocesses, clocked by wall time.
pub struct FfmpegSource {
    path: PathBuf,
    info: Arc<Mutex<Option<MediaInfo>>>,
    audio_spec: AudioSpec,
    position: f64,
    started: Option<Instant>,
    frames: Option<FrameWorker>,
    audio: Option<AudioStream>,
}

impl FfmpegSource {
    fn new(path: PathBuf, info: Arc<Mutex<Option<MediaInfo>>>, audio_spec: AudioSpec) -> Self {
        Self {
            path,
            info,
            audio_spec,
            position: 0.0,
            started: None,
            frames: None,
            audio: None,
        }
    }

    /// Open a file and probe it synchronously.
    pub fn open(path: impl Into<PathBuf>, audio_spec: AudioSpec) -> Result<Self> {
        let path = path.into();
        let info = probe_file(&path)?;
        Ok(Self::new(path, Arc::new(Mutex::new(Some(info))), audio_spec))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn info(&self) -> Option<MediaInfo> {
        *self.info.lock()
    }

    fn restart_audio(&mut self) {
        self.audio = None;
        if self.started.is_none() || !self.info().is_some_and(|i| i.has_audio) {
            return;
        }
        match AudioStream::spawn(&self.path, self.position, self.audio_spec) {
            Ok(stream) => self.audio = Some(stream),
            Err(e) => warn!(path = %self.path.display(), "Audio decode unavailable: {e}"),
        }
    }
}

impl MediaSource for FfmpegSource {
    fn local_time(&self) -> f64 {
        let elapsed = self.started.map_or(0.0, |s| s.elapsed().as_secs_f64());
        let t = self.position + elapsed;
        match self.info() {
            Some(info) => t.min(info.duration),
            None => t,
        }
    }

    fn seek(&mut self, t: f64) {
        let max = self.info().map_or(f64::INFINITY, |i| i.duration);
        self.position = t.clamp(0.0, max);
        if self.started.is_some() {
            self.started = Some(Instant::now());
            self.restart_audio();
        }
    }

    fn play(&mut self) -> std::result::Result<(), StartError> {
        if !self.is_ready() {
            return Err(StartError::Rejected(format!(
                "{} is not ready",
                self.path.display()
            )));
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
            self.restart_audio();
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.local_time();
        self.started = None;
        self.audio = None;
    }

    fn is_ready(&self) -> bool {
        self.info().is_some()
    }

    fn is_playing(&self) -> bool {
        self.started.is_some()
    }

    fn native_size(&self) -> Option<Size> {
        self.info().and_then(|i| i.size)
    }

    fn current_frame(&mut self) -> Option<SharedFrameBuffer> {
        let size = self.native_size()?;
        let t = self.local_time();
        if self.frames.is_none() {
            match FrameWorker::spawn(self.path.clone(), size) {
                Ok(worker) => self.frames = Some(worker),
                Err(e) => {
                    warn!("Failed to spawn frame decoder: {e}");
                    return None;
                }
            }
        }
        let worker = self.frames.as_mut()?;
        worker.request(t);
        worker.latest()
    }

    fn read_audio(&mut self, out: &mut [f32]) -> usize {
        match (&mut self.audio, self.started) {
            (Some(stream), Some(_)) => stream.read(out),
            _ => 0,
        }
    }
}

// ── Frame decoding ──────────────────────────────────────────────

/// Decode the single frame at `t` as RGBA scaled to `size`.
pub fn decode_frame(path: &Path, t: f64, size: Size) -> Result<FrameBuffer> {
    let output = Command::new(ffmpeg_sidecar::paths::ffmpeg_path())
        .args(["-v", "error", "-ss", &format!("{t:.3}"), "-i"])
        .arg(path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", size.width, size.height),
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| ReelsyncError::unreadable(format!("failed to run ffmpeg: {e}")))?;
    FrameBuffer::from_rgba(size.width, size.height, output.stdout).ok_or_else(|| {
        ReelsyncError::unreadable(format!("no frame at {t:.3}s in {}", path.display()))
    })
}

struct FrameWorker {
    requests: Sender<f64>,
    latest: Arc<Mutex<Option<SharedFrameBuffer>>>,
    last_slot: Option<i64>,
}

impl FrameWorker {
    fn spawn(path: PathBuf, size: Size) -> std::io::Result<Self> {
        let (requests, rx): (Sender<f64>, Receiver<f64>) = crossbeam_channel::unbounded();
        let latest = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&latest);
        std::thread::Builder::new()
            .name("reelsync-frames".into())
            .spawn(move || {
                while let Ok(mut t) = rx.recv() {
                    // Only the newest request matters.
                    while let Ok(newer) = rx.try_recv() {
                        t = newer;
                    }
                    match decode_frame(&path, t, size) {
                        Ok(frame) => *shared.lock() = Some(Arc::new(frame)),
                        Err(e) => debug!("Frame decode failed: {e}"),
                    }
                }
            })?;
        Ok(Self {
            requests,
            latest,
            last_slot: None,
        })
    }

    fn request(&mut self, t: f64) {
        let slot = (t * FRAME_REQUEST_FPS).floor() as i64;
        if self.last_slot != Some(slot) {
            self.last_slot = Some(slot);
            let _ = self.requests.send(t);
        }
    }

    fn latest(&self) -> Option<SharedFrameBuffer> {
        self.latest.lock().clone()
    }
}

// ── Audio decoding ──────────────────────────────────────────────

struct AudioStream {
    child: Child,
    chunks: Receiver<Vec<f32>>,
    pending: Vec<f32>,
    cursor: usize,
}

impl AudioStream {
    fn spawn(path: &Path, start: f64, spec: AudioSpec) -> Result<Self> {
        let mut child = Command::new(ffmpeg_sidecar::paths::ffmpeg_path())
            .args(["-v", "error", "-ss", &format!("{start:.3}"), "-i"])
            .arg(path)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-ac",
                &spec.channels.to_string(),
                "-ar",
                &spec.sample_rate.to_string(),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelsyncError::Audio("failed to open ffmpeg stdout".into()))?;

        let (tx, chunks) = crossbeam_channel::bounded(16);
        std::thread::Builder::new()
            .name("reelsync-audio-decode".into())
            .spawn(move || {
                let mut buf = vec![0u8; 16 * 1024];
                let mut carry: Vec<u8> = Vec::new();
                loop {
                    let n = match stdout.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    carry.extend_from_slice(&buf[..n]);
                    let whole = carry.len() / 4 * 4;
                    let samples: Vec<f32> = carry[..whole]
                        .chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect();
                    carry.drain(..whole);
                    if tx.send(samples).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            child,
            chunks,
            pending: Vec::new(),
            cursor: 0,
        })
    }

    fn read(&mut self, out: &mut [f32]) -> usize {
        let mut written = 0;
        while written < out.len() {
            if self.cursor >= self.pending.len() {
                match self.chunks.try_recv() {
                    Ok(chunk) => {
                        self.pending = chunk;
                        self.cursor = 0;
                    }
                    Err(_) => break,
                }
            }
            let n = (out.len() - written).min(self.pending.len() - self.cursor);
            out[written..written + n].copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
            written += n;
            self.cursor += n;
        }
        written
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "streams": [
            { "index": 0, "codec_type": "video", "width": 1280, "height": 720, "duration": "12.480000" },
            { "index": 1, "codec_type": "audio", "duration": "12.500000" }
        ],
        "format": { "filename": "clip.mp4", "duration": "12.500000" }
    }"#;

    #[test]
    fn test_parse_probe_json() {
        let info = parse_probe_json(PROBE_JSON.as_bytes()).unwrap();
        assert_eq!(info.duration, 12.5);
        assert_eq!(info.size, Some(Size::new(1280, 720)));
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_probe_falls_back_to_streams() {
        let json = r#"{ "streams": [ { "codec_type": "audio", "duration": "3.25" } ], "format": {} }"#;
        let info = parse_probe_json(json.as_bytes()).unwrap();
        assert_eq!(info.duration, 3.25);
        assert_eq!(info.size, None);
    }

    #[test]
    fn test_parse_probe_without_duration_is_unreadable() {
        let json = r#"{ "streams": [], "format": { "duration": "N/A" } }"#;
        assert!(matches!(
            parse_probe_json(json.as_bytes()),
            Err(ReelsyncError::UnreadableMedia(_))
        ));
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe_file(Path::new("/definitely/not/here.mp4"));
        assert!(matches!(result, Err(ReelsyncError::UnreadableMedia(_))));
    }

    #[test]
    fn test_unready_source_rejects_play() {
        let mut source = FfmpegSource::new(
            PathBuf::from("pending.mp4"),
            Arc::new(Mutex::new(None)),
            AudioSpec::default(),
        );
        assert!(matches!(source.play(), Err(StartError::Rejected(_))));
        assert!(source.current_frame().is_none());
    }

    #[test]
    fn test_paused_source_holds_position() {
        let info = MediaInfo::new(10.0, None, false).unwrap();
        let mut source = FfmpegSource::new(
            PathBuf::from("a.mp4"),
            Arc::new(Mutex::new(Some(info))),
            AudioSpec::default(),
        );
        source.seek(4.0);
        assert_eq!(source.local_time(), 4.0);
        source.seek(40.0);
        assert_eq!(source.local_time(), 10.0);
    }
}
