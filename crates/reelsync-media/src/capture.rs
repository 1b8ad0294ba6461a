//! Capture backends for the recording pipeline.
//!
//! A backend is asked for a sink once per recording. The sink receives
//! composited RGBA frames and mixed audio, emits encoded chunks as they
//! become available, and hands back whatever is left on finalize.

use reelsync_core::{AudioSpec, FrameBuffer, FrameRate, ReelsyncError, Result, Size, CAPTURE_FPS};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, info};

// ── Settings & traits ───────────────────────────────────────────

/// What a capture sink will be fed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Surface size of every pushed frame.
    pub size: Size,
    pub fps: FrameRate,
    pub audio: AudioSpec,
}

impl CaptureSettings {
    pub fn new(size: Size, audio: AudioSpec) -> Self {
        Self {
            size,
            fps: CAPTURE_FPS,
            audio,
        }
    }
}

/// Constructs capture sinks.
pub trait CaptureBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Container file extension, without the dot.
    fn extension(&self) -> &'static str;

    fn mime_type(&self) -> &'static str;

    /// Build a sink. Fails with `CapabilityUnavailable` if this backend
    /// cannot record on this system.
    fn create(&self, settings: &CaptureSettings) -> Result<Box<dyn CaptureSink>>;
}

/// One recording in progress.
pub trait CaptureSink: Send {
    fn start(&mut self) -> Result<()>;

    /// Encode one composited frame captured at `timestamp` seconds.
    fn push_frame(&mut self, frame: &FrameBuffer, timestamp: f64) -> Result<()>;

    /// Encode interleaved samples from the capture tap.
    fn push_audio(&mut self, samples: &[f32]) -> Result<()>;

    /// Chunks produced since the last call, in order.
    fn poll_chunks(&mut self) -> Vec<Vec<u8>>;

    /// Flush and close, returning the remaining chunks.
    fn finalize(self: Box<Self>) -> Result<Vec<Vec<u8>>>;
}

fn check_frame(settings: &CaptureSettings, frame: &FrameBuffer) -> Result<()> {
    if frame.size() != settings.size {
        return Err(ReelsyncError::InvalidParameter(format!(
            "frame is {}x{}, capture expects {}x{}",
            frame.width, frame.height, settings.size.width, settings.size.height
        )));
    }
    Ok(())
}

// ── Raw capture ─────────────────────────────────────────────────

const RAW_MAGIC: &[u8; 6] = b"RSCAP1";
const RAW_VIDEO_TAG: u8 = b'V';
const RAW_AUDIO_TAG: u8 = b'A';

/// Header of a raw capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCaptureHeader {
    pub width: u32,
    pub height: u32,
    pub fps: FrameRate,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A frame read back from a raw capture.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub timestamp: f64,
    pub frame: FrameBuffer,
}

/// A fully parsed raw capture.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCapture {
    pub header: RawCaptureHeader,
    pub frames: Vec<RawFrame>,
    pub audio: Vec<f32>,
}

impl RawCapture {
    /// Parse the bytes of a `.rawcap` artifact.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bad = |msg: &str| ReelsyncError::encoder(format!("malformed raw capture: {msg}"));

        let rest = bytes.strip_prefix(RAW_MAGIC).ok_or_else(|| bad("magic"))?;
        let header_len = read_u32(rest).ok_or_else(|| bad("header length"))? as usize;
        let rest = &rest[4..];
        if rest.len() < header_len {
            return Err(bad("truncated header"));
        }
        let header: RawCaptureHeader = serde_json::from_slice(&rest[..header_len])?;
        let mut rest = &rest[header_len..];

        let mut frames = Vec::new();
        let mut audio = Vec::new();
        while let Some((&tag, body)) = rest.split_first() {
            match tag {
                RAW_VIDEO_TAG => {
                    let micros = read_u64(body).ok_or_else(|| bad("timestamp"))?;
                    let len = body
                        .get(8..)
                        .and_then(read_u32)
                        .ok_or_else(|| bad("frame length"))? as usize;
                    let data = body.get(12..12 + len).ok_or_else(|| bad("truncated frame"))?;
                    let frame = FrameBuffer::from_rgba(header.width, header.height, data.to_vec())
                        .ok_or_else(|| bad("frame size"))?;
                    frames.push(RawFrame {
                        timestamp: micros as f64 / 1_000_000.0,
                        frame,
                    });
                    rest = &body[12 + len..];
                }
                RAW_AUDIO_TAG => {
                    let len = read_u32(body).ok_or_else(|| bad("audio length"))? as usize;
                    let data = body.get(4..4 + len).ok_or_else(|| bad("truncated audio"))?;
                    audio.extend(
                        data.chunks_exact(4)
                            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                    );
                    rest = &body[4 + len..];
                }
                _ => return Err(bad("unknown chunk tag")),
            }
        }

        Ok(Self {
            header,
            frames,
            audio,
        })
    }
}

fn read_u32(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?))
}

fn read_u64(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.get(..8)?.try_into().ok()?))
}

/// In-process capture into a simple uncompressed container.
///
/// Always available; used by tests and as the fallback when no encoder is
/// installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCaptureBackend;

impl CaptureBackend for RawCaptureBackend {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn extension(&self) -> &'static str {
        "rawcap"
    }

    fn mime_type(&self) -> &'static str {
        "application/octet-stream"
    }

    fn create(&self, settings: &CaptureSettings) -> Result<Box<dyn CaptureSink>> {
        Ok(Box::new(RawCaptureSink {
            settings: *settings,
            chunks: Vec::new(),
            started: false,
        }))
    }
}

struct RawCaptureSink {
    settings: CaptureSettings,
    chunks: Vec<Vec<u8>>,
    started: bool,
}

impl CaptureSink for RawCaptureSink {
    fn start(&mut self) -> Result<()> {
        let header = serde_json::to_vec(&RawCaptureHeader {
            width: self.settings.size.width,
            height: self.settings.size.height,
            fps: self.settings.fps,
            sample_rate: self.settings.audio.sample_rate,
            channels: self.settings.audio.channels,
        })?;
        let mut chunk = Vec::with_capacity(RAW_MAGIC.len() + 4 + header.len());
        chunk.extend_from_slice(RAW_MAGIC);
        chunk.extend_from_slice(&(header.len() as u32).to_le_bytes());
        chunk.extend_from_slice(&header);
        self.chunks.push(chunk);
        self.started = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer, timestamp: f64) -> Result<()> {
        if !self.started {
            return Err(ReelsyncError::encoder("capture not started"));
        }
        check_frame(&self.settings, frame)?;
        let bytes = frame.as_bytes();
        let micros = (timestamp.max(0.0) * 1_000_000.0).round() as u64;
        let mut chunk = Vec::with_capacity(1 + 8 + 4 + bytes.len());
        chunk.push(RAW_VIDEO_TAG);
        chunk.extend_from_slice(&micros.to_le_bytes());
        chunk.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        chunk.extend_from_slice(bytes);
        self.chunks.push(chunk);
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> Result<()> {
        if !self.started {
            return Err(ReelsyncError::encoder("capture not started"));
        }
        if samples.is_empty() {
            return Ok(());
        }
        let mut chunk = Vec::with_capacity(1 + 4 + samples.len() * 4);
        chunk.push(RAW_AUDIO_TAG);
        chunk.extend_from_slice(&((samples.len() * 4) as u32).to_le_bytes());
        for s in samples {
            chunk.extend_from_slice(&s.to_le_bytes());
        }
        self.chunks.push(chunk);
        Ok(())
    }

    fn poll_chunks(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.chunks)
    }

    fn finalize(mut self: Box<Self>) -> Result<Vec<Vec<u8>>> {
        Ok(std::mem::take(&mut self.chunks))
    }
}

// ── FFmpeg capture ──────────────────────────────────────────────

const VIDEO_FILE: &str = "video.webm";
const AUDIO_FILE: &str = "audio.f32";
const MUXED_FILE: &str = "recording.webm";
const OPUS_BITRATE: &str = "128k";
/// Opus only encodes at 48 kHz and its integer divisors.
const OPUS_SAMPLE_RATE: u32 = 48_000;

/// VP9 + Opus WebM encoding through `ffmpeg` subprocesses.
///
/// Frames are piped as raw RGBA into a live VP9 encode while capture-tap
/// audio is spooled to a raw `f32le` file next to it. `finalize` muxes the
/// two into one WebM, so the whole artifact arrives as the final chunk.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegCaptureBackend {
    /// VP9 constant-quality value (0-63, lower = better).
    pub crf: u32,
}

impl Default for FfmpegCaptureBackend {
    fn default() -> Self {
        Self { crf: 32 }
    }
}

impl FfmpegCaptureBackend {
    /// Arguments of the live video encode into `output`.
    pub fn ffmpeg_args(&self, settings: &CaptureSettings, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        // Input from pipe (raw frames)
        args.extend_from_slice(&[
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgba".into(),
            "-video_size".into(),
            format!("{}x{}", settings.size.width, settings.size.height),
            "-framerate".into(),
            format!("{}/{}", settings.fps.numerator, settings.fps.denominator),
            "-i".into(),
            "pipe:0".into(),
        ]);

        // Realtime VP9 so encoding keeps up with the tick
        args.extend_from_slice(&[
            "-c:v".into(),
            "libvpx-vp9".into(),
            "-deadline".into(),
            "realtime".into(),
            "-crf".into(),
            self.crf.to_string(),
            "-b:v".into(),
            "0".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ]);

        args.extend_from_slice(&["-f".into(), "webm".into()]);
        args.push(output.to_string_lossy().into_owned());
        args
    }

    /// Arguments that mux the encoded `video` with the raw `audio` spool
    /// into `output`, encoding the audio as Opus.
    pub fn mux_args(
        &self,
        settings: &CaptureSettings,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-v".into(), "error".into(), "-i".into()];
        args.push(video.to_string_lossy().into_owned());

        // Raw spool written by push_audio
        args.extend_from_slice(&[
            "-f".into(),
            "f32le".into(),
            "-ar".into(),
            settings.audio.sample_rate.to_string(),
            "-ac".into(),
            settings.audio.channels.to_string(),
            "-i".into(),
        ]);
        args.push(audio.to_string_lossy().into_owned());

        args.extend_from_slice(&[
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            "libopus".into(),
            "-b:a".into(),
            OPUS_BITRATE.into(),
            "-ar".into(),
            OPUS_SAMPLE_RATE.to_string(),
            "-f".into(),
            "webm".into(),
        ]);
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

impl CaptureBackend for FfmpegCaptureBackend {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn extension(&self) -> &'static str {
        "webm"
    }

    fn mime_type(&self) -> &'static str {
        "video/webm"
    }

    fn create(&self, settings: &CaptureSettings) -> Result<Box<dyn CaptureSink>> {
        if !ffmpeg_sidecar::command::ffmpeg_is_installed() {
            return Err(ReelsyncError::capability("ffmpeg is not installed"));
        }
        Ok(Box::new(FfmpegCaptureSink {
            backend: *self,
            settings: *settings,
            workdir: None,
            child: None,
            stdin: None,
            audio: None,
            audio_samples: 0,
        }))
    }
}

struct FfmpegCaptureSink {
    backend: FfmpegCaptureBackend,
    settings: CaptureSettings,
    /// Holds the video, audio spool and muxed files; removed on drop.
    workdir: Option<TempDir>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    audio: Option<BufWriter<File>>,
    audio_samples: usize,
}

impl FfmpegCaptureSink {
    /// Run the mux step and return the muxed file's bytes.
    fn mux(&self, dir: &Path) -> Result<Vec<u8>> {
        let output = dir.join(MUXED_FILE);
        let args = self.backend.mux_args(
            &self.settings,
            &dir.join(VIDEO_FILE),
            &dir.join(AUDIO_FILE),
            &output,
        );
        let status = Command::new(ffmpeg_sidecar::paths::ffmpeg_path())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| ReelsyncError::encoder(format!("Failed to spawn ffmpeg mux: {e}")))?;
        if !status.success() {
            return Err(ReelsyncError::encoder(format!(
                "ffmpeg mux exited with status: {status}"
            )));
        }
        Ok(std::fs::read(output)?)
    }
}

impl CaptureSink for FfmpegCaptureSink {
    fn start(&mut self) -> Result<()> {
        let workdir = tempfile::Builder::new()
            .prefix("reelsync-capture")
            .tempdir()?;
        let audio = File::create(workdir.path().join(AUDIO_FILE))?;
        let args = self
            .backend
            .ffmpeg_args(&self.settings, &workdir.path().join(VIDEO_FILE));

        let mut child = Command::new(ffmpeg_sidecar::paths::ffmpeg_path())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ReelsyncError::encoder(format!("Failed to spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelsyncError::encoder("Failed to open ffmpeg stdin"))?;

        info!(
            width = self.settings.size.width,
            height = self.settings.size.height,
            fps = %self.settings.fps,
            dir = %workdir.path().display(),
            "FFmpeg capture started"
        );
        self.workdir = Some(workdir);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.audio = Some(BufWriter::new(audio));
        self.audio_samples = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer, _timestamp: f64) -> Result<()> {
        check_frame(&self.settings, frame)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ReelsyncError::encoder("capture not started"))?;
        stdin
            .write_all(frame.as_bytes())
            .map_err(|e| ReelsyncError::encoder(format!("Failed to write frame: {e}")))
    }

    fn push_audio(&mut self, samples: &[f32]) -> Result<()> {
        let audio = self
            .audio
            .as_mut()
            .ok_or_else(|| ReelsyncError::encoder("capture not started"))?;
        for s in samples {
            audio
                .write_all(&s.to_le_bytes())
                .map_err(|e| ReelsyncError::encoder(format!("Failed to spool audio: {e}")))?;
        }
        self.audio_samples += samples.len();
        Ok(())
    }

    fn poll_chunks(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }

    fn finalize(mut self: Box<Self>) -> Result<Vec<Vec<u8>>> {
        // Close stdin to signal end-of-stream
        drop(self.stdin.take());

        if let Some(mut child) = self.child.take() {
            let status = child
                .wait()
                .map_err(|e| ReelsyncError::encoder(format!("Failed to wait for ffmpeg: {e}")))?;
            if !status.success() {
                return Err(ReelsyncError::encoder(format!(
                    "ffmpeg exited with status: {status}"
                )));
            }
        }
        if let Some(mut audio) = self.audio.take() {
            audio
                .flush()
                .map_err(|e| ReelsyncError::encoder(format!("Failed to spool audio: {e}")))?;
        }
        let workdir = self
            .workdir
            .take()
            .ok_or_else(|| ReelsyncError::encoder("capture not started"))?;

        let bytes = if self.audio_samples == 0 {
            debug!("No capture audio, keeping the video-only stream");
            std::fs::read(workdir.path().join(VIDEO_FILE))?
        } else {
            self.mux(workdir.path())?
        };
        info!(
            bytes = bytes.len(),
            audio_samples = self.audio_samples,
            "FFmpeg capture finalized"
        );
        Ok(vec![bytes])
    }
}

impl Drop for FfmpegCaptureSink {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CaptureSettings {
        CaptureSettings::new(Size::new(4, 2), AudioSpec::default())
    }

    #[test]
    fn test_raw_capture_round_trip() {
        let mut sink = RawCaptureBackend.create(&settings()).unwrap();
        sink.start().unwrap();
        sink.push_frame(&FrameBuffer::filled(4, 2, [9, 8, 7, 255]), 0.0).unwrap();
        sink.push_audio(&[0.5, -0.5]).unwrap();
        let mut chunks = sink.poll_chunks();
        sink.push_frame(&FrameBuffer::new(4, 2), 1.0 / 30.0).unwrap();
        chunks.extend(sink.finalize().unwrap());

        let bytes: Vec<u8> = chunks.concat();
        let capture = RawCapture::parse(&bytes).unwrap();
        assert_eq!(capture.header.width, 4);
        assert_eq!(capture.frames.len(), 2);
        assert_eq!(capture.frames[0].frame.pixel(0, 0), Some([9, 8, 7, 255]));
        assert!((capture.frames[1].timestamp - 1.0 / 30.0).abs() < 1e-6);
        assert_eq!(capture.audio, vec![0.5, -0.5]);
    }

    #[test]
    fn test_raw_capture_rejects_wrong_frame_size() {
        let mut sink = RawCaptureBackend.create(&settings()).unwrap();
        sink.start().unwrap();
        assert!(sink.push_frame(&FrameBuffer::new(8, 8), 0.0).is_err());
    }

    #[test]
    fn test_raw_capture_requires_start() {
        let mut sink = RawCaptureBackend.create(&settings()).unwrap();
        assert!(sink.push_audio(&[0.1]).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RawCapture::parse(b"not a capture").is_err());
    }

    #[test]
    fn test_ffmpeg_args() {
        let args =
            FfmpegCaptureBackend::default().ffmpeg_args(&settings(), Path::new("out/video.webm"));
        assert!(args.contains(&"libvpx-vp9".to_string()));
        assert!(args.contains(&"4x2".to_string()));
        assert!(args.contains(&"30/1".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out/video.webm"));
    }

    #[test]
    fn test_mux_args_add_opus_track() {
        let settings = CaptureSettings::new(Size::new(4, 2), AudioSpec::new(44_100, 2));
        let args = FfmpegCaptureBackend::default().mux_args(
            &settings,
            Path::new("v.webm"),
            Path::new("a.f32"),
            Path::new("out.webm"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-f f32le -ar 44100 -ac 2 -i a.f32"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0 -c:v copy -c:a libopus"));
        assert!(joined.contains("-ar 48000"));
        assert_eq!(args.last().map(String::as_str), Some("out.webm"));
    }

    #[test]
    fn test_ffmpeg_capture_muxes_audio() {
        if !crate::ffmpeg::tools_available() {
            return;
        }
        let settings = CaptureSettings::new(Size::new(64, 36), AudioSpec::new(48_000, 2));
        let mut sink = FfmpegCaptureBackend::default().create(&settings).unwrap();
        sink.start().unwrap();
        let audio = vec![0.25f32; 3200];
        for i in 0..15 {
            sink.push_frame(&FrameBuffer::filled(64, 36, [40, 90, 160, 255]), i as f64 / 30.0)
                .unwrap();
            sink.push_audio(&audio).unwrap();
        }
        let bytes: Vec<u8> = sink.finalize().unwrap().concat();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.webm");
        std::fs::write(&path, &bytes).unwrap();
        let info = crate::ffmpeg::probe_file(&path).unwrap();
        assert!(info.has_audio);
        assert_eq!(info.size, Some(Size::new(64, 36)));
    }
}
