//! Integration tests for the recording pipeline: session, recorder,
//! capture backends and artifact sinks.

use reelsync_core::{Action, ReelsyncError};
use reelsync_engine::{PlaybackState, UnavailableCapture};
use reelsync_media::{
    DirectorySink, FfmpegCaptureBackend, MemorySink, RawCapture, RawCaptureBackend, SimulatedMedia,
};
use std::sync::Arc;

use crate::support::Studio;

#[test]
fn auto_stop_saves_exactly_once() {
    let (mut studio, sink) = Studio::new();
    studio.clip("a", SimulatedMedia::video(0.6));
    studio.clip("b", SimulatedMedia::video(0.4));
    assert!((studio.session.total_duration() - 1.0).abs() < 1e-9);

    studio.session.start_recording().unwrap();
    let mut auto_stops = 0;
    for _ in 0..180 {
        if studio.step().auto_stopped {
            auto_stops += 1;
        }
    }

    assert_eq!(auto_stops, 1);
    assert_eq!(sink.len(), 1);
    assert_eq!(studio.history.count(Action::StopRecording), 1);
    assert_eq!(studio.history.count(Action::ExportComplete), 1);
    assert!(!studio.session.is_recording());
    assert_eq!(studio.session.state(), PlaybackState::Paused);
}

#[test]
fn recording_rewinds_and_captures_at_thirty_fps() {
    let (mut studio, sink) = Studio::new();
    studio.clip("a", SimulatedMedia::video(2.0).with_color([10, 20, 30, 255]));
    studio.session.seek(1.5);

    studio.session.start_recording().unwrap();
    assert_eq!(studio.session.current_time(), 0.0);
    assert_eq!(studio.session.state(), PlaybackState::Recording);

    // one second of 60 Hz ticks
    for _ in 0..60 {
        studio.step();
    }
    let frames = studio.session.frames_captured();
    assert!((29..=31).contains(&frames), "captured {frames}");

    studio.session.stop_recording().unwrap();
    let artifact = &sink.saved()[0];
    assert!(artifact.file_name.starts_with("edited-video-"));
    assert!(artifact.file_name.ends_with(".rawcap"));

    let capture = RawCapture::parse(&artifact.bytes).unwrap();
    assert_eq!(capture.header.width, 64);
    assert_eq!(capture.header.height, 36);
    assert_eq!(capture.frames.len() as u64, frames);
    assert_eq!(capture.frames[0].frame.pixel(32, 18), Some([10, 20, 30, 255]));
    // frames are timestamped in capture order
    assert!(capture
        .frames
        .windows(2)
        .all(|w| w[1].timestamp > w[0].timestamp));
}

#[test]
fn recording_carries_mixed_audio() {
    let (mut studio, sink) = Studio::new();
    studio.clip("a", SimulatedMedia::video(2.0).with_audio_level(Some(0.5)));
    studio.session.start_recording().unwrap();
    for _ in 0..10 {
        studio.step();
    }
    studio.session.stop_recording().unwrap();

    let capture = RawCapture::parse(&sink.saved()[0].bytes).unwrap();
    assert!(!capture.audio.is_empty());
    assert!(capture.audio.iter().any(|s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn capability_unavailable_leaves_state_untouched() {
    let sink = Arc::new(MemorySink::new());
    let mut studio = Studio::with(Box::new(UnavailableCapture), sink.clone());
    studio.clip("a", SimulatedMedia::video(2.0));
    studio.session.seek(0.75);
    let before = studio.session.snapshot();

    let err = studio.session.start_recording().unwrap_err();
    assert!(matches!(err, ReelsyncError::CapabilityUnavailable(_)));
    assert!(err.is_user_visible());
    assert_eq!(studio.session.snapshot(), before);
    assert!(sink.is_empty());
}

#[test]
fn empty_playlist_cannot_record() {
    let (mut studio, _) = Studio::new();
    assert!(matches!(
        studio.session.start_recording(),
        Err(ReelsyncError::EmptyPlaylist)
    ));
    assert_eq!(studio.session.state(), PlaybackState::Idle);
}

#[test]
fn stop_when_idle_is_noop() {
    let (mut studio, sink) = Studio::new();
    studio.clip("a", SimulatedMedia::video(2.0));
    assert!(studio.session.stop_recording().unwrap().is_none());
    assert!(sink.is_empty());
    assert_eq!(studio.history.count(Action::StopRecording), 0);
}

#[test]
fn directory_sink_writes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("recordings");
    let mut studio = Studio::with(
        Box::new(RawCaptureBackend),
        Arc::new(DirectorySink::new(&out)),
    );
    studio.clip("a", SimulatedMedia::video(1.0));
    studio.session.start_recording().unwrap();
    studio.step();
    studio.step();

    let saved = studio.session.stop_recording().unwrap().unwrap();
    assert!(saved.path.starts_with(&out));
    let bytes = std::fs::read(&saved.path).unwrap();
    assert_eq!(bytes.len(), saved.bytes);
    assert_eq!(RawCapture::parse(&bytes).unwrap().frames.len() as u64, saved.frames);
}

#[test]
fn webm_recording_carries_audio_track() {
    if !reelsync_media::ffmpeg::tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut studio = Studio::with(
        Box::new(FfmpegCaptureBackend::default()),
        Arc::new(DirectorySink::new(dir.path())),
    );
    studio.clip("a", SimulatedMedia::video(1.0).with_audio_level(Some(0.5)));
    studio.session.start_recording().unwrap();
    for _ in 0..30 {
        studio.step();
    }

    let saved = studio.session.stop_recording().unwrap().unwrap();
    assert!(saved.path.to_string_lossy().ends_with(".webm"));
    let info = reelsync_media::ffmpeg::probe_file(&saved.path).unwrap();
    assert!(info.has_audio);
    assert_eq!(info.size.map(|s| (s.width, s.height)), Some((64, 36)));
}
