//! Integration tests for playback: controller, synchronizer and sources
//! driven through the editor session.

use reelsync_core::{Action, ReelsyncError, HANDOFF_EPSILON};
use reelsync_engine::{Command, PlaybackState};
use reelsync_media::{MediaResource, SimulatedMedia};
use reelsync_timeline::TrimBound;

use crate::support::Studio;

// ── Boundary hand-off ──────────────────────────────────────────

#[test]
fn boundary_crossing_lands_on_next_clip() {
    let (mut studio, _) = Studio::new();
    let a = studio.clip("a", SimulatedMedia::video(3.0));
    let b = studio.clip("b", SimulatedMedia::video(2.0));
    studio.session.play();

    studio.advance(2.98);
    let report = studio.advance(0.04);
    let sync = report.sync.unwrap();
    assert_eq!(sync.active, Some(b));
    assert_eq!(sync.handoff.map(|h| (h.from, h.to)), Some((a, b)));
    assert!(report.time >= 3.0 && report.time < 3.05);
    assert!((report.time - (3.0 + HANDOFF_EPSILON)).abs() < 1e-9);

    // the next tick is driven by clip b's clock
    let report = studio.advance(0.5);
    assert_eq!(report.sync.unwrap().active, Some(b));
    assert!((report.time - 3.5).abs() < 1e-9);
}

#[test]
fn handoff_respects_trim_start_of_next_clip() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(1.0));
    let b = studio.clip("b", SimulatedMedia::video(4.0));
    studio.session.set_trim(b, TrimBound::Start, 1.5).unwrap();
    studio.session.play();

    studio.advance(1.1);
    let b_handle = studio.ingest.handle("b").unwrap();
    assert!(b_handle.is_playing());
    assert!((b_handle.local_time() - 1.5).abs() < 1e-9);

    let report = studio.advance(1.0);
    assert!((report.time - 2.0).abs() < 1e-9);
}

#[test]
fn playback_stops_at_end_of_timeline() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(1.0));
    studio.session.play();

    let mut finished = 0;
    for _ in 0..120 {
        let report = studio.step();
        if report.sync.is_some_and(|s| s.finished) {
            finished += 1;
        }
    }
    assert_eq!(finished, 1);
    assert_eq!(studio.session.state(), PlaybackState::Paused);
    assert_eq!(studio.session.current_time(), 1.0);
    assert!(!studio.ingest.handle("a").unwrap().is_playing());

    // play at the end restarts from zero
    assert!(studio.session.play());
    assert_eq!(studio.session.current_time(), 0.0);
}

#[test]
fn unready_source_holds_the_playhead() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0));
    studio.session.play();
    studio.advance(1.0);

    let handle = studio.ingest.handle("a").unwrap();
    handle.set_ready(false);
    let held = studio.advance(0.5).time;
    assert!((held - 1.0).abs() < 1e-9);

    handle.set_ready(true);
    let report = studio.advance(0.1);
    assert!((report.time - 1.6).abs() < 1e-9);
}

#[test]
fn handoff_seeks_only_the_incoming_clip() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(1.0));
    let b = studio.clip("b", SimulatedMedia::video(2.0));
    studio.clip("c", SimulatedMedia::video(2.0));
    studio.session.set_trim(b, TrimBound::Start, 0.5).unwrap();
    studio.session.play();

    let handles: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| studio.ingest.handle(name).unwrap())
        .collect();
    let before: Vec<usize> = handles.iter().map(|h| h.seek_calls()).collect();

    studio.advance(1.02);
    assert_eq!(handles[0].seek_calls(), before[0]);
    assert_eq!(handles[1].seek_calls(), before[1] + 1);
    assert_eq!(handles[2].seek_calls(), before[2]);
    assert!(!handles[0].is_playing());
    assert!(handles[1].is_playing());
    assert!((handles[1].local_time() - 0.5).abs() < 1e-9);

    // a seek repositions every clip, parking the inactive ones
    studio.session.seek(0.25);
    assert_eq!(handles[0].seek_calls(), before[0] + 1);
    assert_eq!(handles[1].seek_calls(), before[1] + 2);
    assert_eq!(handles[2].seek_calls(), before[2] + 1);
    assert!(handles[0].is_playing());
    assert!((handles[0].local_time() - 0.25).abs() < 1e-9);
    assert!(!handles[1].is_playing());
    assert!((handles[1].local_time() - 0.5).abs() < 1e-9);
    assert!(!handles[2].is_playing());
    assert_eq!(handles[2].local_time(), 0.0);
}

// ── Seeking ────────────────────────────────────────────────────

#[test]
fn seek_clamps_to_timeline() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0));
    studio.clip("b", SimulatedMedia::video(2.0));

    for (requested, expected) in [(-4.0, 0.0), (2.5, 2.5), (4.0, 4.0), (9.0, 5.0)] {
        assert_eq!(studio.session.seek(requested), Some(expected));
        assert_eq!(studio.session.current_time(), expected);
    }
    assert_eq!(studio.session.seek(f64::NAN), None);
    assert_eq!(studio.session.current_time(), 5.0);
}

#[test]
fn seek_parks_inactive_clips_at_trim_start() {
    let (mut studio, _) = Studio::new();
    let a = studio.clip("a", SimulatedMedia::video(3.0));
    studio.clip("b", SimulatedMedia::video(2.0));
    studio.session.set_trim(a, TrimBound::Start, 1.0).unwrap();
    studio.session.play();
    studio.session.seek(3.0);

    let a_handle = studio.ingest.handle("a").unwrap();
    let b_handle = studio.ingest.handle("b").unwrap();
    assert!(!a_handle.is_playing());
    assert!((a_handle.local_time() - 1.0).abs() < 1e-9);
    assert!(b_handle.is_playing());
    assert!((b_handle.local_time() - 1.0).abs() < 1e-9);
}

// ── Scrubbing ──────────────────────────────────────────────────

#[test]
fn scrub_resumes_playback() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0));
    studio.session.play();
    studio.advance(0.5);

    studio.session.dispatch(Command::BeginScrub).unwrap();
    studio.session.dispatch(Command::ScrubTo { time: 2.0 }).unwrap();
    let report = studio.step();
    assert!(report.sync.is_none());
    assert_eq!(report.time, 2.0);

    studio.session.dispatch(Command::EndScrub).unwrap();
    assert_eq!(studio.session.state(), PlaybackState::Playing);
    let report = studio.advance(0.25);
    assert!((report.time - 2.25).abs() < 1e-9);
}

#[test]
fn pause_during_scrub_stays_paused() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0));
    studio.session.play();
    studio.session.begin_scrub();
    studio.session.pause().unwrap();
    assert_eq!(studio.session.end_scrub(), PlaybackState::Paused);
    assert!(!studio.ingest.handle("a").unwrap().is_playing());
}

// ── Playlist edits during playback ─────────────────────────────

#[test]
fn removing_selected_clip_through_session() {
    let (mut studio, _) = Studio::new();
    let a = studio.clip("a", SimulatedMedia::video(3.0));
    let b = studio.clip("b", SimulatedMedia::video(2.0));
    studio.session.select_clip(b).unwrap();

    studio.session.remove_clip(a).unwrap();
    assert_eq!(studio.session.playlist().selected(), Some(b));
    studio.session.remove_clip(b).unwrap();
    assert_eq!(studio.session.playlist().selected(), None);
    assert_eq!(studio.session.state(), PlaybackState::Idle);
    assert_eq!(studio.history.count(Action::RemoveClip), 2);
}

#[test]
fn unknown_clip_is_not_found() {
    let (mut studio, _) = Studio::new();
    let a = studio.clip("a", SimulatedMedia::video(3.0));
    studio.session.remove_clip(a).unwrap();
    assert!(matches!(
        studio.session.select_clip(a),
        Err(ReelsyncError::NotFound(id)) if id == a
    ));
    assert!(studio.session.set_trim(a, TrimBound::End, 1.0).is_err());
}

#[test]
fn late_probe_extends_running_timeline() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(2.0));
    studio.ingest.defer_probes(true);
    studio.clip("b", SimulatedMedia::video(2.0));
    assert_eq!(studio.session.total_duration(), 2.0);

    studio.session.play();
    studio.advance(1.0);
    studio.ingest.resolve_pending();
    let report = studio.step();
    assert_eq!(report.probes_resolved, 1);
    assert_eq!(studio.session.total_duration(), 4.0);
    assert_eq!(report.state, PlaybackState::Playing);
}

#[test]
fn unreadable_media_keeps_zero_width_clip() {
    let (mut studio, _) = Studio::new();
    let broken = studio
        .session
        .add_clip(&MediaResource::named("does-not-exist"));
    studio.clip("a", SimulatedMedia::video(2.0));

    let clip = studio.session.playlist().get(broken).unwrap();
    assert_eq!(clip.trimmed_duration(), 0.0);
    assert_eq!(studio.session.total_duration(), 2.0);

    studio.session.play();
    let report = studio.advance(0.5);
    assert!((report.time - 0.5).abs() < 1e-9);
}

#[test]
fn snapshot_reflects_session() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0));
    studio.session.seek(1.25);
    let snapshot = studio.session.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Paused);
    assert_eq!(snapshot.total_duration, 3.0);
    assert_eq!(snapshot.current_time, 1.25);
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.clips.len(), 1);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["state"], "paused");
    assert_eq!(json["clips"][0]["name"], "a");
}
