//! Integration tests for the playlist model and the virtual clock.

use proptest::prelude::*;
use reelsync_core::MIN_TRIM_DURATION;
use reelsync_timeline::{resolve_clip_at, Clip, Playlist, TrimBound};

// ── Helpers ────────────────────────────────────────────────────

fn trimmed(name: &str, duration: f64, start: f64, end: f64) -> Clip {
    let mut clip = Clip::with_duration(name, duration);
    clip.set_trim(TrimBound::End, end);
    clip.set_trim(TrimBound::Start, start);
    clip
}

/// `[{10s, 2–8}, {5s, 0–5}]`
fn two_clip_playlist() -> Playlist {
    let mut playlist = Playlist::new();
    playlist.add(trimmed("first", 10.0, 2.0, 8.0));
    playlist.add(trimmed("second", 5.0, 0.0, 5.0));
    playlist
}

// ── Worked example ─────────────────────────────────────────────

#[test]
fn total_is_sum_of_trim_windows() {
    assert_eq!(two_clip_playlist().total_duration(), 11.0);
    assert_eq!(Playlist::new().total_duration(), 0.0);
}

#[test]
fn resolve_inside_first_clip() {
    let playlist = two_clip_playlist();
    let pos = playlist.resolve_clip_at(7.0).unwrap();
    assert_eq!(pos.index, 0);
    assert!((pos.offset - 5.0).abs() < 1e-9);
    assert!(!pos.is_terminal);
    // offset 5 past trim start 2
    let clip = playlist.at(0).unwrap();
    assert!((pos.local_time(clip) - 7.0).abs() < 1e-9);
}

#[test]
fn resolve_inside_second_clip() {
    let playlist = two_clip_playlist();
    let pos = playlist.resolve_clip_at(9.0).unwrap();
    assert_eq!(pos.index, 1);
    assert!((pos.offset - 1.0).abs() < 1e-9);
    assert_eq!(pos.clip_start, 6.0);
}

#[test]
fn resolve_at_total_is_terminal_sentinel() {
    let playlist = two_clip_playlist();
    let pos = playlist.resolve_clip_at(11.0).unwrap();
    assert!(pos.is_terminal);
    assert_eq!(pos.index, 1);
    assert_eq!(pos.offset, 5.0);

    let past = playlist.resolve_clip_at(50.0).unwrap();
    assert!(past.is_terminal);
}

#[test]
fn zero_width_clips_are_never_active() {
    let mut playlist = Playlist::new();
    playlist.add(Clip::with_duration("a", 2.0));
    let pending = playlist.add(Clip::pending("pending"));
    playlist.add(Clip::with_duration("b", 2.0));

    assert_eq!(playlist.total_duration(), 4.0);
    for i in 0..40 {
        let pos = playlist.resolve_clip_at(i as f64 * 0.1).unwrap();
        assert_ne!(pos.clip_id, pending);
    }
}

// ── Selection ──────────────────────────────────────────────────

#[test]
fn removing_selected_clip_clears_selection() {
    let mut playlist = Playlist::new();
    let a = playlist.add(Clip::with_duration("a", 1.0));
    let b = playlist.add(Clip::with_duration("b", 1.0));
    assert_eq!(playlist.selected(), Some(a));

    playlist.remove(a).unwrap();
    assert_eq!(playlist.selected(), None);

    let c = playlist.add(Clip::with_duration("c", 1.0));
    playlist.select(c).unwrap();
    playlist.remove(b).unwrap();
    assert_eq!(playlist.selected(), Some(c));
}

#[test]
fn playlist_serializes_as_json() {
    let playlist = two_clip_playlist();
    let json = serde_json::to_value(playlist.clips()).unwrap();
    let clips: Vec<Clip> = serde_json::from_value(json).unwrap();
    assert_eq!(clips, playlist.clips());
}

// ── Properties ─────────────────────────────────────────────────

fn trim_op() -> impl Strategy<Value = (bool, f64)> {
    (any::<bool>(), -5.0f64..120.0)
}

proptest! {
    #[test]
    fn trim_window_stays_valid(
        duration in MIN_TRIM_DURATION..100.0,
        ops in prop::collection::vec(trim_op(), 0..20),
    ) {
        let mut clip = Clip::with_duration("clip", duration);
        for (is_start, value) in ops {
            let bound = if is_start { TrimBound::Start } else { TrimBound::End };
            clip.set_trim(bound, value);
            prop_assert!(clip.trim_start() >= 0.0);
            prop_assert!(clip.trim_end() <= duration);
            prop_assert!(clip.trim_end() - clip.trim_start() >= MIN_TRIM_DURATION - 1e-9);
        }
    }

    #[test]
    fn total_matches_sum_of_widths(
        durations in prop::collection::vec(0.0f64..50.0, 0..8),
    ) {
        let mut playlist = Playlist::new();
        for (i, d) in durations.iter().enumerate() {
            playlist.add(Clip::with_duration(format!("clip-{i}"), *d));
        }
        let sum: f64 = playlist.clips().iter().map(Clip::trimmed_duration).sum();
        prop_assert!((playlist.total_duration() - sum).abs() < 1e-9);
    }

    #[test]
    fn resolve_is_total_on_timeline(
        durations in prop::collection::vec(0.5f64..20.0, 1..6),
        fraction in 0.0f64..1.0,
    ) {
        let clips: Vec<Clip> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| Clip::with_duration(format!("clip-{i}"), *d))
            .collect();
        let total: f64 = clips.iter().map(Clip::trimmed_duration).sum();
        let t = total * fraction;

        let pos = resolve_clip_at(&clips, t).unwrap();
        let width = clips[pos.index].trimmed_duration();
        prop_assert!(!pos.is_terminal);
        prop_assert!(pos.offset >= 0.0);
        prop_assert!(pos.offset < width + 1e-9);
        // pure: same answer twice
        prop_assert_eq!(resolve_clip_at(&clips, t), Some(pos));
    }
}
