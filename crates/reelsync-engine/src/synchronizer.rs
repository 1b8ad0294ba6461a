//! Per-tick media synchronization.
//!
//! While playing, the active clip's own clock is the source of truth: the
//! global playhead is derived from it, and crossing the trim end hands
//! playback to the next clip.

use reelsync_audio::SourceKey;
use reelsync_core::{ClipId, HANDOFF_EPSILON};
use reelsync_timeline::Playlist;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::registry::SourceRegistry;

/// A hand-off from one clip to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Handoff {
    pub from: ClipId,
    pub to: ClipId,
}

/// Outcome of one synchronizer step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SyncReport {
    /// The authoritative global time after this step.
    pub time: f64,
    /// Clip the step resolved to, if any.
    pub active: Option<ClipId>,
    pub handoff: Option<Handoff>,
    /// Set when playback ran off the end of the timeline.
    pub finished: bool,
}

impl SyncReport {
    fn unchanged(time: f64, active: Option<ClipId>) -> Self {
        Self {
            time,
            active,
            handoff: None,
            finished: false,
        }
    }
}

/// Advance the global playhead from the active source's clock.
///
/// A source that is missing or not ready leaves the time unchanged. A source
/// that drifted before its trim start is held at the clip start.
pub fn synchronize(
    playlist: &Playlist,
    sources: &mut SourceRegistry,
    current_time: f64,
) -> SyncReport {
    let Some(position) = playlist.resolve_clip_at(current_time) else {
        return SyncReport::unchanged(current_time, None);
    };
    let Some(clip) = playlist.at(position.index) else {
        return SyncReport::unchanged(current_time, None);
    };
    let key = SourceKey::Clip(clip.id);
    let local = match sources.get(key) {
        Some(source) if source.is_ready() => source.local_time(),
        _ => return SyncReport::unchanged(current_time, Some(clip.id)),
    };

    if local < clip.trim_end() {
        let time = position.clip_start + (local - clip.trim_start()).max(0.0);
        trace!(clip = %clip.id, local, time, "Synchronized");
        return SyncReport::unchanged(time, Some(clip.id));
    }

    sources.pause(key);

    // A clip no wider than the hand-off step would put the playhead past
    // its own end, inside a clip that was never started. Hand off past it;
    // such clips are never rendered.
    let next = (position.index + 1..playlist.len()).find(|&i| {
        playlist
            .at(i)
            .is_some_and(|c| c.trimmed_duration() > HANDOFF_EPSILON)
    });
    match next.and_then(|i| playlist.at(i).map(|c| (i, c))) {
        Some((index, next_clip)) => {
            let next_key = SourceKey::Clip(next_clip.id);
            sources.seek(next_key, next_clip.trim_start());
            sources.start(next_key);
            let time = playlist.clip_start(index) + HANDOFF_EPSILON;
            debug!(from = %clip.id, to = %next_clip.id, time, "Clip hand-off");
            SyncReport {
                time,
                active: Some(next_clip.id),
                handoff: Some(Handoff {
                    from: clip.id,
                    to: next_clip.id,
                }),
                finished: false,
            }
        }
        None => {
            sources.pause_all();
            let time = playlist.total_duration();
            info!(time, "Reached end of timeline");
            SyncReport {
                time,
                active: Some(clip.id),
                handoff: None,
                finished: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsync_media::{SimClock, SimulatedHandle, SimulatedMedia, SimulatedSource};
    use reelsync_timeline::{Clip, TrimBound};

    struct Fixture {
        playlist: Playlist,
        sources: SourceRegistry,
        handles: Vec<SimulatedHandle>,
        clock: SimClock,
    }

    fn fixture(durations: &[f64]) -> Fixture {
        let clock = SimClock::new();
        let mut playlist = Playlist::new();
        let mut sources = SourceRegistry::new();
        let mut handles = Vec::new();
        for (i, d) in durations.iter().enumerate() {
            let id = playlist.add(Clip::with_duration(format!("clip{i}"), *d));
            let source = SimulatedSource::new(SimulatedMedia::video(*d), clock.clone());
            handles.push(source.handle());
            sources.register(SourceKey::Clip(id), Box::new(source));
        }
        Fixture {
            playlist,
            sources,
            handles,
            clock,
        }
    }

    fn key(f: &Fixture, index: usize) -> SourceKey {
        SourceKey::Clip(f.playlist.clips()[index].id)
    }

    #[test]
    fn test_time_follows_active_source() {
        let mut f = fixture(&[10.0, 5.0]);
        let id = f.playlist.clips()[0].id;
        f.playlist.set_trim(id, TrimBound::Start, 2.0).unwrap();
        let k = key(&f, 0);
        f.sources.seek(k, 2.0);
        f.sources.start(k);
        f.clock.advance(1.5);

        let report = synchronize(&f.playlist, &mut f.sources, 0.0);
        assert!((report.time - 1.5).abs() < 1e-9);
        assert_eq!(report.active, Some(id));
        assert!(report.handoff.is_none());
    }

    #[test]
    fn test_boundary_hands_off_to_next_clip() {
        let mut f = fixture(&[3.0, 2.0]);
        let (a, b) = (key(&f, 0), key(&f, 1));
        f.sources.start(a);
        f.clock.advance(3.02);

        let report = synchronize(&f.playlist, &mut f.sources, 2.99);
        assert!(report.time >= 3.0 && report.time < 3.05);
        assert_eq!(report.active, Some(f.playlist.clips()[1].id));
        assert!(report.handoff.is_some());
        assert!(!f.handles[0].is_playing());
        assert!(f.handles[1].is_playing());
        assert!(f.sources.get(b).is_some_and(|s| s.local_time() == 0.0));
    }

    #[test]
    fn test_last_clip_finishes_timeline() {
        let mut f = fixture(&[1.0, 1.0]);
        let b = key(&f, 1);
        f.sources.start(b);
        f.clock.advance(1.0);

        let report = synchronize(&f.playlist, &mut f.sources, 1.5);
        assert!(report.finished);
        assert_eq!(report.time, 2.0);
        assert!(f.sources.playing().is_empty());
    }

    #[test]
    fn test_unready_source_leaves_time() {
        let mut f = fixture(&[4.0]);
        f.handles[0].set_ready(false);
        f.sources.start(key(&f, 0));
        f.clock.advance(2.0);
        let report = synchronize(&f.playlist, &mut f.sources, 0.7);
        assert_eq!(report.time, 0.7);
    }

    #[test]
    fn test_drift_before_trim_start_holds_clip_start() {
        let mut f = fixture(&[4.0, 4.0]);
        let id = f.playlist.clips()[1].id;
        f.playlist.set_trim(id, TrimBound::Start, 1.0).unwrap();
        f.handles[1].drift_to(0.2);
        let report = synchronize(&f.playlist, &mut f.sources, 4.5);
        assert_eq!(report.time, 4.0);
    }

    #[test]
    fn test_handoff_skips_zero_width_clips() {
        let mut f = fixture(&[1.0, 0.0, 2.0]);
        f.sources.start(key(&f, 0));
        f.clock.advance(1.0);
        let report = synchronize(&f.playlist, &mut f.sources, 0.9);
        assert_eq!(report.active, Some(f.playlist.clips()[2].id));
        assert!(f.handles[2].is_playing());
        assert!(!f.handles[1].is_playing());
    }

    #[test]
    fn test_handoff_skips_clips_narrower_than_step() {
        let mut f = fixture(&[1.0, 0.005, 2.0]);
        f.sources.start(key(&f, 0));
        f.clock.advance(1.0);

        let report = synchronize(&f.playlist, &mut f.sources, 0.9);
        let c = f.playlist.clips()[2].id;
        assert_eq!(report.active, Some(c));
        assert!((report.time - (1.005 + HANDOFF_EPSILON)).abs() < 1e-9);
        assert!(!f.handles[1].is_playing());
        assert!(f.handles[2].is_playing());

        // the next tick keeps advancing on the started clip
        f.clock.advance(0.5);
        let report = synchronize(&f.playlist, &mut f.sources, report.time);
        assert_eq!(report.active, Some(c));
        assert!((report.time - 1.505).abs() < 1e-9);
    }

    #[test]
    fn test_empty_playlist() {
        let mut sources = SourceRegistry::new();
        let report = synchronize(&Playlist::new(), &mut sources, 3.0);
        assert_eq!(report, SyncReport::unchanged(3.0, None));
    }
}
