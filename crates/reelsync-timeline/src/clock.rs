//! Virtual timeline clock: maps global time to a clip and local offset.
//!
//! Both the synchronizer and the compositor resolve through
//! [`resolve_clip_at`], so they always agree on which clip is active.

use reelsync_core::{ClipId, END_EPSILON};
use serde::Serialize;

use crate::clip::Clip;

/// Where a global time lands on the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipPosition {
    /// Index of the clip in the playlist.
    pub index: usize,
    pub clip_id: ClipId,
    /// Global time at which the clip's trim window begins.
    pub clip_start: f64,
    /// Offset into the trim window.
    pub offset: f64,
    /// Set when the time lies at or past the end of the timeline.
    pub is_terminal: bool,
}

impl ClipPosition {
    /// Source-local time for this position.
    pub fn local_time(&self, clip: &Clip) -> f64 {
        clip.local_time(self.offset)
    }
}

/// Find the clip whose trim window contains `global_time`.
///
/// Returns the first clip whose interval `[start, start + width)` contains
/// the time. Times within [`END_EPSILON`] of the end, or past it, resolve to
/// the last clip with `offset` equal to its full width. An empty playlist
/// resolves to `None`.
pub fn resolve_clip_at(clips: &[Clip], global_time: f64) -> Option<ClipPosition> {
    let last = clips.len().checked_sub(1)?;

    let mut elapsed = 0.0;
    for (index, clip) in clips.iter().enumerate() {
        let width = clip.trimmed_duration();
        if global_time >= elapsed && global_time < elapsed + width {
            return Some(ClipPosition {
                index,
                clip_id: clip.id,
                clip_start: elapsed,
                offset: global_time - elapsed,
                is_terminal: false,
            });
        }
        elapsed += width;
    }

    if global_time >= elapsed - END_EPSILON {
        let width = clips[last].trimmed_duration();
        return Some(ClipPosition {
            index: last,
            clip_id: clips[last].id,
            clip_start: elapsed - width,
            offset: width,
            is_terminal: true,
        });
    }

    None
}

/// Global start time of the clip at `index` (sum of the widths before it).
pub fn clip_start(clips: &[Clip], index: usize) -> f64 {
    clips[..index.min(clips.len())]
        .iter()
        .map(Clip::trimmed_duration)
        .sum()
}
