//! Clip types for the timeline.

use reelsync_core::{ClipId, MIN_TRIM_DURATION};
use serde::{Deserialize, Serialize};

/// Which end of a trim window is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimBound {
    Start,
    End,
}

/// A clip on the timeline.
///
/// The trim window `[trim_start, trim_end]` always satisfies
/// `0 <= trim_start <= trim_end <= duration`, and is at least
/// [`MIN_TRIM_DURATION`] long whenever the source itself is that long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Clip name (displayed in UI)
    pub name: String,
    duration: f64,
    trim_start: f64,
    trim_end: f64,
    /// Whether the source duration has been probed yet.
    resolved: bool,
}

impl Clip {
    /// Create a clip whose duration is still being probed.
    ///
    /// It contributes zero width to the timeline until [`Clip::set_duration`]
    /// is called.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            id: ClipId::new(),
            name: name.into(),
            duration: 0.0,
            trim_start: 0.0,
            trim_end: 0.0,
            resolved: false,
        }
    }

    /// Create a clip with a known duration, untrimmed.
    pub fn with_duration(name: impl Into<String>, duration: f64) -> Self {
        let mut clip = Self::pending(name);
        clip.set_duration(duration);
        clip
    }

    /// Full probed source duration.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[inline]
    pub fn trim_start(&self) -> f64 {
        self.trim_start
    }

    #[inline]
    pub fn trim_end(&self) -> f64 {
        self.trim_end
    }

    /// Length of the trim window; this is the clip's width on the timeline.
    #[inline]
    pub fn trimmed_duration(&self) -> f64 {
        self.trim_end - self.trim_start
    }

    /// Whether the duration probe has completed (successfully or not).
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Apply a probed duration and reset the trim window to the full source.
    ///
    /// Non-finite or negative durations are stored as zero.
    pub fn set_duration(&mut self, duration: f64) {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        self.duration = duration;
        self.trim_start = 0.0;
        self.trim_end = duration;
        self.resolved = true;
    }

    /// Move one trim bound, clamping against the other bound.
    ///
    /// Returns the value actually applied, or `None` if `value` is not finite.
    pub fn set_trim(&mut self, bound: TrimBound, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        match bound {
            TrimBound::Start => {
                let max = (self.trim_end - MIN_TRIM_DURATION).max(0.0);
                self.trim_start = value.clamp(0.0, max);
                Some(self.trim_start)
            }
            TrimBound::End => {
                let min = (self.trim_start + MIN_TRIM_DURATION).min(self.duration);
                self.trim_end = value.clamp(min, self.duration);
                Some(self.trim_end)
            }
        }
    }

    /// Source-local time for an offset into the trim window.
    #[inline]
    pub fn local_time(&self, offset: f64) -> f64 {
        self.trim_start + offset
    }
}
