//! Timeline constants and frame rates.
//!
//! Timeline positions are `f64` seconds. Source clocks report in seconds as
//! well, so global time is derived directly from them without conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tolerance for treating a position as the end of the timeline.
pub const END_EPSILON: f64 = 0.1;

/// Offset added past a clip boundary on hand-off so the same boundary is not
/// detected again on the next tick.
pub const HANDOFF_EPSILON: f64 = 0.01;

/// Shortest allowed trim window, in seconds.
pub const MIN_TRIM_DURATION: f64 = 0.5;

/// Frame rate at which the recording pipeline samples the compositor.
pub const CAPTURE_FPS: FrameRate = FrameRate::FPS_30;

/// A frame rate as a rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);

    /// Create a new frame rate.
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Create an integer frame rate; zero is bumped to one.
    pub fn from_fps(fps: u32) -> Self {
        Self::new(fps.max(1), 1)
    }

    /// Frames per second as a float.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator.max(1) as f64
    }

    /// Duration of one frame in seconds.
    #[inline]
    pub fn frame_seconds(self) -> f64 {
        self.denominator as f64 / self.numerator.max(1) as f64
    }

    /// Duration of one frame.
    pub fn frame_interval(self) -> Duration {
        Duration::from_secs_f64(self.frame_seconds())
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{} fps", self.numerator)
        } else {
            write!(f, "{:.3} fps", self.to_fps_f64())
        }
    }
}

/// Clamp `t` into `[0, max]`, treating a negative `max` as zero.
#[inline]
pub fn clamp_time(t: f64, max: f64) -> f64 {
    t.max(0.0).min(max.max(0.0))
}
