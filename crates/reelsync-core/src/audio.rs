//! Audio stream format shared by sources, the routing graph and capture.

use serde::{Deserialize, Serialize};

/// Interleaved f32 PCM stream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioSpec {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel) covering `seconds`.
    pub fn frames_for(self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate as f64).round() as usize
    }

    /// Number of interleaved samples covering `frames` frames.
    #[inline]
    pub fn samples_for_frames(self, frames: usize) -> usize {
        frames * self.channels as usize
    }
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self::new(48_000, 2)
    }
}
