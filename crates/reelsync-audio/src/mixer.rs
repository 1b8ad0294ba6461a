//! Channel mixer: sums the three channel buses into one output block.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three persistent mix channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Playlist clips.
    Main,
    /// The overlay clip's audio.
    Overlay,
    /// Background audio track.
    External,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Main, Self::Overlay, Self::External];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Main => 0,
            Self::Overlay => 1,
            Self::External => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Overlay => "overlay",
            Self::External => "external",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "overlay" => Ok(Self::Overlay),
            "external" | "audio" => Ok(Self::External),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// Mixes the channel buses with per-channel gain and a master limiter.
#[derive(Debug, Clone)]
pub struct Mixer {
    gains: [f32; 3],
    /// Master volume applied after summing.
    pub master_volume: f32,
    /// Hard-clip threshold in linear amplitude; `None` disables the limiter.
    pub limiter: Option<f32>,
    scratch: Vec<f32>,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(Some(0.98))
    }
}

impl Mixer {
    pub fn new(limiter: Option<f32>) -> Self {
        Self {
            gains: [1.0; 3],
            master_volume: 1.0,
            limiter,
            scratch: Vec::new(),
        }
    }

    /// Current gain of a channel, in `[0, 1]`.
    pub fn gain(&self, channel: Channel) -> f32 {
        self.gains[channel.index()]
    }

    /// Set a channel's gain, clamped to `[0, 1]`.
    ///
    /// NaN is ignored and returns `None`; otherwise returns the applied gain.
    pub fn set_gain(&mut self, channel: Channel, gain: f32) -> Option<f32> {
        if gain.is_nan() {
            return None;
        }
        let gain = gain.clamp(0.0, 1.0);
        self.gains[channel.index()] = gain;
        Some(gain)
    }

    /// Sum the three buses (indexed by [`Channel::index`]) into one block.
    ///
    /// Every bus is read up to `len` samples; shorter buses contribute
    /// silence for the remainder.
    pub fn mix(&mut self, buses: [&[f32]; 3], len: usize) -> &[f32] {
        self.scratch.clear();
        self.scratch.resize(len, 0.0);

        for channel in Channel::ALL {
            let gain = self.gains[channel.index()];
            if gain == 0.0 {
                continue;
            }
            let bus = buses[channel.index()];
            for (out, sample) in self.scratch.iter_mut().zip(bus) {
                *out += sample * gain;
            }
        }

        if self.master_volume != 1.0 {
            for s in self.scratch.iter_mut() {
                *s *= self.master_volume;
            }
        }

        if let Some(threshold) = self.limiter {
            for s in self.scratch.iter_mut() {
                *s = s.clamp(-threshold, threshold);
            }
        }

        &self.scratch
    }
}
