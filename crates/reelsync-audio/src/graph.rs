//! Audio routing graph.
//!
//! Sources are connected lazily, each at most once, to one of three
//! persistent channels. Every mix block is fanned out to a live monitor
//! output and to the capture tap read by the recording pipeline.

use reelsync_core::{AudioSpec, ClipId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::mixer::{Channel, Mixer};
use crate::ring_buffer::RingBuffer;

/// Identifies a connectable audio source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKey {
    Clip(ClipId),
    Overlay,
    External,
}

impl SourceKey {
    /// The channel this source feeds.
    pub fn channel(self) -> Channel {
        match self {
            Self::Clip(_) => Channel::Main,
            Self::Overlay => Channel::Overlay,
            Self::External => Channel::External,
        }
    }
}

struct Outputs {
    monitor: Arc<RingBuffer>,
    capture: Arc<RingBuffer>,
}

/// The engine's single audio graph.
pub struct AudioGraph {
    spec: AudioSpec,
    ring_capacity: usize,
    outputs: Option<Outputs>,
    connections: BTreeSet<SourceKey>,
    mixer: Mixer,
    buses: [Vec<f32>; 3],
    pull_buf: Vec<f32>,
}

impl AudioGraph {
    /// A graph producing `spec` audio; each output buffers up to
    /// `ring_capacity` samples. Nothing is allocated until [`AudioGraph::init`].
    pub fn new(spec: AudioSpec, ring_capacity: usize, limiter: Option<f32>) -> Self {
        Self {
            spec,
            ring_capacity,
            outputs: None,
            connections: BTreeSet::new(),
            mixer: Mixer::new(limiter),
            buses: Default::default(),
            pull_buf: Vec::new(),
        }
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Create the outputs. Idempotent.
    pub fn init(&mut self) {
        if self.outputs.is_some() {
            return;
        }
        self.outputs = Some(Outputs {
            monitor: Arc::new(RingBuffer::new(self.ring_capacity)),
            capture: Arc::new(RingBuffer::new(self.ring_capacity)),
        });
        info!(
            sample_rate = self.spec.sample_rate,
            channels = self.spec.channels,
            "Audio graph initialized"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.outputs.is_some()
    }

    /// Drop every connection and both outputs.
    pub fn teardown(&mut self) {
        if self.outputs.take().is_some() {
            info!(connections = self.connections.len(), "Audio graph torn down");
        }
        self.connections.clear();
    }

    /// Connect a source to its channel. Initializes the graph on first use.
    ///
    /// Returns `false` if the source was already connected.
    pub fn connect(&mut self, key: SourceKey) -> bool {
        self.init();
        let added = self.connections.insert(key);
        if added {
            debug!(?key, channel = %key.channel(), "Audio source connected");
        }
        added
    }

    /// Remove a source's connection. Returns `false` if it was not connected.
    pub fn disconnect(&mut self, key: SourceKey) -> bool {
        let removed = self.connections.remove(&key);
        if removed {
            debug!(?key, "Audio source disconnected");
        }
        removed
    }

    pub fn is_connected(&self, key: SourceKey) -> bool {
        self.connections.contains(&key)
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn gain(&self, channel: Channel) -> f32 {
        self.mixer.gain(channel)
    }

    /// Set a channel gain; takes effect on the next mix block.
    pub fn set_gain(&mut self, channel: Channel, gain: f32) -> Option<f32> {
        self.mixer.set_gain(channel, gain)
    }

    /// Mix one block of `frames` frames.
    ///
    /// `pull` is called once per connected source to fill its share of the
    /// block and returns how many samples it wrote. The mixed block is written
    /// to both outputs; returns the block length in samples (zero before
    /// `init`).
    pub fn mix<F>(&mut self, frames: usize, mut pull: F) -> usize
    where
        F: FnMut(SourceKey, &mut [f32]) -> usize,
    {
        let Some(outputs) = &self.outputs else {
            return 0;
        };
        let len = self.spec.samples_for_frames(frames);
        for bus in self.buses.iter_mut() {
            bus.clear();
            bus.resize(len, 0.0);
        }
        self.pull_buf.resize(len, 0.0);

        for key in &self.connections {
            self.pull_buf.fill(0.0);
            let written = pull(*key, &mut self.pull_buf).min(len);
            let bus = &mut self.buses[key.channel().index()];
            for (acc, sample) in bus.iter_mut().zip(&self.pull_buf[..written]) {
                *acc += sample;
            }
        }

        let block = self.mixer.mix(
            [&self.buses[0], &self.buses[1], &self.buses[2]],
            len,
        );
        outputs.monitor.write(block);
        outputs.capture.write(block);
        len
    }

    /// The live monitoring output, for a device callback to drain.
    pub fn monitor_output(&self) -> Option<Arc<RingBuffer>> {
        self.outputs.as_ref().map(|o| Arc::clone(&o.monitor))
    }

    /// Take everything queued on the capture tap.
    pub fn drain_capture(&self) -> Vec<f32> {
        self.outputs
            .as_ref()
            .map(|o| o.capture.drain())
            .unwrap_or_default()
    }

    /// Discard queued capture-tap audio (before a new recording starts).
    pub fn clear_capture(&self) {
        if let Some(outputs) = &self.outputs {
            outputs.capture.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> AudioGraph {
        AudioGraph::new(AudioSpec::new(100, 2), 4096, None)
    }

    #[test]
    fn test_connect_is_memoized() {
        let mut graph = graph();
        let clip = SourceKey::Clip(ClipId::new());
        assert!(graph.connect(clip));
        assert!(!graph.connect(clip));
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_connect_initializes_lazily() {
        let mut graph = graph();
        assert!(!graph.is_initialized());
        graph.connect(SourceKey::Overlay);
        assert!(graph.is_initialized());
        assert!(graph.monitor_output().is_some());
    }

    #[test]
    fn test_mix_before_init_is_silent() {
        let mut graph = graph();
        assert_eq!(graph.mix(10, |_, _| unreachable!()), 0);
    }

    #[test]
    fn test_mix_routes_each_source_once() {
        let mut graph = graph();
        let clip = SourceKey::Clip(ClipId::new());
        graph.connect(clip);
        graph.connect(clip);
        graph.connect(SourceKey::External);
        graph.set_gain(Channel::External, 0.5);

        let mut calls = 0;
        let len = graph.mix(5, |key, out| {
            calls += 1;
            let level = if key == SourceKey::External { 0.2 } else { 0.1 };
            out.fill(level);
            out.len()
        });
        assert_eq!(len, 10);
        assert_eq!(calls, 2);

        let captured = graph.drain_capture();
        assert_eq!(captured.len(), 10);
        assert!((captured[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_gain_changes_apply_without_reconnecting() {
        let mut graph = graph();
        graph.connect(SourceKey::Overlay);
        graph.set_gain(Channel::Overlay, 0.0);
        graph.mix(2, |_, out| {
            out.fill(1.0);
            out.len()
        });
        assert!(graph.drain_capture().iter().all(|s| *s == 0.0));
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_teardown_drops_everything() {
        let mut graph = graph();
        graph.connect(SourceKey::External);
        graph.teardown();
        assert_eq!(graph.connection_count(), 0);
        assert!(!graph.is_initialized());
        assert!(graph.drain_capture().is_empty());
    }
}
