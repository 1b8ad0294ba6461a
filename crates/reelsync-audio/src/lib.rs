//! Reelsync Audio - Routing graph and mixing
//!
//! Architecture:
//! - `RingBuffer`: Lock-free SPSC buffer between the mixer and its consumers
//! - `Mixer`: Combines the three channel buses with gain and a master limiter
//! - `AudioGraph`: Lazy, memoized source connections feeding the mixer, with
//!   a live monitor output and a capture tap
//! - `MonitorOutput` (feature `monitor-device`): drains the monitor output
//!   into the default audio device

pub mod graph;
pub mod mixer;
#[cfg(feature = "monitor-device")]
pub mod monitor;
pub mod ring_buffer;

pub use graph::{AudioGraph, SourceKey};
pub use mixer::{Channel, Mixer};
#[cfg(feature = "monitor-device")]
pub use monitor::MonitorOutput;
pub use ring_buffer::RingBuffer;
