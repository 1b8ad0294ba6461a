//! Reelsync Core - Foundation types for the timeline engine
//!
//! This crate provides the fundamental types used throughout reelsync:
//! - Error type and result alias
//! - Audio stream format
//! - Clip identifiers
//! - Timeline constants and frame rates
//! - RGBA frame buffers for the compositor surface
//! - Geometric primitives (crop and overlay rectangles)
//! - The action-logging (telemetry) side channel

pub mod audio;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod id;
pub mod telemetry;
pub mod time;

pub use audio::AudioSpec;
pub use error::{ReelsyncError, Result};
pub use frame::{FrameBuffer, Rgba, SharedFrameBuffer};
pub use geometry::{Rect, Size};
pub use id::ClipId;
pub use telemetry::{Action, ActionCategory, ActionEntry, ActionHistory, ActionLog, TracingActionLog};
pub use time::{clamp_time, FrameRate, CAPTURE_FPS, END_EPSILON, HANDOFF_EPSILON, MIN_TRIM_DURATION};
