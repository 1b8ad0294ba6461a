//! Reelsync Engine - Timeline playback and compositing
//!
//! Drives a playlist of independently clocked sources from one logical
//! playhead:
//! - Playback state machine (play, pause, seek, scrub, record)
//! - Per-tick media synchronizer with clip hand-off
//! - Compositor (filter, crop, overlay)
//! - Recording pipeline with auto-stop
//! - The [`EditorSession`] facade and its tick scheduler

pub mod command;
pub mod compositor;
pub mod config;
pub mod controller;
pub mod recording;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod synchronizer;

pub use command::{ChannelGains, Command, OverlaySnapshot, SessionSnapshot};
pub use compositor::{Compositor, CropArea};
pub use config::{CaptureBackendKind, EngineConfig};
pub use controller::{PlaybackController, PlaybackState, Transport};
pub use recording::{FramePacer, Recorder, SavedRecording, UnavailableCapture};
pub use registry::SourceRegistry;
pub use scheduler::{CancelHandle, TickCadence, TickScheduler};
pub use session::{Collaborators, EditorSession, TickReport};
pub use synchronizer::{synchronize, Handoff, SyncReport};
