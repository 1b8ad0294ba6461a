//! The source-handle capability.
//!
//! Every media source (a playlist clip, the overlay, the background audio
//! track) runs its own clock. The engine only ever observes and steers it
//! through [`MediaSource`].

use reelsync_core::{ReelsyncError, SharedFrameBuffer, Size};
use thiserror::Error;

/// Why a source refused to start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// A pending start was superseded by a pause or seek. Expected during
    /// normal operation and swallowed by callers.
    #[error("start interrupted: {0}")]
    Interrupted(String),

    /// The source could not start for any other reason.
    #[error("start rejected: {0}")]
    Rejected(String),
}

impl StartError {
    #[inline]
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

impl From<StartError> for ReelsyncError {
    fn from(err: StartError) -> Self {
        ReelsyncError::PlaybackRejected(err.to_string())
    }
}

/// An independently clocked media source.
pub trait MediaSource: Send {
    /// The source's own playback position in seconds.
    fn local_time(&self) -> f64;

    /// Reposition the source. Does not change the play/pause state.
    fn seek(&mut self, t: f64);

    /// Start the source's clock.
    fn play(&mut self) -> Result<(), StartError>;

    /// Stop the source's clock at its current position.
    fn pause(&mut self);

    /// Whether the source can report time and frames.
    fn is_ready(&self) -> bool;

    fn is_playing(&self) -> bool;

    /// Native frame size, once known. Audio-only sources return `None`.
    fn native_size(&self) -> Option<Size>;

    /// The frame at the current position, if one is available.
    fn current_frame(&mut self) -> Option<SharedFrameBuffer>;

    /// Pull interleaved samples at the graph's format into `out`.
    ///
    /// Returns the number of samples written. Sources without audio, or
    /// sources that are paused, write nothing.
    fn read_audio(&mut self, _out: &mut [f32]) -> usize {
        0
    }
}
