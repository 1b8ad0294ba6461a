//! Error types for reelsync.

use thiserror::Error;

use crate::id::ClipId;

/// Main error type for reelsync operations.
#[derive(Error, Debug)]
pub enum ReelsyncError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A media resource could not be opened or probed.
    #[error("Unreadable media: {0}")]
    UnreadableMedia(String),

    /// A source refused to start playing.
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// The capture/record capability could not be constructed.
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Clip not found: {0}")]
    NotFound(ClipId),

    #[error("Playlist is empty")]
    EmptyPlaylist,

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReelsyncError {
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::UnreadableMedia(msg.into())
    }

    pub fn capability(msg: impl Into<String>) -> Self {
        Self::CapabilityUnavailable(msg.into())
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Whether this error must be shown to the user.
    ///
    /// Only capability absence is user-visible; every other kind degrades
    /// to a fallback value.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable(_))
    }
}

/// Result type alias for reelsync operations.
pub type Result<T> = std::result::Result<T, ReelsyncError>;
