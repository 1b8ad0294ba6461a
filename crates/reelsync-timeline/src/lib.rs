//! Reelsync Timeline - Playlist data model
//!
//! Implements the single-track virtual timeline:
//! - Clips with trim windows over an independently probed source duration
//! - The ordered playlist and its selection
//! - The pure mapping from global time to (clip, local offset)

pub mod clip;
pub mod clock;
pub mod playlist;

pub use clip::{Clip, TrimBound};
pub use clock::{resolve_clip_at, ClipPosition};
pub use playlist::Playlist;
