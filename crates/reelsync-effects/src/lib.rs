//! Reelsync Effects - CPU pixel processing for the compositor
//!
//! Provides the fixed set of visual filters (matching their CSS filter
//! function counterparts) and stretched blits with border strokes.

pub mod blit;
pub mod filter;

pub use blit::{draw_stretched, stroke_rect};
pub use filter::{ColorMatrix, VisualFilter};
