//! Integration test crate for reelsync.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every reelsync library crate to verify they work together.

#[cfg(test)]
mod support;

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod recording;

#[cfg(test)]
mod audio;

#[cfg(test)]
mod compositor;
