//! Arena of live source handles.
//!
//! Every source the engine drives (playlist clips, the overlay, the
//! background track) is registered here under its [`SourceKey`] and released
//! by unregistering it.

use reelsync_audio::SourceKey;
use reelsync_media::MediaSource;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Default)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceKey, Box<dyn MediaSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, returning the one it replaces.
    pub fn register(
        &mut self,
        key: SourceKey,
        source: Box<dyn MediaSource>,
    ) -> Option<Box<dyn MediaSource>> {
        debug!(?key, "Source registered");
        self.sources.insert(key, source)
    }

    /// Remove and return a source. Dropping it releases the handle.
    pub fn unregister(&mut self, key: SourceKey) -> Option<Box<dyn MediaSource>> {
        let removed = self.sources.remove(&key);
        if removed.is_some() {
            debug!(?key, "Source unregistered");
        }
        removed
    }

    pub fn contains(&self, key: SourceKey) -> bool {
        self.sources.contains_key(&key)
    }

    pub fn get(&self, key: SourceKey) -> Option<&dyn MediaSource> {
        self.sources.get(&key).map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, key: SourceKey) -> Option<&mut dyn MediaSource> {
        match self.sources.get_mut(&key) {
            Some(source) => Some(source.as_mut()),
            None => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = SourceKey> + '_ {
        self.sources.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Reposition a source, if registered.
    pub fn seek(&mut self, key: SourceKey, t: f64) {
        if let Some(source) = self.sources.get_mut(&key) {
            source.seek(t);
        }
    }

    pub fn pause(&mut self, key: SourceKey) {
        if let Some(source) = self.sources.get_mut(&key) {
            source.pause();
        }
    }

    /// Start a source, absorbing start failures.
    ///
    /// Interruptions are expected whenever a start races a pause or seek and
    /// are only traced; anything else is logged as a warning. Returns whether
    /// the source is now playing.
    pub fn start(&mut self, key: SourceKey) -> bool {
        let Some(source) = self.sources.get_mut(&key) else {
            return false;
        };
        match source.play() {
            Ok(()) => true,
            Err(e) if e.is_interruption() => {
                debug!(?key, "Start interrupted: {e}");
                false
            }
            Err(e) => {
                warn!(?key, "Playback failed: {e}");
                false
            }
        }
    }

    /// Stop every registered source at its current position.
    pub fn pause_all(&mut self) {
        for source in self.sources.values_mut() {
            source.pause();
        }
    }

    /// Keys of every source whose clock is running.
    pub fn playing(&self) -> Vec<SourceKey> {
        self.sources
            .iter()
            .filter(|(_, s)| s.is_playing())
            .map(|(k, _)| *k)
            .collect()
    }
}
