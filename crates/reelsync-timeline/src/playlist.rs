//! The ordered, single-track playlist.

use reelsync_core::{ClipId, ReelsyncError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clip::{Clip, TrimBound};
use crate::clock::{self, ClipPosition};

/// An ordered sequence of clips plus the current selection.
///
/// Clip order is fixed at insertion; there is no reordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    clips: Vec<Clip>,
    selected: Option<ClipId>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clip. The first clip added to an empty playlist is selected.
    pub fn add(&mut self, clip: Clip) -> ClipId {
        let id = clip.id;
        if self.clips.is_empty() {
            self.selected = Some(id);
        }
        debug!(clip = %id, name = %clip.name, "Clip appended");
        self.clips.push(clip);
        id
    }

    /// Remove a clip, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: ClipId) -> Result<Clip> {
        let index = self.index_of(id).ok_or(ReelsyncError::NotFound(id))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(self.clips.remove(index))
    }

    /// Select a clip by id.
    pub fn select(&mut self, id: ClipId) -> Result<()> {
        if self.index_of(id).is_none() {
            return Err(ReelsyncError::NotFound(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Currently selected clip id, if any.
    pub fn selected(&self) -> Option<ClipId> {
        self.selected
    }

    /// Move one trim bound of a clip. See [`Clip::set_trim`] for clamping.
    ///
    /// Returns the applied value, or `None` if the value was not finite.
    pub fn set_trim(&mut self, id: ClipId, bound: TrimBound, value: f64) -> Result<Option<f64>> {
        let clip = self.get_mut(id).ok_or(ReelsyncError::NotFound(id))?;
        Ok(clip.set_trim(bound, value))
    }

    /// Record a probed duration for a clip and reset its trim window.
    pub fn set_duration(&mut self, id: ClipId, duration: f64) -> Result<()> {
        let clip = self.get_mut(id).ok_or(ReelsyncError::NotFound(id))?;
        clip.set_duration(duration);
        Ok(())
    }

    /// Sum of every clip's trimmed width.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(Clip::trimmed_duration).sum()
    }

    /// Resolve a global time to a clip and offset.
    pub fn resolve_clip_at(&self, global_time: f64) -> Option<ClipPosition> {
        clock::resolve_clip_at(&self.clips, global_time)
    }

    /// Global time at which the clip at `index` starts.
    pub fn clip_start(&self, index: usize) -> f64 {
        clock::clip_start(&self.clips, index)
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    /// Clip at a playlist index.
    pub fn at(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn index_of(&self, id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
