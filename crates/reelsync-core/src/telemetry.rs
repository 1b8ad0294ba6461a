//! Action logging side channel.
//!
//! Every user-facing operation reports one entry drawn from a closed set of
//! categories and actions. Logging is fire-and-forget: sinks never return
//! errors and nothing they do feeds back into engine state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a logged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionCategory {
    Project,
    Playlist,
    Layers,
    Audio,
    Playback,
    Editing,
    Effects,
    Export,
}

impl ActionCategory {
    pub const ALL: [Self; 8] = [
        Self::Project,
        Self::Playlist,
        Self::Layers,
        Self::Audio,
        Self::Playback,
        Self::Editing,
        Self::Effects,
        Self::Export,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Playlist => "Playlist",
            Self::Layers => "Layers",
            Self::Audio => "Audio",
            Self::Playback => "Playback",
            Self::Editing => "Editing",
            Self::Effects => "Effects",
            Self::Export => "Export",
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A loggable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "App Opened")]
    AppOpened,
    #[serde(rename = "Add Video Clip")]
    AddClip,
    #[serde(rename = "Remove Video Clip")]
    RemoveClip,
    #[serde(rename = "Select Clip")]
    SelectClip,
    #[serde(rename = "Add Overlay Video")]
    AddOverlay,
    #[serde(rename = "Move Overlay")]
    MoveOverlay,
    #[serde(rename = "Add Audio Track")]
    AddAudio,
    #[serde(rename = "Set Volume")]
    SetVolume,
    #[serde(rename = "Play")]
    Play,
    #[serde(rename = "Pause")]
    Pause,
    #[serde(rename = "Seek")]
    Seek,
    #[serde(rename = "Scrub Timeline")]
    Scrub,
    #[serde(rename = "Trim Start")]
    TrimStart,
    #[serde(rename = "Trim End")]
    TrimEnd,
    #[serde(rename = "Enable Crop")]
    CropEnable,
    #[serde(rename = "Disable Crop")]
    CropDisable,
    #[serde(rename = "Resize Crop Area")]
    CropResize,
    #[serde(rename = "Move Crop Area")]
    CropMove,
    #[serde(rename = "Apply Filter")]
    ApplyFilter,
    #[serde(rename = "Start Recording")]
    StartRecording,
    #[serde(rename = "Stop Recording")]
    StopRecording,
    #[serde(rename = "Export Complete")]
    ExportComplete,
}

impl Action {
    /// Human-readable action name.
    pub fn label(self) -> &'static str {
        match self {
            Self::AppOpened => "App Opened",
            Self::AddClip => "Add Video Clip",
            Self::RemoveClip => "Remove Video Clip",
            Self::SelectClip => "Select Clip",
            Self::AddOverlay => "Add Overlay Video",
            Self::MoveOverlay => "Move Overlay",
            Self::AddAudio => "Add Audio Track",
            Self::SetVolume => "Set Volume",
            Self::Play => "Play",
            Self::Pause => "Pause",
            Self::Seek => "Seek",
            Self::Scrub => "Scrub Timeline",
            Self::TrimStart => "Trim Start",
            Self::TrimEnd => "Trim End",
            Self::CropEnable => "Enable Crop",
            Self::CropDisable => "Disable Crop",
            Self::CropResize => "Resize Crop Area",
            Self::CropMove => "Move Crop Area",
            Self::ApplyFilter => "Apply Filter",
            Self::StartRecording => "Start Recording",
            Self::StopRecording => "Stop Recording",
            Self::ExportComplete => "Export Complete",
        }
    }

    /// The category this action is filed under.
    pub fn category(self) -> ActionCategory {
        match self {
            Self::AppOpened => ActionCategory::Project,
            Self::AddClip | Self::RemoveClip | Self::SelectClip => ActionCategory::Playlist,
            Self::AddOverlay | Self::MoveOverlay => ActionCategory::Layers,
            Self::AddAudio | Self::SetVolume => ActionCategory::Audio,
            Self::Play | Self::Pause | Self::Seek | Self::Scrub => ActionCategory::Playback,
            Self::TrimStart
            | Self::TrimEnd
            | Self::CropEnable
            | Self::CropDisable
            | Self::CropResize
            | Self::CropMove => ActionCategory::Editing,
            Self::ApplyFilter => ActionCategory::Effects,
            Self::StartRecording | Self::StopRecording | Self::ExportComplete => {
                ActionCategory::Export
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sink for action log entries.
pub trait ActionLog: Send + Sync {
    /// Record one action. Must not fail or block for long.
    fn log_action(&self, category: ActionCategory, action: Action, details: serde_json::Value);

    /// Record an action under its own category.
    fn log(&self, action: Action, details: serde_json::Value) {
        self.log_action(action.category(), action, details);
    }
}

/// Emits every action as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActionLog;

impl ActionLog for TracingActionLog {
    fn log_action(&self, category: ActionCategory, action: Action, details: serde_json::Value) {
        tracing::info!(
            target: "reelsync::actions",
            category = category.label(),
            action = action.label(),
            %details,
            "[{category}] {action}"
        );
    }
}

/// A recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Sequence number, starting at 1.
    pub id: u64,
    /// RFC 3339 wall-clock timestamp.
    pub timestamp: String,
    pub category: ActionCategory,
    pub action: Action,
    pub details: serde_json::Value,
}

/// In-memory history of every action since creation.
///
/// Entries are also forwarded to [`TracingActionLog`].
#[derive(Debug, Default)]
pub struct ActionHistory {
    entries: Mutex<Vec<ActionEntry>>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all entries in logging order.
    pub fn entries(&self) -> Vec<ActionEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of times `action` was logged.
    pub fn count(&self, action: Action) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .count()
    }

    /// Entries grouped by category. Categories with no entries are absent.
    pub fn by_category(&self) -> BTreeMap<ActionCategory, Vec<ActionEntry>> {
        let mut grouped: BTreeMap<ActionCategory, Vec<ActionEntry>> = BTreeMap::new();
        for entry in self.entries.lock().iter() {
            grouped.entry(entry.category).or_default().push(entry.clone());
        }
        grouped
    }
}

impl ActionLog for ActionHistory {
    fn log_action(&self, category: ActionCategory, action: Action, details: serde_json::Value) {
        TracingActionLog.log_action(category, action, details.clone());
        let mut entries = self.entries.lock();
        let id = entries.len() as u64 + 1;
        entries.push(ActionEntry {
            id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            category,
            action,
            details,
        });
    }
}

impl<T: ActionLog + ?Sized> ActionLog for std::sync::Arc<T> {
    fn log_action(&self, category: ActionCategory, action: Action, details: serde_json::Value) {
        (**self).log_action(category, action, details);
    }
}
