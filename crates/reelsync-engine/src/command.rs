//! Presentation-facing commands and the state snapshot they read back.

use reelsync_audio::Channel;
use reelsync_core::{ClipId, Rect};
use reelsync_effects::VisualFilter;
use reelsync_media::MediaResource;
use reelsync_timeline::{Clip, TrimBound};
use serde::{Deserialize, Serialize};

use crate::compositor::CropArea;
use crate::controller::PlaybackState;

/// A user action, as dispatched by a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Play,
    Pause,
    /// Play when paused, pause when playing.
    TogglePlay,
    Seek {
        time: f64,
    },
    BeginScrub,
    ScrubTo {
        time: f64,
    },
    EndScrub,
    AddClip {
        resource: MediaResource,
    },
    RemoveClip {
        id: ClipId,
    },
    SelectClip {
        id: ClipId,
    },
    SetTrim {
        id: ClipId,
        bound: TrimBound,
        value: f64,
    },
    SetFilter {
        filter: VisualFilter,
    },
    SetCrop {
        rect: Rect,
    },
    SetCropEnabled {
        enabled: bool,
    },
    SetOverlayRect {
        rect: Rect,
    },
    LoadOverlay {
        resource: MediaResource,
    },
    LoadExternalAudio {
        resource: MediaResource,
    },
    SetChannelGain {
        channel: Channel,
        value: f32,
    },
    StartRecording,
    StopRecording,
}

/// The overlay layer as seen by the presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    pub name: String,
    /// `None` until the overlay's size is known.
    pub rect: Option<Rect>,
    pub duration: f64,
}

/// Everything a presentation layer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub total_duration: f64,
    pub current_time: f64,
    pub is_playing: bool,
    pub is_recording: bool,
    pub clips: Vec<Clip>,
    pub selected: Option<ClipId>,
    pub filter: VisualFilter,
    pub crop: CropArea,
    pub overlay: Option<OverlaySnapshot>,
    pub external_audio: Option<String>,
    pub gains: ChannelGains,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelGains {
    pub main: f32,
    pub overlay: f32,
    pub external: f32,
}
