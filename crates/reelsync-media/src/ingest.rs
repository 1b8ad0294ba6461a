//! Resource ingestion and asynchronous duration probing.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use reelsync_core::{ReelsyncError, Result, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::source::MediaSource;

/// A media resource handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaResource {
    /// Display name (file name for files).
    pub name: String,
    /// Location on disk, if the resource is a file.
    pub path: Option<PathBuf>,
}

impl MediaResource {
    /// A file on disk; the name is its file name.
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            path: Some(path.to_path_buf()),
        }
    }

    /// A resource known only by name (resolved by the ingest backend).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }
}

/// Probed media metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds. Always finite and non-negative.
    pub duration: f64,
    /// Native frame size, if the resource has video.
    pub size: Option<Size>,
    pub has_audio: bool,
}

impl MediaInfo {
    /// Build from a raw probed duration, rejecting non-finite values.
    pub fn new(duration: f64, size: Option<Size>, has_audio: bool) -> Result<Self> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(ReelsyncError::unreadable(format!(
                "non-finite duration: {duration}"
            )));
        }
        Ok(Self {
            duration,
            size,
            has_audio,
        })
    }
}

/// Completes a [`DurationProbe`].
#[derive(Debug)]
pub struct ProbeResolver(Sender<Result<MediaInfo>>);

impl ProbeResolver {
    pub fn resolve(self, result: Result<MediaInfo>) {
        // The engine may have dropped the clip already.
        let _ = self.0.send(result);
    }
}

/// Pending result of probing a resource.
#[derive(Debug)]
pub struct DurationProbe(Receiver<Result<MediaInfo>>);

impl DurationProbe {
    /// A probe completed by the returned resolver.
    pub fn channel() -> (ProbeResolver, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (ProbeResolver(tx), Self(rx))
    }

    /// A probe that is already complete.
    pub fn ready(result: Result<MediaInfo>) -> Self {
        let (resolver, probe) = Self::channel();
        resolver.resolve(result);
        probe
    }

    /// Non-blocking check. `None` while still pending.
    ///
    /// A resolver dropped without answering counts as unreadable media.
    pub fn poll(&self) -> Option<Result<MediaInfo>> {
        match self.0.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(ReelsyncError::unreadable("probe abandoned")))
            }
        }
    }

    /// Block until the probe completes or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<Result<MediaInfo>> {
        match self.0.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Some(Err(ReelsyncError::unreadable("probe abandoned")))
            }
        }
    }
}

/// A source handle together with its pending probe.
pub struct IngestedMedia {
    pub source: Box<dyn MediaSource>,
    pub probe: DurationProbe,
}

/// Turns resources into source handles.
///
/// Ingestion itself never fails: a resource that cannot be read still yields
/// a (never-ready) source, and the failure surfaces through the probe.
pub trait MediaIngest: Send + Sync {
    fn ingest(&self, resource: &MediaResource) -> IngestedMedia;
}
