//! Finished recordings and where they are saved.

use parking_lot::Mutex;
use reelsync_core::Result;
use std::path::PathBuf;
use tracing::info;

/// A finalized recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name including extension, e.g. `edited-video-1700000000000.webm`.
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Concatenate recorded chunks in order.
    pub fn from_chunks(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        chunks: Vec<Vec<u8>>,
    ) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Destination for finished artifacts (the "save" trigger).
pub trait ArtifactSink: Send + Sync {
    /// Persist an artifact, returning where it went.
    fn save(&self, artifact: Artifact) -> Result<PathBuf>;
}

/// Writes artifacts as files into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, artifact: Artifact) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)?;
        info!(path = %path.display(), bytes = artifact.len(), "Artifact saved");
        Ok(path)
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every artifact saved so far.
    pub fn saved(&self) -> Vec<Artifact> {
        self.saved.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.lock().is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn save(&self, artifact: Artifact) -> Result<PathBuf> {
        let path = PathBuf::from(&artifact.file_name);
        self.saved.lock().push(artifact);
        Ok(path)
    }
}
