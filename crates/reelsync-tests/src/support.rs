//! Shared session fixture.

use reelsync_core::{ActionHistory, ClipId};
use reelsync_engine::{Collaborators, EditorSession, EngineConfig, TickReport};
use reelsync_media::{
    ArtifactSink, CaptureBackend, MediaResource, MemorySink, RawCaptureBackend, SimClock,
    SimulatedIngest, SimulatedMedia,
};
use std::sync::Arc;

pub const TICK: f64 = 1.0 / 60.0;

pub struct Studio {
    pub session: EditorSession,
    pub ingest: Arc<SimulatedIngest>,
    pub history: Arc<ActionHistory>,
}

impl Studio {
    /// A session on a 64×36 surface recording into `artifacts`.
    pub fn with(capture: Box<dyn CaptureBackend>, artifacts: Arc<dyn ArtifactSink>) -> Self {
        let ingest = Arc::new(SimulatedIngest::new(SimClock::new()));
        let history = Arc::new(ActionHistory::new());
        let mut config = EngineConfig::default();
        config.surface.width = 64;
        config.surface.height = 36;
        let session = EditorSession::new(
            config,
            Collaborators {
                ingest: ingest.clone(),
                capture,
                artifacts,
                actions: history.clone(),
            },
        );
        Self {
            session,
            ingest,
            history,
        }
    }

    pub fn new() -> (Self, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Self::with(Box::new(RawCaptureBackend), sink.clone()), sink)
    }

    /// Register `media` under `name` and append it as a clip.
    pub fn clip(&mut self, name: &str, media: SimulatedMedia) -> ClipId {
        self.ingest.insert(name, media);
        self.session.add_clip(&MediaResource::named(name))
    }

    pub fn now(&self) -> f64 {
        self.ingest.clock().now()
    }

    /// Advance the shared clock by `seconds`, then tick.
    pub fn advance(&mut self, seconds: f64) -> TickReport {
        self.ingest.clock().advance(seconds);
        let now = self.now();
        self.session.tick(now)
    }

    pub fn step(&mut self) -> TickReport {
        self.advance(TICK)
    }
}
