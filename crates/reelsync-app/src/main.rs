//! Reelsync - headless timeline player and recorder
//!
//! Builds an editor session from the command line, plays the whole
//! timeline on the tick loop (recording it if asked) and prints the final
//! session snapshot as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use reelsync_core::{Rgba, TracingActionLog};
use reelsync_engine::{
    CaptureBackendKind, Collaborators, EditorSession, EngineConfig, TickCadence, TickScheduler,
};
use reelsync_media::{
    CaptureBackend, DirectorySink, FfmpegCaptureBackend, FfmpegIngest, MediaIngest, MediaResource,
    RawCaptureBackend, SimClock, SimulatedIngest, SimulatedMedia,
};
use reelsync_timeline::TrimBound;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cli;
mod logging;

use cli::{Cli, Commands, PlayArgs};

/// Give up when the playhead has not moved for this long.
const STALL_SECONDS: f64 = 5.0;
/// How long to wait for duration probes before starting.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const SYNTHETIC_PALETTE: [Rgba; 4] = [
    [200, 60, 60, 255],
    [60, 160, 80, 255],
    [60, 90, 200, 255],
    [220, 180, 40, 255],
];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref());
    logging::init_logging(&config.logging, cli.verbose);
    reelsync_media::init();

    match cli.command {
        Commands::Play(args) => play(config, args).await,
        Commands::Probe { file } => {
            let info = reelsync_media::ffmpeg::probe_file(&file)
                .with_context(|| format!("probing {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}

async fn play(mut config: EngineConfig, args: PlayArgs) -> Result<()> {
    if let Some(out) = &args.out {
        config.recording.output_dir = out.clone();
    }
    if let Some(backend) = args.backend {
        config.recording.backend = backend;
    }
    config.validate()?;

    let clock = SimClock::new();
    let synthetic = !args.synthetic.is_empty();
    let (ingest, resources): (Arc<dyn MediaIngest>, Vec<MediaResource>) = if synthetic {
        if !args.files.is_empty() {
            bail!("pass either media files or --synthetic, not both");
        }
        synthetic_catalog(&clock, &args)
    } else {
        if args.files.is_empty() {
            bail!("nothing to play: pass media files or --synthetic");
        }
        let resources = args.files.iter().map(MediaResource::file).collect();
        (Arc::new(FfmpegIngest::new(config.audio.spec())), resources)
    };

    let capture: Box<dyn CaptureBackend> = match config.recording.backend {
        CaptureBackendKind::Raw => Box::new(RawCaptureBackend),
        CaptureBackendKind::Ffmpeg => Box::new(FfmpegCaptureBackend::default()),
    };
    let collaborators = Collaborators {
        ingest,
        capture,
        artifacts: Arc::new(DirectorySink::new(&config.recording.output_dir)),
        actions: Arc::new(TracingActionLog),
    };
    let mut session = EditorSession::new(config.clone(), collaborators);

    for resource in &resources {
        session.add_clip(resource);
    }
    if let Some(overlay) = &args.overlay {
        session.load_overlay(&overlay_resource(overlay, synthetic));
    }
    if let Some(audio) = &args.audio {
        session.load_external_audio(&overlay_resource(audio, synthetic));
    }
    wait_for_probes(&mut session).await;

    for trim in &args.trim {
        let Some(id) = session.playlist().at(trim.index).map(|clip| clip.id) else {
            bail!("--trim: no clip at index {}", trim.index);
        };
        session.set_trim(id, TrimBound::Start, trim.start)?;
        session.set_trim(id, TrimBound::End, trim.end)?;
    }
    if let Some(name) = &args.filter {
        session.set_filter_by_name(name)?;
    }
    if let Some(rect) = args.crop {
        session.set_crop_enabled(true);
        session.set_crop(rect);
    }

    info!(
        clips = session.playlist().len(),
        total = session.total_duration(),
        "Timeline ready"
    );
    if args.record {
        session.start_recording()?;
    } else if !session.play() {
        bail!("timeline is empty");
    }

    #[cfg(feature = "monitor")]
    let _monitor = session.audio().monitor_output().and_then(|buffer| {
        reelsync_audio::MonitorOutput::open(buffer, config.audio.spec())
            .map_err(|e| warn!("Audio monitoring unavailable: {e}"))
            .ok()
    });

    let scheduler = TickScheduler::new(TickCadence::from_hz(config.playback.tick_rate_hz));
    let mut last_now = 0.0;
    let mut progress = (f64::NAN, 0.0);
    let mut stalled = false;
    scheduler
        .run(|now| {
            if synthetic {
                clock.advance(now - last_now);
                last_now = now;
            }
            let report = session.tick(now);

            if report.time != progress.0 {
                progress = (report.time, now);
            } else if now - progress.1 > STALL_SECONDS {
                stalled = true;
                return ControlFlow::Break(());
            }
            let done = if args.record {
                !session.is_recording()
            } else {
                !session.is_playing()
            };
            if done {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await;

    if stalled {
        warn!(time = session.current_time(), "Playback stalled, stopping");
        session.pause()?;
    }

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

/// Tick until every duration probe has finished (or the wait times out).
async fn wait_for_probes(session: &mut EditorSession) {
    let started = tokio::time::Instant::now();
    while session.pending_probes() > 0 {
        if started.elapsed() > PROBE_TIMEOUT {
            warn!(pending = session.pending_probes(), "Gave up waiting for probes");
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.tick(started.elapsed().as_secs_f64());
    }
}

/// An in-memory catalog holding one generated clip per requested duration.
fn synthetic_catalog(
    clock: &SimClock,
    args: &PlayArgs,
) -> (Arc<dyn MediaIngest>, Vec<MediaResource>) {
    let ingest = SimulatedIngest::new(clock.clone());
    let mut resources = Vec::with_capacity(args.synthetic.len());
    for (index, duration) in args.synthetic.iter().enumerate() {
        let name = format!("synthetic-{}", index + 1);
        let color = SYNTHETIC_PALETTE[index % SYNTHETIC_PALETTE.len()];
        ingest.insert(name.clone(), SimulatedMedia::video(*duration).with_color(color));
        resources.push(MediaResource::named(name));
    }

    let total: f64 = args.synthetic.iter().sum();
    if let Some(overlay) = &args.overlay {
        let name = overlay.to_string_lossy().into_owned();
        let media = SimulatedMedia::video(total.max(1.0))
            .with_size(320, 180)
            .with_color([240, 240, 240, 255]);
        ingest.insert(name, media);
    }
    if let Some(audio) = &args.audio {
        ingest.insert(
            audio.to_string_lossy().into_owned(),
            SimulatedMedia::audio(total.max(1.0)),
        );
    }
    (Arc::new(ingest), resources)
}

fn overlay_resource(path: &std::path::Path, synthetic: bool) -> MediaResource {
    if synthetic {
        MediaResource::named(path.to_string_lossy())
    } else {
        MediaResource::file(path)
    }
}
