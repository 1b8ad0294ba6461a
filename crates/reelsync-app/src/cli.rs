use clap::{Args, Parser, Subcommand};
use reelsync_core::Rect;
use reelsync_engine::CaptureBackendKind;
use std::path::PathBuf;

/// Play, composite and record a playlist of media clips
#[derive(Parser, Debug)]
#[command(name = "reelsync", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play the whole timeline once, optionally recording it
    Play(PlayArgs),

    /// Print a file's probed media info as JSON
    Probe {
        /// Media file to probe
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Media files, in playlist order
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Use generated clips of these durations instead of files
    #[arg(long, value_name = "SECONDS", value_delimiter = ',')]
    pub synthetic: Vec<f64>,

    /// Visual filter (none, grayscale, sepia, invert, blur, brightness, contrast, hue-rotate)
    #[arg(long, value_name = "NAME")]
    pub filter: Option<String>,

    /// Enable cropping to this surface rectangle
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect)]
    pub crop: Option<Rect>,

    /// Looping picture-in-picture overlay
    #[arg(long, value_name = "FILE")]
    pub overlay: Option<PathBuf>,

    /// External audio track
    #[arg(long, value_name = "FILE")]
    pub audio: Option<PathBuf>,

    /// Trim a clip, by zero-based playlist index (repeatable)
    #[arg(long, value_name = "INDEX:START:END", value_parser = parse_trim)]
    pub trim: Vec<TrimArg>,

    /// Record the composited output
    #[arg(long)]
    pub record: bool,

    /// Directory for recordings
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Capture backend (raw, ffmpeg)
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<CaptureBackendKind>,
}

/// A `--trim` argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimArg {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

fn parse_number(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {s:?}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("not a finite number: {s:?}"))
    }
}

pub fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts = s
        .split(',')
        .map(parse_number)
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Rect::new(*x as f32, *y as f32, *w as f32, *h as f32)),
        _ => Err(format!("expected X,Y,W,H, got {s:?}")),
    }
}

pub fn parse_trim(s: &str) -> Result<TrimArg, String> {
    let mut parts = s.split(':');
    let (Some(index), Some(start), Some(end), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected INDEX:START:END, got {s:?}"));
    };
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("bad clip index: {index:?}"))?;
    Ok(TrimArg {
        index,
        start: parse_number(start)?,
        end: parse_number(end)?,
    })
}
