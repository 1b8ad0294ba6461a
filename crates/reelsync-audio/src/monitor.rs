//! Live monitoring on the default output device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use reelsync_core::{AudioSpec, ReelsyncError, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::ring_buffer::RingBuffer;

/// Keeps a cpal output stream alive that drains the graph's monitor output.
///
/// Underruns are filled with silence.
pub struct MonitorOutput {
    _stream: cpal::Stream,
}

impl MonitorOutput {
    pub fn open(buffer: Arc<RingBuffer>, spec: AudioSpec) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ReelsyncError::Audio("no default output device".into()))?;
        let config = cpal::StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let n = buffer.read(data);
                    data[n..].fill(0.0);
                },
                |err| warn!("Monitor stream error: {err}"),
                None,
            )
            .map_err(|e| ReelsyncError::Audio(format!("failed to open output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| ReelsyncError::Audio(format!("failed to start output stream: {e}")))?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = spec.sample_rate,
            "Monitor output opened"
        );
        Ok(Self { _stream: stream })
    }
}
