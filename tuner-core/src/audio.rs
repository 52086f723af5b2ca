//! # Audio Capture Module
//!
//! Real-time capture with CPAL (Cross-Platform Audio Library) and the sliding
//! analysis window fed by it.
//!
//! ## Features
//! - Default input device selection with an f32 stream at the configured rate
//! - Re-blocking of device callbacks into fixed `window_step` blocks
//! - `AudioWindow`: a fixed-length window that slides by each new block
//! - Stream errors are logged and never stop capture

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::AudioConfig;

/// Fixed-length window of the most recent samples.
///
/// Starts zero-filled. Every push discards as many of the oldest samples as
/// it appends, so the length never changes.
#[derive(Debug, Clone)]
pub struct AudioWindow {
    samples: Vec<f32>,
}

impl AudioWindow {
    pub fn new(size: usize) -> Self {
        Self {
            samples: vec![0.0; size],
        }
    }

    /// Slides the window forward by `block`.
    pub fn push(&mut self, block: &[f32]) {
        let size = self.samples.len();
        if block.len() >= size {
            self.samples.copy_from_slice(&block[block.len() - size..]);
        } else {
            self.samples.drain(..block.len());
            self.samples.extend_from_slice(block);
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// Collects arbitrary-sized device buffers into blocks of exactly `block_size`.
#[derive(Debug)]
pub struct BlockAccumulator {
    block_size: usize,
    pending: Vec<f32>,
}

impl BlockAccumulator {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            pending: Vec::with_capacity(block_size * 2),
        }
    }

    /// Appends `data` and hands every completed block to `on_block`.
    pub fn feed(&mut self, data: &[f32], mut on_block: impl FnMut(&[f32])) {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= self.block_size {
            on_block(&self.pending[..self.block_size]);
            self.pending.drain(..self.block_size);
        }
    }
}

/// Starts capture from the default input device.
///
/// `on_block` runs inside the audio callback for every `window_step` mono
/// samples. Multi-channel devices contribute their first channel only.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - The running stream and its sample rate
/// * `Err(e)` - No usable device or configuration
pub fn start_audio_capture<F>(audio: &AudioConfig, mut on_block: F) -> Result<(cpal::Stream, u32)>
where
    F: FnMut(&[f32]) + Send + 'static,
{
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[AUDIO] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, audio.sample_rate).ok_or_else(|| {
        anyhow!("No f32 input format supports {} Hz", audio.sample_rate)
    })?;

    let config = supported_config.with_sample_rate(cpal::SampleRate(audio.sample_rate));
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    log::info!("[AUDIO] Capturing {channels} channel(s) at {sample_rate} Hz");

    let err_fn = |err: cpal::StreamError| log::warn!("[AUDIO] Stream status: {}", err);

    let mut accumulator = BlockAccumulator::new(audio.window_step);
    let mut mono = Vec::new();

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if channels == 1 {
                accumulator.feed(data, &mut on_block);
            } else {
                mono.clear();
                mono.extend(data.iter().step_by(channels));
                accumulator.feed(&mono, &mut on_block);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks an f32 configuration whose rate range contains `target_rate`,
/// preferring the fewest channels.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            c.sample_format() == cpal::SampleFormat::F32
                && c.min_sample_rate().0 <= target_rate
                && target_rate <= c.max_sample_rate().0
        })
        .min_by_key(|c| c.channels())
}
