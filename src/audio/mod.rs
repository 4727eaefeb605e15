//! Audio node components.
//!
//! This module contains:
//! - `tiled`: tiled overlap-add decoding of long audio latents
//! - `save`: WAV export node

pub mod save;
pub mod tiled;

use std::sync::Arc;

use candle_core::{Result, Tensor};

/// Output sample rate used when the decoding model does not declare one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// A reconstructed waveform paired with its sample rate.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Waveform of shape `(batch, channels, samples)`, f32 in `[-1, 1]`.
    pub waveform: Tensor,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new audio buffer.
    pub fn new(waveform: Tensor, sample_rate: u32) -> Self {
        Self {
            waveform,
            sample_rate,
        }
    }

    /// Batch size.
    pub fn batch(&self) -> Result<usize> {
        self.waveform.dim(0)
    }

    /// Number of channels (1 for mono, 2 for stereo).
    pub fn channels(&self) -> Result<usize> {
        self.waveform.dim(1)
    }

    /// Samples per channel.
    pub fn samples(&self) -> Result<usize> {
        self.waveform.dim(2)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> Result<f32> {
        Ok(self.samples()? as f32 / self.sample_rate as f32)
    }
}

/// Decode-capable model handle.
///
/// The host hands the decoder node a model that turns latent steps into raw
/// audio. The model stays opaque to this crate; only the tile-by-tile decode
/// call and two constants cross the boundary.
pub trait LatentAudioDecoder: Send + Sync {
    /// Audio samples produced per latent step.
    fn upscale_ratio(&self) -> usize;

    /// Native output sample rate, if the model declares one.
    ///
    /// Callers fall back to [`DEFAULT_SAMPLE_RATE`] when this is `None`.
    fn sample_rate(&self) -> Option<u32> {
        None
    }

    /// Decode a latent tile of shape `(batch, channels, steps)` into raw
    /// audio of shape `(batch, 2, steps * upscale_ratio())`.
    ///
    /// # Errors
    /// Any error aborts the surrounding reconstruction; there is no retry
    /// and no partial output.
    fn decode(&self, latent: &Tensor) -> Result<Tensor>;
}

/// Shared decoder handle as carried on node ports.
pub type SharedDecoder = Arc<dyn LatentAudioDecoder>;
