//! Tiled overlap-add decoding of long audio latents.
//!
//! Decoding a whole latent sequence at once keeps the entire waveform on the
//! decoding device. Instead, the latent is split into overlapping tiles that
//! are decoded independently (one tile resident on the device at a time) and
//! blended into host-memory accumulation buffers with a tapering window, so
//! peak device usage is bounded by a single tile's footprint.
//!
//! Reconstruction:
//! 1. Walk tile start offsets `0, stride, 2*stride, ...` with
//!    `stride = tile_size - overlap`; the final tile may be shorter.
//! 2. Decode each tile, multiply it by a Hann window sized to the decoded
//!    segment, and add it into the output buffer; add the window itself into
//!    a parallel weight buffer.
//! 3. Divide the output by the accumulated weights wherever they exceed a
//!    small epsilon, then apply a per-batch loudness normalization.

use candle_core::{DType, Result, Tensor};
use serde::Deserialize;

use crate::audio::{AudioBuffer, LatentAudioDecoder, DEFAULT_SAMPLE_RATE};
use crate::graph::value::{Inputs, Value};

/// Valid range for the tile size, in latent steps.
pub const TILE_SIZE_RANGE: (usize, usize) = (128, 4096);

/// Valid range for the overlap between consecutive tiles, in latent steps.
pub const OVERLAP_RANGE: (usize, usize) = (16, 512);

/// Weight entries at or below this threshold are treated as untouched and
/// excluded from normalization.
pub const WEIGHT_EPSILON: f32 = 1e-6;

/// Scale applied to the per-batch standard deviation when computing the
/// loudness divisor.
pub const LOUDNESS_SCALE: f64 = 5.0;

/// Tiling parameters for the decoder.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TileConfig {
    /// Latent steps per decode tile.
    #[serde(default = "default_tile_size")]
    pub tile_size: usize,
    /// Latent steps shared between consecutive tiles.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_tile_size() -> usize {
    512
}

fn default_overlap() -> usize {
    64
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            overlap: default_overlap(),
        }
    }
}

impl TileConfig {
    /// Clamp both parameters into their widget ranges.
    pub fn clamped(self) -> Self {
        Self {
            tile_size: self.tile_size.clamp(TILE_SIZE_RANGE.0, TILE_SIZE_RANGE.1),
            overlap: self.overlap.clamp(OVERLAP_RANGE.0, OVERLAP_RANGE.1),
        }
    }

    /// Check the caller contract `overlap < tile_size`.
    ///
    /// A non-positive stride would keep the decode loop on the same tile
    /// forever, so the node wrapper rejects the configuration up front.
    pub fn validate(&self) -> Result<()> {
        if self.overlap >= self.tile_size {
            candle_core::bail!(
                "overlap ({}) must be smaller than tile_size ({})",
                self.overlap,
                self.tile_size
            );
        }
        Ok(())
    }
}

/// Hann window with a half-sample offset: `sin^2(pi * (n + 0.5) / len)`.
///
/// Strictly positive at both ends, so every output position a tile touches
/// accumulates a strictly positive weight, including the first and last
/// sample of the sequence.
pub fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let x = std::f32::consts::PI * (n as f32 + 0.5) / len as f32;
            x.sin() * x.sin()
        })
        .collect()
}

/// Reconstruct a continuous waveform from a long audio latent.
///
/// Tiles of at most `config.tile_size` steps are decoded sequentially and
/// blended via windowed overlap-add. The accumulation buffers live in host
/// memory; each decoded tile is released before the next decode call.
///
/// # Arguments
/// * `decoder` - Decode-capable model handle
/// * `latent` - Latent tensor of shape `(batch, channels, total_steps)`
/// * `config` - Tiling parameters; `config.overlap < config.tile_size` is a
///   caller contract and is not validated here (see [`TileConfig::validate`])
///
/// # Returns
/// * Stereo waveform of shape `(batch, 2, total_steps * upscale_ratio)`
///   paired with the decoder's sample rate
pub fn decode_tiled(
    decoder: &dyn LatentAudioDecoder,
    latent: &Tensor,
    config: TileConfig,
) -> Result<AudioBuffer> {
    let (batch, _channels, total_steps) = latent.dims3()?;
    let upscale = decoder.upscale_ratio();
    if upscale == 0 {
        candle_core::bail!("decoder reports an upscale ratio of zero");
    }
    let total_samples = total_steps * upscale;

    debug_assert!(config.overlap < config.tile_size);
    let stride = config.tile_size - config.overlap;

    let mut out = vec![0f32; batch * 2 * total_samples];
    // Window sums are identical across batch and channel lanes, so one lane
    // of weights stands for all of them.
    let mut weight = vec![0f32; total_samples];

    let mut start = 0;
    while start < total_steps {
        let steps = config.tile_size.min(total_steps - start);
        let tile = latent.narrow(2, start, steps)?;
        let decoded = decoder.decode(&tile)?;
        let (dec_batch, dec_channels, samples) = decoded.dims3()?;
        if dec_batch != batch || dec_channels != 2 {
            candle_core::bail!(
                "tile decode returned shape ({}, {}, {}), expected ({}, 2, _)",
                dec_batch,
                dec_channels,
                samples,
                batch
            );
        }
        let offset = start * upscale;
        if offset + samples > total_samples {
            candle_core::bail!(
                "tile at step {} decoded to {} samples, overrunning the {}-sample output",
                start,
                samples,
                total_samples
            );
        }
        tracing::debug!(start, steps, samples, "decoded tile");

        // The window always matches the decoded segment, not the nominal
        // tile size: the final tile may be shorter.
        let window = hann_window(samples);
        let chunk = decoded.to_dtype(DType::F32)?.to_vec3::<f32>()?;
        for (b, lanes) in chunk.iter().enumerate() {
            for (c, lane) in lanes.iter().enumerate() {
                let base = (b * 2 + c) * total_samples + offset;
                for (i, (&sample, &w)) in lane.iter().zip(&window).enumerate() {
                    out[base + i] += sample * w;
                }
            }
        }
        for (i, &w) in window.iter().enumerate() {
            weight[offset + i] += w;
        }

        start += stride;
    }

    // Positions no tile touched keep weight zero and are left as-is.
    for lane in 0..batch * 2 {
        let base = lane * total_samples;
        for (i, &w) in weight.iter().enumerate() {
            if w > WEIGHT_EPSILON {
                out[base + i] /= w;
            }
        }
    }

    let lane_len = 2 * total_samples;
    for b in 0..batch {
        let lane = &mut out[b * lane_len..(b + 1) * lane_len];
        let divisor = loudness_divisor(lane);
        for v in lane.iter_mut() {
            *v /= divisor;
        }
    }

    let waveform = Tensor::from_vec(out, (batch, 2, total_samples), latent.device())?;
    let sample_rate = decoder.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE);
    Ok(AudioBuffer::new(waveform, sample_rate))
}

/// Loudness divisor for one batch element: `max(std * LOUDNESS_SCALE, 1.0)`.
///
/// The clamp keeps near-silent output from being amplified.
fn loudness_divisor(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 1.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (var.sqrt() * LOUDNESS_SCALE).max(1.0) as f32
}

/// Apply the per-batch loudness normalization on its own.
///
/// The standard deviation is taken across the time and channel axes of each
/// batch element. A signal whose deviation already sits at
/// `1 / LOUDNESS_SCALE` is a fixed point of this operation.
pub fn loudness_normalize(waveform: &Tensor) -> Result<Tensor> {
    let (batch, channels, samples) = waveform.dims3()?;
    let mut data = waveform
        .to_dtype(DType::F32)?
        .flatten_all()?
        .to_vec1::<f32>()?;
    let lane_len = channels * samples;
    for b in 0..batch {
        let lane = &mut data[b * lane_len..(b + 1) * lane_len];
        let divisor = loudness_divisor(lane);
        for v in lane.iter_mut() {
            *v /= divisor;
        }
    }
    Tensor::from_vec(data, (batch, channels, samples), waveform.device())
}

pub(crate) fn run_tiled_decode(inputs: &Inputs) -> Result<Vec<Value>> {
    let latent = inputs.latent("latent")?;
    let decoder = inputs.decoder("decoder")?;
    let config = TileConfig {
        tile_size: inputs.int("tile_size")? as usize,
        overlap: inputs.int("overlap")? as usize,
    }
    .clamped();
    config.validate()?;
    let audio = decode_tiled(decoder.as_ref(), latent, config)?;
    Ok(vec![Value::Audio(audio)])
}
