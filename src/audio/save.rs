//! WAV export node.

use std::path::{Path, PathBuf};

use candle_core::{DType, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::AudioBuffer;
use crate::graph::value::{Inputs, Value};

/// Pick a path that does not collide with an existing file.
///
/// `stem.ext`, then `stem_1.ext`, `stem_2.ext`, ...
pub(crate) fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.{ext}"));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{counter}.{ext}"));
        counter += 1;
    }
    path
}

/// Write each batch item of an audio buffer as a 16-bit PCM WAV file.
///
/// Planar channel data is interleaved, clamped to `[-1, 1]`, and quantized
/// to i16. Batches larger than one get a `_NNN` suffix; existing files are
/// never overwritten.
///
/// # Returns
/// * The paths written, one per batch item
pub fn save_audio(audio: &AudioBuffer, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let (batch, channels, samples) = audio.waveform.dims3()?;
    if channels == 0 {
        candle_core::bail!("audio buffer has no channels");
    }
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            candle_core::Error::Msg(format!("failed to create {}: {}", dir.display(), e))
        })?;
    }

    let spec = WavSpec {
        channels: channels as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let data = audio.waveform.to_dtype(DType::F32)?.to_vec3::<f32>()?;
    let mut paths = Vec::with_capacity(batch);
    for (index, item) in data.iter().enumerate() {
        let item_stem = if batch > 1 {
            format!("{stem}_{:03}", index + 1)
        } else {
            stem.to_string()
        };
        let path = unique_path(dir, &item_stem, "wav");

        let mut writer = WavWriter::create(&path, spec).map_err(|e| {
            candle_core::Error::Msg(format!("failed to create {}: {}", path.display(), e))
        })?;
        for s in 0..samples {
            for lane in item.iter() {
                // Clamp to keep clipped peaks from wrapping around in i16.
                let v = lane[s].clamp(-1.0, 1.0);
                writer.write_sample((v * 32767.0) as i16).map_err(|e| {
                    candle_core::Error::Msg(format!(
                        "failed to write {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            }
        }
        writer.finalize().map_err(|e| {
            candle_core::Error::Msg(format!("failed to finalize {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), "saved audio");
        paths.push(path);
    }
    Ok(paths)
}

pub(crate) fn run_save_audio(inputs: &Inputs) -> Result<Vec<Value>> {
    let audio = inputs.audio("audio")?;
    let stem = inputs.text("filename")?;
    let path = inputs.text("path")?;
    let dir = if path.trim().is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(path.trim())
    };
    save_audio(audio, &dir, stem)?;
    Ok(Vec::new())
}
