//! Zero-filled latent initialization.
//!
//! Targets the 16-channel image VAE used by the Qwen-Image family: pixel
//! dimensions aligned to 16, latent dimensions at 1/8 scale. The sampler
//! adds its own noise, so the latent starts at zero.

use candle_core::{DType, Device, Result, Tensor};

use crate::graph::value::{Inputs, Value};

/// Channels of the target VAE's latent space.
pub const LATENT_CHANNELS: usize = 16;

/// Spatial downscale factor between pixels and latents.
pub const DOWNSCALE_FACTOR: usize = 8;

/// Pixel dimensions are rounded to multiples of this.
pub const PIXEL_ALIGNMENT: usize = 16;

/// Supported resolutions, label to `(width, height)`.
pub static RESOLUTION_PRESETS: &[(&str, (usize, usize))] = &[
    ("1:1 (1328x1328)", (1328, 1328)),
    ("16:9 (1664x928)", (1664, 928)),
    ("9:16 (928x1664)", (928, 1664)),
    ("4:3 (1472x1104)", (1472, 1104)),
    ("3:4 (1104x1472)", (1104, 1472)),
    ("3:2 (1584x1056)", (1584, 1056)),
    ("2:3 (1056x1584)", (1056, 1584)),
];

/// Preset labels in table order, for the resolution dropdown.
pub static RESOLUTION_LABELS: &[&str] = &[
    "1:1 (1328x1328)",
    "16:9 (1664x928)",
    "9:16 (928x1664)",
    "4:3 (1472x1104)",
    "3:4 (1104x1472)",
    "3:2 (1584x1056)",
    "2:3 (1056x1584)",
];

/// Look up a preset's base dimensions by label.
pub fn lookup_preset(label: &str) -> Option<(usize, usize)> {
    RESOLUTION_PRESETS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, dims)| *dims)
}

/// Scale base dimensions and round to the pixel alignment.
///
/// Ties round to even, so 1160 / 16 = 72.5 lands on 72 * 16 = 1152.
pub fn aligned_dims(base_w: usize, base_h: usize, multiplier: f64) -> (usize, usize) {
    let align = |v: f64| {
        ((v / PIXEL_ALIGNMENT as f64).round_ties_even() as usize) * PIXEL_ALIGNMENT
    };
    (
        align(base_w as f64 * multiplier),
        align(base_h as f64 * multiplier),
    )
}

pub(crate) fn run_empty_latent(inputs: &Inputs) -> Result<Vec<Value>> {
    let label = inputs.text("resolution")?;
    let multiplier = inputs.float("size_multiplier")?;
    let batch_size = inputs.int("batch_size")?.max(1) as usize;

    let Some((base_w, base_h)) = lookup_preset(label) else {
        candle_core::bail!("unknown resolution preset '{label}'");
    };
    let (width, height) = aligned_dims(base_w, base_h, multiplier);

    let latent = Tensor::zeros(
        (
            batch_size,
            LATENT_CHANNELS,
            height / DOWNSCALE_FACTOR,
            width / DOWNSCALE_FACTOR,
        ),
        DType::F32,
        &Device::Cpu,
    )?;
    Ok(vec![
        Value::Latent(latent),
        Value::Int(width as i64),
        Value::Int(height as i64),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_presets() {
        assert_eq!(RESOLUTION_LABELS.len(), RESOLUTION_PRESETS.len());
        for (label, (name, _)) in RESOLUTION_LABELS.iter().zip(RESOLUTION_PRESETS) {
            assert_eq!(label, name);
        }
    }

    #[test]
    fn test_aligned_dims_rounds_ties_to_even() {
        // 928 * 1.25 = 1160; 1160 / 16 = 72.5 rounds down to 72 -> 1152.
        let (w, h) = aligned_dims(1664, 928, 1.25);
        assert_eq!(w, 2080);
        assert_eq!(h, 1152);
    }

    #[test]
    fn test_unit_multiplier_keeps_presets() {
        for &(_, (base_w, base_h)) in RESOLUTION_PRESETS {
            let (w, h) = aligned_dims(base_w, base_h, 1.0);
            assert_eq!((w, h), (base_w, base_h));
        }
    }

    #[test]
    fn test_node_produces_zero_latent() {
        let inputs = Inputs::new()
            .with("resolution", Value::Text("16:9 (1664x928)".to_string()))
            .with("size_multiplier", Value::Float(1.0))
            .with("batch_size", Value::Int(2));
        let outputs = run_empty_latent(&inputs).unwrap();
        assert_eq!(outputs.len(), 3);

        let Value::Latent(latent) = &outputs[0] else {
            panic!("expected latent");
        };
        assert_eq!(latent.dims(), &[2, 16, 116, 208]);
        let sum = latent
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
            .iter()
            .sum::<f32>();
        assert_eq!(sum, 0.0);

        let Value::Int(width) = &outputs[1] else {
            panic!("expected width");
        };
        let Value::Int(height) = &outputs[2] else {
            panic!("expected height");
        };
        assert_eq!((*width, *height), (1664, 928));
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let inputs = Inputs::new()
            .with("resolution", Value::Text("5:4 (definitely not)".to_string()))
            .with("size_multiplier", Value::Float(1.0))
            .with("batch_size", Value::Int(1));
        assert!(run_empty_latent(&inputs).is_err());
    }
}
