//! Linear and spherical latent blending.

use candle_core::{Result, Tensor};

use crate::graph::value::{Inputs, Value};

/// Blend modes offered by the node.
pub const BLEND_MODES: &[&str] = &["linear", "spherical"];

/// Interpolation mode between the two latents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// `(1 - alpha) * base + alpha * noise`
    Linear,
    /// Great-circle interpolation on the flattened per-batch vectors.
    Spherical,
}

impl BlendMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Self::Linear),
            "spherical" => Ok(Self::Spherical),
            other => candle_core::bail!("unknown blend mode '{other}'"),
        }
    }
}

/// Blend two latents, `alpha` being the weight of `noise`.
///
/// The noise latent is resized (nearest-neighbor) when its spatial
/// dimensions differ from the base, and a batch of 1 broadcasts over a
/// larger base batch. The base latent is never mutated.
pub fn blend_latents(
    base: &Tensor,
    noise: &Tensor,
    alpha: f64,
    mode: BlendMode,
) -> Result<Tensor> {
    let (batch, channels, height, width) = base.dims4()?;
    let (noise_batch, noise_channels, noise_h, noise_w) = noise.dims4()?;
    if noise_channels != channels {
        candle_core::bail!(
            "latent channel mismatch: base has {channels}, noise has {noise_channels}"
        );
    }
    if noise_batch != batch && noise_batch != 1 {
        candle_core::bail!(
            "latent batch mismatch: base has {batch}, noise has {noise_batch}"
        );
    }

    let noise = if (noise_h, noise_w) != (height, width) {
        tracing::debug!(
            from = ?(noise_h, noise_w),
            to = ?(height, width),
            "resizing noise latent"
        );
        noise.upsample_nearest2d(height, width)?
    } else {
        noise.clone()
    };

    match mode {
        BlendMode::Linear => {
            let base_part = (base * (1.0 - alpha))?;
            let noise_part = (&noise * alpha)?;
            base_part.broadcast_add(&noise_part)
        }
        BlendMode::Spherical => slerp(base, &noise, alpha),
    }
}

/// Spherical interpolation per batch element.
///
/// Each element is treated as one flat vector; the interpolation follows the
/// great circle between the two, falling back to a lerp when either vector
/// is near zero or the pair is nearly parallel.
fn slerp(base: &Tensor, noise: &Tensor, t: f64) -> Result<Tensor> {
    let (batch, channels, height, width) = base.dims4()?;
    let noise_batch = noise.dim(0)?;
    let lane = channels * height * width;

    let a = base.flatten_all()?.to_vec1::<f32>()?;
    let b = noise.flatten_all()?.to_vec1::<f32>()?;

    let mut out = Vec::with_capacity(batch * lane);
    for index in 0..batch {
        let a_lane = &a[index * lane..(index + 1) * lane];
        let b_index = if noise_batch == 1 { 0 } else { index };
        let b_lane = &b[b_index * lane..(b_index + 1) * lane];

        let mut dot = 0f64;
        let mut norm_a = 0f64;
        let mut norm_b = 0f64;
        for (&x, &y) in a_lane.iter().zip(b_lane) {
            dot += x as f64 * y as f64;
            norm_a += x as f64 * x as f64;
            norm_b += y as f64 * y as f64;
        }
        let norm_a = norm_a.sqrt();
        let norm_b = norm_b.sqrt();

        let (w_a, w_b) = if norm_a < 1e-12 || norm_b < 1e-12 {
            (1.0 - t, t)
        } else {
            let cos_omega = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
            let omega = cos_omega.acos();
            let sin_omega = omega.sin();
            if sin_omega.abs() < 1e-6 {
                // Nearly parallel: the great circle degenerates.
                (1.0 - t, t)
            } else {
                (
                    (((1.0 - t) * omega).sin() / sin_omega),
                    ((t * omega).sin() / sin_omega),
                )
            }
        };

        out.extend(
            a_lane
                .iter()
                .zip(b_lane)
                .map(|(&x, &y)| (w_a * x as f64 + w_b * y as f64) as f32),
        );
    }
    Tensor::from_vec(out, (batch, channels, height, width), base.device())
}

pub(crate) fn run_latent_blend(inputs: &Inputs) -> Result<Vec<Value>> {
    let base = inputs.latent("latent_image")?;
    let noise = inputs.latent("latent_noise")?;
    let percentage = inputs.int("blend_percentage")?.clamp(0, 100);
    let mode = BlendMode::parse(inputs.text("mode")?)?;

    let alpha = percentage as f64 / 100.0;
    let blended = blend_latents(base, noise, alpha, mode)?;
    Ok(vec![Value::Latent(blended)])
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    fn latent(data: Vec<f32>, shape: (usize, usize, usize, usize)) -> Tensor {
        Tensor::from_vec(data, shape, &Device::Cpu).unwrap()
    }

    fn to_vec(t: &Tensor) -> Vec<f32> {
        t.flatten_all().unwrap().to_vec1::<f32>().unwrap()
    }

    #[test]
    fn test_linear_endpoints() {
        let base = latent(vec![1.0; 8], (1, 2, 2, 2));
        let noise = latent(vec![3.0; 8], (1, 2, 2, 2));

        let zero = blend_latents(&base, &noise, 0.0, BlendMode::Linear).unwrap();
        assert_eq!(to_vec(&zero), vec![1.0; 8]);

        let one = blend_latents(&base, &noise, 1.0, BlendMode::Linear).unwrap();
        assert_eq!(to_vec(&one), vec![3.0; 8]);

        let half = blend_latents(&base, &noise, 0.5, BlendMode::Linear).unwrap();
        assert_eq!(to_vec(&half), vec![2.0; 8]);
    }

    #[test]
    fn test_noise_batch_broadcasts() {
        let base = latent(vec![0.0; 16], (2, 2, 2, 2));
        let noise = latent(vec![4.0; 8], (1, 2, 2, 2));
        let out = blend_latents(&base, &noise, 0.5, BlendMode::Linear).unwrap();
        assert_eq!(out.dims(), &[2, 2, 2, 2]);
        assert_eq!(to_vec(&out), vec![2.0; 16]);
    }

    #[test]
    fn test_mismatched_noise_is_resized() {
        let base = latent(vec![0.0; 16], (1, 4, 2, 2));
        let noise = latent(vec![2.0, 2.0, 2.0, 2.0], (1, 4, 1, 1));
        let out = blend_latents(&base, &noise, 0.5, BlendMode::Linear).unwrap();
        assert_eq!(out.dims(), &[1, 4, 2, 2]);
        assert_eq!(to_vec(&out), vec![1.0; 16]);
    }

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let base = latent(vec![0.0; 8], (1, 2, 2, 2));
        let noise = latent(vec![0.0; 4], (1, 1, 2, 2));
        assert!(blend_latents(&base, &noise, 0.5, BlendMode::Linear).is_err());
    }

    #[test]
    fn test_slerp_preserves_norm_between_orthogonal_units() {
        // Orthogonal unit vectors: the midpoint of the great circle keeps
        // unit norm, where a lerp would shrink to sqrt(0.5).
        let base = latent(vec![1.0, 0.0, 0.0, 0.0], (1, 1, 2, 2));
        let noise = latent(vec![0.0, 1.0, 0.0, 0.0], (1, 1, 2, 2));
        let mid = blend_latents(&base, &noise, 0.5, BlendMode::Spherical).unwrap();
        let v = to_vec(&mid);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
        assert!((v[0] - v[1]).abs() < 1e-6);
    }

    #[test]
    fn test_slerp_endpoints() {
        let base = latent(vec![1.0, 2.0, -1.0, 0.5], (1, 1, 2, 2));
        let noise = latent(vec![-0.5, 1.0, 3.0, 2.0], (1, 1, 2, 2));
        let zero = blend_latents(&base, &noise, 0.0, BlendMode::Spherical).unwrap();
        for (x, y) in to_vec(&zero).iter().zip(to_vec(&base)) {
            assert!((x - y).abs() < 1e-5);
        }
        let one = blend_latents(&base, &noise, 1.0, BlendMode::Spherical).unwrap();
        for (x, y) in to_vec(&one).iter().zip(to_vec(&noise)) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_slerp_parallel_falls_back_to_lerp() {
        let base = latent(vec![1.0, 1.0, 1.0, 1.0], (1, 1, 2, 2));
        let noise = latent(vec![2.0, 2.0, 2.0, 2.0], (1, 1, 2, 2));
        let mid = blend_latents(&base, &noise, 0.5, BlendMode::Spherical).unwrap();
        for v in to_vec(&mid) {
            assert!((v - 1.5).abs() < 1e-5);
        }
    }
}
