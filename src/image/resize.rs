//! Megapixel-preserving resize.

use candle_core::{Result, Tensor};
use image::imageops::{self, FilterType};

use crate::graph::value::{Inputs, Value};
use crate::image::batch_pixels;

/// Resampling methods offered by the resize node.
pub const RESIZE_METHODS: &[&str] = &["lanczos", "bicubic", "bilinear", "nearest"];

/// Compute target dimensions for a given pixel budget.
///
/// The aspect ratio is preserved (`height = sqrt(area / aspect)`), then both
/// dimensions are rounded to the nearest multiple of 8 and clamped to at
/// least 8.
pub fn megapixel_dims(width: usize, height: usize, target_megapixels: f64) -> (usize, usize) {
    let aspect = width as f64 / height as f64;
    let target_pixels = target_megapixels * 1_000_000.0;
    let new_h = (target_pixels / aspect).sqrt();
    let new_w = new_h * aspect;
    let round8 = |v: f64| (((v / 8.0).round_ties_even() as usize) * 8).max(8);
    (round8(new_w), round8(new_h))
}

fn filter_from_name(name: &str) -> Result<FilterType> {
    match name {
        "lanczos" => Ok(FilterType::Lanczos3),
        "bicubic" => Ok(FilterType::CatmullRom),
        "bilinear" => Ok(FilterType::Triangle),
        "nearest" => Ok(FilterType::Nearest),
        other => candle_core::bail!("unknown resize method '{other}'"),
    }
}

/// Resize every batch item to `(new_w, new_h)` with the given method.
///
/// Resampling runs on f32 pixels, so repeated resizes do not accumulate
/// 8-bit quantization error.
pub fn resize_image(image: &Tensor, new_w: usize, new_h: usize, method: &str) -> Result<Tensor> {
    let filter = filter_from_name(method)?;
    let (batch, _height, _width, channels) = image.dims4()?;

    let mut out = Vec::with_capacity(batch * new_h * new_w * channels);
    for index in 0..batch {
        let (pixels, height, width, channels) = batch_pixels(image, index)?;
        match channels {
            3 => {
                let buffer =
                    image::Rgb32FImage::from_raw(width as u32, height as u32, pixels).ok_or_else(
                        || candle_core::Error::Msg("image buffer size mismatch".to_string()),
                    )?;
                let resized = imageops::resize(&buffer, new_w as u32, new_h as u32, filter);
                out.extend_from_slice(resized.as_raw());
            }
            4 => {
                let buffer =
                    image::Rgba32FImage::from_raw(width as u32, height as u32, pixels).ok_or_else(
                        || candle_core::Error::Msg("image buffer size mismatch".to_string()),
                    )?;
                let resized = imageops::resize(&buffer, new_w as u32, new_h as u32, filter);
                out.extend_from_slice(resized.as_raw());
            }
            other => candle_core::bail!("expected 3 or 4 channels, got {other}"),
        }
    }
    Tensor::from_vec(out, (batch, new_h, new_w, channels), image.device())
}

pub(crate) fn run_megapixel_resize(inputs: &Inputs) -> Result<Vec<Value>> {
    let image = inputs.image("image")?;
    let target_megapixels = inputs.float("target_megapixels")?;
    let method = inputs.text("method")?;

    let (_batch, height, width, _channels) = image.dims4()?;
    let (new_w, new_h) = megapixel_dims(width, height, target_megapixels);
    let resized = resize_image(image, new_w, new_h, method)?;
    Ok(vec![
        Value::Image(resized),
        Value::Int(new_w as i64),
        Value::Int(new_h as i64),
    ])
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    #[test]
    fn test_megapixel_dims_square() {
        let (w, h) = megapixel_dims(512, 512, 1.0);
        assert_eq!((w, h), (1000, 1000));
    }

    #[test]
    fn test_megapixel_dims_keeps_aspect_and_alignment() {
        let (w, h) = megapixel_dims(1664, 928, 1.0);
        assert_eq!(w % 8, 0);
        assert_eq!(h % 8, 0);
        let aspect_in = 1664.0 / 928.0;
        let aspect_out = w as f64 / h as f64;
        assert!((aspect_in - aspect_out).abs() < 0.05);
        let area = (w * h) as f64;
        assert!((area - 1_000_000.0).abs() < 40_000.0);
    }

    #[test]
    fn test_megapixel_dims_never_collapses() {
        let (w, h) = megapixel_dims(4096, 16, 0.001);
        assert!(w >= 8);
        assert!(h >= 8);
    }

    #[test]
    fn test_resize_nearest_preserves_constant_image() {
        let data = vec![0.5f32; 4 * 4 * 3];
        let image = Tensor::from_vec(data, (1, 4, 4, 3), &Device::Cpu).unwrap();
        let resized = resize_image(&image, 8, 8, "nearest").unwrap();
        assert_eq!(resized.dims(), &[1, 8, 8, 3]);
        for v in resized.flatten_all().unwrap().to_vec1::<f32>().unwrap() {
            assert!((v - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_resize_keeps_batch_and_alpha() {
        let data = vec![0.25f32; 2 * 4 * 4 * 4];
        let image = Tensor::from_vec(data, (2, 4, 4, 4), &Device::Cpu).unwrap();
        let resized = resize_image(&image, 8, 6, "bilinear").unwrap();
        assert_eq!(resized.dims(), &[2, 6, 8, 4]);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let image = Tensor::zeros((1, 4, 4, 3), candle_core::DType::F32, &Device::Cpu).unwrap();
        assert!(resize_image(&image, 8, 8, "area").is_err());
    }
}
