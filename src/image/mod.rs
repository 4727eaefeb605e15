//! Image node components.
//!
//! This module contains:
//! - `convert`: channel-layout conversion (RGBA to RGB)
//! - `resize`: megapixel-preserving resize
//! - `save`: PNG/JPEG/WEBP export with a sidecar text file
//! - `iterate`: directory iteration with a cache fingerprint
//!
//! Image tensors are `(batch, height, width, channels)` f32 in `[0, 1]`,
//! with 3 (RGB) or 4 (RGBA) channels.

pub mod convert;
pub mod iterate;
pub mod resize;
pub mod save;

use candle_core::{DType, Device, Result, Tensor};

/// Load one 8-bit RGB image buffer into a `(1, height, width, 3)` tensor.
pub fn rgb8_to_tensor(img: &image::RgbImage, device: &Device) -> Result<Tensor> {
    let (width, height) = img.dimensions();
    let data: Vec<f32> = img.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    Tensor::from_vec(data, (1, height as usize, width as usize, 3), device)
}

/// Extract one batch item as raw f32 pixels plus its dimensions.
pub(crate) fn batch_pixels(image: &Tensor, index: usize) -> Result<(Vec<f32>, usize, usize, usize)> {
    let (_batch, height, width, channels) = image.dims4()?;
    let item = image
        .narrow(0, index, 1)?
        .to_dtype(DType::F32)?
        .flatten_all()?
        .to_vec1::<f32>()?;
    Ok((item, height, width, channels))
}

/// Extract one batch item as an 8-bit image, keeping an alpha channel when
/// the tensor carries one.
pub(crate) fn batch_to_image(image: &Tensor, index: usize) -> Result<image::DynamicImage> {
    let (pixels, height, width, channels) = batch_pixels(image, index)?;
    let bytes: Vec<u8> = pixels
        .iter()
        .map(|&v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();
    match channels {
        3 => {
            let buffer = image::RgbImage::from_raw(width as u32, height as u32, bytes)
                .ok_or_else(|| candle_core::Error::Msg("image buffer size mismatch".to_string()))?;
            Ok(image::DynamicImage::ImageRgb8(buffer))
        }
        4 => {
            let buffer = image::RgbaImage::from_raw(width as u32, height as u32, bytes)
                .ok_or_else(|| candle_core::Error::Msg("image buffer size mismatch".to_string()))?;
            Ok(image::DynamicImage::ImageRgba8(buffer))
        }
        other => candle_core::bail!("expected 3 or 4 channels, got {other}"),
    }
}
