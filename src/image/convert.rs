//! Channel-layout conversion.

use candle_core::{Result, Tensor};

use crate::graph::value::{Inputs, Value};

/// Drop the alpha channel of an RGBA image without touching color values.
///
/// 4-channel input is sliced to its first three channels (a view, no pixel
/// math). 3-channel input passes through unchanged, and single-channel
/// input is replicated to RGB. Other channel counts pass through with a
/// warning.
pub fn rgba_to_rgb(image: &Tensor) -> Result<Tensor> {
    let (_batch, _height, _width, channels) = image.dims4()?;
    match channels {
        4 => image.narrow(3, 0, 3),
        3 => Ok(image.clone()),
        1 => image.repeat((1, 1, 1, 3)),
        other => {
            tracing::warn!(channels = other, "unexpected channel count, passing image through");
            Ok(image.clone())
        }
    }
}

pub(crate) fn run_rgba_to_rgb(inputs: &Inputs) -> Result<Vec<Value>> {
    let image = inputs.image("image")?;
    Ok(vec![Value::Image(rgba_to_rgb(image)?)])
}

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device};

    use super::*;

    #[test]
    fn test_rgba_slices_alpha_off() {
        let data: Vec<f32> = (0..2 * 2 * 4).map(|i| i as f32 / 16.0).collect();
        let rgba = Tensor::from_vec(data, (1, 2, 2, 4), &Device::Cpu).unwrap();
        let rgb = rgba_to_rgb(&rgba).unwrap();
        assert_eq!(rgb.dims(), &[1, 2, 2, 3]);
        // Color values are untouched.
        let expected = rgba.narrow(3, 0, 3).unwrap().flatten_all().unwrap();
        let got = rgb.flatten_all().unwrap();
        assert_eq!(
            expected.to_vec1::<f32>().unwrap(),
            got.to_vec1::<f32>().unwrap()
        );
    }

    #[test]
    fn test_rgb_passes_through() {
        let rgb = Tensor::zeros((2, 4, 4, 3), DType::F32, &Device::Cpu).unwrap();
        let out = rgba_to_rgb(&rgb).unwrap();
        assert_eq!(out.dims(), &[2, 4, 4, 3]);
    }

    #[test]
    fn test_grayscale_replicates() {
        let gray = Tensor::from_vec(vec![0.25f32, 0.75], (1, 1, 2, 1), &Device::Cpu).unwrap();
        let rgb = rgba_to_rgb(&gray).unwrap();
        assert_eq!(rgb.dims(), &[1, 1, 2, 3]);
        assert_eq!(
            rgb.flatten_all().unwrap().to_vec1::<f32>().unwrap(),
            vec![0.25, 0.25, 0.25, 0.75, 0.75, 0.75]
        );
    }

    #[test]
    fn test_unknown_channel_count_passes_through() {
        let odd = Tensor::zeros((1, 2, 2, 5), DType::F32, &Device::Cpu).unwrap();
        let out = rgba_to_rgb(&odd).unwrap();
        assert_eq!(out.dims(), &[1, 2, 2, 5]);
    }
}
