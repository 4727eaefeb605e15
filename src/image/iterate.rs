//! Directory iteration.
//!
//! Loads a deterministic, sorted slice of a directory's images and forwards
//! them one-by-one to downstream nodes as list outputs. The slice is
//! fingerprinted (filenames + modification times) so the host can skip
//! re-execution until the slice actually changes.

use std::path::Path;
use std::time::UNIX_EPOCH;

use candle_core::{Device, Result, Tensor};
use sha2::{Digest, Sha256};

use crate::graph::value::{Inputs, Value};
use crate::image::rgb8_to_tensor;

/// Extensions the iterator accepts, lowercase.
pub const VALID_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff"];

fn has_valid_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VALID_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sorted slice of image filenames in `dir`.
///
/// `limit` of 0 means everything from `start_index` on.
pub fn list_image_slice(dir: &Path, start_index: usize, limit: usize) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        candle_core::Error::Msg(format!("failed to read {}: {}", dir.display(), e))
    })?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str().map(String::from))
        .filter(|name| has_valid_extension(name))
        .collect();
    names.sort();

    let end = if limit > 0 {
        (start_index + limit).min(names.len())
    } else {
        names.len()
    };
    if start_index >= names.len() {
        return Ok(Vec::new());
    }
    Ok(names[start_index..end].to_vec())
}

/// Hash of the slice's filenames and modification times.
///
/// The host treats a changed fingerprint as a cache miss; renames, edits,
/// additions, and removals inside the slice all change it.
pub fn slice_fingerprint(dir: &Path, start_index: usize, limit: usize) -> Result<String> {
    let mut hasher = Sha256::new();
    for name in list_image_slice(dir, start_index, limit)? {
        let path = dir.join(&name);
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| {
                candle_core::Error::Msg(format!("failed to stat {}: {}", path.display(), e))
            })?;
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        hasher.update(name.as_bytes());
        hasher.update(nanos.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Load one image file as a `(1, height, width, 3)` tensor.
pub fn load_image_tensor(path: &Path, device: &Device) -> Result<Tensor> {
    let img = image::open(path)
        .map_err(|e| {
            candle_core::Error::Msg(format!("failed to load {}: {}", path.display(), e))
        })?
        .to_rgb8();
    rgb8_to_tensor(&img, device)
}

pub(crate) fn run_directory_iterator(inputs: &Inputs) -> Result<Vec<Value>> {
    let folder = inputs.text("folder_path")?;
    let start_index = inputs.int("start_index")?.max(0) as usize;
    let limit = inputs.int("image_limit")?.max(0) as usize;

    let dir = Path::new(folder.trim());
    if !dir.is_dir() {
        candle_core::bail!("directory does not exist: {}", dir.display());
    }

    let names = list_image_slice(dir, start_index, limit)?;
    if names.is_empty() {
        candle_core::bail!("no valid images found in the specified range");
    }
    tracing::debug!(count = names.len(), "iterating directory slice");

    let mut images = Vec::with_capacity(names.len());
    let mut filenames = Vec::with_capacity(names.len());
    for name in names {
        let tensor = load_image_tensor(&dir.join(&name), &Device::Cpu)?;
        images.push(Value::Image(tensor));
        filenames.push(Value::Text(name));
    }
    Ok(vec![Value::List(images), Value::List(filenames)])
}

pub(crate) fn run_iterator_filename(inputs: &Inputs) -> Result<Vec<Value>> {
    let names = inputs.list("filename")?;
    let mut stripped = Vec::with_capacity(names.len());
    for value in names {
        let Value::Text(name) = value else {
            candle_core::bail!("expected filename text, got {}", value.kind_str());
        };
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name.as_str())
            .to_string();
        stripped.push(Value::Text(stem));
    }
    Ok(vec![Value::List(stripped)])
}
