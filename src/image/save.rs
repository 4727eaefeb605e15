//! PNG/JPEG/WEBP export with a sidecar text file.
//!
//! Alongside every image the node writes a `.txt` file describing the model
//! stack, the prompts, and up to three sampler passes, so a render can be
//! reproduced from the files alone.

use std::path::{Path, PathBuf};

use candle_core::{Result, Tensor};

use crate::graph::value::{Inputs, Value};
use crate::image::batch_to_image;

/// File formats offered by the save node.
pub const SAVE_FORMATS: &[&str] = &["png", "jpg", "webp"];

/// One sampler pass recorded in the sidecar.
#[derive(Debug, Clone, Default)]
pub struct SamplerPass {
    pub sampler: Option<String>,
    pub scheduler: Option<String>,
    pub steps: Option<i64>,
    pub seed: Option<i64>,
}

impl SamplerPass {
    fn is_set(&self) -> bool {
        self.sampler.is_some() || self.steps.is_some()
    }

    fn describe(&self, ordinal: &str) -> String {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
        let num_or_na = |v: &Option<i64>| v.map_or_else(|| "N/A".to_string(), |n| n.to_string());
        format!(
            "{ordinal} pass: sampler {}, scheduler {}, steps {}, seed {}",
            or_na(&self.sampler),
            or_na(&self.scheduler),
            num_or_na(&self.steps),
            num_or_na(&self.seed),
        )
    }
}

/// Everything the sidecar records besides the image itself.
#[derive(Debug, Clone, Default)]
pub struct SidecarMeta {
    pub model_name: String,
    pub clip_name: String,
    pub vae_name: String,
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub passes: [SamplerPass; 3],
    /// Raw JSON handed down by the host (workflow snapshot); embedded
    /// pretty-printed when it parses, skipped with a warning otherwise.
    pub extra_json: Option<String>,
}

/// Next free counter for `prefix_NNNNN_` filenames in `dir`.
pub(crate) fn next_counter(dir: &Path, prefix: &str) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 1;
    };
    let marker = format!("{prefix}_");
    let mut max = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(rest) = name.strip_prefix(&marker) else {
            continue;
        };
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(count) = digits.parse::<usize>() {
            max = max.max(count);
        }
    }
    max + 1
}

fn sidecar_text(file_name: &str, image_path: &Path, format: &str, meta: &SidecarMeta) -> String {
    let pass_lines: Vec<String> = meta
        .passes
        .iter()
        .zip(["First", "Second", "Third"])
        .filter(|(pass, _)| pass.is_set())
        .map(|(pass, ordinal)| pass.describe(ordinal))
        .collect();

    let mut text = format!(
        "FILENAME INFORMATION\n\
         Filename: {file_name}\n\
         Filepath: {path}\n\
         Format:   {format}\n\
         \n\
         ==================================================\n\
         MODEL DETAILS\n\
         ==================================================\n\
         Diffusion Model: {model}\n\
         Clip Model:      {clip}\n\
         VAE Model:       {vae}\n\
         \n\
         ==================================================\n\
         PROMPTS\n\
         ==================================================\n\
         [Positive Prompt]\n\
         {positive}\n\
         \n\
         [Negative Prompt]\n\
         {negative}\n\
         \n\
         ==================================================\n\
         SAMPLING PROCESS (Seeds & Steps)\n\
         ==================================================\n\
         {passes}\n",
        file_name = file_name,
        path = image_path.display(),
        format = format.to_uppercase(),
        model = meta.model_name,
        clip = meta.clip_name,
        vae = meta.vae_name,
        positive = meta.positive_prompt,
        negative = meta.negative_prompt,
        passes = pass_lines.join("\n"),
    );

    if let Some(raw) = &meta.extra_json {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(parsed) => {
                let pretty = serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| raw.clone());
                text.push_str("\n==================================================\n");
                text.push_str("WORKFLOW\n");
                text.push_str("==================================================\n");
                text.push_str(&pretty);
                text.push('\n');
            }
            Err(e) => tracing::warn!(error = %e, "workflow metadata is not valid JSON, skipping"),
        }
    }
    text
}

/// Save every batch item plus its sidecar; returns the image paths written.
pub fn save_images_with_sidecar(
    image: &Tensor,
    dir: &Path,
    prefix: &str,
    format: &str,
    meta: &SidecarMeta,
) -> Result<Vec<PathBuf>> {
    if !SAVE_FORMATS.contains(&format) {
        candle_core::bail!("unknown image format '{format}'");
    }
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            candle_core::Error::Msg(format!("failed to create {}: {}", dir.display(), e))
        })?;
    }

    let (batch, _height, _width, _channels) = image.dims4()?;
    let mut counter = next_counter(dir, prefix);
    let mut paths = Vec::with_capacity(batch);
    for index in 0..batch {
        let mut item = batch_to_image(image, index)?;
        // JPEG has no alpha channel.
        if format == "jpg" && item.color().has_alpha() {
            item = image::DynamicImage::ImageRgb8(item.to_rgb8());
        }

        let file_base = format!("{prefix}_{counter:05}_");
        let file_name = format!("{file_base}.{format}");
        let image_path = dir.join(&file_name);
        let txt_path = dir.join(format!("{file_base}.txt"));

        item.save(&image_path).map_err(|e| {
            candle_core::Error::Msg(format!("failed to save {}: {}", image_path.display(), e))
        })?;
        std::fs::write(&txt_path, sidecar_text(&file_name, &image_path, format, meta)).map_err(
            |e| candle_core::Error::Msg(format!("failed to write {}: {}", txt_path.display(), e)),
        )?;

        tracing::info!(path = %image_path.display(), "saved image with sidecar");
        paths.push(image_path);
        counter += 1;
    }
    Ok(paths)
}

fn pass_from_inputs(inputs: &Inputs, prefix: &str) -> SamplerPass {
    SamplerPass {
        sampler: inputs.text_opt(&format!("{prefix}_sampler")).map(String::from),
        scheduler: inputs
            .text_opt(&format!("{prefix}_scheduler"))
            .map(String::from),
        steps: inputs.int_opt(&format!("{prefix}_steps")),
        seed: inputs.int_opt(&format!("{prefix}_seed")),
    }
}

pub(crate) fn run_save_image_sidecar(inputs: &Inputs) -> Result<Vec<Value>> {
    let image = inputs.image("images")?;
    let prefix = inputs.text("filename_prefix")?;
    let format = inputs.text("file_format")?;
    let output_path = inputs.text("output_path")?;
    let dir = if output_path.trim().is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(output_path.trim())
    };

    let meta = SidecarMeta {
        model_name: inputs.text("model_name")?.to_string(),
        clip_name: inputs.text("clip_name")?.to_string(),
        vae_name: inputs.text("vae_name")?.to_string(),
        positive_prompt: inputs.text("positive_prompt")?.to_string(),
        negative_prompt: inputs.text("negative_prompt")?.to_string(),
        passes: [
            pass_from_inputs(inputs, "p1"),
            pass_from_inputs(inputs, "p2"),
            pass_from_inputs(inputs, "p3"),
        ],
        extra_json: inputs.text_opt("workflow_json").map(String::from),
    };

    save_images_with_sidecar(image, &dir, prefix, format, &meta)?;
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    fn test_image(batch: usize, channels: usize) -> Tensor {
        let data = vec![0.5f32; batch * 4 * 4 * channels];
        Tensor::from_vec(data, (batch, 4, 4, channels), &Device::Cpu).unwrap()
    }

    fn test_meta() -> SidecarMeta {
        SidecarMeta {
            model_name: "model-a".to_string(),
            positive_prompt: "a quiet harbor".to_string(),
            passes: [
                SamplerPass {
                    sampler: Some("euler".to_string()),
                    scheduler: Some("simple".to_string()),
                    steps: Some(20),
                    seed: Some(42),
                },
                SamplerPass::default(),
                SamplerPass::default(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_save_writes_image_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let paths =
            save_images_with_sidecar(&test_image(1, 3), dir.path(), "render", "png", &test_meta())
                .unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].file_name().unwrap(), "render_00001_.png");

        let sidecar = std::fs::read_to_string(dir.path().join("render_00001_.txt")).unwrap();
        assert!(sidecar.contains("[Positive Prompt]\na quiet harbor"));
        assert!(sidecar.contains("Diffusion Model: model-a"));
        assert!(sidecar.contains("First pass: sampler euler, scheduler simple, steps 20, seed 42"));
        // Unset passes leave no line behind.
        assert!(!sidecar.contains("Second pass"));
    }

    #[test]
    fn test_counter_continues_across_saves() {
        let dir = tempfile::tempdir().unwrap();
        save_images_with_sidecar(&test_image(2, 3), dir.path(), "render", "png", &test_meta())
            .unwrap();
        let paths =
            save_images_with_sidecar(&test_image(1, 3), dir.path(), "render", "png", &test_meta())
                .unwrap();
        assert_eq!(paths[0].file_name().unwrap(), "render_00003_.png");
    }

    #[test]
    fn test_jpg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let paths =
            save_images_with_sidecar(&test_image(1, 4), dir.path(), "render", "jpg", &test_meta())
                .unwrap();
        let saved = image::open(&paths[0]).unwrap();
        assert!(!saved.color().has_alpha());
    }

    #[test]
    fn test_workflow_json_is_embedded_when_valid() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = test_meta();
        meta.extra_json = Some(r#"{"seed": 42}"#.to_string());
        save_images_with_sidecar(&test_image(1, 3), dir.path(), "render", "png", &meta).unwrap();
        let sidecar = std::fs::read_to_string(dir.path().join("render_00001_.txt")).unwrap();
        assert!(sidecar.contains("WORKFLOW"));
        assert!(sidecar.contains("\"seed\": 42"));

        meta.extra_json = Some("not json".to_string());
        save_images_with_sidecar(&test_image(1, 3), dir.path(), "other", "png", &meta).unwrap();
        let sidecar = std::fs::read_to_string(dir.path().join("other_00001_.txt")).unwrap();
        assert!(!sidecar.contains("WORKFLOW"));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_images_with_sidecar(
            &test_image(1, 3),
            dir.path(),
            "render",
            "bmp",
            &test_meta(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown image format"));
    }
}
