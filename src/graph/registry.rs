//! The static node registry.
//!
//! One immutable table describes every node in the pack; the host looks
//! nodes up by their stable name, renders widgets from the schema, and
//! dispatches through the stored run function. The table is plain data
//! built at compile time; only the name index is constructed lazily.

use std::collections::HashMap;

use candle_core::Result;
use once_cell::sync::Lazy;

use crate::graph::schema::{InputDef, NodeDef, OutputDef, ValueKind, Widget};
use crate::graph::value::{Inputs, Value};
use crate::image::resize::RESIZE_METHODS;
use crate::image::save::SAVE_FORMATS;
use crate::latent::blend::BLEND_MODES;
use crate::latent::empty::RESOLUTION_LABELS;
use crate::{audio, image, latent, params, routing};

/// Every node in the pack.
pub static NODE_TYPES: &[NodeDef] = &[
    NodeDef {
        name: "TiledAudioDecode",
        display_name: "Tiled Audio Decode",
        category: "audio",
        inputs: &[
            InputDef::link("latent", ValueKind::Latent),
            InputDef::link("decoder", ValueKind::Decoder),
            InputDef::int("tile_size", 512, 128, 4096),
            InputDef::int("overlap", 64, 16, 512),
        ],
        outputs: &[OutputDef::single("audio", ValueKind::Audio)],
        output_node: false,
        run: audio::tiled::run_tiled_decode,
    },
    NodeDef {
        name: "SaveAudio",
        display_name: "Save Audio",
        category: "audio/output",
        inputs: &[
            InputDef::link("audio", ValueKind::Audio),
            InputDef::text("filename", "audio_output"),
            InputDef::text("path", ""),
        ],
        outputs: &[],
        output_node: true,
        run: audio::save::run_save_audio,
    },
    NodeDef {
        name: "RgbaToRgb",
        display_name: "RGBA to RGB (Lossless)",
        category: "image/convert",
        inputs: &[InputDef::link("image", ValueKind::Image)],
        outputs: &[OutputDef::single("rgb_image", ValueKind::Image)],
        output_node: false,
        run: image::convert::run_rgba_to_rgb,
    },
    NodeDef {
        name: "MegapixelResize",
        display_name: "Megapixel Resize",
        category: "image/resize",
        inputs: &[
            InputDef::link("image", ValueKind::Image),
            InputDef::float("target_megapixels", 1.0, 0.1, 4.0, 0.01),
            InputDef::combo("method", RESIZE_METHODS, "lanczos"),
        ],
        outputs: &[
            OutputDef::single("image", ValueKind::Image),
            OutputDef::single("width", ValueKind::Int),
            OutputDef::single("height", ValueKind::Int),
        ],
        output_node: false,
        run: image::resize::run_megapixel_resize,
    },
    NodeDef {
        name: "SaveImageWithSidecar",
        display_name: "Save Image with Sidecar TXT",
        category: "image/output",
        inputs: &[
            InputDef::link("images", ValueKind::Image),
            InputDef::text("filename_prefix", "render"),
            InputDef::combo("file_format", SAVE_FORMATS, "png"),
            InputDef::optional_text("output_path", ""),
            InputDef::optional_text("positive_prompt", ""),
            InputDef::optional_text("negative_prompt", ""),
            InputDef::optional_text("model_name", "Unknown Model"),
            InputDef::optional_text("clip_name", "Unknown CLIP"),
            InputDef::optional_text("vae_name", "Unknown VAE"),
            InputDef::optional_link("p1_sampler", ValueKind::Text),
            InputDef::optional_link("p1_scheduler", ValueKind::Text),
            InputDef::optional_link("p1_steps", ValueKind::Int),
            InputDef::optional_link("p1_seed", ValueKind::Int),
            InputDef::optional_link("p2_sampler", ValueKind::Text),
            InputDef::optional_link("p2_scheduler", ValueKind::Text),
            InputDef::optional_link("p2_steps", ValueKind::Int),
            InputDef::optional_link("p2_seed", ValueKind::Int),
            InputDef::optional_link("p3_sampler", ValueKind::Text),
            InputDef::optional_link("p3_scheduler", ValueKind::Text),
            InputDef::optional_link("p3_steps", ValueKind::Int),
            InputDef::optional_link("p3_seed", ValueKind::Int),
            InputDef::optional_link("workflow_json", ValueKind::Text),
        ],
        outputs: &[],
        output_node: true,
        run: image::save::run_save_image_sidecar,
    },
    NodeDef {
        name: "DirectoryImageIterator",
        display_name: "Directory Image Iterator",
        category: "image/iteration",
        inputs: &[
            InputDef::text("folder_path", ""),
            InputDef::int("start_index", 0, 0, 100_000),
            InputDef::int("image_limit", 0, 0, 100_000),
        ],
        outputs: &[
            OutputDef::list("image", ValueKind::Image),
            OutputDef::list("filename", ValueKind::Text),
        ],
        output_node: false,
        run: image::iterate::run_directory_iterator,
    },
    NodeDef {
        name: "IteratorFilename",
        display_name: "Iterator Current Filename",
        category: "image/iteration",
        inputs: &[InputDef::link("filename", ValueKind::Text)],
        outputs: &[OutputDef::list("filename_prefix", ValueKind::Text)],
        output_node: false,
        run: image::iterate::run_iterator_filename,
    },
    NodeDef {
        name: "EmptyQwenImageLatent",
        display_name: "Empty Qwen-Image Latent",
        category: "latent",
        inputs: &[
            InputDef::combo("resolution", RESOLUTION_LABELS, "16:9 (1664x928)"),
            InputDef::slider("size_multiplier", 1.0, 1.0, 2.0, 0.25),
            InputDef::int("batch_size", 1, 1, 64),
        ],
        outputs: &[
            OutputDef::single("latent", ValueKind::Latent),
            OutputDef::single("width", ValueKind::Int),
            OutputDef::single("height", ValueKind::Int),
        ],
        output_node: false,
        run: latent::empty::run_empty_latent,
    },
    NodeDef {
        name: "LatentBlend",
        display_name: "Latent Blend",
        category: "latent/noise",
        inputs: &[
            InputDef::link("latent_image", ValueKind::Latent),
            InputDef::link("latent_noise", ValueKind::Latent),
            InputDef::int("blend_percentage", 50, 0, 100),
            InputDef::combo("mode", BLEND_MODES, "linear"),
        ],
        outputs: &[OutputDef::single("blended_latent", ValueKind::Latent)],
        output_node: false,
        run: latent::blend::run_latent_blend,
    },
    NodeDef {
        name: "Slider",
        display_name: "Slider",
        category: "params/slider",
        inputs: &[
            InputDef::int("value_int", 20, -4_294_967_296, 4_294_967_296),
            InputDef::float("value_float", 20.0, -4_294_967_296.0, 4_294_967_296.0, 1.0),
            InputDef::int("is_float", 0, 0, 1),
        ],
        outputs: &[OutputDef::single("x", ValueKind::Any)],
        output_node: false,
        run: params::run_slider,
    },
    NodeDef {
        name: "Slider2D",
        display_name: "Slider 2D",
        category: "params/slider",
        inputs: &[
            InputDef::int("x_int", 512, -4_294_967_296, 4_294_967_296),
            InputDef::float("x_float", 512.0, -4_294_967_296.0, 4_294_967_296.0, 1.0),
            InputDef::int("y_int", 512, -4_294_967_296, 4_294_967_296),
            InputDef::float("y_float", 512.0, -4_294_967_296.0, 4_294_967_296.0, 1.0),
            InputDef::int("is_float_x", 0, 0, 1),
            InputDef::int("is_float_y", 0, 0, 1),
        ],
        outputs: &[
            OutputDef::single("x", ValueKind::Any),
            OutputDef::single("y", ValueKind::Any),
        ],
        output_node: false,
        run: params::run_slider_2d,
    },
    NodeDef {
        name: "Float4",
        display_name: "Float 4",
        category: "params/slider",
        inputs: &[
            InputDef::slider("f1", 0.0, 0.0, 1.0, 0.01),
            InputDef::slider("f2", 0.0, 0.0, 1.0, 0.01),
            InputDef::slider("f3", 0.0, 0.0, 1.0, 0.01),
            InputDef::slider("f4", 0.0, 0.0, 1.0, 0.01),
        ],
        outputs: &[
            OutputDef::single("f1", ValueKind::Float),
            OutputDef::single("f2", ValueKind::Float),
            OutputDef::single("f3", ValueKind::Float),
            OutputDef::single("f4", ValueKind::Float),
        ],
        output_node: false,
        run: params::run_float4,
    },
    NodeDef {
        name: "Float5",
        display_name: "Float 5",
        category: "params/slider",
        inputs: &[
            InputDef::slider("f1", 0.0, 0.0, 1.0, 0.1),
            InputDef::slider("f2", 0.0, 0.0, 1.0, 0.1),
            InputDef::slider("f3", 0.0, 0.0, 1.0, 0.1),
            InputDef::slider("f4", 0.0, 0.0, 1.0, 0.1),
            InputDef::slider("f5", 0.0, 0.0, 1.0, 0.1),
        ],
        outputs: &[
            OutputDef::single("f1", ValueKind::Float),
            OutputDef::single("f2", ValueKind::Float),
            OutputDef::single("f3", ValueKind::Float),
            OutputDef::single("f4", ValueKind::Float),
            OutputDef::single("f5", ValueKind::Float),
        ],
        output_node: false,
        run: params::run_float5,
    },
    NodeDef {
        name: "Int3",
        display_name: "Int 3",
        category: "params/multi",
        inputs: &[
            InputDef::int("i1", 0, 0, 4_294_967_296),
            InputDef::int("i2", 0, 0, 4_294_967_296),
            InputDef::int("i3", 0, 0, 4_294_967_296),
        ],
        outputs: &[
            OutputDef::single("i1", ValueKind::Int),
            OutputDef::single("i2", ValueKind::Int),
            OutputDef::single("i3", ValueKind::Int),
        ],
        output_node: false,
        run: params::run_int3,
    },
    NodeDef {
        name: "String3",
        display_name: "String 3",
        category: "params/multi",
        inputs: &[
            InputDef::text("s1", ""),
            InputDef::text("s2", ""),
            InputDef::text("s3", ""),
        ],
        outputs: &[
            OutputDef::single("s1", ValueKind::Text),
            OutputDef::single("s2", ValueKind::Text),
            OutputDef::single("s3", ValueKind::Text),
        ],
        output_node: false,
        run: params::run_string3,
    },
    NodeDef {
        name: "CfgScale",
        display_name: "CFG Scale",
        category: "params/slider",
        inputs: &[InputDef::float("cfg", 7.0, 0.0, 100.0, 0.1)],
        outputs: &[OutputDef::single("cfg", ValueKind::Float)],
        output_node: false,
        run: params::run_cfg_scale,
    },
    NodeDef {
        name: "SamplingShift",
        display_name: "Sampling Shift",
        category: "params/slider",
        inputs: &[InputDef::float("value", 1.0, 0.0, 15.0, 0.01)],
        outputs: &[OutputDef::single("value", ValueKind::Float)],
        output_node: false,
        run: params::run_sampling_shift,
    },
    NodeDef {
        name: "InputSwitch",
        display_name: "Input Switch",
        category: "routing/switch",
        inputs: &[
            InputDef::int("select_a", 1, 0, 1),
            InputDef::int("select_b", 0, 0, 1),
            InputDef::optional_link("input_a", ValueKind::Any),
            InputDef::optional_link("input_b", ValueKind::Any),
        ],
        outputs: &[OutputDef::single("output", ValueKind::Any)],
        output_node: false,
        run: routing::run_input_switch,
    },
    NodeDef {
        name: "InputSwitch3",
        display_name: "Input Switch 3",
        category: "routing/switch",
        inputs: &[
            InputDef::int("select_a", 1, 0, 1),
            InputDef::int("select_b", 0, 0, 1),
            InputDef::int("select_c", 0, 0, 1),
            InputDef::optional_link("input_a", ValueKind::Any),
            InputDef::optional_link("input_b", ValueKind::Any),
            InputDef::optional_link("input_c", ValueKind::Any),
        ],
        outputs: &[OutputDef::single("output", ValueKind::Any)],
        output_node: false,
        run: routing::run_input_switch3,
    },
    NodeDef {
        name: "SizeSwitch",
        display_name: "Size Switch",
        category: "routing/switch",
        inputs: &[
            InputDef::int("width_a", 512, 0, 4_294_967_296),
            InputDef::int("height_a", 512, 0, 4_294_967_296),
            InputDef::text("label_a", "Resolution A"),
            InputDef::int("width_b", 1024, 0, 4_294_967_296),
            InputDef::int("height_b", 1024, 0, 4_294_967_296),
            InputDef::text("label_b", "Resolution B"),
            InputDef::int("select", 0, 0, 1),
        ],
        outputs: &[
            OutputDef::single("width", ValueKind::Int),
            OutputDef::single("height", ValueKind::Int),
        ],
        output_node: false,
        run: routing::run_size_switch,
    },
    NodeDef {
        name: "BatchGroupSwitch",
        display_name: "Batch Group Switch",
        category: "routing/logic",
        inputs: &[
            InputDef::int("batch_index", 0, 0, i64::MAX),
            InputDef::int("total_batch_size", 12, 1, 1_000_000),
            InputDef::int("num_groups", 3, 1, 1_000_000),
            InputDef::optional_link("input_a", ValueKind::Any),
            InputDef::optional_link("input_b", ValueKind::Any),
            InputDef::optional_link("input_c", ValueKind::Any),
            InputDef::optional_link("fallback_input", ValueKind::Any),
        ],
        outputs: &[OutputDef::single("selected_context", ValueKind::Any)],
        output_node: false,
        run: routing::run_batch_group_switch,
    },
    NodeDef {
        name: "OutputGate",
        display_name: "Output Gate",
        category: "routing/flow_control",
        inputs: &[
            InputDef::boolean("active_1", true),
            InputDef::boolean("active_2", true),
            InputDef::boolean("active_3", true),
            InputDef::boolean("active_4", true),
            InputDef::boolean("active_5", true),
            InputDef::optional_link("input_1", ValueKind::Any),
            InputDef::optional_link("input_2", ValueKind::Any),
            InputDef::optional_link("input_3", ValueKind::Any),
            InputDef::optional_link("input_4", ValueKind::Any),
            InputDef::optional_link("input_5", ValueKind::Any),
        ],
        outputs: &[
            OutputDef::single("out_1", ValueKind::Any),
            OutputDef::single("out_2", ValueKind::Any),
            OutputDef::single("out_3", ValueKind::Any),
            OutputDef::single("out_4", ValueKind::Any),
            OutputDef::single("out_5", ValueKind::Any),
        ],
        output_node: false,
        run: routing::run_output_gate,
    },
];

static NODE_INDEX: Lazy<HashMap<&'static str, &'static NodeDef>> =
    Lazy::new(|| NODE_TYPES.iter().map(|def| (def.name, def)).collect());

/// Look up a node definition by its stable name.
pub fn lookup(name: &str) -> Option<&'static NodeDef> {
    NODE_INDEX.get(name).copied()
}

/// Names of every registered node, in table order.
pub fn node_names() -> Vec<&'static str> {
    NODE_TYPES.iter().map(|def| def.name).collect()
}

/// Serialize every node definition for the host's node browser.
pub fn schema_json() -> Result<String> {
    serde_json::to_string_pretty(&NODE_TYPES)
        .map_err(|e| candle_core::Error::Msg(format!("failed to serialize schema: {e}")))
}

/// Fill widget defaults, clamp numeric inputs into their widget ranges, and
/// validate combo choices and required links.
pub fn prepare_inputs(def: &NodeDef, inputs: &mut Inputs) -> Result<()> {
    for input in def.inputs {
        if !inputs.has(input.name) {
            match &input.widget {
                Widget::Int { default, .. } => inputs.set(input.name, Value::Int(*default)),
                Widget::Float { default, .. } => inputs.set(input.name, Value::Float(*default)),
                Widget::Text { default, .. } => {
                    inputs.set(input.name, Value::Text((*default).to_string()))
                }
                Widget::Combo { default, .. } => {
                    inputs.set(input.name, Value::Text((*default).to_string()))
                }
                Widget::Bool { default } => inputs.set(input.name, Value::Bool(*default)),
                Widget::None => {
                    if input.required {
                        candle_core::bail!(
                            "node '{}': missing required input '{}'",
                            def.name,
                            input.name
                        );
                    }
                }
            }
            continue;
        }
        if let Some(value) = inputs.get_mut(input.name) {
            match (&input.widget, value) {
                (Widget::Int { min, max, .. }, Value::Int(v)) => {
                    *v = (*v).clamp(*min, *max);
                }
                (Widget::Float { min, max, .. }, Value::Float(v)) => {
                    *v = (*v).clamp(*min, *max);
                }
                (Widget::Combo { options, .. }, Value::Text(choice)) => {
                    if !options.contains(&choice.as_str()) {
                        candle_core::bail!(
                            "node '{}': '{}' is not a valid choice for '{}' (options: {})",
                            def.name,
                            choice,
                            input.name,
                            options.join(", ")
                        );
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Look up, prepare, and run a node in one call.
pub fn run_node(name: &str, mut inputs: Inputs) -> Result<Vec<Value>> {
    let Some(def) = lookup(name) else {
        candle_core::bail!("unknown node type '{name}'");
    };
    prepare_inputs(def, &mut inputs)?;
    (def.run)(&inputs)
}
