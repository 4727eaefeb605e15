//! # Media Nodes
//!
//! A pack of plugin nodes for a visual node-graph host that builds
//! image/audio/latent generation pipelines. The host owns the execution
//! graph, caching, and dispatch; this crate owns the nodes themselves:
//! each one declares a typed input/output schema and implements a single
//! stateless transformation.
//!
//! This crate provides:
//! - A static node registry (`graph::registry`) mapping stable string
//!   identifiers to node definitions the host can enumerate and invoke
//! - A tagged value union (`graph::value::Value`) for everything a node
//!   port can carry
//! - The tiled overlap-add audio decoder (`audio::tiled`), which
//!   reconstructs a continuous waveform from independently decoded latent
//!   tiles
//! - Image, latent, parameter, and routing utility nodes
//!
//! ## Example
//!
//! ```no_run
//! use media_nodes::{run_node, Inputs, Value};
//!
//! # fn main() -> candle_core::Result<()> {
//! let inputs = Inputs::new()
//!     .with("resolution", Value::Text("16:9 (1664x928)".to_string()))
//!     .with("size_multiplier", Value::Float(1.0))
//!     .with("batch_size", Value::Int(1));
//! let outputs = run_node("EmptyQwenImageLatent", inputs)?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod graph;
pub mod image;
pub mod latent;
pub mod params;
pub mod routing;

pub use audio::{AudioBuffer, LatentAudioDecoder, DEFAULT_SAMPLE_RATE};
pub use graph::registry::{lookup, run_node, schema_json, NODE_TYPES};
pub use graph::value::{Inputs, Value};
