//! Node, input, and output definitions.
//!
//! A node definition is pure data plus a run function pointer; the host
//! enumerates definitions to build its node browser and wires values by the
//! declared names and kinds. Widget metadata (defaults, ranges, options)
//! mirrors what the host renders next to each input.

use serde::Serialize;

use candle_core::Result;

use crate::graph::value::{Inputs, Value};

/// Payload kind declared on a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Image,
    Latent,
    Audio,
    Decoder,
    Int,
    Float,
    Text,
    Bool,
    /// Routing ports that forward any payload untouched.
    Any,
}

/// Widget rendered for an input, with its defaults and constraints.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "widget", rename_all = "lowercase")]
pub enum Widget {
    Int {
        default: i64,
        min: i64,
        max: i64,
        step: i64,
    },
    Float {
        default: f64,
        min: f64,
        max: f64,
        step: f64,
        slider: bool,
    },
    Text {
        default: &'static str,
        multiline: bool,
    },
    Combo {
        options: &'static [&'static str],
        default: &'static str,
    },
    Bool {
        default: bool,
    },
    /// Link-only input; the value always arrives over a graph edge.
    None,
}

/// One declared input of a node.
#[derive(Clone, Debug, Serialize)]
pub struct InputDef {
    pub name: &'static str,
    pub kind: ValueKind,
    pub widget: Widget,
    pub required: bool,
}

impl InputDef {
    /// Required link-only input.
    pub const fn link(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            widget: Widget::None,
            required: true,
        }
    }

    /// Optional link-only input.
    pub const fn optional_link(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            widget: Widget::None,
            required: false,
        }
    }

    pub const fn int(name: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name,
            kind: ValueKind::Int,
            widget: Widget::Int {
                default,
                min,
                max,
                step: 1,
            },
            required: true,
        }
    }

    pub const fn float(
        name: &'static str,
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> Self {
        Self {
            name,
            kind: ValueKind::Float,
            widget: Widget::Float {
                default,
                min,
                max,
                step,
                slider: false,
            },
            required: true,
        }
    }

    pub const fn slider(
        name: &'static str,
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> Self {
        Self {
            name,
            kind: ValueKind::Float,
            widget: Widget::Float {
                default,
                min,
                max,
                step,
                slider: true,
            },
            required: true,
        }
    }

    pub const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Text,
            widget: Widget::Text {
                default,
                multiline: false,
            },
            required: true,
        }
    }

    /// Host-supplied text that may be absent; defaults fill in when it is.
    pub const fn optional_text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Text,
            widget: Widget::Text {
                default,
                multiline: false,
            },
            required: false,
        }
    }

    pub const fn combo(
        name: &'static str,
        options: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ValueKind::Text,
            widget: Widget::Combo { options, default },
            required: true,
        }
    }

    pub const fn boolean(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: ValueKind::Bool,
            widget: Widget::Bool { default },
            required: true,
        }
    }
}

/// One declared output of a node.
#[derive(Clone, Debug, Serialize)]
pub struct OutputDef {
    pub name: &'static str,
    pub kind: ValueKind,
    /// List-valued outputs are expanded item-by-item by the host.
    pub is_list: bool,
}

impl OutputDef {
    pub const fn single(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            is_list: false,
        }
    }

    pub const fn list(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            is_list: true,
        }
    }
}

/// Run function of a node: prepared inputs in, one value per output out.
pub type RunFn = fn(&Inputs) -> Result<Vec<Value>>;

/// A complete node definition.
#[derive(Clone, Debug, Serialize)]
pub struct NodeDef {
    /// Stable identifier the host dispatches on.
    pub name: &'static str,
    pub display_name: &'static str,
    /// Menu path, `/`-separated.
    pub category: &'static str,
    pub inputs: &'static [InputDef],
    pub outputs: &'static [OutputDef],
    /// Terminal nodes write files; the host always executes them even when
    /// nothing consumes their outputs.
    pub output_node: bool,
    #[serde(skip)]
    pub run: RunFn,
}
