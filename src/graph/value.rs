//! Typed values carried on node ports.
//!
//! The host's port types map onto a single tagged union; every node matches
//! exhaustively on the payload kinds it consumes instead of bypassing type
//! checks with wildcard markers.

use std::collections::HashMap;
use std::fmt;

use candle_core::{Result, Tensor};

use crate::audio::{AudioBuffer, SharedDecoder};

/// Payload of a node port.
#[derive(Clone)]
pub enum Value {
    /// Image tensor of shape `(batch, height, width, channels)`, f32 in `[0, 1]`.
    Image(Tensor),
    /// Latent tensor, `(batch, channels, height, width)` for images or
    /// `(batch, channels, steps)` for audio.
    Latent(Tensor),
    /// Waveform plus sample rate.
    Audio(AudioBuffer),
    /// Decode-capable model handle.
    Decoder(SharedDecoder),
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// List-valued output, expanded item-by-item by the host.
    List(Vec<Value>),
    /// Marker that tells the host to suppress downstream execution.
    Blocked,
}

impl Value {
    /// Short name of the payload kind, for error messages.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Value::Image(_) => "image",
            Value::Latent(_) => "latent",
            Value::Audio(_) => "audio",
            Value::Decoder(_) => "decoder",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Blocked => "blocked",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Image(t) => write!(f, "Image({:?})", t.shape()),
            Value::Latent(t) => write!(f, "Latent({:?})", t.shape()),
            Value::Audio(a) => write!(f, "Audio({:?}, {} Hz)", a.waveform.shape(), a.sample_rate),
            Value::Decoder(_) => write!(f, "Decoder(..)"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Text(v) => write!(f, "Text({v:?})"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::List(v) => write!(f, "List(len={})", v.len()),
            Value::Blocked => write!(f, "Blocked"),
        }
    }
}

/// Named inputs handed to a node's run function.
///
/// Accessors fail with a descriptive error when an input is missing or
/// carries the wrong payload kind; `*_opt` variants report absence as `None`.
#[derive(Debug, Default)]
pub struct Inputs {
    values: HashMap<String, Value>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn required(&self, name: &str) -> Result<&Value> {
        match self.values.get(name) {
            Some(value) => Ok(value),
            None => candle_core::bail!("missing required input '{name}'"),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.required(name)? {
            Value::Int(v) => Ok(*v),
            other => candle_core::bail!(
                "input '{}' expected an int, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    pub fn int_opt(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Float access; int inputs are promoted.
    pub fn float(&self, name: &str) -> Result<f64> {
        match self.required(name)? {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => candle_core::bail!(
                "input '{}' expected a float, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.required(name)? {
            Value::Text(v) => Ok(v.as_str()),
            other => candle_core::bail!(
                "input '{}' expected text, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    pub fn text_opt(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(Value::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Boolean access; int inputs read as `!= 0`.
    pub fn boolean(&self, name: &str) -> Result<bool> {
        match self.required(name)? {
            Value::Bool(v) => Ok(*v),
            Value::Int(v) => Ok(*v != 0),
            other => candle_core::bail!(
                "input '{}' expected a bool, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    pub fn image(&self, name: &str) -> Result<&Tensor> {
        match self.required(name)? {
            Value::Image(t) => Ok(t),
            other => candle_core::bail!(
                "input '{}' expected an image, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    pub fn latent(&self, name: &str) -> Result<&Tensor> {
        match self.required(name)? {
            Value::Latent(t) => Ok(t),
            other => candle_core::bail!(
                "input '{}' expected a latent, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    pub fn audio(&self, name: &str) -> Result<&AudioBuffer> {
        match self.required(name)? {
            Value::Audio(a) => Ok(a),
            other => candle_core::bail!(
                "input '{}' expected audio, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    pub fn decoder(&self, name: &str) -> Result<SharedDecoder> {
        match self.required(name)? {
            Value::Decoder(d) => Ok(d.clone()),
            other => candle_core::bail!(
                "input '{}' expected a decoder handle, got {}",
                name,
                other.kind_str()
            ),
        }
    }

    /// List access; a single non-list value reads as a one-element list.
    pub fn list(&self, name: &str) -> Result<Vec<&Value>> {
        match self.required(name)? {
            Value::List(items) => Ok(items.iter().collect()),
            single => Ok(vec![single]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let inputs = Inputs::new()
            .with("count", Value::Int(3))
            .with("scale", Value::Float(1.5))
            .with("label", Value::Text("hello".to_string()));

        assert_eq!(inputs.int("count").unwrap(), 3);
        assert_eq!(inputs.float("scale").unwrap(), 1.5);
        // Ints promote to floats, never the reverse.
        assert_eq!(inputs.float("count").unwrap(), 3.0);
        assert!(inputs.int("scale").is_err());
        assert_eq!(inputs.text("label").unwrap(), "hello");
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let inputs = Inputs::new();
        let err = inputs.int("count").unwrap_err();
        assert!(err.to_string().contains("missing required input 'count'"));
        assert_eq!(inputs.int_opt("count"), None);
        assert_eq!(inputs.text_opt("label"), None);
    }

    #[test]
    fn test_boolean_accepts_int_toggles() {
        let inputs = Inputs::new()
            .with("on", Value::Int(1))
            .with("off", Value::Int(0))
            .with("flag", Value::Bool(true));
        assert!(inputs.boolean("on").unwrap());
        assert!(!inputs.boolean("off").unwrap());
        assert!(inputs.boolean("flag").unwrap());
    }

    #[test]
    fn test_list_wraps_single_values() {
        let inputs = Inputs::new()
            .with("names", Value::List(vec![
                Value::Text("a".to_string()),
                Value::Text("b".to_string()),
            ]))
            .with("single", Value::Text("c".to_string()));
        assert_eq!(inputs.list("names").unwrap().len(), 2);
        assert_eq!(inputs.list("single").unwrap().len(), 1);
    }
}
