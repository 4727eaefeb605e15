//! Parameter nodes: sliders and grouped constants.
//!
//! These exist to keep a graph's tunable numbers in one place; every run
//! function just forwards its widget values.

use candle_core::Result;

use crate::graph::value::{Inputs, Value};

/// Int/float pair with a selector; emits whichever the toggle picks.
pub(crate) fn run_slider(inputs: &Inputs) -> Result<Vec<Value>> {
    let out = if inputs.int("is_float")? > 0 {
        Value::Float(inputs.float("value_float")?)
    } else {
        Value::Int(inputs.int("value_int")?)
    };
    Ok(vec![out])
}

pub(crate) fn run_slider_2d(inputs: &Inputs) -> Result<Vec<Value>> {
    let x = if inputs.int("is_float_x")? > 0 {
        Value::Float(inputs.float("x_float")?)
    } else {
        Value::Int(inputs.int("x_int")?)
    };
    let y = if inputs.int("is_float_y")? > 0 {
        Value::Float(inputs.float("y_float")?)
    } else {
        Value::Int(inputs.int("y_int")?)
    };
    Ok(vec![x, y])
}

pub(crate) fn run_float4(inputs: &Inputs) -> Result<Vec<Value>> {
    ["f1", "f2", "f3", "f4"]
        .into_iter()
        .map(|name| Ok(Value::Float(inputs.float(name)?)))
        .collect()
}

pub(crate) fn run_float5(inputs: &Inputs) -> Result<Vec<Value>> {
    ["f1", "f2", "f3", "f4", "f5"]
        .into_iter()
        .map(|name| Ok(Value::Float(inputs.float(name)?)))
        .collect()
}

pub(crate) fn run_int3(inputs: &Inputs) -> Result<Vec<Value>> {
    ["i1", "i2", "i3"]
        .into_iter()
        .map(|name| Ok(Value::Int(inputs.int(name)?)))
        .collect()
}

pub(crate) fn run_string3(inputs: &Inputs) -> Result<Vec<Value>> {
    ["s1", "s2", "s3"]
        .into_iter()
        .map(|name| Ok(Value::Text(inputs.text(name)?.to_string())))
        .collect()
}

pub(crate) fn run_cfg_scale(inputs: &Inputs) -> Result<Vec<Value>> {
    Ok(vec![Value::Float(inputs.float("cfg")?)])
}

pub(crate) fn run_sampling_shift(inputs: &Inputs) -> Result<Vec<Value>> {
    Ok(vec![Value::Float(inputs.float("value")?)])
}
