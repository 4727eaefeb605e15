//! Routing nodes: switches and gates.
//!
//! These forward payloads of any kind without inspecting them. A selected
//! input that is not connected resolves to [`Value::Blocked`], which tells
//! the host to suppress the downstream branch.

use candle_core::Result;

use crate::graph::value::{Inputs, Value};

fn route(inputs: &Inputs, name: &str) -> Value {
    match inputs.get(name) {
        Some(value) => value.clone(),
        None => Value::Blocked,
    }
}

/// Two-way switch; `select_a` wins when set.
pub(crate) fn run_input_switch(inputs: &Inputs) -> Result<Vec<Value>> {
    let chosen = if inputs.int("select_a")? > 0 {
        "input_a"
    } else {
        "input_b"
    };
    Ok(vec![route(inputs, chosen)])
}

/// Three-way switch; the first active toggle wins.
pub(crate) fn run_input_switch3(inputs: &Inputs) -> Result<Vec<Value>> {
    let chosen = if inputs.int("select_a")? > 0 {
        "input_a"
    } else if inputs.int("select_b")? > 0 {
        "input_b"
    } else {
        "input_c"
    };
    Ok(vec![route(inputs, chosen)])
}

/// Two labeled width/height presets, one selected.
pub(crate) fn run_size_switch(inputs: &Inputs) -> Result<Vec<Value>> {
    let (width, height) = if inputs.int("select")? == 0 {
        (inputs.int("width_a")?, inputs.int("height_a")?)
    } else {
        (inputs.int("width_b")?, inputs.int("height_b")?)
    };
    Ok(vec![Value::Int(width), Value::Int(height)])
}

/// Split a batch into equal groups and route per-group parameters.
///
/// With 12 generations and 3 groups, indices 0-3 take `input_a`, 4-7 take
/// `input_b`, 8-11 take `input_c`. Indices past the configured groups clamp
/// to the fallback, or to `input_c` when no fallback is connected.
pub(crate) fn run_batch_group_switch(inputs: &Inputs) -> Result<Vec<Value>> {
    let batch_index = inputs.int("batch_index")?.max(0);
    let total = inputs.int("total_batch_size")?.max(1);
    let groups = inputs.int("num_groups")?.max(1);

    let group_size = (total / groups).max(1);
    let group_index = batch_index / group_size;

    let chosen = match group_index {
        0 => route(inputs, "input_a"),
        1 => route(inputs, "input_b"),
        2 => route(inputs, "input_c"),
        _ => {
            if inputs.has("fallback_input") {
                route(inputs, "fallback_input")
            } else {
                route(inputs, "input_c")
            }
        }
    };
    tracing::debug!(batch_index, group_index, "batch group routed");
    Ok(vec![chosen])
}

/// Five independent on/off lanes; inactive lanes emit the blocked marker.
pub(crate) fn run_output_gate(inputs: &Inputs) -> Result<Vec<Value>> {
    let mut outputs = Vec::with_capacity(5);
    for lane in 1..=5 {
        let active = inputs.boolean(&format!("active_{lane}"))?;
        outputs.push(if active {
            route(inputs, &format!("input_{lane}"))
        } else {
            Value::Blocked
        });
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_switch_routes_selected() {
        let inputs = Inputs::new()
            .with("select_a", Value::Int(1))
            .with("select_b", Value::Int(0))
            .with("input_a", Value::Text("a".to_string()))
            .with("input_b", Value::Text("b".to_string()));
        let out = run_input_switch(&inputs).unwrap();
        assert!(matches!(&out[0], Value::Text(s) if s == "a"));

        let inputs = inputs.with("select_a", Value::Int(0));
        let out = run_input_switch(&inputs).unwrap();
        assert!(matches!(&out[0], Value::Text(s) if s == "b"));
    }

    #[test]
    fn test_unconnected_selection_is_blocked() {
        let inputs = Inputs::new()
            .with("select_a", Value::Int(1))
            .with("select_b", Value::Int(0));
        let out = run_input_switch(&inputs).unwrap();
        assert!(matches!(out[0], Value::Blocked));
    }

    #[test]
    fn test_switch3_falls_through_to_c() {
        let inputs = Inputs::new()
            .with("select_a", Value::Int(0))
            .with("select_b", Value::Int(0))
            .with("select_c", Value::Int(1))
            .with("input_c", Value::Int(7));
        let out = run_input_switch3(&inputs).unwrap();
        assert!(matches!(out[0], Value::Int(7)));
    }

    #[test]
    fn test_batch_groups() {
        let base = |index: i64| {
            Inputs::new()
                .with("batch_index", Value::Int(index))
                .with("total_batch_size", Value::Int(12))
                .with("num_groups", Value::Int(3))
                .with("input_a", Value::Text("a".to_string()))
                .with("input_b", Value::Text("b".to_string()))
                .with("input_c", Value::Text("c".to_string()))
        };
        for (index, expected) in [(0, "a"), (3, "a"), (4, "b"), (8, "c"), (11, "c")] {
            let out = run_batch_group_switch(&base(index)).unwrap();
            assert!(
                matches!(&out[0], Value::Text(s) if s == expected),
                "index {index}"
            );
        }
        // Past the configured range without a fallback, the last input wins.
        let out = run_batch_group_switch(&base(40)).unwrap();
        assert!(matches!(&out[0], Value::Text(s) if s == "c"));
    }

    #[test]
    fn test_batch_group_fallback() {
        let inputs = Inputs::new()
            .with("batch_index", Value::Int(99))
            .with("total_batch_size", Value::Int(12))
            .with("num_groups", Value::Int(3))
            .with("fallback_input", Value::Text("fb".to_string()));
        let out = run_batch_group_switch(&inputs).unwrap();
        assert!(matches!(&out[0], Value::Text(s) if s == "fb"));
    }

    #[test]
    fn test_output_gate_blocks_inactive_lanes() {
        let mut inputs = Inputs::new();
        for lane in 1..=5 {
            inputs.set(format!("active_{lane}"), Value::Bool(lane % 2 == 1));
            inputs.set(format!("input_{lane}"), Value::Int(lane as i64));
        }
        let out = run_output_gate(&inputs).unwrap();
        assert!(matches!(out[0], Value::Int(1)));
        assert!(matches!(out[1], Value::Blocked));
        assert!(matches!(out[2], Value::Int(3)));
        assert!(matches!(out[3], Value::Blocked));
        assert!(matches!(out[4], Value::Int(5)));
    }
}
