//! Property-based tests for every built-in processor.
//!
//! Each processor is driven inside a real graph (`builtin -> output`) with
//! random parameters inside its declared ranges, and must produce finite,
//! bounded output.

use std::sync::Arc;

use patchbay_core::{ComponentRegistry, Graph, GraphSettings, params};
use patchbay_nodes::{Builtin, GENERIC_OUTPUT, ParamUnit, builtins, register_builtins};
use proptest::prelude::*;

const FRAMES: usize = 32;

/// Picks a value inside each declared range from normalized `[0, 1]` inputs.
fn params_for(builtin: &Builtin, t: &[f32; 8]) -> Vec<f32> {
    builtin
        .params
        .iter()
        .zip(t)
        .map(|(spec, &t)| {
            let value = spec.min + t * (spec.max - spec.min);
            if spec.unit == ParamUnit::Count {
                value.round()
            } else {
                value
            }
        })
        .collect()
}

/// `sine -> builtin -> output`, running. Every input port of the builtin is
/// fed so variadic processors see signal.
fn render_through(builtin: &Builtin, config: &[u8], host: &[f32]) -> Vec<f32> {
    let registry = Arc::new(ComponentRegistry::new());
    register_builtins(&registry);
    let graph = Graph::with_settings(
        registry,
        GraphSettings {
            max_frames: FRAMES,
            ..GraphSettings::default()
        },
    );
    let sine = graph.add_node(patchbay_nodes::SINE, &params::encode(&[997.0, 1.0])).unwrap();
    let out = graph.add_node(GENERIC_OUTPUT, &[]).unwrap();
    if builtin.description == GENERIC_OUTPUT {
        let _ = graph.connect(sine, 0, out, 0).unwrap();
    } else {
        let node = graph.add_node(builtin.description, config).unwrap();
        let _ = graph.connect(sine, 0, node, 0).unwrap();
        let _ = graph.connect(sine, 0, node, 1).unwrap();
        let _ = graph.connect(node, 0, out, 0).unwrap();
    }
    graph.open().unwrap();
    graph.initialize().unwrap();
    graph.start().unwrap();

    let mut renderer = graph.renderer().unwrap();
    let mut rendered = Vec::with_capacity(FRAMES * 8);
    let mut block = [0.0f32; FRAMES];
    for _ in 0..8 {
        let report = renderer.render(&[host], &mut block);
        assert_eq!(report.failed_nodes, 0, "{}", builtin.name);
        rendered.extend_from_slice(&block);
    }
    rendered
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every builtin renders finite output for any in-range parameters.
    #[test]
    fn builtins_render_finite_output(
        index in 0usize..16,
        t in prop::array::uniform8(0.0f32..=1.0f32),
        host in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let all = builtins();
        let builtin = &all[index % all.len()];
        let config = params::encode(&params_for(builtin, &t));
        let out = render_through(builtin, &config, &host);
        prop_assert!(out.iter().all(|s| s.is_finite()), "{}: non-finite output", builtin.name);
        prop_assert!(out.iter().all(|s| s.abs() <= 32.0), "{}: unbounded output", builtin.name);
    }

    /// The mixer output is the gain-weighted sum of its inputs.
    #[test]
    fn mixer_is_linear(
        a in prop::array::uniform8(-1.0f32..=1.0f32),
        b in prop::array::uniform8(-1.0f32..=1.0f32),
        ga in -2.0f32..=2.0,
        gb in -2.0f32..=2.0,
    ) {
        use patchbay_core::{Inputs, NodeProcessor, Outputs, RenderContext};

        let mut mixer = patchbay_nodes::Mixer::new(vec![ga, gb]);
        let ports = [Some(&a[..]), Some(&b[..])];
        let inputs = Inputs::from_slices(&ports, 8);
        let mut data = [0.0f32; 8];
        let mut outputs = Outputs::new(&mut data, 8, 8);
        let ctx = RenderContext { sample_rate: 48000.0, frames: 8, cycle: 0, host_inputs: &[] };
        mixer.render(&ctx, &inputs, &mut outputs).unwrap();
        for i in 0..8 {
            let expected = a[i] * ga + b[i] * gb;
            prop_assert!((data[i] - expected).abs() < 1e-5);
        }
    }
}
