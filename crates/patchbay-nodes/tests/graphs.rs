//! Built-in processors wired into complete graphs.

use std::sync::Arc;

use patchbay_core::{ComponentRegistry, Graph, GraphSettings, NodeId, Renderer, params};
use patchbay_nodes::{
    CONSTANT, DELAY, GAIN, GENERIC_OUTPUT, HOST_INPUT, MIXER, SINE, SPLITTER, register_builtins,
};

fn graph(max_frames: usize) -> Graph {
    let registry = Arc::new(ComponentRegistry::new());
    register_builtins(&registry);
    Graph::with_settings(
        registry,
        GraphSettings {
            sample_rate: 1000.0,
            max_frames,
            failure_queue_capacity: 8,
        },
    )
}

fn chain(graph: &Graph, ids: &[NodeId]) {
    for pair in ids.windows(2) {
        let _ = graph.connect(pair[0], 0, pair[1], 0).unwrap();
    }
}

fn start(graph: &Graph) -> Renderer {
    graph.open().unwrap();
    graph.initialize().unwrap();
    graph.start().unwrap();
    graph.renderer().unwrap()
}

#[test]
fn constant_through_gain() {
    let g = graph(8);
    let dc = g.add_node(CONSTANT, &params::encode(&[0.5])).unwrap();
    let gain = g.add_node(GAIN, &params::encode(&[3.0])).unwrap();
    let out = g.add_node(GENERIC_OUTPUT, &[]).unwrap();
    chain(&g, &[dc, gain, out]);

    let mut renderer = start(&g);
    let mut block = [0.0f32; 8];
    let report = renderer.render(&[], &mut block);
    assert_eq!(report.failed_nodes, 0);
    assert_eq!(block, [1.5; 8]);
}

#[test]
fn splitter_feeds_mixer() {
    let g = graph(4);
    let dc = g.add_node(CONSTANT, &params::encode(&[1.0])).unwrap();
    let split = g.add_node(SPLITTER, &params::encode(&[3.0])).unwrap();
    let mix = g.add_node(MIXER, &params::encode(&[0.5, 0.25, 0.125])).unwrap();
    let out = g.add_node(GENERIC_OUTPUT, &[]).unwrap();
    let _ = g.connect(dc, 0, split, 0).unwrap();
    for port in 0..3 {
        let _ = g.connect(split, port, mix, port).unwrap();
    }
    let _ = g.connect(mix, 0, out, 0).unwrap();

    let mut renderer = start(&g);
    let mut block = [0.0f32; 4];
    renderer.render(&[], &mut block);
    assert_eq!(block, [0.875; 4]);
    assert_eq!(renderer.render_order(), &[dc, split, mix, out]);
}

#[test]
fn splitter_port_out_of_range_renders_silence() {
    let g = graph(4);
    let dc = g.add_node(CONSTANT, &params::encode(&[1.0])).unwrap();
    let split = g.add_node(SPLITTER, &[]).unwrap();
    let out = g.add_node(GENERIC_OUTPUT, &[]).unwrap();
    let _ = g.connect(dc, 0, split, 0).unwrap();
    // The default splitter has two outputs; port 5 carries nothing.
    let _ = g.connect(split, 5, out, 0).unwrap();

    let mut renderer = start(&g);
    let mut block = [9.0f32; 4];
    renderer.render(&[], &mut block);
    assert_eq!(block, [0.0; 4]);
}

#[test]
fn delay_echoes_across_blocks() {
    // 1 kHz, 6-sample delay, fully wet, no feedback.
    let g = graph(4);
    let host = g.add_node(HOST_INPUT, &[]).unwrap();
    let delay = g.add_node(DELAY, &params::encode(&[0.006, 0.0, 1.0])).unwrap();
    let out = g.add_node(GENERIC_OUTPUT, &[]).unwrap();
    chain(&g, &[host, delay, out]);

    let mut renderer = start(&g);
    let impulse = [1.0f32, 0.0, 0.0, 0.0];
    let silence = [0.0f32; 4];
    let mut first = [0.0f32; 4];
    let mut second = [0.0f32; 4];
    renderer.render(&[&impulse], &mut first);
    renderer.render(&[&silence], &mut second);
    assert_eq!(first, [0.0; 4]);
    assert_eq!(second, [0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn sub_graph_processes_parent_signal() {
    let parent = graph(4);
    let dc = parent.add_node(CONSTANT, &params::encode(&[0.25])).unwrap();
    let (sub, nested) = parent.add_subgraph_node().unwrap();
    let out = parent.add_node(GENERIC_OUTPUT, &[]).unwrap();
    let _ = parent.connect(dc, 0, sub, 0).unwrap();
    let _ = parent.connect(sub, 0, out, 0).unwrap();

    let host = nested.add_node(HOST_INPUT, &[]).unwrap();
    let gain = nested.add_node(GAIN, &params::encode(&[4.0])).unwrap();
    let nested_out = nested.add_node(GENERIC_OUTPUT, &[]).unwrap();
    chain(&nested, &[host, gain, nested_out]);

    let mut renderer = start(&parent);
    let mut block = [0.0f32; 4];
    let report = renderer.render(&[], &mut block);
    assert_eq!(report.failed_nodes, 0);
    assert_eq!(block, [1.0; 4]);
}

#[test]
fn sine_period_is_sample_accurate() {
    // 250 Hz at 1 kHz: period of four samples.
    let g = graph(8);
    let sine = g.add_node(SINE, &params::encode(&[250.0, 1.0])).unwrap();
    let out = g.add_node(GENERIC_OUTPUT, &[]).unwrap();
    chain(&g, &[sine, out]);

    let mut renderer = start(&g);
    let mut block = [0.0f32; 8];
    renderer.render(&[], &mut block);
    for (i, pair) in block[..4].iter().zip(&block[4..]).enumerate() {
        assert!((pair.0 - pair.1).abs() < 1e-5, "sample {i}");
    }
    assert!((block[1] - 1.0).abs() < 1e-6);
}

#[test]
fn invalid_parameters_fail_open() {
    let g = graph(4);
    let _ = g.add_node(SPLITTER, &params::encode(&[2.5])).unwrap();
    let err = g.open().unwrap_err();
    assert_eq!(err.class(), patchbay_core::ErrorClass::Resource);
    assert!(!g.is_open());
}
