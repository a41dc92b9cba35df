//! Integration tests for patchbay-cli.
//!
//! Tests invoke the `patchbay` binary against bundled graphs and documents
//! written to temporary directories.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Helper to get the path to the `patchbay` binary built by cargo.
fn patchbay_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_patchbay"))
}

fn run(args: &[&str]) -> Output {
    patchbay_bin()
        .args(args)
        .output()
        .expect("failed to run patchbay")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_doc(dir: &Path, name: &str, toml: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, toml).unwrap();
    path.to_string_lossy().into_owned()
}

fn read_wav(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader
        .into_samples::<f32>()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (spec, samples)
}

const BROKEN: &str = r#"
name = "Broken"

[[nodes]]
label = "osc"
builtin = "sine"

[[nodes]]
label = "osc"
builtin = "reverb"

[[connections]]
from = "osc"
to = "nowhere"
"#;

const DC: &str = r#"
name = "DC"

[engine]
sample_rate = 8000.0
max_frames = 64

[[nodes]]
label = "dc"
builtin = "constant"
params = [0.5]

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "dc"
to = "out"
"#;

const PASSTHROUGH: &str = r#"
name = "Thru"

[engine]
sample_rate = 8000.0
max_frames = 32

[[nodes]]
label = "in"
builtin = "host-input"
params = [1.0]

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "in"
to = "out"
"#;

// ---------------------------------------------------------------------------
// `patchbay nodes`
// ---------------------------------------------------------------------------

#[test]
fn cli_nodes_lists_every_builtin() {
    let output = run(&["nodes"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for name in [
        "output",
        "gain",
        "delay",
        "mixer",
        "splitter",
        "sine",
        "constant",
        "host-input",
    ] {
        assert!(text.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_nodes_detail_shows_parameters() {
    let output = run(&["nodes", "delay"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Parameters"));
    assert!(text.contains("Time"));
    assert!(text.contains("Feedback"));
    assert!(text.contains("aufx/dely/pbay"));

    assert!(!run(&["nodes", "reverb"]).status.success());
}

// ---------------------------------------------------------------------------
// `patchbay validate`
// ---------------------------------------------------------------------------

#[test]
fn cli_validate_accepts_bundled_graph() {
    let output = run(&["validate", "nested-echo", "--open"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Nested Echo: ok"));
}

#[test]
fn cli_validate_reports_every_issue() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(dir.path(), "broken.toml", BROKEN);

    let output = run(&["validate", &path]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("3 issue(s)"), "{text}");
    assert!(text.contains("duplicate node label 'osc'"));
    assert!(text.contains("unknown builtin 'reverb'"));
    assert!(text.contains("unknown node 'nowhere'"));
}

#[test]
fn cli_validate_unknown_graph_fails() {
    let output = run(&["validate", "no-such-graph"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

// ---------------------------------------------------------------------------
// `patchbay inspect`
// ---------------------------------------------------------------------------

#[test]
fn cli_inspect_json_describes_nested_graphs() {
    let output = run(&["inspect", "nested-echo", "--json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(report["name"], "Nested Echo");
    let graphs = report["graphs"].as_array().unwrap();
    assert_eq!(graphs.len(), 2);
    assert_eq!(graphs[0]["render_order"], serde_json::json!(["osc", "fx", "out"]));
    assert_eq!(graphs[1]["scope"], "fx");
    assert_eq!(graphs[1]["render_order"], serde_json::json!(["in", "delay", "out"]));
    assert_eq!(graphs[0]["nodes"][1]["kind"], "sub-graph");
}

#[test]
fn cli_inspect_text_lists_connections() {
    let output = run(&["inspect", "split-mix"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("split:1 -> quiet:0"), "{text}");
    assert!(text.contains("Render order: osc -> split -> quiet -> mix -> out"), "{text}");
}

// ---------------------------------------------------------------------------
// `patchbay render`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_writes_float_wav() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(dir.path(), "dc.toml", DC);
    let out = dir.path().join("dc.wav");

    let output = run(&[
        "render",
        &doc,
        "-o",
        out.to_str().unwrap(),
        "--seconds",
        "0.1",
        "--frames",
        "48",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let (spec, samples) = read_wav(&out);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(samples.len(), 800);
    assert!(samples.iter().all(|&s| s == 0.5));
}

#[test]
fn cli_render_feeds_host_input_channels() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(dir.path(), "thru.toml", PASSTHROUGH);
    let input = dir.path().join("in.wav");
    let out = dir.path().join("out.wav");

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&input, spec).unwrap();
    for i in 0..100 {
        writer.write_sample(0.0f32).unwrap();
        writer.write_sample(i as f32 / 100.0).unwrap();
    }
    writer.finalize().unwrap();

    let output = run(&[
        "render",
        &doc,
        "-o",
        out.to_str().unwrap(),
        "--seconds",
        "0.02",
        "--input",
        input.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    // Channel 1 passes through; frames past the input are silent.
    let (_, samples) = read_wav(&out);
    assert_eq!(samples.len(), 160);
    for (i, &s) in samples.iter().enumerate().take(100) {
        assert!((s - i as f32 / 100.0).abs() < 1e-6, "sample {i}");
    }
    assert!(samples[100..].iter().all(|&s| s == 0.0));
}

#[test]
fn cli_render_rejects_oversized_blocks() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(dir.path(), "dc.toml", DC);
    let out = dir.path().join("dc.wav");

    let output = run(&["render", &doc, "-o", out.to_str().unwrap(), "--frames", "65"]);
    assert!(!output.status.success());
    assert!(!out.exists());
}
