//! Offline rendering command.
//!
//! The graph is rendered on a dedicated thread that owns the [`Renderer`],
//! the same way an audio callback would. The calling thread plays the
//! control role: it applies queued edits with a non-blocking `update`,
//! drains render failures, and drives the progress bar.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use indicatif::{ProgressBar, ProgressStyle};
use patchbay_core::Renderer;
use tracing::{debug, info, warn};

use super::common::load_graph;

#[derive(Args)]
pub struct RenderArgs {
    /// Graph document (TOML path or bundled graph name)
    #[arg(value_name = "GRAPH")]
    graph: String,

    /// Output WAV file (mono, 32-bit float)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Duration to render in seconds
    #[arg(long, default_value = "1.0")]
    seconds: f64,

    /// Frames per render cycle (defaults to the graph's max_frames)
    #[arg(long)]
    frames: Option<usize>,

    /// WAV file whose channels feed the graph's host inputs
    #[arg(short, long)]
    input: Option<PathBuf>,
}

/// Reads a WAV file into one buffer per channel.
fn read_channels(path: &Path) -> anyhow::Result<(Vec<Vec<f32>>, u32)> {
    let reader =
        WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let mut out = vec![Vec::with_capacity(interleaved.len() / channels); channels];
    for frame in interleaved.chunks(channels) {
        for (channel, &sample) in out.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    Ok((out, spec.sample_rate))
}

fn write_mono(path: &Path, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// What the render thread hands back.
struct RenderOutcome {
    samples: Vec<f32>,
    failed_cycles: u64,
}

/// Renders `total` frames in blocks of `frames`, publishing progress.
fn render_thread(
    mut renderer: Renderer,
    inputs: Vec<Vec<f32>>,
    total: usize,
    frames: usize,
    progress: Arc<AtomicUsize>,
) -> RenderOutcome {
    let mut samples = vec![0.0f32; total];
    let mut failed_cycles = 0;
    let mut host: Vec<&[f32]> = Vec::with_capacity(inputs.len());

    for (index, block) in samples.chunks_mut(frames).enumerate() {
        let start = index * frames;
        host.clear();
        for channel in &inputs {
            let end = (start + block.len()).min(channel.len());
            host.push(channel.get(start..end).unwrap_or(&[]));
        }
        let report = renderer.render(&host, block);
        if report.failed_nodes > 0 {
            failed_cycles += 1;
        }
        progress.store(start + block.len(), Ordering::Relaxed);
    }
    RenderOutcome {
        samples,
        failed_cycles,
    }
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

fn linear_to_db(value: f32) -> f32 {
    if value <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * value.log10()
    }
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let (doc, built) = load_graph(&args.graph)?;
    let graph = built.graph.clone();
    let settings = graph.settings();

    let frames = args.frames.unwrap_or(settings.max_frames);
    if frames == 0 || frames > settings.max_frames {
        anyhow::bail!(
            "--frames must be between 1 and the graph's max_frames ({})",
            settings.max_frames
        );
    }
    if !(args.seconds.is_finite() && args.seconds > 0.0) {
        anyhow::bail!("--seconds must be a positive number");
    }
    let total = (args.seconds * settings.sample_rate).round() as usize;

    let inputs = match &args.input {
        Some(path) => {
            let (channels, rate) = read_channels(path)?;
            if f64::from(rate) != settings.sample_rate {
                warn!(
                    file_rate = rate,
                    graph_rate = settings.sample_rate,
                    "input sample rate differs from the graph; samples are not resampled"
                );
            }
            info!(channels = channels.len(), path = %path.display(), "host input");
            channels
        }
        None => Vec::new(),
    };

    if graph.output_node().is_none() {
        warn!("graph has no output node; rendering silence");
    }

    println!("Rendering '{}' ({:.2}s, {total} frames)...", doc.name, args.seconds);
    graph.open()?;
    graph.initialize()?;
    graph.start()?;
    let renderer = graph.renderer()?;
    let failures = graph.render_failures();

    let progress = Arc::new(AtomicUsize::new(0));
    let handle = {
        let progress = Arc::clone(&progress);
        std::thread::Builder::new()
            .name("patchbay-render".into())
            .spawn(move || render_thread(renderer, inputs, total, frames, progress))?
    };

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut reported = 0usize;
    let mut drain = |pb: &ProgressBar| {
        for failure in failures.try_iter() {
            reported += 1;
            pb.suspend(|| warn!(%failure, "render failure"));
        }
    };
    while !handle.is_finished() {
        match graph.update(false) {
            Ok(true) => {}
            Ok(false) => debug!("topology busy; update deferred"),
            Err(e) => warn!(error = %e, "pending edit failed"),
        }
        drain(&pb);
        pb.set_position(progress.load(Ordering::Relaxed) as u64);
        std::thread::sleep(Duration::from_millis(5));
    }
    let outcome = handle
        .join()
        .map_err(|_| anyhow::anyhow!("render thread panicked"))?;
    drain(&pb);
    pb.finish_with_message("done");

    graph.stop()?;
    graph.uninitialize()?;
    graph.close()?;

    let sample_rate = settings.sample_rate.round() as u32;
    write_mono(&args.output, &outcome.samples, sample_rate)?;

    println!("\nWrote {}", args.output.display());
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&outcome.samples)),
        linear_to_db(peak(&outcome.samples))
    );
    if outcome.failed_cycles > 0 || reported > 0 {
        println!(
            "  {} cycle(s) with failing nodes, {reported} failure(s) reported, {} dropped",
            outcome.failed_cycles,
            graph.dropped_failures()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_helpers() {
        assert_eq!(peak(&[0.25, -0.5, 0.1]), 0.5);
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5; 16]) - 0.5).abs() < 1e-6);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
        assert!((linear_to_db(1.0)).abs() < 1e-6);
    }

    #[test]
    fn wav_round_trip_splits_channels() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for sample in [0.1f32, -0.1, 0.2, -0.2, 0.3, -0.3] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let (channels, rate) = read_channels(&path).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(channels, vec![vec![0.1, 0.2, 0.3], vec![-0.1, -0.2, -0.3]]);
    }
}
