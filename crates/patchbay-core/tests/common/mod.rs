//! Test processors shared by the integration and property tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender};
use patchbay_core::{
    ComponentDescription, ComponentRegistry, GraphSettings, Inputs, NodeProcessor, Outputs,
    ProcessorError, RenderContext, RenderError, params,
};

pub const SOURCE: ComponentDescription = ComponentDescription::from_bytes(b"augn", b"dcof", b"test");
pub const EFFECT: ComponentDescription = ComponentDescription::from_bytes(b"aufx", b"scal", b"test");
pub const OUTPUT: ComponentDescription = ComponentDescription::from_bytes(b"auou", b"genr", b"test");
pub const COUNTED: ComponentDescription = ComponentDescription::from_bytes(b"aufx", b"cnt_", b"test");
pub const GATE: ComponentDescription = ComponentDescription::from_bytes(b"aufx", b"gate", b"test");

pub fn settings() -> GraphSettings {
    GraphSettings {
        sample_rate: 48000.0,
        max_frames: 16,
        failure_queue_capacity: 16,
    }
}

/// Writes a constant (`[value]`), scales input 0 (`[factor]`) or passes input 0 through.
struct Simple {
    mode: Mode,
    value: f32,
}

#[derive(Clone, Copy)]
enum Mode {
    Constant,
    Scale,
    Through,
}

impl NodeProcessor for Simple {
    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        let out = outputs.get_mut(0).ok_or(RenderError("no output"))?;
        let input = inputs.get(0);
        match (self.mode, input) {
            (Mode::Constant, _) => out.fill(self.value),
            (Mode::Scale, Some(input)) => {
                for (o, i) in out.iter_mut().zip(input) {
                    *o = i * self.value;
                }
            }
            (Mode::Through, Some(input)) => out.copy_from_slice(input),
            (_, None) => out.fill(0.0),
        }
        Ok(())
    }
}

fn register_simple(registry: &ComponentRegistry, desc: ComponentDescription, mode: Mode) {
    registry.register(
        desc,
        "simple",
        move |_: &ComponentDescription,
              config: &[u8]|
              -> Result<Box<dyn NodeProcessor>, ProcessorError> {
            let values = params::decode(config)?;
            Ok(Box::new(Simple {
                mode,
                value: params::param_or(&values, 0, 1.0),
            }))
        },
    );
}

/// Registry with the constant source, scaling effect and passthrough output.
pub fn registry() -> Arc<ComponentRegistry> {
    let registry = ComponentRegistry::new();
    register_simple(&registry, SOURCE, Mode::Constant);
    register_simple(&registry, EFFECT, Mode::Scale);
    register_simple(&registry, OUTPUT, Mode::Through);
    Arc::new(registry)
}

/// A processor that tracks how many instances are alive. Config `[1.0]`
/// makes `open` fail.
pub struct Counted {
    live: Arc<AtomicUsize>,
    fail_open: bool,
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl NodeProcessor for Counted {
    fn open(&mut self) -> Result<(), ProcessorError> {
        if self.fail_open {
            Err(ProcessorError::ResourceUnavailable("refused".into()))
        } else {
            Ok(())
        }
    }

    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        _inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        outputs.silence();
        Ok(())
    }
}

pub fn register_counted(registry: &ComponentRegistry) -> Arc<AtomicUsize> {
    let live = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&live);
    registry.register(
        COUNTED,
        "counted",
        move |_: &ComponentDescription,
              config: &[u8]|
              -> Result<Box<dyn NodeProcessor>, ProcessorError> {
            let values = params::decode(config)?;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Counted {
                live: Arc::clone(&counter),
                fail_open: params::param_or(&values, 0, 0.0) != 0.0,
            }))
        },
    );
    live
}

/// Handles for a processor whose `open` blocks until released.
pub struct GateControl {
    /// Receives one message when `open` starts waiting.
    pub entered: Receiver<()>,
    /// Send one message to let `open` return.
    pub release: Sender<()>,
}

struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl NodeProcessor for Gate {
    fn open(&mut self) -> Result<(), ProcessorError> {
        let _ = self.entered.send(());
        self.release
            .recv()
            .map_err(|_| ProcessorError::ResourceUnavailable("gate dropped".into()))
    }

    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        _inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        outputs.silence();
        Ok(())
    }
}

pub fn register_gate(registry: &ComponentRegistry) -> GateControl {
    let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    registry.register(
        GATE,
        "gate",
        move |_: &ComponentDescription,
              _: &[u8]|
              -> Result<Box<dyn NodeProcessor>, ProcessorError> {
            Ok(Box::new(Gate {
                entered: entered_tx.clone(),
                release: release_rx.clone(),
            }))
        },
    );
    GateControl {
        entered: entered_rx,
        release: release_tx,
    }
}
