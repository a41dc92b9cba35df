//! Sine oscillator.
//!
//! Phase-accumulator oscillator. Phase is kept in `[0, 1)` as `f64` so long
//! renders do not drift, and is reset whenever the node is initialized.

use core::f64::consts::TAU;

use patchbay_core::{
    Inputs, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError, StreamFormat,
};

use crate::param::{self, ParamSpec, ParamUnit};

/// Parameter table: `[frequency, amplitude]`.
pub const PARAMS: &[ParamSpec; 2] = &[
    ParamSpec::new("Frequency", ParamUnit::Hertz, 0.0, 20000.0, 440.0),
    ParamSpec::new("Amplitude", ParamUnit::Linear, 0.0, 1.0, 0.5),
];

/// Sine generator. Frequencies above Nyquist for the current sample rate
/// are folded down to Nyquist.
#[derive(Debug, Clone)]
pub struct Sine {
    frequency: f64,
    amplitude: f32,
    phase: f64,
}

impl Sine {
    /// Creates an oscillator.
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency: f64::from(PARAMS[0].clamp(frequency)),
            amplitude: PARAMS[1].clamp(amplitude),
            phase: 0.0,
        }
    }

    /// Creates an oscillator from a `[frequency, amplitude]` blob.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        let [frequency, amplitude] = param::resolve(config, PARAMS)?;
        Ok(Self::new(frequency, amplitude))
    }

    /// Current phase in `[0, 1)`.
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl NodeProcessor for Sine {
    fn initialize(&mut self, _format: &StreamFormat) -> Result<(), ProcessorError> {
        self.phase = 0.0;
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &RenderContext<'_>,
        _inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        if ctx.sample_rate <= 0.0 {
            return Err(RenderError("sample rate must be positive"));
        }
        let out = outputs.get_mut(0).ok_or(RenderError("no output port"))?;
        let increment = self.frequency.min(ctx.sample_rate / 2.0) / ctx.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.amplitude * (self.phase * TAU).sin() as f32;
            self.phase += increment;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
        Ok(())
    }
}
