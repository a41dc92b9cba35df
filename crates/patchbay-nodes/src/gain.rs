//! Linear gain.

use patchbay_core::{Inputs, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError};

use crate::param::{self, ParamSpec, ParamUnit};

/// Parameter table: `[gain]`.
pub const PARAMS: &[ParamSpec; 1] = &[ParamSpec::new("Gain", ParamUnit::Linear, -16.0, 16.0, 1.0)];

/// Multiplies input 0 by a fixed gain. Unconnected input renders silence.
#[derive(Debug, Clone)]
pub struct Gain {
    gain: f32,
}

impl Gain {
    /// Creates a gain stage.
    pub fn new(gain: f32) -> Self {
        Self {
            gain: PARAMS[0].clamp(gain),
        }
    }

    /// Creates a gain stage from a `[gain]` blob.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        let [gain] = param::resolve(config, PARAMS)?;
        Ok(Self::new(gain))
    }

    /// Current gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl NodeProcessor for Gain {
    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        let out = outputs.get_mut(0).ok_or(RenderError("no output port"))?;
        match inputs.get(0) {
            Some(input) => {
                for (o, &i) in out.iter_mut().zip(input) {
                    *o = i * self.gain;
                }
            }
            None => out.fill(0.0),
        }
        Ok(())
    }
}
