//! DC source.

use patchbay_core::{Inputs, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError};

use crate::param::{self, ParamSpec, ParamUnit};

/// Parameter table: `[value]`.
pub const PARAMS: &[ParamSpec; 1] =
    &[ParamSpec::new("Value", ParamUnit::Linear, -16.0, 16.0, 0.0)];

/// Writes the same value to every frame.
#[derive(Debug, Clone)]
pub struct Constant {
    value: f32,
}

impl Constant {
    /// Creates a source writing `value`.
    pub fn new(value: f32) -> Self {
        Self {
            value: PARAMS[0].clamp(value),
        }
    }

    /// Creates a source from a `[value]` blob.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        let [value] = param::resolve(config, PARAMS)?;
        Ok(Self::new(value))
    }
}

impl NodeProcessor for Constant {
    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        _inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        outputs
            .get_mut(0)
            .ok_or(RenderError("no output port"))?
            .fill(self.value);
        Ok(())
    }
}
