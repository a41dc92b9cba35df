//! Fan-out.

use patchbay_core::{
    Inputs, MAX_PORTS, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError,
};

use crate::param::{self, ParamSpec, ParamUnit};

/// Parameter table: `[outputs]`.
pub const PARAMS: &[ParamSpec; 1] = &[ParamSpec::new(
    "Outputs",
    ParamUnit::Count,
    1.0,
    MAX_PORTS as f32,
    2.0,
)];

/// Copies input 0 to each of its outputs.
///
/// A source output may feed any number of inputs directly; the splitter
/// exists for graphs that want distinct ports per branch.
#[derive(Debug, Clone)]
pub struct Splitter {
    outputs: usize,
}

impl Splitter {
    /// Creates a splitter with `outputs` ports, clamped to `1..=MAX_PORTS`.
    pub fn new(outputs: usize) -> Self {
        Self {
            outputs: outputs.clamp(1, MAX_PORTS as usize),
        }
    }

    /// Creates a splitter from an `[outputs]` blob.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        let [outputs] = param::resolve(config, PARAMS)?;
        if outputs.fract() != 0.0 {
            return Err(ProcessorError::InvalidConfig(format!(
                "output count must be a whole number, got {outputs}"
            )));
        }
        Ok(Self::new(outputs as usize))
    }
}

impl NodeProcessor for Splitter {
    fn output_count(&self) -> usize {
        self.outputs
    }

    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        let input = inputs.get(0);
        for out in outputs.iter_mut() {
            match input {
                Some(signal) => out.copy_from_slice(signal),
                None => out.fill(0.0),
            }
        }
        Ok(())
    }
}
