//! Host input channel.

use patchbay_core::{Inputs, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError};

use crate::param::{self, ParamSpec, ParamUnit};

/// Parameter table: `[channel]`.
pub const PARAMS: &[ParamSpec; 1] =
    &[ParamSpec::new("Channel", ParamUnit::Count, 0.0, 63.0, 0.0)];

/// Copies one of the channels the host passes to `Renderer::render`.
///
/// Inside a sub-graph the host channels are the sub-graph node's inputs.
/// A missing channel renders silence; a short one is zero-padded.
#[derive(Debug, Clone)]
pub struct HostInput {
    channel: usize,
}

impl HostInput {
    /// Creates a reader for `channel`.
    pub fn new(channel: usize) -> Self {
        Self { channel }
    }

    /// Creates a reader from a `[channel]` blob.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        let [channel] = param::resolve(config, PARAMS)?;
        if channel.fract() != 0.0 {
            return Err(ProcessorError::InvalidConfig(format!(
                "channel must be a whole number, got {channel}"
            )));
        }
        Ok(Self::new(channel as usize))
    }

    /// Host channel this node reads.
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl NodeProcessor for HostInput {
    fn render(
        &mut self,
        ctx: &RenderContext<'_>,
        _inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        let out = outputs.get_mut(0).ok_or(RenderError("no output port"))?;
        match ctx.host_input(self.channel) {
            Some(input) => {
                let (head, tail) = out.split_at_mut(input.len().min(out.len()));
                head.copy_from_slice(&input[..head.len()]);
                tail.fill(0.0);
            }
            None => out.fill(0.0),
        }
        Ok(())
    }
}
