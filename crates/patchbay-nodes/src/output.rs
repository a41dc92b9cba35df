//! Generic output unit.

use patchbay_core::{Inputs, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError};

/// The graph's output node: copies input 0 to output 0, silence when unconnected.
///
/// Tracks whether it has been started so a render before `start` is reported
/// instead of silently producing audio.
#[derive(Debug, Default)]
pub struct GenericOutput {
    started: bool,
}

impl GenericOutput {
    /// Creates an output node. Takes no parameters.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        if config.is_empty() {
            Ok(Self::default())
        } else {
            Err(ProcessorError::InvalidConfig(
                "output takes no parameters".into(),
            ))
        }
    }

    /// True between `start` and `stop`.
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl NodeProcessor for GenericOutput {
    fn start(&mut self) -> Result<(), ProcessorError> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        if !self.started {
            return Err(RenderError("output not started"));
        }
        let out = outputs.get_mut(0).ok_or(RenderError("no output port"))?;
        match inputs.get(0) {
            Some(input) => out.copy_from_slice(input),
            None => out.fill(0.0),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, run};

    #[test]
    fn passes_input_through_once_started() {
        let mut node = GenericOutput::from_config(&[]).unwrap();
        let input = [0.5f32; 4];
        assert!(run(&mut node, &ctx(4), &[Some(&input)], 1).is_err());

        node.start().unwrap();
        assert_eq!(run(&mut node, &ctx(4), &[Some(&input)], 1).unwrap(), vec![vec![0.5; 4]]);
        assert_eq!(run(&mut node, &ctx(4), &[], 1).unwrap(), vec![vec![0.0; 4]]);

        node.stop();
        assert!(!node.is_started());
    }

    #[test]
    fn rejects_parameters() {
        assert!(GenericOutput::from_config(&[0, 0, 0, 0]).is_err());
    }
}
