//! Summing mixer.

use patchbay_core::{
    Inputs, MAX_PORTS, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError, params,
};

/// Sums every connected input into output 0.
///
/// The parameter blob holds one gain per input port; ports past the end of
/// the blob use unity gain. Gains must be finite.
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    gains: Vec<f32>,
}

impl Mixer {
    /// Creates a mixer with the given per-input gains.
    pub fn new(gains: Vec<f32>) -> Self {
        Self { gains }
    }

    /// Creates a mixer from a blob of per-input gains.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        let gains = params::decode(config)?;
        if gains.len() > MAX_PORTS as usize {
            return Err(ProcessorError::InvalidConfig(format!(
                "mixer has at most {MAX_PORTS} inputs, got {} gains",
                gains.len()
            )));
        }
        if let Some(bad) = gains.iter().find(|g| !g.is_finite()) {
            return Err(ProcessorError::InvalidConfig(format!(
                "mixer gain must be finite, got {bad}"
            )));
        }
        Ok(Self::new(gains))
    }

    /// Gain applied to `port`.
    pub fn gain(&self, port: usize) -> f32 {
        params::param_or(&self.gains, port, 1.0)
    }
}

impl NodeProcessor for Mixer {
    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        let out = outputs.get_mut(0).ok_or(RenderError("no output port"))?;
        out.fill(0.0);
        for (port, signal) in inputs.connected() {
            let gain = self.gain(port);
            for (o, &s) in out.iter_mut().zip(signal) {
                *o += s * gain;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, run};

    #[test]
    fn sums_connected_inputs_with_gains() {
        let mut mixer = Mixer::from_config(&params::encode(&[0.5, 2.0])).unwrap();
        let a = [1.0f32; 3];
        let c = [0.25f32; 3];
        // Port 1 unconnected, port 2 past the gain table.
        let out = run(&mut mixer, &ctx(3), &[Some(&a), None, Some(&c)], 1).unwrap();
        assert_eq!(out[0], vec![0.75; 3]);
    }

    #[test]
    fn no_inputs_is_silence() {
        let mut mixer = Mixer::default();
        assert_eq!(run(&mut mixer, &ctx(2), &[], 1).unwrap()[0], vec![0.0; 2]);
    }

    #[test]
    fn rejects_bad_gains() {
        assert!(Mixer::from_config(&params::encode(&[f32::INFINITY])).is_err());
        assert!(Mixer::from_config(&params::encode(&vec![1.0; MAX_PORTS as usize + 1])).is_err());
    }
}
