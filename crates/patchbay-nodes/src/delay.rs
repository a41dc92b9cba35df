//! Feedback delay.
//!
//! The delay line is a circular buffer sized from the delay time and the
//! sample rate negotiated at initialize, so the render path never allocates.
//! Uninitializing releases it.

use patchbay_core::{
    Inputs, NodeProcessor, Outputs, ProcessorError, RenderContext, RenderError, StreamFormat,
};

use crate::param::{self, ParamSpec, ParamUnit};

/// Parameter table: `[seconds, feedback, mix]`.
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | Time | 0.001–10 s | 0.25 |
/// | 1 | Feedback | 0–0.95 | 0.3 |
/// | 2 | Mix | 0–1 | 0.5 |
pub const PARAMS: &[ParamSpec; 3] = &[
    ParamSpec::new("Time", ParamUnit::Seconds, 0.001, 10.0, 0.25),
    ParamSpec::new("Feedback", ParamUnit::Ratio, 0.0, 0.95, 0.3),
    ParamSpec::new("Mix", ParamUnit::Ratio, 0.0, 1.0, 0.5),
];

/// Flushes values in the subnormal range to zero so a decaying feedback
/// loop does not fall onto the slow floating-point path.
#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Feedback delay on input 0.
///
/// Output is `input * (1 - mix) + delayed * mix`; the line is fed
/// `input + delayed * feedback`.
#[derive(Debug, Clone)]
pub struct Delay {
    seconds: f32,
    feedback: f32,
    mix: f32,
    buffer: Vec<f32>,
    write_pos: usize,
}

impl Delay {
    /// Creates a delay. Values are clamped to the ranges in [`PARAMS`].
    pub fn new(seconds: f32, feedback: f32, mix: f32) -> Self {
        Self {
            seconds: PARAMS[0].clamp(seconds),
            feedback: PARAMS[1].clamp(feedback),
            mix: PARAMS[2].clamp(mix),
            buffer: Vec::new(),
            write_pos: 0,
        }
    }

    /// Creates a delay from a `[seconds, feedback, mix]` blob.
    pub fn from_config(config: &[u8]) -> Result<Self, ProcessorError> {
        let [seconds, feedback, mix] = param::resolve(config, PARAMS)?;
        Ok(Self::new(seconds, feedback, mix))
    }

    /// Delay length in samples, 0 until initialized.
    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }
}

impl NodeProcessor for Delay {
    fn initialize(&mut self, format: &StreamFormat) -> Result<(), ProcessorError> {
        if !(format.sample_rate > 0.0) {
            return Err(ProcessorError::InvalidConfig(format!(
                "delay needs a positive sample rate, got {}",
                format.sample_rate
            )));
        }
        let samples = (f64::from(self.seconds) * format.sample_rate).round().max(1.0) as usize;
        self.buffer = vec![0.0; samples];
        self.write_pos = 0;
        Ok(())
    }

    fn uninitialize(&mut self) {
        self.buffer = Vec::new();
        self.write_pos = 0;
    }

    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        if self.buffer.is_empty() {
            return Err(RenderError("delay not initialized"));
        }
        let out = outputs.get_mut(0).ok_or(RenderError("no output port"))?;
        let input = inputs.get(0);
        let len = self.buffer.len();
        for (i, sample) in out.iter_mut().enumerate() {
            let dry = input.map_or(0.0, |signal| signal[i]);
            let delayed = self.buffer[self.write_pos];
            self.buffer[self.write_pos] = flush_denormal(dry + delayed * self.feedback);
            self.write_pos = (self.write_pos + 1) % len;
            *sample = dry * (1.0 - self.mix) + delayed * self.mix;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, run};
    use patchbay_core::params;

    fn format(sample_rate: f64) -> StreamFormat {
        StreamFormat {
            sample_rate,
            max_frames: 64,
        }
    }

    #[test]
    fn buffer_follows_lifecycle() {
        let mut delay = Delay::from_config(&params::encode(&[0.5])).unwrap();
        assert_eq!(delay.delay_samples(), 0);
        assert!(run(&mut delay, &ctx(4), &[], 1).is_err());

        delay.initialize(&format(1000.0)).unwrap();
        assert_eq!(delay.delay_samples(), 500);
        delay.uninitialize();
        assert_eq!(delay.delay_samples(), 0);
    }

    #[test]
    fn impulse_repeats_with_feedback() {
        // 4-sample delay, half feedback, fully wet.
        let mut delay = Delay::new(0.004, 0.5, 1.0);
        delay.initialize(&format(1000.0)).unwrap();

        let mut impulse = [0.0f32; 12];
        impulse[0] = 1.0;
        let out = run(&mut delay, &ctx(12), &[Some(&impulse)], 1).unwrap();
        let mut expected = [0.0f32; 12];
        expected[4] = 1.0;
        expected[8] = 0.5;
        assert_eq!(out[0], expected);
    }

    #[test]
    fn dry_mix_passes_input() {
        let mut delay = Delay::new(0.01, 0.9, 0.0);
        delay.initialize(&format(48000.0)).unwrap();
        let input = [0.25f32; 8];
        assert_eq!(run(&mut delay, &ctx(8), &[Some(&input)], 1).unwrap()[0], vec![0.25; 8]);
    }

    #[test]
    fn rejects_bad_format() {
        let mut delay = Delay::from_config(&[]).unwrap();
        assert!(delay.initialize(&format(0.0)).is_err());
    }
}
