//! Parameter descriptors for built-in processors.
//!
//! Each processor with fixed parameters publishes a `PARAMS` table. The blob
//! is decoded against it with [`resolve`]: absent trailing values take the
//! default, present values are clamped to the range.

use patchbay_core::{ProcessorError, params};

/// Unit of a parameter value, used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamUnit {
    /// Plain multiplier or level.
    Linear,
    /// Hertz.
    Hertz,
    /// Seconds.
    Seconds,
    /// Fraction in `[0, 1]`.
    Ratio,
    /// Whole number (channel, count).
    Count,
}

/// Describes one parameter slot in a blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Display name.
    pub name: &'static str,
    /// Display unit.
    pub unit: ParamUnit,
    /// Smallest accepted value.
    pub min: f32,
    /// Largest accepted value.
    pub max: f32,
    /// Value used when the blob omits this slot.
    pub default: f32,
}

impl ParamSpec {
    /// Creates a descriptor.
    pub const fn new(name: &'static str, unit: ParamUnit, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            unit,
            min,
            max,
            default,
        }
    }

    /// Clamps `value` into range.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Decodes `config` against `specs`.
///
/// Fails with [`ProcessorError::InvalidConfig`] when the blob is ragged,
/// carries more values than there are slots, or contains a non-finite value.
pub fn resolve<const N: usize>(
    config: &[u8],
    specs: &[ParamSpec; N],
) -> Result<[f32; N], ProcessorError> {
    let values = params::decode(config)?;
    if values.len() > N {
        return Err(ProcessorError::InvalidConfig(format!(
            "expected at most {N} parameters, got {}",
            values.len()
        )));
    }
    let mut resolved = [0.0; N];
    for (i, (slot, spec)) in resolved.iter_mut().zip(specs).enumerate() {
        let value = params::param_or(&values, i, spec.default);
        if !value.is_finite() {
            return Err(ProcessorError::InvalidConfig(format!(
                "{} must be finite, got {value}",
                spec.name
            )));
        }
        *slot = spec.clamp(value);
    }
    Ok(resolved)
}
