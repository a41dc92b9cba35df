//! Patchbay Nodes - built-in processors
//!
//! This crate provides the processors every patchbay graph can use without
//! registering its own components:
//!
//! - [`GenericOutput`] - Passes input 0 to the graph output
//! - [`Gain`] - Scales input 0
//! - [`Delay`] - Feedback delay, buffer allocated at initialize
//! - [`Mixer`] - Sums every connected input with per-input gains
//! - [`Splitter`] - Copies input 0 to N outputs
//! - [`Sine`] - Sine oscillator
//! - [`Constant`] - DC source
//! - [`HostInput`] - Reads a channel the host passes to `Renderer::render`
//!
//! Parameters are an `f32` blob (see [`patchbay_core::params`]). Missing
//! values take the defaults listed in each processor's [`ParamSpec`] table and
//! out-of-range values are clamped.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use patchbay_core::{ComponentRegistry, Graph, params};
//!
//! let registry = Arc::new(ComponentRegistry::new());
//! patchbay_nodes::register_builtins(&registry);
//!
//! let graph = Graph::new(registry);
//! let sine = graph.add_node(patchbay_nodes::SINE, &params::encode(&[220.0, 0.3])).unwrap();
//! let out = graph.add_node(patchbay_nodes::GENERIC_OUTPUT, &[]).unwrap();
//! let _ = graph.connect(sine, 0, out, 0).unwrap();
//! ```

pub mod constant;
pub mod delay;
pub mod gain;
pub mod host_input;
pub mod mixer;
pub mod output;
pub mod param;
pub mod sine;
pub mod splitter;

use patchbay_core::{
    ComponentDescription, ComponentRegistry, FourCc, MANUFACTURER, NodeProcessor, ProcessorError,
    types,
};

// Re-export main types at crate root
pub use constant::Constant;
pub use delay::Delay;
pub use gain::Gain;
pub use host_input::HostInput;
pub use mixer::Mixer;
pub use output::GenericOutput;
pub use param::{ParamSpec, ParamUnit};
pub use sine::Sine;
pub use splitter::Splitter;

const fn builtin(component_type: FourCc, subtype: &[u8; 4]) -> ComponentDescription {
    ComponentDescription::new(component_type, FourCc(*subtype), MANUFACTURER)
}

/// `auou/genr/pbay`
pub const GENERIC_OUTPUT: ComponentDescription = builtin(types::OUTPUT, b"genr");
/// `aufx/gain/pbay`
pub const GAIN: ComponentDescription = builtin(types::EFFECT, b"gain");
/// `aufx/dely/pbay`
pub const DELAY: ComponentDescription = builtin(types::EFFECT, b"dely");
/// `aumx/smxr/pbay`
pub const MIXER: ComponentDescription = builtin(types::MIXER, b"smxr");
/// `aufc/splt/pbay`
pub const SPLITTER: ComponentDescription = builtin(types::FORMAT_CONVERTER, b"splt");
/// `augn/sine/pbay`
pub const SINE: ComponentDescription = builtin(types::GENERATOR, b"sine");
/// `augn/dcof/pbay`
pub const CONSTANT: ComponentDescription = builtin(types::GENERATOR, b"dcof");
/// `augn/hsti/pbay`
pub const HOST_INPUT: ComponentDescription = builtin(types::GENERATOR, b"hsti");

/// Metadata for one built-in processor.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    /// Descriptor nodes use to select this processor.
    pub description: ComponentDescription,
    /// Short name, e.g. `"gain"`.
    pub name: &'static str,
    /// One-line summary.
    pub summary: &'static str,
    /// Parameters in blob order. Empty for variadic processors.
    pub params: &'static [ParamSpec],
    build: fn(&[u8]) -> Result<Box<dyn NodeProcessor>, ProcessorError>,
}

impl Builtin {
    /// Creates a processor from a parameter blob.
    pub fn instantiate(&self, config: &[u8]) -> Result<Box<dyn NodeProcessor>, ProcessorError> {
        (self.build)(config)
    }
}

fn boxed<P: NodeProcessor + 'static>(
    result: Result<P, ProcessorError>,
) -> Result<Box<dyn NodeProcessor>, ProcessorError> {
    result.map(|p| Box::new(p) as Box<dyn NodeProcessor>)
}

static BUILTINS: [Builtin; 8] = [
    Builtin {
        description: GENERIC_OUTPUT,
        name: "output",
        summary: "Passes input 0 to the graph output",
        params: &[],
        build: |c| boxed(GenericOutput::from_config(c)),
    },
    Builtin {
        description: GAIN,
        name: "gain",
        summary: "Scales input 0",
        params: gain::PARAMS,
        build: |c| boxed(Gain::from_config(c)),
    },
    Builtin {
        description: DELAY,
        name: "delay",
        summary: "Feedback delay",
        params: delay::PARAMS,
        build: |c| boxed(Delay::from_config(c)),
    },
    Builtin {
        description: MIXER,
        name: "mixer",
        summary: "Sums connected inputs, one gain per input",
        params: &[],
        build: |c| boxed(Mixer::from_config(c)),
    },
    Builtin {
        description: SPLITTER,
        name: "splitter",
        summary: "Copies input 0 to every output",
        params: splitter::PARAMS,
        build: |c| boxed(Splitter::from_config(c)),
    },
    Builtin {
        description: SINE,
        name: "sine",
        summary: "Sine oscillator",
        params: sine::PARAMS,
        build: |c| boxed(Sine::from_config(c)),
    },
    Builtin {
        description: CONSTANT,
        name: "constant",
        summary: "Writes a constant value",
        params: constant::PARAMS,
        build: |c| boxed(Constant::from_config(c)),
    },
    Builtin {
        description: HOST_INPUT,
        name: "host-input",
        summary: "Copies one host input channel",
        params: host_input::PARAMS,
        build: |c| boxed(HostInput::from_config(c)),
    },
];

/// Every built-in processor.
pub fn builtins() -> &'static [Builtin] {
    &BUILTINS
}

/// Built-in processor for `description`, if any.
pub fn find_builtin(description: &ComponentDescription) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.description == *description)
}

/// Built-in processor by short name.
pub fn builtin_by_name(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Registers every built-in processor with `registry`.
pub fn register_builtins(registry: &ComponentRegistry) {
    for builtin in &BUILTINS {
        let build = builtin.build;
        registry.register(
            builtin.description,
            builtin.name,
            move |_: &ComponentDescription,
                  config: &[u8]|
                  -> Result<Box<dyn NodeProcessor>, ProcessorError> { build(config) },
        );
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered() {
        let registry = ComponentRegistry::new();
        register_builtins(&registry);
        assert_eq!(registry.len(), BUILTINS.len());
        for builtin in builtins() {
            let entry = registry.find(&builtin.description).unwrap();
            assert_eq!(entry.name, builtin.name);
            assert!(builtin.description.is_well_formed());
        }
    }

    #[test]
    fn builtins_have_unique_descriptions_and_names() {
        for (i, a) in BUILTINS.iter().enumerate() {
            for b in &BUILTINS[i + 1..] {
                assert_ne!(a.description, b.description);
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn lookup_by_name_and_description() {
        assert_eq!(builtin_by_name("delay").unwrap().description, DELAY);
        assert_eq!(find_builtin(&SINE).unwrap().name, "sine");
        assert!(builtin_by_name("reverb").is_none());
    }

    #[test]
    fn defaults_instantiate() {
        for builtin in builtins() {
            assert!(builtin.instantiate(&[]).is_ok(), "{}", builtin.name);
        }
    }
}
